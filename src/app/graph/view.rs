use std::collections::BTreeSet;

use eframe::egui::{self, CursorIcon, Sense, Stroke, Ui};

use super::super::render_utils::blend_color;
use super::super::scene::{SceneInputs, surface_for};
use super::super::session::{GraphInstance, radial_radius};
use super::super::theme::Palette;
use super::interaction::NavigationTarget;
use crate::content::slug::tag_name;

/// egui reports Ctrl+wheel as a zoom factor and also leaves it in the raw
/// scroll delta; only one of the two may move the zoom.
fn wheel_zoom_delta(scroll: f32, pinch: f32) -> f32 {
    if pinch == 1.0 { scroll } else { 0.0 }
}

/// Draws one graph canvas filling the available space and feeds it this
/// frame's pointer input. Returns the node the user clicked, if any.
pub(in crate::app) fn draw_graph(
    ui: &mut Ui,
    instance: &mut GraphInstance,
    visited: &BTreeSet<String>,
    palette: Palette,
) -> Option<NavigationTarget> {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, palette.light);
    painter.rect_stroke(
        rect,
        4.0,
        Stroke::new(1.0, blend_color(palette.lightgray, palette.gray, 0.3)),
        egui::StrokeKind::Inside,
    );

    let GraphInstance {
        model,
        simulation,
        scene,
        controller,
        frame_loop,
        config,
    } = instance;

    let center = rect.center();
    let mut navigation = None;

    let (pointer, pressed, released, scroll, pinch) = ui.input(|input| {
        (
            input.pointer.hover_pos(),
            input.pointer.primary_pressed(),
            input.pointer.primary_released(),
            input.raw_scroll_delta.y,
            input.zoom_delta(),
        )
    });
    let pointer_inside =
        response.hovered() && pointer.is_some_and(|position| rect.contains(position));

    match pointer {
        Some(position) if pointer_inside || controller.is_pressed() => {
            if pressed && pointer_inside {
                controller.pointer_pressed(position, model, scene, simulation);
            }
            controller.pointer_moved(position, model, scene, simulation);
        }
        _ => controller.pointer_left(model),
    }
    if released {
        navigation = controller.pointer_released(model, simulation);
    }

    if pointer_inside && let Some(anchor) = pointer {
        controller.scrolled(center, anchor, wheel_zoom_delta(scroll, pinch));
        controller.zoom_by(center, anchor, pinch);
    }

    if controller.is_dragging() {
        ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
    } else if controller.hover().hovered.is_some() {
        ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
    }

    if frame_loop.tick() {
        simulation.set_radial_radius(radial_radius(config, rect.width(), rect.height()));
        simulation.step();
        ui.ctx().request_repaint();
    }

    scene.sync(
        model,
        simulation,
        &SceneInputs {
            center,
            view: controller.view(),
            hover: controller.hover(),
            visited,
            palette,
            font_size: config.font_size,
            opacity_scale: config.opacity_scale,
            focus_on_hover: config.focus_on_hover,
        },
    );

    if let Some(backend) = scene.backend() {
        let mut surface = surface_for(backend, &painter);
        scene.paint(surface.as_mut());
    }

    navigation
}

/// One line describing the hovered node, or the graph when nothing is hovered.
pub(in crate::app) fn hover_caption(instance: &GraphInstance) -> String {
    let hovered = instance
        .controller
        .hover()
        .hovered
        .and_then(|index| instance.model.nodes.get(index));

    match hovered {
        Some(node) if node.tags.is_empty() => node.text.clone(),
        Some(node) => {
            let tags = node
                .tags
                .iter()
                .map(|tag| format!("#{}", tag_name(tag)))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{}  {tags}", node.text)
        }
        None => format!(
            "{} nodes, {} edges, energy {:.3}",
            instance.model.nodes.len(),
            instance.model.edges.len(),
            instance.simulation.alpha()
        ),
    }
}

/// Placeholder for a slot that is open but has nothing to draw.
pub(in crate::app) fn draw_empty_graph(ui: &mut Ui, palette: Palette) {
    let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, palette.light);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "No linked pages",
        egui::FontId::proportional(13.0),
        palette.darkgray,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_zoom_is_ignored_while_a_zoom_gesture_is_reported() {
        assert_eq!(wheel_zoom_delta(120.0, 1.0), 120.0);
        assert_eq!(wheel_zoom_delta(120.0, 1.2), 0.0);
        assert_eq!(wheel_zoom_delta(0.0, 0.8), 0.0);
    }
}
