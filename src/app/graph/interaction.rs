use std::collections::HashSet;

use eframe::egui::{Pos2, Vec2};
use tracing::debug;

use crate::config::GraphConfig;
use crate::content::slug::navigation_href;

use super::super::physics::Simulation;
use super::super::render_utils::{screen_to_world, world_to_screen};
use super::super::scene::RenderScene;
use super::GraphModel;

pub(in crate::app) const MIN_ZOOM: f32 = 0.25;
pub(in crate::app) const MAX_ZOOM: f32 = 4.0;
/// Pointer travel, in pixels, after which a press is a drag and not a click.
const CLICK_SLOP: f32 = 3.0;
const SCROLL_ZOOM_RATE: f32 = 0.0018;

/// Pan offset and zoom of one canvas. Screen position of a world point is
/// `center + pan + world * base_scale * zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ViewTransform {
    pub(in crate::app) pan: Vec2,
    pub(in crate::app) zoom: f32,
    pub(in crate::app) base_scale: f32,
}

impl ViewTransform {
    pub(in crate::app) fn new(base_scale: f32) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            base_scale,
        }
    }

    pub(in crate::app) fn scale(&self) -> f32 {
        self.base_scale * self.zoom
    }

    pub(in crate::app) fn to_screen(&self, center: Pos2, world: Vec2) -> Pos2 {
        world_to_screen(center, self.pan, self.scale(), world)
    }

    pub(in crate::app) fn to_world(&self, center: Pos2, screen: Pos2) -> Vec2 {
        screen_to_world(center, self.pan, self.scale(), screen)
    }

    /// Multiplies the zoom by `factor`, clamped, keeping the world point under
    /// `anchor` where it is on screen.
    pub(in crate::app) fn zoom_about(&mut self, center: Pos2, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world = self.to_world(center, anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = anchor - center - world * self.scale();
    }
}

/// Hovered node plus every node sharing an edge with it (itself included).
#[derive(Clone, Debug, Default, PartialEq)]
pub(in crate::app) struct HoverState {
    pub(in crate::app) hovered: Option<usize>,
    pub(in crate::app) neighbours: HashSet<usize>,
}

impl HoverState {
    pub(in crate::app) fn for_node(model: &GraphModel, index: usize) -> Self {
        let mut neighbours = model.neighbours(index);
        neighbours.insert(index);
        Self {
            hovered: Some(index),
            neighbours,
        }
    }

    pub(in crate::app) fn is_active(&self, index: usize) -> bool {
        self.neighbours.contains(&index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DragState {
    Idle,
    Pressed {
        node: usize,
        press: Pos2,
        /// World position at press; `None` when dragging is disabled.
        origin: Option<Vec2>,
        moved: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PanState {
    Idle,
    Panning { last: Pos2 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct NavigationTarget {
    pub(in crate::app) id: String,
    pub(in crate::app) href: String,
}

/// Turns pointer input on one canvas into hover, drag, pan/zoom and click
/// navigation.
pub(in crate::app) struct InteractionController {
    view: ViewTransform,
    hover: HoverState,
    drag: DragState,
    pan: PanState,
    drag_enabled: bool,
    zoom_enabled: bool,
    base_path: String,
}

impl InteractionController {
    pub(in crate::app) fn new(config: &GraphConfig, base_path: &str) -> Self {
        Self {
            view: ViewTransform::new(config.scale),
            hover: HoverState::default(),
            drag: DragState::Idle,
            pan: PanState::Idle,
            drag_enabled: config.drag,
            zoom_enabled: config.zoom,
            base_path: base_path.to_owned(),
        }
    }

    pub(in crate::app) fn view(&self) -> ViewTransform {
        self.view
    }

    pub(in crate::app) fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub(in crate::app) fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Pressed { moved: true, .. })
    }

    pub(in crate::app) fn is_pressed(&self) -> bool {
        matches!(self.drag, DragState::Pressed { .. }) || matches!(self.pan, PanState::Panning { .. })
    }

    fn set_hover(&mut self, model: &GraphModel, hovered: Option<usize>) {
        if self.hover.hovered == hovered {
            return;
        }
        self.hover = match hovered {
            Some(index) => HoverState::for_node(model, index),
            None => HoverState::default(),
        };
    }

    pub(in crate::app) fn pointer_moved(
        &mut self,
        pointer: Pos2,
        model: &GraphModel,
        scene: &RenderScene,
        simulation: &mut Simulation,
    ) {
        match &mut self.drag {
            DragState::Pressed {
                node,
                press,
                origin,
                moved,
            } => {
                let delta = pointer - *press;
                if delta.length() > CLICK_SLOP {
                    *moved = true;
                }
                if let Some(origin) = *origin
                    && *moved
                {
                    simulation.pin(*node, origin + delta / self.view.scale());
                }
                return;
            }
            DragState::Idle => {}
        }

        if let PanState::Panning { last } = &mut self.pan {
            self.view.pan += pointer - *last;
            *last = pointer;
            return;
        }

        self.set_hover(model, scene.hit_test(pointer));
    }

    pub(in crate::app) fn pointer_left(&mut self, model: &GraphModel) {
        if matches!(self.drag, DragState::Idle) {
            self.set_hover(model, None);
        }
    }

    pub(in crate::app) fn pointer_pressed(
        &mut self,
        pointer: Pos2,
        model: &GraphModel,
        scene: &RenderScene,
        simulation: &mut Simulation,
    ) {
        let Some(node) = scene.hit_test(pointer) else {
            if self.zoom_enabled {
                self.pan = PanState::Panning { last: pointer };
            }
            return;
        };

        self.set_hover(model, Some(node));
        let origin = if self.drag_enabled {
            simulation.position(node)
        } else {
            None
        };
        if let Some(origin) = origin {
            simulation.pin(node, origin);
            simulation.set_alpha_target(1.0);
        }
        self.drag = DragState::Pressed {
            node,
            press: pointer,
            origin,
            moved: false,
        };
    }

    /// Ends any gesture. A press that never left the click slop navigates.
    pub(in crate::app) fn pointer_released(
        &mut self,
        model: &GraphModel,
        simulation: &mut Simulation,
    ) -> Option<NavigationTarget> {
        self.pan = PanState::Idle;

        let DragState::Pressed {
            node,
            origin,
            moved,
            ..
        } = std::mem::replace(&mut self.drag, DragState::Idle)
        else {
            return None;
        };

        if origin.is_some() {
            simulation.unpin(node);
            simulation.set_alpha_target(0.0);
        }
        if moved {
            return None;
        }

        let id = &model.nodes.get(node)?.id;
        let target = NavigationTarget {
            id: id.clone(),
            href: navigation_href(id, &self.base_path),
        };
        debug!(id = %target.id, href = %target.href, "graph node clicked");
        Some(target)
    }

    /// Wheel zoom; `delta` is the vertical scroll in points.
    pub(in crate::app) fn scrolled(&mut self, center: Pos2, anchor: Pos2, delta: f32) {
        if delta.abs() <= f32::EPSILON {
            return;
        }
        let factor = (1.0 + delta * SCROLL_ZOOM_RATE).clamp(0.85, 1.15);
        self.zoom_by(center, anchor, factor);
    }

    pub(in crate::app) fn zoom_by(&mut self, center: Pos2, anchor: Pos2, factor: f32) {
        if self.zoom_enabled && (factor - 1.0).abs() > f32::EPSILON {
            self.view.zoom_about(center, anchor, factor);
        }
    }
}
