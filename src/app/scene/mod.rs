mod surface;

use std::collections::BTreeSet;

use eframe::egui::{Color32, Pos2, Stroke, vec2};

use super::graph::GraphModel;
use super::graph::interaction::{HoverState, ViewTransform};
use super::physics::Simulation;
use super::render_utils::{circle_visible, edge_visible, with_alpha};
use super::theme::Palette;

pub(super) use surface::{
    RenderBackend, SceneSurface, SurfaceError, SurfaceLease, SurfaceRegistry, surface_for,
};

const DIMMED_ALPHA: f32 = 0.2;
const LABEL_PIXELS_PER_FONT_UNIT: f32 = 15.0;
const HOVERED_LABEL_MAGNIFICATION: f32 = 1.1;
const LABEL_FADE_SPAN: f32 = 3.75;
const LABEL_GAP: f32 = 2.0;
const TAG_OUTLINE_WIDTH: f32 = 2.0;
const EDGE_WIDTH: f32 = 1.0;
const MIN_HIT_RADIUS: f32 = 4.0;

/// Everything besides the model and layout that decides how one frame looks.
pub(super) struct SceneInputs<'a> {
    pub(super) center: Pos2,
    pub(super) view: ViewTransform,
    pub(super) hover: &'a HoverState,
    pub(super) visited: &'a BTreeSet<String>,
    pub(super) palette: Palette,
    pub(super) font_size: f32,
    pub(super) opacity_scale: f32,
    pub(super) focus_on_hover: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct EdgeVisual {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) endpoints: Option<[Pos2; 2]>,
    pub(super) color: Color32,
    pub(super) alpha: f32,
    pub(super) width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct NodeVisual {
    pub(super) position: Option<Pos2>,
    pub(super) radius: f32,
    pub(super) fill: Color32,
    pub(super) outline: Option<Stroke>,
    pub(super) alpha: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct LabelVisual {
    pub(super) text: String,
    pub(super) anchor: Option<Pos2>,
    pub(super) size: f32,
    pub(super) color: Color32,
    pub(super) alpha: f32,
}

/// Retained edge, node and label layers of one graph instance, drawn in that
/// order. Holds the canvas lease of its slot; without one it paints nothing.
pub(super) struct RenderScene {
    edges: Vec<EdgeVisual>,
    nodes: Vec<NodeVisual>,
    labels: Vec<LabelVisual>,
    lease: Option<SurfaceLease>,
}

/// Current, visited/tag or default colour of a node.
pub(super) fn node_color(
    model: &GraphModel,
    index: usize,
    visited: &BTreeSet<String>,
    palette: Palette,
) -> Color32 {
    let node = &model.nodes[index];
    if node.id == model.focus {
        palette.secondary
    } else if node.is_tag || visited.contains(&node.id) {
        palette.tertiary
    } else {
        palette.gray
    }
}

/// Label opacity from zoom alone; zero until the zoom passes the threshold.
pub(super) fn zoom_label_alpha(zoom: f32, opacity_scale: f32) -> f32 {
    ((zoom * opacity_scale - 1.0) / LABEL_FADE_SPAN).clamp(0.0, 1.0)
}

impl RenderScene {
    pub(super) fn new(model: &GraphModel, lease: Option<SurfaceLease>) -> Self {
        let edges = model
            .edges
            .iter()
            .map(|edge| EdgeVisual {
                source: edge.source,
                target: edge.target,
                endpoints: None,
                color: Color32::TRANSPARENT,
                alpha: 1.0,
                width: EDGE_WIDTH,
            })
            .collect();
        let nodes = model
            .nodes
            .iter()
            .map(|_| NodeVisual {
                position: None,
                radius: 0.0,
                fill: Color32::TRANSPARENT,
                outline: None,
                alpha: 1.0,
            })
            .collect();
        let labels = model
            .nodes
            .iter()
            .map(|node| LabelVisual {
                text: node.text.clone(),
                anchor: None,
                size: 0.0,
                color: Color32::TRANSPARENT,
                alpha: 0.0,
            })
            .collect();

        Self {
            edges,
            nodes,
            labels,
            lease,
        }
    }

    pub(super) fn backend(&self) -> Option<RenderBackend> {
        self.lease.as_ref().map(SurfaceLease::backend)
    }

    /// Drops every visual and hands back the canvas lease.
    pub(super) fn release(&mut self) -> Option<SurfaceLease> {
        self.edges.clear();
        self.nodes.clear();
        self.labels.clear();
        self.lease.take()
    }

    #[cfg(test)]
    pub(super) fn edges(&self) -> &[EdgeVisual] {
        &self.edges
    }

    #[cfg(test)]
    pub(super) fn nodes(&self) -> &[NodeVisual] {
        &self.nodes
    }

    #[cfg(test)]
    pub(super) fn labels(&self) -> &[LabelVisual] {
        &self.labels
    }

    pub(super) fn sync(&mut self, model: &GraphModel, simulation: &Simulation, inputs: &SceneInputs) {
        let scale = inputs.view.scale();
        let hovered = inputs.hover.hovered;
        let dimming = hovered.is_some() && inputs.focus_on_hover;
        let label_size = inputs.font_size * LABEL_PIXELS_PER_FONT_UNIT;
        let zoom_alpha = zoom_label_alpha(inputs.view.zoom, inputs.opacity_scale);

        for (index, visual) in self.nodes.iter_mut().enumerate() {
            let Some(node) = model.nodes.get(index) else {
                continue;
            };
            let color = node_color(model, index, inputs.visited, inputs.palette);
            let active = inputs.hover.is_active(index);

            visual.position = simulation
                .position(index)
                .map(|world| inputs.view.to_screen(inputs.center, world));
            visual.radius = model.radius(index) * scale;
            if node.is_tag {
                visual.fill = inputs.palette.light;
                visual.outline = Some(Stroke::new(
                    TAG_OUTLINE_WIDTH * scale,
                    inputs.palette.tertiary,
                ));
            } else {
                visual.fill = color;
                visual.outline = None;
            }
            visual.alpha = if dimming && !active { DIMMED_ALPHA } else { 1.0 };

            let label = &mut self.labels[index];
            label.anchor = visual
                .position
                .map(|position| position - vec2(0.0, visual.radius + LABEL_GAP));
            label.color = inputs.palette.dark;
            if hovered == Some(index) {
                label.alpha = 1.0;
                label.size = label_size * HOVERED_LABEL_MAGNIFICATION;
            } else {
                label.alpha = if dimming && !active { 0.0 } else { zoom_alpha };
                label.size = label_size;
            }
        }

        for visual in &mut self.edges {
            let active = hovered.is_some_and(|index| visual.source == index || visual.target == index);
            visual.endpoints = match (
                self.nodes.get(visual.source).and_then(|node| node.position),
                self.nodes.get(visual.target).and_then(|node| node.position),
            ) {
                (Some(from), Some(to)) => Some([from, to]),
                _ => None,
            };
            visual.color = if active {
                inputs.palette.gray
            } else {
                inputs.palette.lightgray
            };
            visual.alpha = if dimming && !active { DIMMED_ALPHA } else { 1.0 };
            visual.width = (EDGE_WIDTH * scale).max(0.5);
        }
    }

    /// Paints the three layers bottom to top. Returns the number of
    /// primitives submitted; elements without coordinates are skipped.
    pub(super) fn paint(&self, surface: &mut dyn SceneSurface) -> usize {
        if self.lease.is_none() {
            return 0;
        }

        let clip = surface.clip_rect();
        let mut drawn = 0;

        for edge in &self.edges {
            let Some([from, to]) = edge.endpoints else {
                continue;
            };
            if !edge_visible(clip, from, to, edge.width) {
                continue;
            }
            surface.line(
                from,
                to,
                Stroke::new(edge.width, with_alpha(edge.color, edge.alpha)),
            );
            drawn += 1;
        }

        for node in &self.nodes {
            let Some(position) = node.position else {
                continue;
            };
            let stroke = node.outline.map_or(Stroke::NONE, |outline| {
                Stroke::new(outline.width, with_alpha(outline.color, node.alpha))
            });
            if !circle_visible(clip, position, node.radius + stroke.width) {
                continue;
            }
            surface.circle(position, node.radius, with_alpha(node.fill, node.alpha), stroke);
            drawn += 1;
        }

        for label in &self.labels {
            let Some(anchor) = label.anchor else {
                continue;
            };
            if label.alpha <= f32::EPSILON || !clip.expand(label.size * 8.0).contains(anchor) {
                continue;
            }
            surface.text(anchor, &label.text, label.size, with_alpha(label.color, label.alpha));
            drawn += 1;
        }

        surface.finish();
        drawn
    }

    /// Topmost node under `pointer` in screen space.
    pub(super) fn hit_test(&self, pointer: Pos2) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let distance = node.position?.distance(pointer);
                (distance <= node.radius.max(MIN_HIT_RADIUS)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Rect, pos2};

    use super::super::graph::{GraphEdge, GraphNode};
    use super::super::physics::LayoutConfig;
    use super::super::session::Slot;
    use super::super::theme::ThemeMode;
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Drawn {
        Line,
        Circle { outlined: bool },
        Text(String),
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<Drawn>,
        finished: bool,
    }

    impl SceneSurface for RecordingSurface {
        fn clip_rect(&self) -> Rect {
            Rect::from_min_max(pos2(-10_000.0, -10_000.0), pos2(10_000.0, 10_000.0))
        }

        fn line(&mut self, _from: Pos2, _to: Pos2, _stroke: Stroke) {
            self.calls.push(Drawn::Line);
        }

        fn circle(&mut self, _center: Pos2, _radius: f32, _fill: Color32, stroke: Stroke) {
            self.calls.push(Drawn::Circle {
                outlined: stroke.width > 0.0,
            });
        }

        fn text(&mut self, _anchor: Pos2, text: &str, _size: f32, _color: Color32) {
            self.calls.push(Drawn::Text(text.to_owned()));
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    fn node(id: &str, is_tag: bool) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            text: if is_tag { format!("#{id}") } else { id.to_uppercase() },
            tags: Default::default(),
            is_tag,
        }
    }

    /// a - b - c, with a tag node on a.
    fn model() -> GraphModel {
        GraphModel::new(
            vec![node("a", false), node("b", false), node("c", false), node("tags/x", true)],
            vec![
                GraphEdge { source: 0, target: 1 },
                GraphEdge { source: 1, target: 2 },
                GraphEdge { source: 0, target: 3 },
            ],
            "a".to_owned(),
        )
    }

    fn simulation(model: &GraphModel) -> Simulation {
        Simulation::start(
            model,
            LayoutConfig {
                repel_force: 0.5,
                center_force: 0.3,
                link_distance: 30.0,
                radial_radius: None,
            },
        )
    }

    fn lease() -> Option<SurfaceLease> {
        SurfaceRegistry::new(RenderBackend::Immediate)
            .lease(Slot::Local)
            .ok()
    }

    fn inputs<'a>(hover: &'a HoverState, visited: &'a BTreeSet<String>, zoom: f32) -> SceneInputs<'a> {
        let mut view = ViewTransform::new(1.0);
        view.zoom = zoom;
        SceneInputs {
            center: pos2(100.0, 100.0),
            view,
            hover,
            visited,
            palette: ThemeMode::Light.palette(),
            font_size: 0.6,
            opacity_scale: 1.0,
            focus_on_hover: true,
        }
    }

    #[test]
    fn colours_follow_focus_visited_and_tags() {
        let model = model();
        let palette = ThemeMode::Light.palette();
        let visited = BTreeSet::from(["b".to_owned()]);
        assert_eq!(node_color(&model, 0, &visited, palette), palette.secondary);
        assert_eq!(node_color(&model, 1, &visited, palette), palette.tertiary);
        assert_eq!(node_color(&model, 2, &visited, palette), palette.gray);
        assert_eq!(node_color(&model, 3, &visited, palette), palette.tertiary);
    }

    #[test]
    fn tag_nodes_get_an_outline() {
        let model = model();
        let simulation = simulation(&model);
        let mut scene = RenderScene::new(&model, lease());
        let hover = HoverState::default();
        let visited = BTreeSet::new();
        scene.sync(&model, &simulation, &inputs(&hover, &visited, 1.0));

        let palette = ThemeMode::Light.palette();
        assert_eq!(scene.nodes()[3].fill, palette.light);
        assert_eq!(
            scene.nodes()[3].outline.map(|stroke| stroke.color),
            Some(palette.tertiary)
        );
        assert_eq!(scene.nodes()[0].outline, None);
    }

    #[test]
    fn hover_dims_unrelated_elements() {
        let model = model();
        let simulation = simulation(&model);
        let mut scene = RenderScene::new(&model, lease());
        let hover = HoverState::for_node(&model, 2);
        let visited = BTreeSet::new();
        scene.sync(&model, &simulation, &inputs(&hover, &visited, 1.0));

        assert_eq!(scene.nodes()[2].alpha, 1.0);
        assert_eq!(scene.nodes()[1].alpha, 1.0);
        assert_eq!(scene.nodes()[0].alpha, DIMMED_ALPHA);
        assert_eq!(scene.edges()[1].alpha, 1.0);
        assert_eq!(scene.edges()[0].alpha, DIMMED_ALPHA);

        let palette = ThemeMode::Light.palette();
        assert_eq!(scene.edges()[1].color, palette.gray);
        assert_eq!(scene.edges()[0].color, palette.lightgray);

        let hovered = &scene.labels()[2];
        assert_eq!(hovered.alpha, 1.0);
        assert!(hovered.size > scene.labels()[1].size);
    }

    #[test]
    fn without_focus_on_hover_everything_stays_opaque() {
        let model = model();
        let simulation = simulation(&model);
        let mut scene = RenderScene::new(&model, lease());
        let hover = HoverState::for_node(&model, 2);
        let visited = BTreeSet::new();
        let mut frame = inputs(&hover, &visited, 1.0);
        frame.focus_on_hover = false;
        scene.sync(&model, &simulation, &frame);

        assert!(scene.nodes().iter().all(|node| node.alpha == 1.0));
        assert!(scene.edges().iter().all(|edge| edge.alpha == 1.0));
    }

    #[test]
    fn labels_fade_in_with_zoom_at_constant_size() {
        assert_eq!(zoom_label_alpha(1.0, 1.0), 0.0);
        assert!(zoom_label_alpha(2.0, 1.0) > 0.0);
        assert_eq!(zoom_label_alpha(4.0, 2.0), 1.0);

        let model = model();
        let simulation = simulation(&model);
        let mut scene = RenderScene::new(&model, lease());
        let hover = HoverState::default();
        let visited = BTreeSet::new();

        scene.sync(&model, &simulation, &inputs(&hover, &visited, 1.0));
        let near = scene.labels()[0].clone();
        scene.sync(&model, &simulation, &inputs(&hover, &visited, 3.0));
        let far = scene.labels()[0].clone();

        assert_eq!(near.alpha, 0.0);
        assert!(far.alpha > 0.0);
        assert_eq!(near.size, far.size);
    }

    #[test]
    fn paints_layers_in_order_and_skips_unresolved_nodes() {
        let model = model();
        let mut simulation = simulation(&model);
        simulation.bodies_mut()[2].position = eframe::egui::vec2(f32::NAN, 0.0);

        let mut scene = RenderScene::new(&model, lease());
        let hover = HoverState::for_node(&model, 0);
        let visited = BTreeSet::new();
        scene.sync(&model, &simulation, &inputs(&hover, &visited, 1.0));
        assert!(scene.nodes()[2].position.is_none());
        assert!(scene.edges()[1].endpoints.is_none());

        let mut surface = RecordingSurface::default();
        let drawn = scene.paint(&mut surface);

        assert!(surface.finished);
        assert_eq!(drawn, surface.calls.len());
        assert_eq!(&surface.calls[..2], &[Drawn::Line, Drawn::Line]);
        assert_eq!(
            &surface.calls[2..5],
            &[
                Drawn::Circle { outlined: false },
                Drawn::Circle { outlined: false },
                Drawn::Circle { outlined: true },
            ]
        );
        assert_eq!(&surface.calls[5..], &[Drawn::Text("A".to_owned())]);
    }

    #[test]
    fn no_lease_means_nothing_is_drawn() {
        let model = model();
        let simulation = simulation(&model);
        let mut scene = RenderScene::new(&model, None);
        let hover = HoverState::default();
        let visited = BTreeSet::new();
        scene.sync(&model, &simulation, &inputs(&hover, &visited, 1.0));

        let mut surface = RecordingSurface::default();
        assert_eq!(scene.paint(&mut surface), 0);
        assert!(surface.calls.is_empty());
        assert_eq!(scene.backend(), None);
    }

    #[test]
    fn hit_test_finds_the_nearest_node() {
        let model = model();
        let simulation = simulation(&model);
        let mut scene = RenderScene::new(&model, lease());
        let hover = HoverState::default();
        let visited = BTreeSet::new();
        scene.sync(&model, &simulation, &inputs(&hover, &visited, 1.0));

        let target = scene.nodes()[1].position.unwrap();
        assert_eq!(scene.hit_test(target + vec2(0.5, 0.0)), Some(1));
        assert_eq!(scene.hit_test(pos2(-5_000.0, -5_000.0)), None);

        assert!(scene.release().is_some());
        assert!(scene.nodes().is_empty());
        assert_eq!(scene.hit_test(target), None);
    }
}
