mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use super::graph::GraphModel;
use forces::{
    ChargeParams, CollisionParams, Spring, accumulate_charge, accumulate_collision_pairs,
    apply_centering, apply_radial, apply_springs,
};
use quadtree::Cell;

const BARNES_HUT_THETA: f32 = 0.9;
const ALPHA_MIN: f32 = 0.001;
const VELOCITY_DECAY: f32 = 0.4;
const COLLISION_ITERATIONS: usize = 3;
const RADIAL_STRENGTH: f32 = 0.2;
const INITIAL_RADIUS: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct LayoutConfig {
    pub(super) repel_force: f32,
    pub(super) center_force: f32,
    pub(super) link_distance: f32,
    /// Target ring radius when the radial force is enabled.
    pub(super) radial_radius: Option<f32>,
}

/// Position, velocity and drag pin of one node.
#[derive(Clone, Copy, Debug)]
pub(super) struct Body {
    pub(super) position: Vec2,
    pub(super) velocity: Vec2,
    pub(super) pinned: Option<Vec2>,
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
    impulses: Vec<Vec2>,
}

/// Continuous force-directed layout. Energy (`alpha`) decays toward
/// `alpha_target` on every step but stepping never finishes on its own.
pub(super) struct Simulation {
    bodies: Vec<Body>,
    radii: Vec<f32>,
    springs: Vec<Spring>,
    config: LayoutConfig,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    running: bool,
    scratch: PhysicsScratch,
}

fn initial_position(index: usize) -> Vec2 {
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    vec2(angle.cos(), angle.sin()) * radius
}

impl Simulation {
    pub(super) fn start(model: &GraphModel, config: LayoutConfig) -> Self {
        let node_count = model.nodes.len();
        let bodies = (0..node_count)
            .map(|index| Body {
                position: initial_position(index),
                velocity: Vec2::ZERO,
                pinned: None,
            })
            .collect();
        let radii = (0..node_count).map(|index| model.radius(index)).collect();

        let springs = model
            .edges
            .iter()
            .filter(|edge| edge.source != edge.target)
            .map(|edge| {
                let source_degree = model.degree(edge.source).max(1) as f32;
                let target_degree = model.degree(edge.target).max(1) as f32;
                Spring {
                    source: edge.source,
                    target: edge.target,
                    strength: 1.0 / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        debug!(nodes = node_count, edges = model.edges.len(), "layout started");

        Self {
            bodies,
            radii,
            springs,
            config,
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
            running: true,
            scratch: PhysicsScratch::default(),
        }
    }

    /// Halts stepping and drops all per-node state.
    pub(super) fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.bodies = Vec::new();
        self.springs = Vec::new();
        self.radii = Vec::new();
        self.scratch = PhysicsScratch::default();
        debug!("layout stopped");
    }

    #[cfg(test)]
    pub(super) fn is_running(&self) -> bool {
        self.running
    }

    pub(super) fn alpha(&self) -> f32 {
        self.alpha
    }

    #[cfg(test)]
    pub(super) fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub(super) fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub(super) fn set_radial_radius(&mut self, radius: Option<f32>) {
        self.config.radial_radius = radius;
    }

    #[cfg(test)]
    pub(super) fn config(&self) -> LayoutConfig {
        self.config
    }

    #[cfg(test)]
    pub(super) fn body(&self, index: usize) -> Option<&Body> {
        self.bodies.get(index)
    }

    /// Current position, or `None` while the coordinates are unresolved.
    pub(super) fn position(&self, index: usize) -> Option<Vec2> {
        self.bodies
            .get(index)
            .map(|body| body.position)
            .filter(|position| position.x.is_finite() && position.y.is_finite())
    }

    pub(super) fn pin(&mut self, index: usize, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(index) {
            body.pinned = Some(position);
        }
    }

    pub(super) fn unpin(&mut self, index: usize) {
        if let Some(body) = self.bodies.get_mut(index) {
            body.pinned = None;
        }
    }

    #[cfg(test)]
    pub(super) fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Advances the layout by one tick. Returns `false` once stopped.
    pub(super) fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }

        let node_count = self.bodies.len();
        if node_count == 0 {
            return true;
        }

        for (index, body) in self.bodies.iter_mut().enumerate() {
            let resolved = body.position.x.is_finite() && body.position.y.is_finite();
            if !resolved {
                body.position = initial_position(index);
                body.velocity = Vec2::ZERO;
            }
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        let alpha = self.alpha;

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.positions.extend(self.bodies.iter().map(|body| body.position));
        scratch.velocities.extend(self.bodies.iter().map(|body| body.velocity));

        if let Some(tree) = Cell::build(&scratch.positions, &self.radii) {
            let params = ChargeParams {
                strength: -100.0 * self.config.repel_force,
                theta: BARNES_HUT_THETA,
                alpha,
            };
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_charge(&tree, index, &scratch.positions, params, velocity);
            }
        }

        apply_centering(&mut scratch.positions, self.config.center_force);
        apply_springs(
            &self.springs,
            self.config.link_distance,
            alpha,
            &scratch.positions,
            &mut scratch.velocities,
        );

        for _ in 0..COLLISION_ITERATIONS {
            scratch.predicted.clear();
            scratch.predicted.extend(
                scratch
                    .positions
                    .iter()
                    .zip(&scratch.velocities)
                    .map(|(position, velocity)| *position + *velocity),
            );
            scratch.impulses.clear();
            scratch.impulses.resize(node_count, Vec2::ZERO);

            let Some(tree) = Cell::build(&scratch.predicted, &self.radii) else {
                break;
            };
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                &scratch.predicted,
                &self.radii,
                CollisionParams { strength: 1.0 },
                &mut scratch.impulses,
            );
            for (velocity, impulse) in scratch.velocities.iter_mut().zip(&scratch.impulses) {
                *velocity += *impulse;
            }
        }

        if let Some(radius) = self.config.radial_radius {
            apply_radial(
                radius,
                RADIAL_STRENGTH,
                alpha,
                &scratch.positions,
                &mut scratch.velocities,
            );
        }

        for ((body, position), velocity) in self
            .bodies
            .iter_mut()
            .zip(&scratch.positions)
            .zip(&scratch.velocities)
        {
            if let Some(pinned) = body.pinned {
                body.position = pinned;
                body.velocity = Vec2::ZERO;
                continue;
            }

            body.velocity = *velocity * (1.0 - VELOCITY_DECAY);
            body.position = *position + body.velocity;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::graph::{GraphEdge, GraphModel, GraphNode};

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            text: id.to_owned(),
            tags: Default::default(),
            is_tag: false,
        }
    }

    fn star(leaves: usize) -> GraphModel {
        let mut nodes = vec![node("hub")];
        let mut edges = Vec::new();
        for leaf in 0..leaves {
            nodes.push(node(&format!("leaf-{leaf}")));
            edges.push(GraphEdge {
                source: 0,
                target: leaf + 1,
            });
        }
        GraphModel::new(nodes, edges, "hub".to_owned())
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            repel_force: 0.5,
            center_force: 0.3,
            link_distance: 30.0,
            radial_radius: None,
        }
    }

    #[test]
    fn keeps_stepping_after_cooling() {
        let mut simulation = Simulation::start(&star(6), config());
        for _ in 0..2_000 {
            assert!(simulation.step());
        }
        assert!(simulation.alpha() < ALPHA_MIN);
        for index in 0..7 {
            assert!(simulation.position(index).is_some());
        }
    }

    #[test]
    fn leaves_settle_near_link_distance() {
        let mut simulation = Simulation::start(&star(5), config());
        for _ in 0..600 {
            simulation.step();
        }
        let hub = simulation.position(0).unwrap();
        for leaf in 1..6 {
            let distance = (simulation.position(leaf).unwrap() - hub).length();
            assert!((10.0..90.0).contains(&distance), "leaf {leaf} at {distance}");
        }
    }

    #[test]
    fn pinned_body_holds_until_released() {
        let mut simulation = Simulation::start(&star(4), config());
        let anchor = vec2(120.0, -40.0);
        simulation.pin(2, anchor);
        for _ in 0..20 {
            simulation.step();
            assert_eq!(simulation.position(2), Some(anchor));
        }

        simulation.unpin(2);
        assert!(simulation.body(2).unwrap().pinned.is_none());
        for _ in 0..20 {
            simulation.step();
        }
        assert_ne!(simulation.position(2), Some(anchor));
    }

    #[test]
    fn energy_tracks_the_target() {
        let mut simulation = Simulation::start(&star(3), config());
        for _ in 0..400 {
            simulation.step();
        }
        let cooled = simulation.alpha();

        simulation.set_alpha_target(1.0);
        for _ in 0..30 {
            simulation.step();
        }
        assert!(simulation.alpha() > cooled);
        assert_eq!(simulation.alpha_target(), 1.0);
    }

    #[test]
    fn unresolved_coordinates_recover_next_step() {
        let mut simulation = Simulation::start(&star(3), config());
        simulation.bodies_mut()[1].position = vec2(f32::NAN, 0.0);
        assert!(simulation.position(1).is_none());

        simulation.step();
        assert!(simulation.position(1).is_some());
    }

    #[test]
    fn radial_force_spreads_nodes_to_the_ring() {
        let mut radial = config();
        radial.radial_radius = Some(150.0);
        radial.center_force = 0.0;
        let mut simulation = Simulation::start(&star(8), radial);
        for _ in 0..400 {
            simulation.step();
        }
        let mean_distance = (0..9)
            .map(|index| simulation.position(index).unwrap().length())
            .sum::<f32>()
            / 9.0;
        assert!(mean_distance > 60.0, "mean distance {mean_distance}");
    }

    #[test]
    fn stop_releases_state() {
        let mut simulation = Simulation::start(&star(3), config());
        simulation.stop();
        assert!(!simulation.is_running());
        assert!(!simulation.step());
        assert!(simulation.position(0).is_none());
    }
}
