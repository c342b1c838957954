use eframe::egui::{Vec2, vec2};

use super::quadtree::Cell;

const DISTANCE_MIN_SQ: f32 = 1.0;

/// Tiny deterministic offset used when two bodies coincide exactly.
pub(super) fn jiggle(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-6
}

fn nonzero(delta: Vec2, from: usize, to: usize) -> Vec2 {
    let mut delta = delta;
    if delta.x == 0.0 {
        delta.x = jiggle(from, to).x;
    }
    if delta.y == 0.0 {
        delta.y = jiggle(from, to).y;
    }
    delta
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    /// Negative values repel.
    pub(super) strength: f32,
    pub(super) theta: f32,
    pub(super) alpha: f32,
}

/// Many-body charge on `index`, approximating distant cells by their centroid.
pub(super) fn accumulate_charge(
    cell: &Cell,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if cell.weight <= 0.0 {
        return;
    }

    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.bodies {
            if other == index {
                continue;
            }
            let delta = nonzero(positions[other] - point, index, other);
            *velocity += charge_impulse(delta, params.strength, params.alpha);
        }
        return;
    }

    let delta = cell.centroid - point;
    let distance_sq = delta.length_sq();
    let far_enough = !cell.bounds.contains(point)
        && distance_sq > 0.0
        && (cell.bounds.side_length() / distance_sq.sqrt()) < params.theta;

    if far_enough {
        *velocity += charge_impulse(delta, params.strength * cell.weight, params.alpha);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, params, velocity);
    }
}

fn charge_impulse(delta: Vec2, strength: f32, alpha: f32) -> Vec2 {
    let mut distance_sq = delta.length_sq();
    if distance_sq < DISTANCE_MIN_SQ {
        distance_sq = (DISTANCE_MIN_SQ * distance_sq).sqrt();
    }
    delta * (strength * alpha / distance_sq)
}

/// Shifts every position so the layout's mean moves toward the origin.
pub(super) fn apply_centering(positions: &mut [Vec2], strength: f32) {
    if positions.is_empty() {
        return;
    }

    let mean = positions.iter().fold(Vec2::ZERO, |sum, point| sum + *point) / positions.len() as f32;
    let shift = mean * strength;
    for position in positions {
        *position -= shift;
    }
}

#[derive(Clone, Copy)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

pub(super) fn apply_springs(
    springs: &[Spring],
    rest_length: f32,
    alpha: f32,
    positions: &[Vec2],
    velocities: &mut [Vec2],
) {
    for spring in springs {
        let (source, target) = (spring.source, spring.target);
        let predicted_source = positions[source] + velocities[source];
        let predicted_target = positions[target] + velocities[target];
        let delta = nonzero(predicted_target - predicted_source, source, target);

        let length = delta.length();
        let correction = delta * ((length - rest_length) / length * alpha * spring.strength);
        velocities[target] -= correction * spring.bias;
        velocities[source] += correction * (1.0 - spring.bias);
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
}

/// Separates overlapping bodies, walking pairs of cells and pruning those
/// farther apart than their largest radii allow.
pub(super) fn accumulate_collision_pairs(
    cell_a: &Cell,
    cell_b: &Cell,
    same_cell: bool,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    impulses: &mut [Vec2],
) {
    let reach = cell_a.max_radius + cell_b.max_radius;
    if cell_a.bounds.gap_sq(cell_b.bounds) > reach * reach {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if same_cell {
            for (offset, &from) in cell_a.bodies.iter().enumerate() {
                for &to in &cell_a.bodies[offset + 1..] {
                    separate(from, to, predicted, radii, params, impulses);
                }
            }
        } else {
            for &from in &cell_a.bodies {
                for &to in &cell_b.bodies {
                    separate(from, to, predicted, radii, params, impulses);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = cell_a.children().collect::<Vec<_>>();
        for (first, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(child_a, child_a, true, predicted, radii, params, impulses);
            for child_b in &children[first + 1..] {
                accumulate_collision_pairs(
                    child_a, child_b, false, predicted, radii, params, impulses,
                );
            }
        }
        return;
    }

    let split_a = if cell_a.is_leaf() {
        false
    } else if cell_b.is_leaf() {
        true
    } else {
        cell_a.bounds.half_extent >= cell_b.bounds.half_extent
    };

    if split_a {
        for child in cell_a.children() {
            accumulate_collision_pairs(child, cell_b, false, predicted, radii, params, impulses);
        }
    } else {
        for child in cell_b.children() {
            accumulate_collision_pairs(cell_a, child, false, predicted, radii, params, impulses);
        }
    }
}

fn separate(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    impulses: &mut [Vec2],
) {
    let min_distance = radii[from] + radii[to];
    let delta = predicted[from] - predicted[to];
    let distance_sq = delta.length_sq();
    if distance_sq >= min_distance * min_distance {
        return;
    }

    let delta = nonzero(delta, from, to);
    let distance = delta.length();
    let push = delta * ((min_distance - distance) / distance * params.strength);

    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };
    impulses[from] += push * share;
    impulses[to] -= push * (1.0 - share);
}

/// Pulls every body toward a circle of `radius` around the origin.
pub(super) fn apply_radial(
    radius: f32,
    strength: f32,
    alpha: f32,
    positions: &[Vec2],
    velocities: &mut [Vec2],
) {
    for (position, velocity) in positions.iter().zip(velocities.iter_mut()) {
        let distance = position.length().max(1e-6);
        let k = (radius - distance) * strength * alpha / distance;
        *velocity += *position * k;
    }
}
