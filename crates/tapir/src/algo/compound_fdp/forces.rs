//! Pairwise forces between axis-aligned boxes.
//!
//! Every force is measured between the points where the center-to-center line leaves each box,
//! so two large boxes with nearby outlines interact as strongly as two small boxes at the same
//! outline distance. Functions return the force acting on the *first* shape; callers apply the
//! negated vector to the second one.

use super::rng::XorShift64Star;
use nalgebra::Vector2;

pub(super) type Vec2 = Vector2<f64>;

/// Distances below this are treated as zero.
pub(super) const ZERO_DISTANCE: f64 = 1e-9;
const JITTER: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub(super) struct Shape {
    pub(super) center: Vec2,
    pub(super) size: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct RepulsionParams {
    pub(super) ideal_edge_length: f64,
    pub(super) separation_multiplier: f64,
    pub(super) repulsion_constant: f64,
}

/// Where the ray from `center` towards `external` leaves the box of `size` around `center`.
///
/// The result may lie beyond `external` when `external` is inside the box.
pub(super) fn clipping_point(size: Vec2, center: Vec2, external: Vec2) -> Vec2 {
    let d = external - center;
    if d.x == 0.0 && d.y == 0.0 {
        return center;
    }
    let half = size / 2.0;
    let t_x = if d.x != 0.0 {
        half.x / d.x.abs()
    } else {
        f64::INFINITY
    };
    let t_y = if d.y != 0.0 {
        half.y / d.y.abs()
    } else {
        f64::INFINITY
    };
    center + d * t_x.min(t_y)
}

pub(super) fn is_same_direction(a: Vec2, b: Vec2) -> bool {
    a.dot(&b) > 0.0
}

/// Returns the two centers, jittered apart when they coincide.
pub(super) fn separate(a: Vec2, b: Vec2, rng: &mut XorShift64Star) -> (Vec2, Vec2) {
    if (a - b).norm() >= ZERO_DISTANCE {
        return (a, b);
    }
    let a2 = a + Vec2::new(rng.next_f64_signed(), rng.next_f64_signed()) * JITTER;
    let b2 = b + Vec2::new(rng.next_f64_signed(), rng.next_f64_signed()) * JITTER;
    if (a2 - b2).norm() >= ZERO_DISTANCE {
        (a2, b2)
    } else {
        (a2 + Vec2::new(JITTER, 0.0), b2)
    }
}

/// Spring force along an edge with the given ideal length.
///
/// Stretched springs pull the boxes together, compressed ones push them apart; overlapping boxes
/// (clipping points crossed over) count as stretched by `|d| + ideal`.
pub(super) fn spring_force(
    u: Shape,
    v: Shape,
    ideal: f64,
    elastic_constant: f64,
    scale: f64,
    rng: &mut XorShift64Star,
) -> Vec2 {
    let (cu, cv) = separate(u.center, v.center, rng);
    let position = cu - cv;
    let d = clipping_point(u.size, cu, cv) - clipping_point(v.size, cv, cu);
    let dist = d.norm();

    let stretch = if is_same_direction(position, d) {
        dist - ideal
    } else {
        dist + ideal
    };
    let magnitude = (stretch / ideal).powi(2) / elastic_constant * scale;
    let direction = position / position.norm();
    if stretch > 0.0 {
        -direction * magnitude
    } else {
        direction * magnitude
    }
}

/// Repulsion between two siblings; zero once their outlines are far enough apart.
pub(super) fn repulsion_force(
    u: Shape,
    v: Shape,
    params: &RepulsionParams,
    scale: f64,
    rng: &mut XorShift64Star,
) -> Vec2 {
    let (cu, cv) = separate(u.center, v.center, rng);
    let position = cu - cv;
    let d = clipping_point(u.size, cu, cv) - clipping_point(v.size, cv, cu);
    let dist = d.norm();
    let ideal = params.ideal_edge_length;

    let same = is_same_direction(position, d);
    if same && dist > ideal * params.separation_multiplier {
        return Vec2::zeros();
    }
    let term = if same {
        dist.max(1.0) / (2.0 * ideal)
    } else {
        1.0 / dist.max(1.0)
    };
    let magnitude = params.repulsion_constant / (term * term) * scale;
    position / position.norm() * magnitude
}

/// Pull of `center` towards `target` (the inner canvas center of the container).
pub(super) fn gravitation_force(center: Vec2, target: Vec2, magnitude: f64, ideal: f64) -> Vec2 {
    let delta = target - center;
    let dist = delta.norm();
    if dist < ZERO_DISTANCE {
        return Vec2::zeros();
    }
    let falloff = (dist / (2.0 * ideal)).max(1.0).powf(0.25);
    delta / dist * (magnitude / falloff)
}

pub(super) fn clip_to_length(v: Vec2, limit: f64) -> Vec2 {
    let len = v.norm();
    if len > limit && len > 0.0 {
        v * (limit / len)
    } else {
        v
    }
}
