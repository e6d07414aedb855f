//! Narrow-phase collision detection
//!
//! Circle/circle uses the center distance directly. Anything involving a
//! polygon goes through the Separating Axis Theorem over the polygon edge
//! normals (plus, for circles, the axis from the nearest vertex to the circle
//! center). Normals always point from B toward A, so pushing A along the
//! normal separates the pair.

use glam::Vec2;

use super::bounds::Bounds;
use super::collider::{Collider, Shape};

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Separation direction, unit length, from B toward A
    pub normal: Vec2,
    /// Overlap depth along `normal`
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    fn hit(normal: Vec2, penetration: f32) -> Self {
        Self {
            hit: true,
            normal,
            penetration,
        }
    }

    /// Same contact seen from the other body
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Test collider `a` against collider `b`
pub fn collide(a: &Collider, b: &Collider) -> CollisionResult {
    match (&a.shape, &b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, *ra, b.position, *rb)
        }
        (Shape::Circle { radius }, Shape::Polygon { .. }) => {
            circle_polygon(a.position, *radius, &b.world_vertices())
        }
        (Shape::Polygon { .. }, Shape::Circle { radius }) => {
            circle_polygon(b.position, *radius, &a.world_vertices()).flipped()
        }
        (Shape::Polygon { .. }, Shape::Polygon { .. }) => {
            polygon_polygon(&a.world_vertices(), &b.world_vertices())
        }
    }
}

/// Like [`collide`], but circles reach `margin` further.
///
/// `hit` means the shapes are within `margin` of each other; `penetration` is
/// still measured between the real shapes, so a pair that is close but apart
/// reports a value in `(-margin, 0]`. Polygon pairs get no margin.
pub fn collide_with_margin(a: &Collider, b: &Collider, margin: f32) -> CollisionResult {
    let grown = match (&a.shape, &b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, *ra + margin, b.position, *rb)
        }
        (Shape::Circle { radius }, Shape::Polygon { .. }) => {
            circle_polygon(a.position, *radius + margin, &b.world_vertices())
        }
        (Shape::Polygon { .. }, Shape::Circle { radius }) => {
            circle_polygon(b.position, *radius + margin, &a.world_vertices()).flipped()
        }
        (Shape::Polygon { .. }, Shape::Polygon { .. }) => return collide(a, b),
    };
    CollisionResult {
        penetration: grown.penetration - margin,
        ..grown
    }
}

/// Whether a body of `radius` travelling `from -> to` touches `collider` on the way
pub fn sweep_hits(from: Vec2, to: Vec2, radius: f32, collider: &Collider) -> bool {
    match &collider.shape {
        Shape::Circle { radius: r } => {
            line_circle(from, to, collider.position, r + radius).is_some()
                || from.distance_squared(collider.position) < (r + radius) * (r + radius)
        }
        Shape::Polygon { .. } => line_polygon(from, to, &collider.world_vertices()).is_some(),
    }
}

/// Circle A against circle B
pub fn circle_circle(center_a: Vec2, radius_a: f32, center_b: Vec2, radius_b: f32) -> CollisionResult {
    let delta = center_a - center_b;
    let dist_sq = delta.length_squared();
    let reach = radius_a + radius_b;
    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Coincident centers: pick a fixed axis so the result stays deterministic
    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::X };
    CollisionResult::hit(normal, reach - dist)
}

/// Circle A against convex polygon B (world-space vertices)
pub fn circle_polygon(center: Vec2, radius: f32, vertices: &[Vec2]) -> CollisionResult {
    if vertices.is_empty() {
        return CollisionResult::miss();
    }

    let mut axes = edge_normals(vertices);
    if let Some(nearest) = vertices
        .iter()
        .min_by(|a, b| a.distance_squared(center).total_cmp(&b.distance_squared(center)))
    {
        let axis = (center - *nearest).normalize_or_zero();
        if axis != Vec2::ZERO {
            axes.push(axis);
        }
    }

    let mut best = CollisionResult::hit(Vec2::ZERO, f32::INFINITY);
    for axis in axes {
        let c = center.dot(axis);
        let (min_a, max_a) = (c - radius, c + radius);
        let (min_b, max_b) = project(vertices, axis);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return CollisionResult::miss();
        }
        if overlap < best.penetration {
            best = CollisionResult::hit(axis, overlap);
        }
    }

    orient(best, center - centroid(vertices))
}

/// Convex polygon A against convex polygon B (both world-space)
pub fn polygon_polygon(vertices_a: &[Vec2], vertices_b: &[Vec2]) -> CollisionResult {
    if vertices_a.is_empty() || vertices_b.is_empty() {
        return CollisionResult::miss();
    }

    let mut best = CollisionResult::hit(Vec2::ZERO, f32::INFINITY);
    for axis in edge_normals(vertices_a).into_iter().chain(edge_normals(vertices_b)) {
        let (min_a, max_a) = project(vertices_a, axis);
        let (min_b, max_b) = project(vertices_b, axis);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return CollisionResult::miss();
        }
        if overlap < best.penetration {
            best = CollisionResult::hit(axis, overlap);
        }
    }

    orient(best, centroid(vertices_a) - centroid(vertices_b))
}

/// Whether a shape placed at `position` overlaps `bounds`
pub fn shape_intersects_bounds(shape: &Shape, position: Vec2, bounds: &Bounds) -> bool {
    match shape {
        Shape::Circle { radius } => {
            let closest = position.clamp(bounds.min(), bounds.max());
            closest.distance_squared(position) < radius * radius
        }
        Shape::Polygon { vertices } => {
            let world: Vec<Vec2> = vertices.iter().map(|v| *v + position).collect();
            polygon_polygon(&world, &bounds.corners()).hit
        }
    }
}

/// Nearest point where segment `from -> to` crosses the collider boundary
pub fn line_intersection(from: Vec2, to: Vec2, collider: &Collider) -> Option<Vec2> {
    match &collider.shape {
        Shape::Circle { radius } => line_circle(from, to, collider.position, *radius),
        Shape::Polygon { .. } => line_polygon(from, to, &collider.world_vertices()),
    }
}

/// Solve `|from + t(to - from) - center|² = r²` for the smallest `t` in [0, 1]
pub fn line_circle(from: Vec2, to: Vec2, center: Vec2, radius: f32) -> Option<Vec2> {
    let d = to - from;
    let f = from - center;
    let a = d.dot(d);
    if a <= f32::EPSILON {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let c = f.dot(f) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }

    let sqrt = disc.sqrt();
    let t1 = (-b - sqrt) / (2.0 * a);
    let t2 = (-b + sqrt) / (2.0 * a);
    [t1, t2]
        .into_iter()
        .find(|t| (0.0..=1.0).contains(t))
        .map(|t| from + d * t)
}

/// Closest crossing of segment `from -> to` with any polygon edge
pub fn line_polygon(from: Vec2, to: Vec2, vertices: &[Vec2]) -> Option<Vec2> {
    let d = to - from;
    let mut best_t: Option<f32> = None;

    for (i, a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        let e = b - *a;
        let denom = d.perp_dot(e);
        if denom.abs() <= f32::EPSILON {
            continue; // parallel
        }
        let ap = *a - from;
        let t = ap.perp_dot(e) / denom;
        let u = ap.perp_dot(d) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            best_t = Some(best_t.map_or(t, |best| best.min(t)));
        }
    }

    best_t.map(|t| from + d * t)
}

fn edge_normals(vertices: &[Vec2]) -> Vec<Vec2> {
    let n = vertices.len();
    (0..n)
        .filter_map(|i| {
            let edge = vertices[(i + 1) % n] - vertices[i];
            let normal = Vec2::new(edge.y, -edge.x).normalize_or_zero();
            (normal != Vec2::ZERO).then_some(normal)
        })
        .collect()
}

fn project(vertices: &[Vec2], axis: Vec2) -> (f32, f32) {
    vertices.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), v| {
        let p = v.dot(axis);
        (min.min(p), max.max(p))
    })
}

fn centroid(vertices: &[Vec2]) -> Vec2 {
    vertices.iter().copied().sum::<Vec2>() / vertices.len().max(1) as f32
}

/// Flip the normal so it points along `b_to_a`
fn orient(result: CollisionResult, b_to_a: Vec2) -> CollisionResult {
    if result.normal.dot(b_to_a) < 0.0 {
        result.flipped()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collider::Collider;

    fn square(center: Vec2, size: f32) -> Vec<Vec2> {
        Bounds::from_center(center, Vec2::splat(size)).corners().to_vec()
    }

    #[test]
    fn test_circle_circle() {
        let r = circle_circle(Vec2::new(1.0, 0.0), 5.0, Vec2::new(8.0, 0.0), 5.0);
        assert!(r.hit);
        assert!((r.penetration - 3.0).abs() < 1e-5);
        assert!((r.normal - Vec2::new(-1.0, 0.0)).length() < 1e-6);

        assert!(!circle_circle(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0).hit);
    }

    #[test]
    fn test_circle_polygon_normal_points_toward_circle() {
        let wall = square(Vec2::new(9.0, 0.0), 2.0);
        let r = circle_polygon(Vec2::new(4.5, 0.0), 5.0, &wall);
        assert!(r.hit);
        assert!((r.penetration - 1.5).abs() < 1e-4);
        assert!((r.normal - Vec2::new(-1.0, 0.0)).length() < 1e-5);

        assert!(!circle_polygon(Vec2::new(2.0, 0.0), 5.0, &wall).hit);
    }

    #[test]
    fn test_circle_near_polygon_corner_misses() {
        // Inside both AABB projections but outside the corner radius
        let poly = square(Vec2::ZERO, 10.0);
        let r = circle_polygon(Vec2::new(8.6, 8.6), 5.0, &poly);
        assert!(!r.hit);
    }

    #[test]
    fn test_polygon_polygon() {
        let a = square(Vec2::new(0.0, 0.0), 10.0);
        let b = square(Vec2::new(8.0, 1.0), 10.0);
        let r = polygon_polygon(&a, &b);
        assert!(r.hit);
        assert!((r.penetration - 2.0).abs() < 1e-4);
        assert!((r.normal - Vec2::new(-1.0, 0.0)).length() < 1e-5);

        let c = square(Vec2::new(20.0, 0.0), 10.0);
        assert!(!polygon_polygon(&a, &c).hit);
    }

    #[test]
    fn test_collide_dispatch_flips_for_polygon_first() {
        let poly = Collider::with_shape(Shape::rect(2.0, 20.0)).at(Vec2::new(9.0, 0.0));
        let circle = Collider::circle(5.0).at(Vec2::new(4.5, 0.0));
        let ab = collide(&poly, &circle);
        let ba = collide(&circle, &poly);
        assert!(ab.hit && ba.hit);
        assert!((ab.normal + ba.normal).length() < 1e-5);
        assert!(ab.normal.x > 0.0);
    }

    #[test]
    fn test_margin_reports_near_pairs_with_real_depth() {
        let a = Collider::circle(5.0);
        let touching = Collider::circle(5.0).at(Vec2::new(10.05, 0.0));
        let r = collide_with_margin(&a, &touching, 0.1);
        assert!(r.hit);
        assert!(!collide(&a, &touching).hit);
        assert!((r.penetration + 0.05).abs() < 1e-4);
        assert!((r.normal - Vec2::new(-1.0, 0.0)).length() < 1e-5);

        let overlapping = Collider::circle(5.0).at(Vec2::new(9.0, 0.0));
        let r = collide_with_margin(&a, &overlapping, 0.1);
        assert!((r.penetration - 1.0).abs() < 1e-4);

        let apart = Collider::circle(5.0).at(Vec2::new(10.5, 0.0));
        assert!(!collide_with_margin(&a, &apart, 0.1).hit);

        let wall = Collider::with_shape(Shape::rect(2.0, 20.0)).at(Vec2::new(6.05, 0.0));
        let r = collide_with_margin(&wall, &a, 0.1);
        assert!(r.hit && r.penetration <= 0.0);
        assert!(r.normal.x > 0.0);
    }

    #[test]
    fn test_sweep_catches_what_the_end_position_misses() {
        let post = Collider::circle(2.0).at(Vec2::new(5.0, 0.0));
        assert!(sweep_hits(Vec2::ZERO, Vec2::new(10.0, 0.0), 1.0, &post));
        assert!(sweep_hits(Vec2::ZERO, Vec2::new(10.0, 2.5), 1.0, &post));
        assert!(!sweep_hits(Vec2::ZERO, Vec2::new(10.0, 8.0), 1.0, &post));
        // Resting inside counts
        assert!(sweep_hits(Vec2::new(5.5, 0.0), Vec2::new(5.5, 0.0), 1.0, &post));

        let wall = Collider::with_shape(Shape::rect(1.0, 10.0)).at(Vec2::new(5.0, 0.0));
        assert!(sweep_hits(Vec2::ZERO, Vec2::new(10.0, 0.0), 0.5, &wall));
        assert!(!sweep_hits(Vec2::ZERO, Vec2::new(3.0, 0.0), 0.5, &wall));
    }

    #[test]
    fn test_shape_intersects_bounds() {
        let cell = Bounds::new(4.0, 0.0, 1.0, 1.0).inflate(-0.125);
        let circle = Shape::Circle { radius: 0.5 };
        assert!(shape_intersects_bounds(&circle, Vec2::new(4.5, 0.5), &cell));
        assert!(!shape_intersects_bounds(&circle, Vec2::new(2.5, 0.5), &cell));

        let block = Shape::rect(1.0, 2.0);
        assert!(shape_intersects_bounds(&block, Vec2::new(4.5, 1.0), &cell));
        assert!(!shape_intersects_bounds(&block, Vec2::new(3.5, 1.0), &cell));
    }

    #[test]
    fn test_line_circle_takes_nearest_entry() {
        let hit = line_circle(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0), Vec2::ZERO, 2.0);
        let p = hit.expect("segment crosses the circle");
        assert!((p - Vec2::new(-2.0, 0.0)).length() < 1e-4);

        assert!(line_circle(Vec2::new(-10.0, 5.0), Vec2::new(10.0, 5.0), Vec2::ZERO, 2.0).is_none());
        // Segment stops short of the circle
        assert!(line_circle(Vec2::new(-10.0, 0.0), Vec2::new(-5.0, 0.0), Vec2::ZERO, 2.0).is_none());
    }

    #[test]
    fn test_line_polygon_takes_nearest_edge() {
        let poly = square(Vec2::new(5.0, 0.0), 2.0);
        let p = line_polygon(Vec2::ZERO, Vec2::new(10.0, 0.0), &poly).expect("crosses box");
        assert!((p - Vec2::new(4.0, 0.0)).length() < 1e-4);
        assert!(line_polygon(Vec2::ZERO, Vec2::new(0.0, 10.0), &poly).is_none());
    }

    #[test]
    fn test_line_intersection_dispatch() {
        let wall = Collider::with_shape(Shape::rect(2.0, 2.0)).at(Vec2::new(5.0, 0.0));
        assert!(line_intersection(Vec2::ZERO, Vec2::new(10.0, 0.0), &wall).is_some());
        let post = Collider::circle(1.0).at(Vec2::new(5.0, 3.0));
        assert!(line_intersection(Vec2::ZERO, Vec2::new(10.0, 0.0), &post).is_none());
    }
}
