//! Collider world: owns every body and advances them one fixed tick at a time
//!
//! Per tick, in this order:
//! 1. rebuild the dynamic broad phase (swept AABBs of non-static bodies)
//! 2. integrate acceleration -> velocity (with friction), clear acceleration
//! 3. move solid bodies in substeps; after each one gather touching pairs,
//!    rank them outward from static geometry and resolve them in passes
//! 4. sweep sensors along their full path and report what they crossed
//!
//! Static bodies live in their own quadtree that is only rebuilt when the
//! static set changes. Iteration follows insertion order so a run is
//! reproducible from the same sequence of `add` calls.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bounds::Bounds;
use super::collider::{Collider, ColliderId};
use super::collision::{collide, collide_with_margin, sweep_hits};
use super::quadtree::{DEFAULT_CAPACITY, DEFAULT_MAX_DEPTH, Quadtree};

/// Upper bound on substeps per tick
pub const MAX_SUBSTEPS: u32 = 20;
/// A dynamic body moves at most this fraction of its smallest half-extent per substep
pub const SUBSTEP_FRACTION: f32 = 0.3;
/// Pairs closer than this count as touching, so resting contacts keep their speed cancelled
pub const CONTACT_MARGIN: f32 = 0.5;
/// Resolution sweeps per substep
pub const MAX_SOLVER_PASSES: u32 = 8;
/// Deepest leftover overlap that ends the sweeps early
const SETTLED_PENETRATION: f32 = 1e-3;
/// Level of a body with no contact path to static geometry
const UNANCHORED: u32 = u32::MAX;

/// How group masks decide whether a pair interacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaskPolicy {
    /// Both sides must list each other's group
    #[default]
    Symmetric,
    /// One side listing the other is enough; only the listing side is pushed
    Either,
}

/// A touching pair recorded during the last tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: ColliderId,
    pub b: ColliderId,
    /// Points from `b` toward `a`
    pub normal: Vec2,
    pub penetration: f32,
}

impl Contact {
    pub fn involves(&self, id: ColliderId) -> bool {
        self.a == id || self.b == id
    }

    /// The other collider in the pair, if `id` is one of them
    pub fn other(&self, id: ColliderId) -> Option<ColliderId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A solid pair gathered for the current substep, with the share of the
/// correction each side takes
#[derive(Debug, Clone, Copy)]
struct Pair {
    i: usize,
    j: usize,
    inv_i: f32,
    inv_j: f32,
}

#[derive(Debug, Clone)]
pub struct ColliderWorld {
    colliders: Vec<Collider>,
    index: HashMap<ColliderId, usize>,
    next_id: u32,
    dynamic_tree: Quadtree<ColliderId>,
    static_tree: Quadtree<ColliderId>,
    static_dirty: bool,
    policy: MaskPolicy,
    restitution: f32,
    contacts: Vec<Contact>,
    seen_pairs: HashSet<(ColliderId, ColliderId)>,
    scratch: Vec<ColliderId>,
    pairs: Vec<Pair>,
    levels: Vec<u32>,
    links: Vec<Vec<usize>>,
}

impl ColliderWorld {
    /// World whose broad phase covers `bounds`, with the reference quadtree settings
    pub fn new(bounds: Bounds) -> Self {
        Self::with_quadtree(bounds, DEFAULT_CAPACITY, DEFAULT_MAX_DEPTH)
    }

    pub fn with_quadtree(bounds: Bounds, capacity: usize, max_depth: u32) -> Self {
        Self {
            colliders: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            dynamic_tree: Quadtree::new(bounds, capacity, max_depth),
            static_tree: Quadtree::new(bounds, capacity, max_depth),
            static_dirty: false,
            policy: MaskPolicy::default(),
            restitution: 0.0,
            contacts: Vec::new(),
            seen_pairs: HashSet::new(),
            scratch: Vec::new(),
            pairs: Vec::new(),
            levels: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn set_policy(&mut self, policy: MaskPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> MaskPolicy {
        self.policy
    }

    /// Bounce factor along the contact normal (0 = slide, 1 = fully elastic)
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution.clamp(0.0, 1.0);
    }

    /// Register a collider and return its new id
    pub fn add(&mut self, mut collider: Collider) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        collider.id = id;
        if collider.is_static() {
            self.static_dirty = true;
        }
        self.index.insert(id, self.colliders.len());
        self.colliders.push(collider);
        id
    }

    /// Unregister a collider, keeping the insertion order of the rest
    pub fn remove(&mut self, id: ColliderId) -> Option<Collider> {
        let idx = self.index.remove(&id)?;
        let removed = self.colliders.remove(idx);
        for c in &self.colliders[idx..] {
            if let Some(i) = self.index.get_mut(&c.id) {
                *i -= 1;
            }
        }
        if removed.is_static() {
            self.static_dirty = true;
        }
        Some(removed)
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.index.get(&id).map(|&i| &self.colliders[i])
    }

    /// Mutable access. Touching a static body schedules a static-tree rebuild.
    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        let &i = self.index.get(&id)?;
        let collider = &mut self.colliders[i];
        if collider.is_static() {
            self.static_dirty = true;
        }
        Some(collider)
    }

    pub fn position(&self, id: ColliderId) -> Option<Vec2> {
        self.get(id).map(|c| c.position)
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Broad phase over dynamic bodies, as of the last tick start
    pub fn quadtree(&self) -> &Quadtree<ColliderId> {
        &self.dynamic_tree
    }

    pub fn static_quadtree(&self) -> &Quadtree<ColliderId> {
        &self.static_tree
    }

    /// Contacts found during the last tick, in detection order
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Candidate colliders whose AABB intersects `area` (static and dynamic)
    pub fn query(&self, area: &Bounds) -> Vec<ColliderId> {
        let mut out = self.static_tree.query(area);
        self.dynamic_tree.query_into(area, &mut out);
        out
    }

    /// Candidates around a circle; callers do the exact distance test
    pub fn query_circle(&self, center: Vec2, radius: f32) -> Vec<ColliderId> {
        self.query(&Bounds::from_center(center, Vec2::splat(radius * 2.0)))
    }

    /// Advance every dynamic body by `dt` seconds
    pub fn fixed_update(&mut self, dt: f32) {
        self.contacts.clear();
        self.seen_pairs.clear();

        self.rebuild_broad_phase(dt);
        self.integrate(dt);

        let substeps = self.substep_count(dt);
        let step_dt = dt / substeps as f32;
        for _ in 0..substeps {
            for c in self.colliders.iter_mut().filter(|c| is_solid_dynamic(c)) {
                c.position += c.velocity * step_dt;
            }
            self.gather_pairs();
            self.assign_levels();
            self.solve_pairs();
        }

        self.sweep_sensors(dt);
    }

    fn rebuild_broad_phase(&mut self, dt: f32) {
        if self.static_dirty {
            self.static_tree.clear();
            for c in self.colliders.iter().filter(|c| c.is_static()) {
                self.static_tree.insert(c.id, c.aabb());
            }
            self.static_dirty = false;
        }

        self.dynamic_tree.clear();
        for c in self.colliders.iter().filter(|c| !c.is_static()) {
            // Cover the whole path this tick so the snapshot has no false negatives
            let predicted = (c.velocity + c.acceleration * dt) * (1.0 - c.friction);
            let now = c.aabb();
            let swept = now.union(&now.translate(predicted * dt)).inflate(CONTACT_MARGIN);
            if !self.dynamic_tree.insert(c.id, swept) {
                // Partly outside the root: fall back to the current box
                self.dynamic_tree.insert(c.id, now);
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        for c in &mut self.colliders {
            if c.is_static() {
                c.velocity = Vec2::ZERO;
                c.acceleration = Vec2::ZERO;
                continue;
            }
            c.velocity += c.acceleration * dt;
            c.velocity *= 1.0 - c.friction;
            c.acceleration = Vec2::ZERO;
        }
    }

    /// Substeps needed by the fastest solid body. Sensors are swept separately.
    fn substep_count(&self, dt: f32) -> u32 {
        self.colliders
            .iter()
            .filter(|c| is_solid_dynamic(c))
            .map(|c| {
                let travel = c.velocity.length() * dt;
                let step = (c.shape.min_extent() * SUBSTEP_FRACTION).max(0.01);
                (travel / step).ceil() as u32
            })
            .max()
            .unwrap_or(1)
            .clamp(1, MAX_SUBSTEPS)
    }

    fn interacts(&self, a: &Collider, b: &Collider) -> Option<(bool, bool)> {
        let a_accepts = a.accepts(b);
        let b_accepts = b.accepts(a);
        let interacts = match self.policy {
            MaskPolicy::Symmetric => a_accepts && b_accepts,
            MaskPolicy::Either => a_accepts || b_accepts,
        };
        interacts.then_some((a_accepts, b_accepts))
    }

    /// Solid pairs that overlap or sit within [`CONTACT_MARGIN`] of each other
    fn gather_pairs(&mut self) {
        let mut candidates = std::mem::take(&mut self.scratch);
        self.pairs.clear();

        for i in 0..self.colliders.len() {
            let a = &self.colliders[i];
            if !is_solid_dynamic(a) {
                continue;
            }

            candidates.clear();
            let area = a.aabb().inflate(CONTACT_MARGIN);
            self.static_tree.query_into(&area, &mut candidates);
            self.dynamic_tree.query_into(&area, &mut candidates);

            for &other in &candidates {
                let Some(&j) = self.index.get(&other) else {
                    continue;
                };
                let b = &self.colliders[j];
                // Dynamic pairs are gathered once, from the lower index
                if j == i || b.sensor || (j < i && !b.is_static()) {
                    continue;
                }
                let Some((a_accepts, b_accepts)) = self.interacts(a, b) else {
                    continue;
                };
                if !collide_with_margin(a, b, CONTACT_MARGIN).hit {
                    continue;
                }
                self.pairs.push(Pair {
                    i,
                    j,
                    inv_i: if a_accepts { a.inverse_mass() } else { 0.0 },
                    inv_j: if b_accepts { b.inverse_mass() } else { 0.0 },
                });
            }
        }

        self.scratch = candidates;
    }

    /// Rank bodies by how many contacts separate them from static geometry.
    ///
    /// Within a pair the body nearer to a static body is held in place, so a
    /// crowd pressed against a wall is pushed back out in a single sweep.
    fn assign_levels(&mut self) {
        let n = self.colliders.len();
        self.levels.clear();
        self.levels
            .extend(self.colliders.iter().map(|c| if c.is_static() { 0 } else { UNANCHORED }));
        self.links.resize_with(n, Vec::new);
        for links in &mut self.links {
            links.clear();
        }

        let mut queue = VecDeque::new();
        for pair in &self.pairs {
            if self.colliders[pair.j].is_static() {
                if self.levels[pair.i] == UNANCHORED {
                    self.levels[pair.i] = 1;
                    queue.push_back(pair.i);
                }
            } else {
                self.links[pair.i].push(pair.j);
                self.links[pair.j].push(pair.i);
            }
        }
        while let Some(body) = queue.pop_front() {
            let next = self.levels[body] + 1;
            for k in 0..self.links[body].len() {
                let neighbor = self.links[body][k];
                if self.levels[neighbor] == UNANCHORED {
                    self.levels[neighbor] = next;
                    queue.push_back(neighbor);
                }
            }
        }

        let levels = &self.levels;
        for pair in &mut self.pairs {
            let (li, lj) = (levels[pair.i], levels[pair.j]);
            let inv_i = if li < lj { 0.0 } else { pair.inv_i };
            let inv_j = if lj < li { 0.0 } else { pair.inv_j };
            // Keep the mask answer when ranking would freeze both sides
            if inv_i + inv_j > 0.0 {
                pair.inv_i = inv_i;
                pair.inv_j = inv_j;
            }
        }
        self.pairs
            .sort_by_key(|p| (levels[p.i].min(levels[p.j]), levels[p.i].max(levels[p.j])));
    }

    fn solve_pairs(&mut self) {
        for _ in 0..MAX_SOLVER_PASSES {
            let mut deepest = 0.0f32;
            for k in 0..self.pairs.len() {
                let pair = self.pairs[k];
                deepest = deepest.max(self.resolve_pair(pair));
            }
            if deepest <= SETTLED_PENETRATION {
                break;
            }
        }
    }

    /// Push one pair apart and cancel its approach speed. Returns the overlap removed.
    fn resolve_pair(&mut self, pair: Pair) -> f32 {
        let (a, b) = pair_mut(&mut self.colliders, pair.i, pair.j);

        let result = collide_with_margin(a, b, CONTACT_MARGIN);
        if !result.hit {
            return 0.0;
        }

        if result.penetration > 0.0 {
            let key = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
            if self.seen_pairs.insert(key) {
                self.contacts.push(Contact {
                    a: a.id,
                    b: b.id,
                    normal: result.normal,
                    penetration: result.penetration,
                });
            }
        }

        let total = pair.inv_i + pair.inv_j;
        if total <= 0.0 {
            return 0.0;
        }

        let n = result.normal;
        let penetration = result.penetration.max(0.0);
        a.position += n * (penetration * pair.inv_i / total);
        b.position -= n * (penetration * pair.inv_j / total);

        let approach = (a.velocity - b.velocity).dot(n);
        if approach < 0.0 {
            let impulse = -(1.0 + self.restitution) * approach / total;
            a.velocity += n * (impulse * pair.inv_i);
            b.velocity -= n * (impulse * pair.inv_j);
        }
        penetration
    }

    /// Move sensors along their whole path for the tick and report what they
    /// touched on the way. Sensors never push or get pushed.
    fn sweep_sensors(&mut self, dt: f32) {
        let mut candidates = std::mem::take(&mut self.scratch);

        for i in 0..self.colliders.len() {
            let sensor = &self.colliders[i];
            if !sensor.sensor || sensor.is_static() {
                continue;
            }
            let from = sensor.position;
            let to = from + sensor.velocity * dt;
            let area = sensor.aabb().union(&sensor.shape.aabb_at(to));
            self.colliders[i].position = to;

            candidates.clear();
            self.static_tree.query_into(&area, &mut candidates);
            self.dynamic_tree.query_into(&area, &mut candidates);

            for &other in &candidates {
                let Some(&j) = self.index.get(&other) else {
                    continue;
                };
                let (sensor, target) = (&self.colliders[i], &self.colliders[j]);
                if j == i || target.sensor || self.interacts(sensor, target).is_none() {
                    continue;
                }

                let at_end = collide(sensor, target);
                let touched = at_end.hit || sweep_hits(from, to, sensor.shape.min_extent(), target);
                if !touched {
                    continue;
                }
                let key = if sensor.id < target.id { (sensor.id, target.id) } else { (target.id, sensor.id) };
                if self.seen_pairs.insert(key) {
                    let normal = if at_end.hit { at_end.normal } else { -(to - from).normalize_or_zero() };
                    self.contacts.push(Contact {
                        a: sensor.id,
                        b: target.id,
                        normal,
                        penetration: at_end.penetration,
                    });
                }
            }
        }

        self.scratch = candidates;
    }
}

fn is_solid_dynamic(c: &Collider) -> bool {
    !c.is_static() && !c.sensor
}

/// Two distinct mutable elements of a slice
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collider::{CollisionGroup, GroupMask, Shape};

    fn world() -> ColliderWorld {
        ColliderWorld::new(Bounds::new(-500.0, -500.0, 1000.0, 1000.0))
    }

    fn players_mask() -> GroupMask {
        GroupMask::of(&[CollisionGroup::Player])
    }

    #[test]
    fn test_single_body_integrates() {
        let mut w = world();
        let mut c = Collider::circle(5.0).with_mass(1.0);
        c.velocity = Vec2::new(100.0, 0.0);
        let id = w.add(c);

        w.fixed_update(0.1);

        let p = w.position(id).unwrap();
        assert!((p.x - 10.0).abs() < 1e-3);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn test_friction_and_acceleration() {
        let mut w = world();
        let mut c = Collider::circle(1.0).with_mass(2.0);
        c.friction = 0.5;
        let id = w.add(c);
        w.get_mut(id).unwrap().apply_force(Vec2::new(20.0, 0.0)); // a = 10

        w.fixed_update(1.0);

        let c = w.get(id).unwrap();
        // v = (0 + 10 * 1) * 0.5
        assert!((c.velocity.x - 5.0).abs() < 1e-5);
        assert!((c.position.x - 5.0).abs() < 1e-3);
        assert_eq!(c.acceleration, Vec2::ZERO);
    }

    #[test]
    fn test_two_circles_separate_symmetrically() {
        let mut w = world();
        let mut a = Collider::circle(5.0)
            .with_mass(1.0)
            .in_group(CollisionGroup::Player, players_mask());
        a.velocity = Vec2::new(50.0, 0.0);
        let mut b = Collider::circle(5.0)
            .with_mass(1.0)
            .at(Vec2::new(9.0, 0.0))
            .in_group(CollisionGroup::Player, players_mask());
        b.velocity = Vec2::new(-50.0, 0.0);
        let ida = w.add(a);
        let idb = w.add(b);

        w.fixed_update(0.02);

        let pa = w.position(ida).unwrap();
        let pb = w.position(idb).unwrap();
        assert!(pa.distance(pb) >= 10.0 - 1e-3);
        // Both moved the same amount away from the midpoint 4.5
        assert!(((4.5 - pa.x) - (pb.x - 4.5)).abs() < 1e-3);
        assert_eq!(w.contacts().len(), 1);
    }

    #[test]
    fn test_static_wall_stops_circle() {
        let mut w = world();
        let mut ball = Collider::circle(5.0)
            .with_mass(1.0)
            .in_group(CollisionGroup::Player, GroupMask::ALL);
        ball.velocity = Vec2::new(1000.0, 0.0);
        let ball = w.add(ball);
        let wall = w.add(
            Collider::with_shape(Shape::rect(2.0, 100.0))
                .at(Vec2::new(9.0, 0.0))
                .in_group(CollisionGroup::MapTiles, GroupMask::ALL)
                .into_static(),
        );

        w.fixed_update(0.02);

        let p = w.position(ball).unwrap();
        assert!(p.x <= 3.0 + 0.5, "ball went through the wall: {}", p.x);
        assert!(p.x > 0.0);
        let wall = w.get(wall).unwrap();
        assert_eq!(wall.position, Vec2::new(9.0, 0.0));
        assert_eq!(wall.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_mask_filters_pairs() {
        let mut w = world();
        let a = Collider::circle(5.0).in_group(CollisionGroup::Player, players_mask());
        let b = Collider::circle(5.0)
            .at(Vec2::new(6.0, 0.0))
            .in_group(CollisionGroup::Zombies, GroupMask::of(&[CollisionGroup::Zombies]));
        let ida = w.add(a);
        let idb = w.add(b);

        w.fixed_update(0.016);

        assert!(w.contacts().is_empty());
        assert_eq!(w.position(ida).unwrap(), Vec2::ZERO);
        assert_eq!(w.position(idb).unwrap(), Vec2::new(6.0, 0.0));
    }

    #[test]
    fn test_either_policy_pushes_only_listing_side() {
        let mut w = world();
        w.set_policy(MaskPolicy::Either);
        let a = Collider::circle(5.0).in_group(CollisionGroup::Player, GroupMask::of(&[CollisionGroup::Zombies]));
        let b = Collider::circle(5.0)
            .at(Vec2::new(6.0, 0.0))
            .in_group(CollisionGroup::Zombies, GroupMask::NONE);
        let ida = w.add(a);
        let idb = w.add(b);

        w.fixed_update(0.016);

        assert_eq!(w.contacts().len(), 1);
        assert!((w.position(ida).unwrap().x + 4.0).abs() < 1e-3);
        assert_eq!(w.position(idb).unwrap(), Vec2::new(6.0, 0.0));
    }

    #[test]
    fn test_sensor_reports_without_resolving() {
        let mut w = world();
        let mut bullet = Collider::circle(1.0).in_group(CollisionGroup::Projectiles, GroupMask::ALL);
        bullet.sensor = true;
        let bullet = w.add(bullet);
        let target = w.add(
            Collider::circle(5.0)
                .at(Vec2::new(3.0, 0.0))
                .in_group(CollisionGroup::Zombies, GroupMask::ALL),
        );

        w.fixed_update(0.016);

        assert_eq!(w.contacts().len(), 1);
        assert!(w.contacts()[0].involves(bullet));
        assert_eq!(w.contacts()[0].other(bullet), Some(target));
        assert_eq!(w.position(target).unwrap(), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_remove_keeps_order_and_lookup() {
        let mut w = world();
        let a = w.add(Collider::circle(1.0));
        let b = w.add(Collider::circle(1.0).at(Vec2::new(50.0, 0.0)));
        let c = w.add(Collider::circle(1.0).at(Vec2::new(100.0, 0.0)));

        assert!(w.remove(b).is_some());
        assert!(w.remove(b).is_none());
        assert_eq!(w.len(), 2);
        assert_eq!(w.position(c), Some(Vec2::new(100.0, 0.0)));
        let order: Vec<_> = w.iter().map(|c| c.id()).collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn test_crowd_stays_separated() {
        let mut w = world();
        let mask = GroupMask::of(&[CollisionGroup::Zombies]);
        let ids: Vec<_> = (0..25)
            .map(|i| {
                let pos = Vec2::new((i % 5) as f32 * 6.0, (i / 5) as f32 * 6.0);
                let mut c = Collider::circle(5.0)
                    .with_mass(1.0)
                    .at(pos)
                    .in_group(CollisionGroup::Zombies, mask);
                c.friction = 0.2;
                w.add(c)
            })
            .collect();

        for _ in 0..300 {
            w.fixed_update(1.0 / 60.0);
        }

        for (n, a) in ids.iter().enumerate() {
            for b in &ids[n + 1..] {
                let d = w.position(*a).unwrap().distance(w.position(*b).unwrap());
                assert!(d >= 10.0 - 0.5, "pair still overlapping by {}", 10.0 - d);
            }
        }
    }

    /// Deepest overlap among `ids`, and between any of them and the wall at `wall_left`
    fn worst_overlap(w: &ColliderWorld, ids: &[ColliderId], radius: f32, wall_left: f32) -> f32 {
        let mut worst = 0.0f32;
        for (n, a) in ids.iter().enumerate() {
            let pa = w.position(*a).unwrap();
            worst = worst.max(pa.x + radius - wall_left);
            for b in &ids[n + 1..] {
                let d = pa.distance(w.position(*b).unwrap());
                worst = worst.max(2.0 * radius - d);
            }
        }
        worst
    }

    #[test]
    fn test_crowd_pressed_against_wall_stays_separated() {
        let mut w = world();
        let mask = GroupMask::of(&[CollisionGroup::Zombies, CollisionGroup::MapTiles]);
        w.add(
            Collider::with_shape(Shape::rect(10.0, 200.0))
                .at(Vec2::new(105.0, 0.0))
                .in_group(CollisionGroup::MapTiles, GroupMask::ALL)
                .into_static(),
        );
        let ids: Vec<_> = (0..10)
            .map(|i| {
                w.add(
                    Collider::circle(5.0)
                        .with_mass(100.0)
                        .at(Vec2::new(5.0 + 10.0 * i as f32, 0.0))
                        .in_group(CollisionGroup::Zombies, mask),
                )
            })
            .collect();

        for tick in 0..120 {
            for id in &ids {
                w.get_mut(*id).unwrap().apply_force(Vec2::new(200.0 * 100.0, 0.0));
            }
            w.fixed_update(1.0 / 60.0);
            if tick >= 30 {
                let worst = worst_overlap(&w, &ids, 5.0, 100.0);
                assert!(worst <= 0.5, "tick {tick}: overlap {worst}");
            }
        }

        let last = w.position(ids[9]).unwrap();
        assert!((last.x - 95.0).abs() < 0.5);
        // The whole row comes to rest instead of sliding into the wall
        assert!(ids.iter().all(|id| w.get(*id).unwrap().velocity.x.abs() < 5.0));
    }

    #[test]
    fn test_two_rows_pressed_into_wall() {
        let mut w = world();
        let mask = GroupMask::of(&[CollisionGroup::Zombies, CollisionGroup::MapTiles]);
        w.add(
            Collider::with_shape(Shape::rect(10.0, 400.0))
                .at(Vec2::new(105.0, 0.0))
                .in_group(CollisionGroup::MapTiles, GroupMask::ALL)
                .into_static(),
        );
        let ids: Vec<_> = (0..24)
            .map(|i| {
                let row = (i / 12) as f32;
                let pos = Vec2::new(90.0 - 11.0 * (i % 12) as f32 - 5.5 * row, row * 9.0);
                w.add(
                    Collider::circle(5.0)
                        .with_mass(1.0)
                        .at(pos)
                        .in_group(CollisionGroup::Zombies, mask),
                )
            })
            .collect();

        for tick in 0..180 {
            for id in &ids {
                w.get_mut(*id).unwrap().apply_force(Vec2::new(200.0, 0.0));
            }
            w.fixed_update(1.0 / 60.0);
            if tick >= 90 {
                let worst = worst_overlap(&w, &ids, 5.0, 100.0);
                assert!(worst <= 0.5, "tick {tick}: overlap {worst}");
            }
        }
    }

    #[test]
    fn test_sensors_do_not_drive_substeps() {
        let mut w = world();
        for i in 0..50 {
            w.add(Collider::circle(5.0).at(Vec2::new((i % 10) as f32 * 20.0 - 100.0, (i / 10) as f32 * 20.0)));
        }
        let dt = 1.0 / 60.0;
        assert_eq!(w.substep_count(dt), 1);

        let mut bullet = Collider::circle(1.0).at(Vec2::new(-200.0, 200.0));
        bullet.sensor = true;
        bullet.velocity = Vec2::new(600.0, 0.0);
        let bullet = w.add(bullet);
        assert_eq!(w.substep_count(dt), 1);

        w.fixed_update(dt);
        let p = w.position(bullet).unwrap();
        assert!((p.x - (-190.0)).abs() < 1e-3);
    }

    #[test]
    fn test_fast_sensor_reports_what_it_passes_through() {
        let mut w = world();
        let mut bullet = Collider::circle(1.0).in_group(CollisionGroup::Projectiles, GroupMask::ALL);
        bullet.sensor = true;
        bullet.velocity = Vec2::new(1200.0, 0.0);
        let bullet = w.add(bullet);
        // Thin post sits between the start and the end of the tick
        let post = w.add(
            Collider::circle(2.0)
                .at(Vec2::new(10.0, 0.5))
                .in_group(CollisionGroup::Zombies, GroupMask::ALL),
        );
        let wide = w.add(
            Collider::circle(2.0)
                .at(Vec2::new(10.0, 6.0))
                .in_group(CollisionGroup::Zombies, GroupMask::ALL),
        );

        w.fixed_update(1.0 / 60.0);

        assert!((w.position(bullet).unwrap().x - 20.0).abs() < 1e-3);
        let hits: Vec<_> = w.contacts().iter().filter_map(|c| c.other(bullet)).collect();
        assert_eq!(hits, vec![post]);
        assert!(!w.contacts().iter().any(|c| c.involves(wide)));
        assert_eq!(w.position(post).unwrap(), Vec2::new(10.0, 0.5));
    }

    #[test]
    fn test_query_circle_finds_static_and_dynamic() {
        let mut w = world();
        let s = w.add(Collider::with_shape(Shape::rect(4.0, 4.0)).at(Vec2::new(10.0, 0.0)).into_static());
        let d = w.add(Collider::circle(2.0).at(Vec2::new(-10.0, 0.0)));
        w.fixed_update(0.016);

        let found = w.query_circle(Vec2::ZERO, 15.0);
        assert!(found.contains(&s));
        assert!(found.contains(&d));
        assert!(w.query_circle(Vec2::new(200.0, 200.0), 5.0).is_empty());
    }
}
