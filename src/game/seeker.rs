//! Enemies that chase a target: zombies and the devil
//!
//! Steering happens every fixed tick from whatever AI state the seeker last
//! received. Line-of-sight and path searches are planned here as
//! [`AiRequest`]s and run elsewhere (usually on a worker); their
//! [`AiResult`]s are written back with [`Seeker::apply`].

use glam::Vec2;

use super::entity::{Entity, EntityId, Health, collider_mut, collider_of};
use super::render::{Color, RenderSurface};
use crate::error::EntityError;
use crate::settings::SeekerSettings;
use crate::sim::{
    Bounds, Collider, ColliderId, ColliderWorld, CollisionGroup, GroupMask, IntervalMap, Obstacle, PathFinder,
    VectorExt, from_angle, line_intersection,
};

const HEALTH_BAR_RED: Color = [0.8, 0.1, 0.1, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekerKind {
    Zombie,
    Devil,
}

impl SeekerKind {
    pub fn sprite(self, facing_left: bool) -> &'static str {
        match (self, facing_left) {
            (SeekerKind::Zombie, false) => "zombie",
            (SeekerKind::Zombie, true) => "zombie_left",
            (SeekerKind::Devil, false) => "devil",
            (SeekerKind::Devil, true) => "devil_left",
        }
    }

    /// Steering force toward `angle`. Devils charge when close with a clear line.
    fn seek_force(self, settings: &SeekerSettings, mass: f32, angle: f32, distance: f32, clear: bool) -> Vec2 {
        let mut magnitude = settings.speed * mass;
        if self == SeekerKind::Devil && clear && distance < settings.charge_distance {
            magnitude *= settings.charge_multiplier;
        }
        from_angle(angle) * magnitude
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Timer {
    LineOfSight,
    Path,
    Attack,
}

/// Work a seeker wants done off the simulation thread.
/// Positions are copied in at planning time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiRequest {
    LineOfSight { seeker: EntityId, from: Vec2, to: Vec2 },
    Path { seeker: EntityId, from: Vec2, to: Vec2 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AiOutcome {
    LineOfSight(bool),
    Path(Vec<Vec2>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiResult {
    pub seeker: EntityId,
    pub outcome: AiOutcome,
}

/// True if the segment touches none of `walls`
pub fn has_line_of_sight(from: Vec2, to: Vec2, walls: &[Collider]) -> bool {
    walls.iter().all(|wall| line_intersection(from, to, wall).is_none())
}

/// Seeker bodies as they stood when a planning round started.
/// Path searches route around the ones close to the requester.
#[derive(Debug, Clone, Default)]
pub struct Crowd {
    range: f32,
    members: Vec<(EntityId, Obstacle)>,
}

impl Crowd {
    pub fn new(range: f32) -> Self {
        Self {
            range,
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, seeker: EntityId, obstacle: Obstacle) {
        self.members.push((seeker, obstacle));
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Everyone within range of `around`, except `seeker` itself
    pub fn near(&self, seeker: EntityId, around: Vec2) -> Vec<Obstacle> {
        let range_sq = self.range * self.range;
        self.members
            .iter()
            .filter(|(id, o)| *id != seeker && o.position.distance_squared(around) <= range_sq)
            .map(|(_, o)| o.clone())
            .collect()
    }
}

impl AiRequest {
    pub fn seeker(&self) -> EntityId {
        match *self {
            AiRequest::LineOfSight { seeker, .. } | AiRequest::Path { seeker, .. } => seeker,
        }
    }

    /// Run the request against read-only map data and a crowd snapshot
    pub fn run(&self, walls: &[Collider], path_finder: &PathFinder, crowd: &Crowd) -> AiResult {
        let outcome = match *self {
            AiRequest::LineOfSight { from, to, .. } => AiOutcome::LineOfSight(has_line_of_sight(from, to, walls)),
            AiRequest::Path { seeker, from, to } => {
                let nearby = crowd.near(seeker, from);
                AiOutcome::Path(path_finder.request_path_with(from, to, &nearby))
            }
        };
        AiResult {
            seeker: self.seeker(),
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Seeker {
    id: EntityId,
    kind: SeekerKind,
    collider: ColliderId,
    settings: SeekerSettings,
    health: Health,
    target: Vec2,
    path_clear: bool,
    /// Goal first; the next step is near the end
    path: Vec<Vec2>,
    timers: IntervalMap<Timer>,
}

impl Seeker {
    pub fn spawn(
        id: EntityId,
        kind: SeekerKind,
        settings: &SeekerSettings,
        colliders: &mut ColliderWorld,
        position: Vec2,
    ) -> Self {
        let mask = GroupMask::of(&[
            CollisionGroup::MapBounds,
            CollisionGroup::MapTiles,
            CollisionGroup::Player,
            CollisionGroup::Zombies,
            CollisionGroup::Projectiles,
        ]);
        let mut collider = Collider::circle(settings.radius)
            .at(position)
            .with_mass(settings.mass)
            .in_group(CollisionGroup::Zombies, mask);
        collider.friction = settings.friction;
        let collider = colliders.add(collider);

        let mut timers = IntervalMap::new();
        timers.register(Timer::LineOfSight, settings.line_of_sight_interval_ms);
        timers.register(Timer::Path, settings.path_interval_ms);
        timers.register(Timer::Attack, settings.attack_interval_ms);

        Self {
            id,
            kind,
            collider,
            settings: settings.clone(),
            health: Health::new(settings.health),
            target: position,
            path_clear: false,
            path: Vec::new(),
            timers,
        }
    }

    pub fn kind(&self) -> SeekerKind {
        self.kind
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    pub fn is_path_clear(&self) -> bool {
        self.path_clear
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Track `target` and emit whatever AI work is due
    pub fn plan(&mut self, colliders: &ColliderWorld, target: Vec2, now_ms: f64) -> Result<Vec<AiRequest>, EntityError> {
        let from = collider_of(colliders, self.collider)?.position;
        self.target = target;

        let mut requests = Vec::new();
        if self.timers.try_fire(&Timer::LineOfSight, now_ms) {
            requests.push(AiRequest::LineOfSight {
                seeker: self.id,
                from,
                to: target,
            });
        }
        if !self.path_clear && self.timers.try_fire(&Timer::Path, now_ms) {
            requests.push(AiRequest::Path {
                seeker: self.id,
                from,
                to: target,
            });
        }
        Ok(requests)
    }

    /// Store a finished AI result. Newer results overwrite older ones.
    pub fn apply(&mut self, outcome: AiOutcome) {
        match outcome {
            AiOutcome::LineOfSight(clear) => self.path_clear = clear,
            AiOutcome::Path(path) => self.path = path,
        }
    }

    /// Where to head this tick
    fn steer_point(&self) -> Vec2 {
        if self.path_clear || self.path.len() < 2 {
            return self.target;
        }
        self.path[self.path.len() - 2]
    }

    /// Apply this tick's steering force
    pub fn fixed_update(&mut self, colliders: &mut ColliderWorld) -> Result<(), EntityError> {
        let steer = self.steer_point();
        let collider = collider_mut(colliders, self.collider)?;
        let to = steer - collider.position;
        if to.length_squared() <= f32::EPSILON {
            return Ok(());
        }
        let distance = self.target.distance(collider.position);
        let force = self
            .kind
            .seek_force(&self.settings, collider.mass(), to.heading(), distance, self.path_clear);
        collider.apply_force(force);
        Ok(())
    }

    /// Contact damage if the attack cooldown allows
    pub fn try_attack(&mut self, now_ms: f64) -> Option<f32> {
        self.timers
            .try_fire(&Timer::Attack, now_ms)
            .then_some(self.settings.damage)
    }
}

impl Entity for Seeker {
    fn id(&self) -> EntityId {
        self.id
    }

    fn collider(&self) -> ColliderId {
        self.collider
    }

    fn render(
        &self,
        colliders: &ColliderWorld,
        surface: &mut dyn RenderSurface,
        alpha: f32,
        step: f32,
    ) -> Result<(), EntityError> {
        let pos = self.render_position(colliders, alpha, step)?;
        let size = self.settings.radius * 4.0;
        let facing_left = collider_of(colliders, self.collider)?.velocity.x < 0.0;
        let anchor = pos - Vec2::new(0.0, self.settings.radius);
        surface.draw_image(
            self.kind.sprite(facing_left),
            None,
            Bounds::from_center(anchor, Vec2::splat(size)),
        );

        if self.kind == SeekerKind::Devil && self.health.fraction() < 1.0 {
            let bar = Bounds::new(pos.x - size / 2.0, pos.y - size, size * self.health.fraction(), 1.5);
            surface.fill_rect(bar, HEALTH_BAR_RED);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> ColliderWorld {
        ColliderWorld::new(Bounds::new(-500.0, -500.0, 1000.0, 1000.0))
    }

    #[test]
    fn test_plan_respects_intervals() {
        let mut colliders = world();
        let mut zombie = Seeker::spawn(EntityId(7), SeekerKind::Zombie, &SeekerSettings::zombie(), &mut colliders, Vec2::ZERO);

        let first = zombie.plan(&colliders, Vec2::new(50.0, 0.0), 0.0).unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|r| r.seeker() == EntityId(7)));

        assert!(zombie.plan(&colliders, Vec2::new(50.0, 0.0), 50.0).unwrap().is_empty());

        // Line of sight every 100 ms, path every 150 ms
        let at_100 = zombie.plan(&colliders, Vec2::new(50.0, 0.0), 100.0).unwrap();
        assert!(matches!(at_100.as_slice(), [AiRequest::LineOfSight { .. }]));
        let at_150 = zombie.plan(&colliders, Vec2::new(50.0, 0.0), 150.0).unwrap();
        assert!(matches!(at_150.as_slice(), [AiRequest::Path { .. }]));
    }

    #[test]
    fn test_no_path_requests_while_clear() {
        let mut colliders = world();
        let mut zombie = Seeker::spawn(EntityId(1), SeekerKind::Zombie, &SeekerSettings::zombie(), &mut colliders, Vec2::ZERO);
        zombie.apply(AiOutcome::LineOfSight(true));
        let requests = zombie.plan(&colliders, Vec2::new(50.0, 0.0), 0.0).unwrap();
        assert!(matches!(requests.as_slice(), [AiRequest::LineOfSight { .. }]));
    }

    #[test]
    fn test_steers_to_second_to_last_waypoint() {
        let mut colliders = world();
        let mut zombie = Seeker::spawn(EntityId(1), SeekerKind::Zombie, &SeekerSettings::zombie(), &mut colliders, Vec2::ZERO);
        zombie.plan(&colliders, Vec2::new(100.0, 0.0), 0.0).unwrap();
        zombie.apply(AiOutcome::LineOfSight(false));
        zombie.apply(AiOutcome::Path(vec![
            Vec2::new(100.0, 0.0),
            Vec2::new(0.0, 64.0),
            Vec2::new(0.0, 32.0),
        ]));

        zombie.fixed_update(&mut colliders).unwrap();
        let a = colliders.get(zombie.collider()).unwrap().acceleration;
        // Heads straight down toward (0, 64)
        assert!(a.x.abs() < 1e-3);
        assert!((a.y - 200.0).abs() < 1e-2);
    }

    #[test]
    fn test_direct_steering_when_clear_and_devil_charge() {
        let mut colliders = world();
        let mut devil = Seeker::spawn(EntityId(2), SeekerKind::Devil, &SeekerSettings::devil(), &mut colliders, Vec2::ZERO);
        devil.plan(&colliders, Vec2::new(100.0, 0.0), 0.0).unwrap();
        devil.apply(AiOutcome::LineOfSight(true));
        devil.fixed_update(&mut colliders).unwrap();
        let a = colliders.get(devil.collider()).unwrap().acceleration;
        assert!((a.x - 300.0).abs() < 1e-2);

        // Out of charge range: plain speed
        colliders.fixed_update(1.0 / 60.0);
        devil.plan(&colliders, Vec2::new(400.0, 0.0), 1.0).unwrap();
        devil.fixed_update(&mut colliders).unwrap();
        let a = colliders.get(devil.collider()).unwrap().acceleration;
        assert!((a.x - 200.0).abs() < 1e-2);
    }

    #[test]
    fn test_line_of_sight_request_against_walls() {
        let wall = Collider::with_shape(crate::sim::Shape::rect(10.0, 40.0))
            .at(Vec2::new(50.0, 0.0))
            .into_static();
        let pf = PathFinder::new(10.0, 200.0, 200.0, Vec2::new(-100.0, -100.0));
        let walls = vec![wall];

        let blocked = AiRequest::LineOfSight {
            seeker: EntityId(3),
            from: Vec2::ZERO,
            to: Vec2::new(90.0, 0.0),
        };
        let crowd = Crowd::default();
        assert_eq!(blocked.run(&walls, &pf, &crowd).outcome, AiOutcome::LineOfSight(false));

        let open = AiRequest::LineOfSight {
            seeker: EntityId(3),
            from: Vec2::ZERO,
            to: Vec2::new(0.0, 90.0),
        };
        assert_eq!(open.run(&walls, &pf, &crowd).outcome, AiOutcome::LineOfSight(true));
    }

    #[test]
    fn test_path_request_routes_around_nearby_seekers() {
        let pf = PathFinder::new(10.0, 200.0, 200.0, Vec2::new(-100.0, -100.0));
        let from = pf.cell_center((2, 10));
        let to = pf.cell_center((12, 10));
        let request = AiRequest::Path {
            seeker: EntityId(1),
            from,
            to,
        };
        let blocked_cell = (5, 10);

        let mut crowd = Crowd::new(60.0);
        // The requester itself never blocks its own route
        crowd.push(EntityId(1), Obstacle::new(crate::sim::Shape::rect(10.0, 10.0), from));
        crowd.push(
            EntityId(2),
            Obstacle::new(crate::sim::Shape::rect(10.0, 10.0), pf.cell_center(blocked_cell)),
        );
        // Far away: ignored
        crowd.push(
            EntityId(3),
            Obstacle::new(crate::sim::Shape::rect(10.0, 10.0), pf.cell_center((9, 10))),
        );
        assert_eq!(crowd.near(EntityId(1), from).len(), 1);

        let AiOutcome::Path(path) = request.run(&[], &pf, &crowd).outcome else {
            panic!("path request answered with line of sight");
        };
        let cells: Vec<_> = path.iter().map(|p| pf.cell_of(*p)).collect();
        assert!(!cells.contains(&blocked_cell));
        // One step up and one back down: same move count as the straight line
        assert_eq!(path.len(), 10);
        assert_eq!(cells[0], (12, 10));

        let AiOutcome::Path(straight) = request.run(&[], &pf, &Crowd::default()).outcome else {
            panic!("path request answered with line of sight");
        };
        let cells: Vec<_> = straight.iter().map(|p| pf.cell_of(*p)).collect();
        assert!(cells.contains(&blocked_cell));
        assert!(cells.iter().all(|c| c.1 == 10));
    }

    #[test]
    fn test_attack_cooldown() {
        let mut colliders = world();
        let mut zombie = Seeker::spawn(EntityId(1), SeekerKind::Zombie, &SeekerSettings::zombie(), &mut colliders, Vec2::ZERO);
        assert_eq!(zombie.try_attack(0.0), Some(1.0));
        assert_eq!(zombie.try_attack(100.0), None);
        assert_eq!(zombie.try_attack(500.0), Some(1.0));
    }
}
