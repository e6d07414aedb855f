//! The world: owns the map, the collider world, the path finder and every
//! entity, and drives them through the three loop phases.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, bounded};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::camera::Camera;
use super::entity::{Entity, EntityId, Owner};
use super::input::{Control, InputSnapshot};
use super::map::TileMap;
use super::player::{Player, ShotRequest, Weapon};
use super::projectile::{Bullet, Explosion, Grenade};
use super::render::{Color, RenderSurface, WHITE};
use super::seeker::{AiRequest, AiResult, Crowd, Seeker, SeekerKind};
use crate::consts::{RENDER_DISTANCE_OFFSET, SPAWN_CLEARANCE};
use crate::error::{EntityError, SetupError, SetupResult};
use crate::settings::Settings;
use crate::sim::{
    Bounds, Collider, ColliderId, ColliderWorld, CollisionGroup, Obstacle, PathFinder, Quadtree, WorkerPool,
};

const HEALTH_BAR_BACK: Color = [0.2, 0.2, 0.2, 0.8];
const HEALTH_BAR_FRONT: Color = [0.1, 0.8, 0.2, 1.0];

fn log_entity_error(phase: &str, error: EntityError) {
    log::warn!("{phase}: skipping entity: {error}");
}

pub struct World {
    settings: Settings,
    map: TileMap,
    colliders: ColliderWorld,
    path_finder: Arc<PathFinder>,
    /// Map geometry for line-of-sight checks
    walls: Arc<Vec<Collider>>,
    camera: Camera,

    // === Entities ===
    player: Player,
    seekers: Vec<Seeker>,
    bullets: Vec<Bullet>,
    grenades: Vec<Grenade>,
    explosions: Vec<Explosion>,
    owners: HashMap<ColliderId, Owner>,
    next_entity: u32,

    // === AI workers ===
    ai_pool: WorkerPool,
    ai_sender: Sender<AiResult>,
    ai_results: Receiver<AiResult>,

    // === Session state ===
    rng: Pcg32,
    /// Simulation clock, advanced only by fixed ticks
    clock_ms: f64,
    paused: bool,
    weapons_visible: bool,
    input: InputSnapshot,
    game_over: bool,
    disposed: bool,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("clock_ms", &self.clock_ms)
            .field("seekers", &self.seekers.len())
            .field("bullets", &self.bullets.len())
            .field("grenades", &self.grenades.len())
            .field("paused", &self.paused)
            .field("game_over", &self.game_over)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Build the world: place map colliders, index obstacles, seed entities
    pub fn new(settings: Settings, mut map: TileMap) -> SetupResult<Self> {
        settings.validate()?;
        if map.tile_sheet().is_none() {
            return Err(SetupError::MissingTileSheet);
        }
        let ws = &settings.world;

        map.set_boundary_thickness(ws.boundary_thickness);
        let extent = map.extent();
        let root = extent.inflate(ws.boundary_thickness.max(ws.quadtree_margin) + map.tile_width().max(map.tile_height()));

        let mut colliders = ColliderWorld::with_quadtree(root, ws.quadtree_capacity, ws.quadtree_max_depth);
        colliders.set_policy(ws.mask_policy);
        colliders.set_restitution(ws.restitution);
        let walls = map.initialize_colliders(&mut colliders);

        let mut path_finder = PathFinder::new(ws.path_node_size, extent.w, extent.h, extent.min());
        for wall in &walls {
            path_finder.add_obstacle(Obstacle::from_collider(wall));
        }

        let ai_pool = WorkerPool::new("ai", ws.worker_threads, ws.worker_queue_capacity)?;
        let (ai_sender, ai_results) = bounded(ws.worker_queue_capacity);

        let mut camera = Camera::new(settings.camera.screen_width, settings.camera.screen_height);
        camera.zoom_to(settings.camera.view_width);

        let spawn = map.nearest_open_tile(extent.center()).unwrap_or(extent.center());
        let player = Player::spawn(EntityId(0), &settings.player, &mut colliders, spawn);
        camera.move_to(player.render_anchor());
        map.set_viewport(camera.viewport());

        let mut owners = HashMap::new();
        owners.insert(player.collider(), Owner::Player);

        let mut world = Self {
            rng: Pcg32::seed_from_u64(ws.seed),
            settings,
            map,
            colliders,
            path_finder: Arc::new(path_finder),
            walls: Arc::new(walls),
            camera,
            player,
            seekers: Vec::new(),
            bullets: Vec::new(),
            grenades: Vec::new(),
            explosions: Vec::new(),
            owners,
            next_entity: 1,
            ai_pool,
            ai_sender,
            ai_results,
            clock_ms: 0.0,
            paused: false,
            weapons_visible: false,
            input: InputSnapshot::default(),
            game_over: false,
            disposed: false,
        };

        let (zombies, devils) = (world.settings.world.zombie_count, world.settings.world.devil_count);
        for _ in 0..zombies {
            let at = world.random_spawn_point(spawn);
            world.spawn_seeker(SeekerKind::Zombie, at);
        }
        for _ in 0..devils {
            let at = world.random_spawn_point(spawn);
            world.spawn_seeker(SeekerKind::Devil, at);
        }

        let (gx, gy) = world.path_finder.grid_size();
        log::info!(
            "World started: {}x{} tiles, {} zombies, {} devils, {} colliders, path grid {}x{}, quadtree root {:?}",
            world.map.columns(),
            world.map.rows(),
            zombies,
            devils,
            world.colliders.len(),
            gx,
            gy,
            root
        );
        Ok(world)
    }

    fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// A random open tile away from `avoid`, jittered inside the tile
    fn random_spawn_point(&mut self, avoid: Vec2) -> Vec2 {
        let open: Vec<Vec2> = (0..self.map.rows())
            .flat_map(|r| (0..self.map.columns()).map(move |c| (r, c)))
            .filter(|&(r, c)| self.map.is_open(r, c))
            .map(|(r, c)| self.map.tile_center(r, c))
            .collect();
        let far: Vec<Vec2> = open
            .iter()
            .copied()
            .filter(|p| p.distance(avoid) >= SPAWN_CLEARANCE)
            .collect();
        let pool = if far.is_empty() { &open } else { &far };
        if pool.is_empty() {
            return avoid;
        }

        let center = pool[self.rng.random_range(0..pool.len())];
        let jitter = Vec2::new(self.map.tile_width(), self.map.tile_height()) / 4.0;
        center
            + Vec2::new(
                self.rng.random_range(-jitter.x..=jitter.x),
                self.rng.random_range(-jitter.y..=jitter.y),
            )
    }

    // === Spawning ===

    pub fn spawn_seeker(&mut self, kind: SeekerKind, position: Vec2) -> EntityId {
        let id = self.next_id();
        let settings = match kind {
            SeekerKind::Zombie => &self.settings.zombie,
            SeekerKind::Devil => &self.settings.devil,
        };
        let seeker = Seeker::spawn(id, kind, settings, &mut self.colliders, position);
        self.owners.insert(seeker.collider(), Owner::Seeker(id));
        self.seekers.push(seeker);
        id
    }

    pub fn spawn_bullet(&mut self, x: f32, y: f32, angle: f32) -> &Bullet {
        let id = self.next_id();
        let bullet = Bullet::spawn(id, &self.settings.bullet, &mut self.colliders, Vec2::new(x, y), angle);
        self.owners.insert(bullet.collider(), Owner::Bullet(id));
        let idx = self.bullets.len();
        self.bullets.push(bullet);
        &self.bullets[idx]
    }

    pub fn spawn_grenade(&mut self, x: f32, y: f32, angle: f32) -> &Grenade {
        let id = self.next_id();
        let grenade = Grenade::spawn(
            id,
            &self.settings.grenade,
            &mut self.colliders,
            Vec2::new(x, y),
            angle,
            self.clock_ms,
        );
        self.owners.insert(grenade.collider(), Owner::Grenade(id));
        let idx = self.grenades.len();
        self.grenades.push(grenade);
        &self.grenades[idx]
    }

    fn fire(&mut self, shot: ShotRequest) {
        match shot.weapon {
            Weapon::Pistol => {
                self.spawn_bullet(shot.origin.x, shot.origin.y, shot.angle);
            }
            Weapon::GrenadeLauncher => {
                self.spawn_grenade(shot.origin.x, shot.origin.y, shot.angle);
            }
        }
    }

    // === Control ===

    /// Latch this frame's input. Pause and weapon-panel toggles fire on the press edge.
    pub fn set_input(&mut self, input: InputSnapshot) {
        let previous = std::mem::replace(&mut self.input, input);
        if input.just_pressed(&previous, Control::PauseGame) {
            if self.paused {
                self.play();
            } else {
                self.pause();
            }
        }
        if input.just_pressed(&previous, Control::ShowWeapons) {
            self.weapons_visible = !self.weapons_visible;
        }
        if !self.paused {
            let mouse_world = self.camera.screen_to_world(input.mouse.position);
            self.player.apply_input(&input, mouse_world);
        }
    }

    pub fn select_weapon(&mut self, weapon: Weapon) {
        self.player.set_weapon(weapon);
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Game paused at {:.0} ms", self.clock_ms);
        }
    }

    pub fn play(&mut self) {
        if self.paused {
            self.paused = false;
            log::info!("Game resumed at {:.0} ms", self.clock_ms);
        }
    }

    /// Tear everything down. The world is inert afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.ai_pool.shutdown();
        for seeker in self.seekers.drain(..) {
            seeker.dispose(&mut self.colliders);
        }
        for bullet in self.bullets.drain(..) {
            bullet.dispose(&mut self.colliders);
        }
        for grenade in self.grenades.drain(..) {
            grenade.dispose(&mut self.colliders);
        }
        self.player.dispose(&mut self.colliders);
        self.explosions.clear();
        self.owners.clear();
        self.disposed = true;
        log::info!("World disposed after {:.0} ms", self.clock_ms);
    }

    fn is_simulating(&self) -> bool {
        !self.paused && !self.disposed && !self.game_over
    }

    // === Fixed tick ===

    /// Forces, physics step, contact handling, clock
    pub fn fixed_update(&mut self, dt: f32) {
        if !self.is_simulating() {
            return;
        }

        if let Err(e) = self.player.fixed_update(&mut self.colliders, self.clock_ms) {
            log_entity_error("player fixed_update", e);
        }
        for seeker in &mut self.seekers {
            if let Err(e) = seeker.fixed_update(&mut self.colliders) {
                log_entity_error("seeker fixed_update", e);
            }
        }
        for grenade in &mut self.grenades {
            if let Err(e) = grenade.fixed_update(&mut self.colliders) {
                log_entity_error("grenade fixed_update", e);
            }
        }

        self.colliders.fixed_update(dt);
        self.handle_contacts();
        self.clock_ms += f64::from(dt) * 1000.0;
    }

    fn is_map_geometry(&self, id: ColliderId) -> bool {
        self.colliders
            .get(id)
            .is_some_and(|c| matches!(c.group, CollisionGroup::MapTiles | CollisionGroup::MapBounds))
    }

    fn handle_contacts(&mut self) {
        let contacts = self.colliders.contacts().to_vec();
        for contact in contacts {
            let a = self.owners.get(&contact.a).copied();
            let b = self.owners.get(&contact.b).copied();
            match (a, b) {
                (Some(Owner::Bullet(bullet)), Some(Owner::Seeker(seeker)))
                | (Some(Owner::Seeker(seeker)), Some(Owner::Bullet(bullet))) => self.bullet_hit(bullet, seeker),
                (Some(Owner::Player), Some(Owner::Seeker(seeker))) | (Some(Owner::Seeker(seeker)), Some(Owner::Player)) => {
                    self.seeker_attack(seeker)
                }
                (Some(Owner::Bullet(bullet)), None) if self.is_map_geometry(contact.b) => self.bullet_blocked(bullet),
                (None, Some(Owner::Bullet(bullet))) if self.is_map_geometry(contact.a) => self.bullet_blocked(bullet),
                _ => {}
            }
        }
    }

    fn bullet_hit(&mut self, bullet: EntityId, seeker: EntityId) {
        let Some(bullet) = self.bullets.iter_mut().find(|b| b.id() == bullet) else {
            return;
        };
        let Some(seeker) = self.seekers.iter_mut().find(|s| s.id() == seeker) else {
            return;
        };
        if seeker.is_dead() {
            return;
        }
        if let Some(damage) = bullet.hit(seeker.id()) {
            seeker.health_mut().damage(damage);
        }
    }

    fn bullet_blocked(&mut self, bullet: EntityId) {
        if let Some(bullet) = self.bullets.iter_mut().find(|b| b.id() == bullet) {
            bullet.hit_wall();
        }
    }

    fn seeker_attack(&mut self, seeker: EntityId) {
        let now = self.clock_ms;
        let Some(seeker) = self.seekers.iter_mut().find(|s| s.id() == seeker) else {
            return;
        };
        if seeker.is_dead() {
            return;
        }
        if let Some(damage) = seeker.try_attack(now) {
            if self.player.health_mut().damage(damage) {
                self.game_over = true;
                log::info!("Player died at {:.0} ms", now);
            }
        }
    }

    // === Variable update ===

    /// AI results, shooting, camera, AI planning, projectile lifetimes, cleanup
    pub fn update(&mut self, _dt: f32) {
        if !self.is_simulating() {
            return;
        }
        let now = self.clock_ms;

        self.drain_ai_results();

        match self.player.update(&self.colliders, now) {
            Ok(Some(shot)) => self.fire(shot),
            Ok(None) => {}
            Err(e) => log_entity_error("player update", e),
        }

        self.camera.move_to(self.player.render_anchor());
        self.camera.zoom_to(self.settings.camera.view_width);

        self.plan_seekers(now);
        self.update_bullets();
        self.update_grenades(now);
        self.explosions.retain(|e| !e.is_finished(now));
        self.remove_dead_seekers();

        self.map.set_viewport(self.camera.viewport());
    }

    fn drain_ai_results(&mut self) {
        for result in self.ai_results.try_iter() {
            match self.seekers.iter_mut().find(|s| s.id() == result.seeker) {
                Some(seeker) => seeker.apply(result.outcome),
                None => log::trace!("dropping AI result for disposed seeker {:?}", result.seeker),
            }
        }
    }

    fn plan_seekers(&mut self, now: f64) {
        let target = match self.player.position(&self.colliders) {
            Ok(p) => p,
            Err(e) => {
                log_entity_error("seeker planning", e);
                return;
            }
        };

        let mut requests = Vec::new();
        for seeker in &mut self.seekers {
            match seeker.plan(&self.colliders, target, now) {
                Ok(r) => requests.extend(r),
                Err(e) => log_entity_error("seeker update", e),
            }
        }
        if requests.is_empty() {
            return;
        }

        let crowd = if requests.iter().any(|r| matches!(r, AiRequest::Path { .. })) {
            Arc::new(self.crowd_snapshot())
        } else {
            Arc::new(Crowd::default())
        };
        for request in requests {
            let walls = Arc::clone(&self.walls);
            let path_finder = Arc::clone(&self.path_finder);
            let crowd = Arc::clone(&crowd);
            let sender = self.ai_sender.clone();
            self.ai_pool.submit(move || {
                let result = request.run(&walls, &path_finder, &crowd);
                if sender.try_send(result).is_err() {
                    log::trace!("AI result channel full or closed, dropping result");
                }
            });
        }
    }

    /// Seeker bodies as path obstacles for this planning round
    fn crowd_snapshot(&self) -> Crowd {
        let mut crowd = Crowd::new(self.settings.world.crowd_avoid_range);
        if self.settings.world.crowd_avoid_range <= 0.0 {
            return crowd;
        }
        for seeker in &self.seekers {
            if let Some(collider) = self.colliders.get(seeker.collider()) {
                crowd.push(seeker.id(), Obstacle::from_collider(collider));
            }
        }
        crowd
    }

    fn update_bullets(&mut self) {
        let mut i = 0;
        while i < self.bullets.len() {
            let live = match self.bullets[i].update(&self.colliders) {
                Ok(live) => live,
                Err(e) => {
                    log_entity_error("bullet update", e);
                    false
                }
            };
            if live {
                i += 1;
                continue;
            }
            let bullet = self.bullets.remove(i);
            self.owners.remove(&bullet.collider());
            bullet.dispose(&mut self.colliders);
        }
    }

    fn update_grenades(&mut self, now: f64) {
        let mut i = 0;
        while i < self.grenades.len() {
            if !self.grenades[i].should_detonate(now) {
                i += 1;
                continue;
            }
            let mut grenade = self.grenades.remove(i);
            self.owners.remove(&grenade.collider());
            match grenade.detonate(&mut self.colliders) {
                Ok((center, caught)) => {
                    for id in caught {
                        let Some(Owner::Seeker(victim)) = self.owners.get(&id).copied() else {
                            continue;
                        };
                        if !grenade.mark(victim) {
                            continue;
                        }
                        if let Some(seeker) = self.seekers.iter_mut().find(|s| s.id() == victim) {
                            seeker.health_mut().damage(grenade.damage());
                        }
                    }
                    self.explosions.push(Explosion::new(
                        center,
                        grenade.aoe(),
                        now,
                        self.settings.grenade.explosion_lifetime_ms,
                    ));
                }
                Err(e) => log_entity_error("grenade detonation", e),
            }
            grenade.dispose(&mut self.colliders);
        }
    }

    fn remove_dead_seekers(&mut self) {
        let mut i = 0;
        while i < self.seekers.len() {
            if !self.seekers[i].is_dead() {
                i += 1;
                continue;
            }
            let seeker = self.seekers.remove(i);
            self.owners.remove(&seeker.collider());
            seeker.dispose(&mut self.colliders);
            log::debug!("{:?} {:?} died", seeker.kind(), seeker.id());
        }
    }

    // === Render ===

    /// Draw the frame. `alpha` is the fraction of a step since the last tick.
    pub fn render(&self, surface: &mut dyn RenderSurface, alpha: f32) -> SetupResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.camera.begin(surface);
        let drawn = self.render_world(surface, alpha);
        self.camera.end(surface);
        drawn?;

        self.render_overlay(surface);
        Ok(())
    }

    fn render_world(&self, surface: &mut dyn RenderSurface, alpha: f32) -> SetupResult<()> {
        self.map.render(surface)?;
        let step = self.settings.game_loop.step as f32;

        let mut actors: Vec<(f32, &dyn Entity)> = Vec::with_capacity(self.seekers.len() + 1);
        for entity in std::iter::once(&self.player as &dyn Entity).chain(self.seekers.iter().map(|s| s as &dyn Entity)) {
            if let Ok(p) = entity.position(&self.colliders) {
                if self.camera.is_in_viewport(p, RENDER_DISTANCE_OFFSET) {
                    actors.push((p.y, entity));
                }
            }
        }
        actors.sort_by(|a, b| a.0.total_cmp(&b.0));

        let projectiles = self
            .bullets
            .iter()
            .map(|b| b as &dyn Entity)
            .chain(self.grenades.iter().map(|g| g as &dyn Entity));
        for entity in actors.into_iter().map(|(_, e)| e).chain(projectiles) {
            if let Err(e) = entity.render(&self.colliders, surface, alpha, step) {
                log_entity_error("render", e);
            }
        }

        for explosion in &self.explosions {
            explosion.render(surface, self.clock_ms);
        }
        Ok(())
    }

    fn render_overlay(&self, surface: &mut dyn RenderSurface) {
        let health = self.player.health();
        let bar = Bounds::new(16.0, 16.0, 200.0, 10.0);
        surface.fill_rect(bar, HEALTH_BAR_BACK);
        surface.fill_rect(Bounds::new(bar.x, bar.y, bar.w * health.fraction(), bar.h), HEALTH_BAR_FRONT);

        if self.weapons_visible {
            let screen = self.camera.screen_size();
            let panel = Bounds::new(screen.x / 2.0 - 64.0, screen.y - 80.0, 128.0, 64.0);
            surface.draw_image("weapons", None, panel);
            let label = match self.player.weapon() {
                Weapon::Pistol => "Pistol",
                Weapon::GrenadeLauncher => "Grenade launcher",
            };
            surface.fill_text(label, Vec2::new(panel.x, panel.y - 8.0), WHITE);
        }
    }

    // === Accessors ===

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn seekers(&self) -> &[Seeker] {
        &self.seekers
    }

    pub fn zombies(&self) -> impl Iterator<Item = &Seeker> {
        self.seekers.iter().filter(|s| s.kind() == SeekerKind::Zombie)
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn grenades(&self) -> &[Grenade] {
        &self.grenades
    }

    /// Bullets and grenades together
    pub fn projectiles(&self) -> impl Iterator<Item = &dyn Entity> {
        self.bullets
            .iter()
            .map(|b| b as &dyn Entity)
            .chain(self.grenades.iter().map(|g| g as &dyn Entity))
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn collider_world(&self) -> &ColliderWorld {
        &self.colliders
    }

    pub fn quadtree(&self) -> &Quadtree<ColliderId> {
        self.colliders.quadtree()
    }

    pub fn path_finder(&self) -> &PathFinder {
        &self.path_finder
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn weapons_visible(&self) -> bool {
        self.weapons_visible
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STEP;
    use crate::game::map::TileLocation;
    use crate::game::render::DrawRecorder;
    use crate::sim::Shape;

    fn open_map() -> TileMap {
        let mut map = TileMap::new(32.0, 32.0);
        map.set_tile_sheet("sheet");
        map.register_tile("g", TileLocation::new(0, 0), 0);
        map.register_tile("w", TileLocation::new(1, 0), 0);
        map.register_collider_to_tile("w", Collider::with_shape(Shape::rect(32.0, 32.0)))
            .unwrap();
        let row = vec!["g"; 12].join(" ");
        let text = vec![row; 12].join("\n");
        map.set_matrix_str(&text, " ").unwrap();
        map
    }

    fn quiet_settings() -> Settings {
        let mut settings = Settings::default();
        settings.world.zombie_count = 0;
        settings.world.devil_count = 0;
        settings.world.worker_threads = 0;
        settings
    }

    fn player_pos(world: &World) -> Vec2 {
        world.player().position(world.collider_world()).unwrap()
    }

    fn tick(world: &mut World, n: usize) {
        for _ in 0..n {
            world.fixed_update(STEP);
        }
    }

    #[test]
    fn test_city_world_setup() {
        let mut settings = Settings::default();
        settings.world.worker_threads = 0;
        settings.world.zombie_count = 10;
        let world = World::new(settings, TileMap::city().unwrap()).unwrap();

        assert_eq!(world.zombies().count(), 10);
        assert_eq!(world.seekers().len(), 11);

        let tiles = world.map().placed_colliders().len();
        assert_eq!(world.collider_world().len(), tiles + 1 + 11);

        // Everything spawned inside the map, off the buildings
        let extent = world.map().extent();
        for seeker in world.seekers() {
            let p = seeker.position(world.collider_world()).unwrap();
            assert!(extent.contains_point(p));
        }
        let spawn = player_pos(&world);
        let (r, c) = (
            ((spawn.y - extent.y) / 32.0) as usize,
            ((spawn.x - extent.x) / 32.0) as usize,
        );
        assert!(world.map().is_open(r, c));
    }

    #[test]
    fn test_missing_tile_sheet_is_fatal() {
        let mut map = TileMap::new(32.0, 32.0);
        map.register_tile("g", TileLocation::new(0, 0), 0);
        map.set_matrix_str("g g\ng g", " ").unwrap();
        assert!(matches!(World::new(quiet_settings(), map), Err(SetupError::MissingTileSheet)));
    }

    #[test]
    fn test_pause_toggles_on_press_edge() {
        let mut world = World::new(quiet_settings(), open_map()).unwrap();
        tick(&mut world, 6);
        let clock = world.clock_ms();
        assert!((clock - 100.0).abs() < 1e-3);

        let pause = InputSnapshot::new().with(Control::PauseGame);
        world.set_input(pause);
        assert!(world.is_paused());
        // Still held: no second toggle
        world.set_input(pause);
        assert!(world.is_paused());

        tick(&mut world, 6);
        world.update(STEP);
        assert_eq!(world.clock_ms(), clock);

        world.set_input(InputSnapshot::new());
        world.set_input(pause);
        assert!(!world.is_paused());
        tick(&mut world, 1);
        assert!(world.clock_ms() > clock);
    }

    #[test]
    fn test_show_weapons_toggle() {
        let mut world = World::new(quiet_settings(), open_map()).unwrap();
        world.set_input(InputSnapshot::new().with(Control::ShowWeapons));
        assert!(world.weapons_visible());
        world.set_input(InputSnapshot::new());
        world.set_input(InputSnapshot::new().with(Control::ShowWeapons));
        assert!(!world.weapons_visible());
    }

    #[test]
    fn test_bullet_damages_seeker_once_then_dies_off() {
        let mut world = World::new(quiet_settings(), open_map()).unwrap();
        let p = player_pos(&world);
        let zombie = world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(60.0, 0.0));
        world.spawn_bullet(p.x + 20.0, p.y, 0.0);

        tick(&mut world, 10);
        let seeker = world.seekers().iter().find(|s| s.id() == zombie).unwrap();
        assert_eq!(seeker.health().current(), 70.0);

        world.update(STEP);
        assert!(world.bullets().is_empty());
    }

    #[test]
    fn test_dead_seekers_are_removed() {
        let mut settings = quiet_settings();
        settings.zombie.health = 20.0;
        let mut world = World::new(settings, open_map()).unwrap();
        let p = player_pos(&world);
        world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(60.0, 0.0));
        world.spawn_bullet(p.x + 20.0, p.y, 0.0);
        let before = world.collider_world().len();

        tick(&mut world, 10);
        world.update(STEP);
        assert!(world.seekers().is_empty());
        assert_eq!(world.collider_world().len(), before - 2);
    }

    #[test]
    fn test_contact_damage_and_game_over() {
        let mut settings = quiet_settings();
        settings.player.max_health = 2.0;
        let mut world = World::new(settings, open_map()).unwrap();
        let p = player_pos(&world);
        world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(6.0, 0.0));

        tick(&mut world, 1);
        assert_eq!(world.player().health().current(), 1.0);
        assert!(!world.is_game_over());

        // Keep them touching until the attack cooldown passes again
        for _ in 0..60 {
            let p = player_pos(&world);
            if let Some(s) = world.seekers.first() {
                let id = s.collider();
                if let Some(c) = world.colliders.get_mut(id) {
                    c.position = p + Vec2::new(6.0, 0.0);
                    c.velocity = Vec2::ZERO;
                }
            }
            tick(&mut world, 1);
        }
        assert!(world.is_game_over());
        let clock = world.clock_ms();
        tick(&mut world, 5);
        assert_eq!(world.clock_ms(), clock);
    }

    #[test]
    fn test_seekers_receive_inline_ai_results() {
        let mut world = World::new(quiet_settings(), open_map()).unwrap();
        let p = player_pos(&world);
        let id = world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(100.0, 0.0));

        world.update(STEP);
        tick(&mut world, 1);
        world.update(STEP);

        let seeker = world.seekers().iter().find(|s| s.id() == id).unwrap();
        assert!(seeker.is_path_clear());
        assert!(!seeker.path().is_empty());
    }

    fn planned_path_cells(settings: Settings) -> (Vec<crate::sim::Cell>, crate::sim::Cell) {
        let mut world = World::new(settings, open_map()).unwrap();
        let p = player_pos(&world);
        let runner = world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(160.0, 0.0));
        let blocker_at = p + Vec2::new(128.0, 0.0);
        world.spawn_seeker(SeekerKind::Zombie, blocker_at);

        world.update(STEP);
        world.update(STEP);

        let seeker = world.seekers().iter().find(|s| s.id() == runner).unwrap();
        let pf = world.path_finder();
        let cells = seeker.path().iter().map(|w| pf.cell_of(*w)).collect();
        (cells, pf.cell_of(blocker_at))
    }

    #[test]
    fn test_paths_bend_around_nearby_seekers() {
        let (cells, blocker) = planned_path_cells(quiet_settings());
        assert!(!cells.is_empty());
        assert!(!cells.contains(&blocker), "path {cells:?} runs through {blocker:?}");

        let mut settings = quiet_settings();
        settings.world.crowd_avoid_range = 0.0;
        let (cells, blocker) = planned_path_cells(settings);
        assert!(cells.contains(&blocker));
    }

    #[test]
    fn test_grenade_detonates_and_damages() {
        let mut settings = quiet_settings();
        settings.grenade.speed = 0.0;
        let mut world = World::new(settings, open_map()).unwrap();
        let p = player_pos(&world);
        let zombie = world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(40.0, 0.0));
        world.spawn_grenade(p.x + 20.0, p.y, 0.0);

        tick(&mut world, 61);
        world.update(STEP);

        assert!(world.grenades().is_empty());
        assert_eq!(world.explosions().len(), 1);
        let seeker = world.seekers().iter().find(|s| s.id() == zombie).unwrap();
        assert_eq!(seeker.health().current(), 20.0);
    }

    #[test]
    fn test_render_sorts_actors_by_y() {
        let mut world = World::new(quiet_settings(), open_map()).unwrap();
        let p = player_pos(&world);
        world.spawn_seeker(SeekerKind::Zombie, p + Vec2::new(0.0, 40.0));
        world.spawn_seeker(SeekerKind::Devil, p + Vec2::new(0.0, -40.0));

        let mut surface = DrawRecorder::new();
        world.render(&mut surface, 0.0).unwrap();
        let actors: Vec<&str> = surface
            .images()
            .filter(|i| ["player", "zombie", "devil"].contains(i))
            .collect();
        assert_eq!(actors, vec!["devil", "player", "zombie"]);
        assert!(surface.images().next() == Some("sheet"));
    }

    #[test]
    fn test_dispose_unregisters_everything() {
        let mut settings = quiet_settings();
        settings.world.zombie_count = 5;
        let mut world = World::new(settings, open_map()).unwrap();
        let walls = world.map().placed_colliders().len();
        world.dispose();
        assert!(world.is_disposed());
        assert_eq!(world.collider_world().len(), walls);
        assert!(world.seekers().is_empty());
    }
}
