//! Game session: the frame loop wrapped around a world, plus world startup
//! (inline or on a one-slot background queue)

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use glam::Vec2;

use super::input::InputSnapshot;
use super::map::TileMap;
use super::render::{FPS_GREEN, RenderSurface};
use super::world::World;
use crate::error::{SetupError, SetupResult};
use crate::settings::Settings;
use crate::sim::{FrameHandler, GameLoop, WorkerPool};

const FPS_TEXT_POSITION: Vec2 = Vec2::new(10.0, 20.0);

/// Routes loop phases to the world for one frame
struct FrameAdapter<'a> {
    world: &'a mut World,
    surface: &'a mut dyn RenderSurface,
    render_error: Option<SetupError>,
}

impl FrameHandler for FrameAdapter<'_> {
    fn fixed_update(&mut self, dt: f32) {
        self.world.fixed_update(dt);
    }

    fn update(&mut self, dt: f32) {
        self.world.update(dt);
    }

    fn render(&mut self, alpha: f32) {
        if let Err(e) = self.world.render(self.surface, alpha) {
            self.render_error = Some(e);
        }
    }
}

pub struct Game {
    settings: Settings,
    world: Option<World>,
    game_loop: GameLoop,
    init_pool: WorkerPool,
    pending: Option<Receiver<SetupResult<World>>>,
}

impl Game {
    pub fn new(settings: Settings) -> SetupResult<Self> {
        settings.validate()?;
        let game_loop = GameLoop::new(settings.game_loop.step, settings.game_loop.fps_window);
        Ok(Self {
            settings,
            world: None,
            game_loop,
            init_pool: WorkerPool::new("init", 1, 1)?,
            pending: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.world.as_mut()
    }

    pub fn game_loop(&self) -> &GameLoop {
        &self.game_loop
    }

    pub fn is_starting(&self) -> bool {
        self.pending.is_some()
    }

    fn install(&mut self, world: World) {
        self.world = Some(world);
        self.game_loop.start();
    }

    /// Build the world on this thread and start the loop
    pub fn start_sync(&mut self, map: TileMap) -> SetupResult<()> {
        self.reset();
        let world = World::new(self.settings.clone(), map)?;
        self.install(world);
        Ok(())
    }

    /// Queue world construction on the init worker.
    /// Returns false if a start is already in flight.
    pub fn start_async(&mut self, map: TileMap) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.reset();

        let (sender, receiver) = bounded(1);
        let settings = self.settings.clone();
        let queued = self.init_pool.submit(move || {
            let result = World::new(settings, map);
            if sender.send(result).is_err() {
                log::debug!("world finished loading after the session stopped waiting");
            }
        });
        if queued {
            self.pending = Some(receiver);
        }
        queued
    }

    /// Check on a queued start. Ok(true) once a world is running.
    pub fn poll_start(&mut self) -> SetupResult<bool> {
        let Some(receiver) = &self.pending else {
            return Ok(self.world.is_some());
        };
        match receiver.try_recv() {
            Ok(result) => {
                self.pending = None;
                self.install(result?);
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                Err(SetupError::InitAborted)
            }
        }
    }

    /// Drop the current world and stop the loop
    pub fn reset(&mut self) {
        if let Some(mut world) = self.world.take() {
            world.dispose();
        }
        self.pending = None;
        self.game_loop.stop();
    }

    pub fn pause(&mut self) {
        if let Some(world) = &mut self.world {
            world.pause();
        }
    }

    pub fn play(&mut self) {
        if let Some(world) = &mut self.world {
            world.play();
        }
    }

    /// Drive one display frame at `now` seconds. Returns the number of fixed
    /// ticks run.
    pub fn frame(&mut self, now: f64, input: InputSnapshot, surface: &mut dyn RenderSurface) -> SetupResult<u32> {
        if self.pending.is_some() {
            self.poll_start()?;
        }
        let Some(world) = &mut self.world else {
            return Ok(0);
        };

        world.set_input(input);
        let mut adapter = FrameAdapter {
            world,
            surface: &mut *surface,
            render_error: None,
        };
        let steps = self.game_loop.frame(now, &mut adapter);
        if let Some(e) = adapter.render_error {
            return Err(e);
        }

        surface.fill_text(&format!("FPS: {}", self.game_loop.fps()), FPS_TEXT_POSITION, FPS_GREEN);
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::game::map::TileLocation;
    use crate::game::render::{DrawCommand, DrawRecorder};

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.world.zombie_count = 3;
        settings.world.worker_threads = 0;
        settings
    }

    #[test]
    fn test_sync_start_and_frames() {
        let mut game = Game::new(settings()).unwrap();
        game.start_sync(TileMap::city().unwrap()).unwrap();
        assert!(game.world().is_some());

        let mut surface = DrawRecorder::new();
        assert_eq!(game.frame(0.0, InputSnapshot::new(), &mut surface).unwrap(), 0);
        let steps = game.frame(0.06, InputSnapshot::new(), &mut surface).unwrap();
        assert_eq!(steps, 3);

        let fps_drawn = surface
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCommand::Text { text, .. } if text.starts_with("FPS")));
        assert!(fps_drawn);
    }

    #[test]
    fn test_async_start_completes() {
        let mut game = Game::new(settings()).unwrap();
        assert!(game.start_async(TileMap::city().unwrap()));
        assert!(!game.start_async(TileMap::city().unwrap()));

        let deadline = Instant::now() + Duration::from_secs(10);
        while !game.poll_start().unwrap() {
            assert!(Instant::now() < deadline, "world never finished loading");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!game.is_starting());
        assert_eq!(game.world().unwrap().seekers().len(), 4);
    }

    #[test]
    fn test_async_start_reports_setup_errors() {
        let mut game = Game::new(settings()).unwrap();
        let mut map = TileMap::new(32.0, 32.0);
        map.register_tile(".", TileLocation::new(0, 0), 0);
        map.set_matrix_str(". .", " ").unwrap();
        assert!(game.start_async(map));

        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match game.poll_start() {
                Ok(false) => {
                    assert!(Instant::now() < deadline);
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(true) => panic!("world without a tile sheet should not start"),
                Err(e) => {
                    assert!(matches!(e, SetupError::MissingTileSheet));
                    break;
                }
            }
        }
    }

    #[test]
    fn test_reset_drops_world() {
        let mut game = Game::new(settings()).unwrap();
        game.start_sync(TileMap::city().unwrap()).unwrap();
        game.pause();
        assert!(game.world().unwrap().is_paused());
        game.reset();
        assert!(game.world().is_none());
        assert!(!game.game_loop().is_running());
    }
}
