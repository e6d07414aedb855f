//! Headless demo: runs the city map with scripted input and logs what happens.
//!
//! Usage: `horde [settings.json]`. Log level comes from `RUST_LOG` (default `info`).

use std::time::{Duration, Instant};

use glam::Vec2;
use horde::game::{Control, DrawRecorder, Entity, InputSnapshot, TileMap, Weapon};
use horde::{Game, SetupError, SetupResult, Settings};

const DEMO_SECONDS: u32 = 20;
const FRAME_RATE: f64 = 60.0;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Scripted controls for one frame: strafe in a square, dash now and then,
/// and keep shooting at the closest seeker.
fn scripted_input(game: &Game, frame: u32) -> InputSnapshot {
    let seconds = frame as f64 / FRAME_RATE;
    let mut input = InputSnapshot::new();
    let direction = match (seconds as u32 / 2) % 4 {
        0 => Control::MoveRight,
        1 => Control::MoveDown,
        2 => Control::MoveLeft,
        _ => Control::MoveUp,
    };
    input.set(direction, true);
    input.set(Control::Dash, frame % 180 == 0);

    let Some(world) = game.world() else {
        return input;
    };
    let Ok(me) = world.player().position(world.collider_world()) else {
        return input;
    };
    let closest = world
        .seekers()
        .iter()
        .filter_map(|s| s.position(world.collider_world()).ok())
        .min_by(|a, b| a.distance_squared(me).total_cmp(&b.distance_squared(me)));
    match closest {
        Some(target) => input.with_mouse(world.camera().world_to_screen(target), true),
        None => input.with_mouse(world.camera().world_to_screen(me + Vec2::X), false),
    }
}

fn wait_for_world(game: &mut Game) -> SetupResult<()> {
    let started = Instant::now();
    while !game.poll_start()? {
        if started.elapsed() > LOAD_TIMEOUT {
            return Err(SetupError::InitAborted);
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    log::info!("World loaded in {:.1} ms", started.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

fn run() -> SetupResult<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let mut game = Game::new(settings)?;
    if !game.start_async(TileMap::city()?) {
        return Err(SetupError::InitAborted);
    }
    wait_for_world(&mut game)?;

    let mut surface = DrawRecorder::new();
    let total_frames = DEMO_SECONDS * FRAME_RATE as u32;
    for frame in 0..=total_frames {
        if frame == total_frames / 2 {
            if let Some(world) = game.world_mut() {
                world.select_weapon(Weapon::GrenadeLauncher);
                log::info!("Switched to grenade launcher");
            }
        }

        let input = scripted_input(&game, frame);
        surface.clear();
        game.frame(frame as f64 / FRAME_RATE, input, &mut surface)?;

        let Some(world) = game.world() else {
            break;
        };
        if frame % FRAME_RATE as u32 == 0 {
            log::info!(
                "t={:>6.0} ms fps={} seekers={} bullets={} grenades={} hp={} draws={}",
                world.clock_ms(),
                game.game_loop().fps(),
                world.seekers().len(),
                world.bullets().len(),
                world.grenades().len(),
                world.player().health().current(),
                surface.commands().len()
            );
        }
        if world.is_game_over() {
            log::info!("Game over after {:.1} s", world.clock_ms() / 1000.0);
            break;
        }
    }

    game.reset();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Horde headless demo starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
