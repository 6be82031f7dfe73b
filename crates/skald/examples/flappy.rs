//! Flappy: a headless run of the rule engine.
//!
//! A bird falls under a gravity event, flaps while ArrowUp is held (at most
//! ten times per level), bounces off the ground, and moves to the next
//! level once it has flown far enough. Input is scripted and collision
//! detection is a one-line ground check, standing in for a real platform
//! layer.
//!
//! Run with: `RUST_LOG=info cargo run -p skald --example flappy`

use skald::prelude::*;

const GROUND_Y: f64 = 100.0;
const FINISH_X: f64 = 60.0;

fn main() {
    env_logger::init();

    let game = Game::new("Flappy")
        .with_level(make_level("meadow", 2.0))
        .with_level(make_level("caves", 3.0));

    let mut engine = match Engine::builder(game).seed(2024).build() {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("could not start: {e}");
            return;
        }
    };

    for tick in 0..400 {
        // Flap for two ticks out of every twelve.
        if tick % 12 < 2 {
            engine.input_mut().press(KeyCode::ArrowUp);
        } else {
            engine.input_mut().release(KeyCode::ArrowUp);
        }
        detect_ground(&mut engine);

        let report = match engine.tick() {
            Ok(report) => report,
            Err(e) => {
                log::error!("tick {tick} failed: {e}");
                return;
            }
        };
        if let Some(transition) = report.transition {
            log::info!("tick {tick}: {transition:?}");
        }
        if tick % 20 == 0 {
            print_bird(&engine, tick);
        }
        if engine.is_over() {
            println!("{:?} after {} ticks", engine.status(), engine.tick_count());
            break;
        }
    }

    let path = std::env::temp_dir().join("skald_flappy.json");
    match skald::snapshot::save_to_file(engine.game(), &path) {
        Ok(()) => println!("final state written to {}", path.display()),
        Err(e) => log::warn!("could not save: {e}"),
    }
}

fn make_level(name: &str, next: f64) -> Level {
    let mut level = Level::new(name);
    level.spawn(
        Entity::new()
            .with(kinds::NAME, "flappy".to_string())
            .with(kinds::X_POSITION, 0.0)
            .with(kinds::Y_POSITION, 50.0)
            .with(kinds::X_VELOCITY, 1.0)
            .with(kinds::Y_VELOCITY, 0.0)
            .with(kinds::VALUE, 0.0)
            .with(kinds::PROGRESSION, false)
            .with(kinds::NEXT_LEVEL, next),
    );
    level.spawn(
        Entity::new()
            .with(kinds::NAME, "Ground".to_string())
            .with(kinds::Y_POSITION, GROUND_Y),
    );

    level.add_event(
        Event::named("flappy")
            .with_label("gravity")
            .with_condition(Condition::less_than(kinds::Y_VELOCITY, 6.0))
            .with_action(Action::number(ModifyType::Relative, 1.0, kinds::Y_VELOCITY)),
    );
    level.add_event(
        Event::named("flappy")
            .with_label("flap")
            .with_input(KeyCode::ArrowUp)
            .with_condition(Condition::less_than(kinds::VALUE, 10.0))
            .with_action(Action::number(ModifyType::Absolute, -5.0, kinds::Y_VELOCITY))
            .with_action(Action::number(ModifyType::Relative, 1.0, kinds::VALUE)),
    );
    level.add_event(
        Event::bounce(Direction::Bottom, "flappy", "Ground", false).with_label("bounce"),
    );
    level.add_event(
        Event::named("flappy")
            .with_label("finish")
            .with_condition(Condition::greater_than(kinds::X_POSITION, FINISH_X))
            .with_action(Action::set(kinds::PROGRESSION, true)),
    );
    level
}

/// Record a bottom contact when the bird reaches the ground.
fn detect_ground(engine: &mut Engine) {
    let Some(level) = engine.level_mut() else {
        return;
    };
    let (Some(bird), Some(ground)) = (
        level.entities().find_named("flappy"),
        level.entities().find_named("Ground"),
    ) else {
        return;
    };
    let bird_y = level.get(bird).and_then(|e| e.value(kinds::Y_POSITION).copied());
    if bird_y.is_some_and(|y| y >= GROUND_Y) {
        if let Err(e) = level.record_contact(bird, ground, Direction::Bottom) {
            log::warn!("contact not recorded: {e}");
        }
    }
}

fn print_bird(engine: &Engine, tick: u64) {
    let Some(level) = engine.level() else {
        return;
    };
    let Some(bird) = level.entities().find_named("flappy").and_then(|id| level.get(id)) else {
        return;
    };
    println!(
        "tick {tick:>3} [{}] x={:>5.1} y={:>5.1} vy={:>4.1} flaps={}",
        level.name(),
        bird.value(kinds::X_POSITION).copied().unwrap_or_default(),
        bird.value(kinds::Y_POSITION).copied().unwrap_or_default(),
        bird.value(kinds::Y_VELOCITY).copied().unwrap_or_default(),
        bird.value(kinds::VALUE).copied().unwrap_or_default(),
    );
}
