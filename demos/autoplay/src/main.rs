//! Plays Snip the Vine without a player.
//!
//! A scripted finger drags across the scene just above the prize every
//! couple of seconds, cutting whatever vine it meets first. Outcomes are
//! logged as levels come and go.
//!
//! Usage: `autoplay [config.json] [seconds]`
//! Set `RUST_LOG=debug` to follow the cuts.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use snipvine::{
    Engine, GameConfig, InputSource, InputState, Outcome, PlayState, SceneDirector, Session, Vec2,
};

/// Drags from one side of the scene to the other in small steps.
struct ScriptedFinger {
    from: Vec2,
    to: Vec2,
    steps: u32,
    period: Duration,
    next_drag: Duration,
    step: Option<u32>,
}

impl ScriptedFinger {
    fn new(scene_size: Vec2, y: f32) -> Self {
        Self {
            from: Vec2::new(0.0, y),
            to: Vec2::new(scene_size.x, y),
            steps: 12,
            period: Duration::from_millis(1500),
            next_drag: Duration::from_millis(500),
            step: None,
        }
    }
}

impl InputSource for ScriptedFinger {
    fn poll(&mut self, now: Duration, input: &mut InputState) {
        match self.step {
            None if now >= self.next_drag => {
                input.touch_began(0, self.from);
                self.step = Some(1);
            }
            Some(step) if step <= self.steps => {
                let t = step as f32 / self.steps as f32;
                input.touch_moved(0, self.from.lerp(self.to, t));
                self.step = Some(step + 1);
            }
            Some(_) => {
                input.touch_ended(0);
                self.step = None;
                self.next_drag = now + self.period;
            }
            None => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GameConfig::load(&PathBuf::from(path))?,
        None => GameConfig::default(),
    };
    let seconds: u64 = match args.next() {
        Some(s) => s.parse().context("seconds must be a whole number")?,
        None => 20,
    };

    let layout = config.layout.clone();
    let drag_height = layout.prize_origin().y + layout.prize_size.y;
    let session = Session::new(config)?;

    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&outcomes);
    let first_level = PlayState::new(session)?.with_outcome_observer(move |outcome| {
        log::info!("level over: {outcome:?}");
        record.borrow_mut().push(outcome);
    });

    let mut director = SceneDirector::with_initial_state(Box::new(first_level));
    let mut finger = ScriptedFinger::new(layout.size, drag_height);

    let frames = Engine::new()
        .with_title("Snip the Vine (autoplay)")
        .with_max_frames(seconds * 60)
        .run(&mut director, &mut finger)?;

    let outcomes = outcomes.borrow();
    let won = outcomes.iter().filter(|o| **o == Outcome::Won).count();
    log::info!(
        "{} frames, {} levels played, {} won, {} lost",
        frames,
        director.presented(),
        won,
        outcomes.len() - won
    );
    Ok(())
}
