use std::time::Duration;

use anyhow::Result;

use crate::{audio::AudioSystem, input::InputState};

/// Configuration values for the engine loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub title: String,
    /// Length of one fixed simulation step.
    pub fixed_timestep: Duration,
    /// Simulated wall time between frames.
    pub frame_time: Duration,
    /// Stop after this many frames. Runs until exit is requested when unset.
    pub max_frames: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Snip the Vine".into(),
            fixed_timestep: Duration::from_secs_f64(1.0 / 60.0),
            frame_time: Duration::from_secs_f64(1.0 / 60.0),
            max_frames: None,
        }
    }
}

/// Feeds touches into the input state once per frame.
pub trait InputSource {
    /// `now` is the simulated time at the start of the frame.
    fn poll(&mut self, now: Duration, input: &mut InputState);
}

/// A source that never touches anything.
impl InputSource for () {
    fn poll(&mut self, _now: Duration, _input: &mut InputState) {}
}

/// Main entrypoint for running a game headlessly.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create a new engine instance with default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    #[must_use]
    pub fn with_fixed_timestep(mut self, step: Duration) -> Self {
        self.config.fixed_timestep = step;
        self
    }

    #[must_use]
    pub fn with_frame_time(mut self, frame: Duration) -> Self {
        self.config.frame_time = frame;
        self
    }

    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.config.max_frames = Some(frames);
        self
    }

    /// Run the game until it requests exit or the frame limit is reached.
    /// Returns the number of frames run.
    pub fn run<G: Game>(self, game: &mut G, source: &mut dyn InputSource) -> Result<u64> {
        self.run_with_audio(game, source, AudioSystem::new())
    }

    /// Like `run`, with an audio system supplied by the caller.
    pub fn run_with_audio<G: Game>(
        self,
        game: &mut G,
        source: &mut dyn InputSource,
        audio: AudioSystem,
    ) -> Result<u64> {
        let config = self.config;
        log::info!("Starting {}", config.title);

        let mut ctx = EngineContext::new(&config, audio);
        game.init(&mut ctx)?;

        let mut frames = 0;
        let result = loop {
            if config.max_frames.is_some_and(|max| frames >= max) || ctx.exit_requested {
                break Ok(frames);
            }

            source.poll(ctx.elapsed_time, &mut ctx.input);
            ctx.update_time(config.frame_time);

            if let Err(err) = game.update(&mut ctx) {
                log::error!("Encountered error during update: {err:?}");
                break Err(err);
            }
            frames += 1;
        };

        ctx.audio.shutdown();
        log::info!("{} stopped after {} frames", config.title, frames);
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared context provided to game code each frame.
pub struct EngineContext {
    delta_time: Duration,
    elapsed_time: Duration,
    fixed_delta_time: Duration,
    fixed_time_accumulator: Duration,
    exit_requested: bool,
    input: InputState,
    audio: AudioSystem,
}

impl EngineContext {
    fn new(config: &EngineConfig, audio: AudioSystem) -> Self {
        Self {
            delta_time: Duration::ZERO,
            elapsed_time: Duration::ZERO,
            fixed_delta_time: config.fixed_timestep,
            fixed_time_accumulator: Duration::ZERO,
            exit_requested: false,
            input: InputState::new(),
            audio,
        }
    }

    /// A context outside any engine loop, for driving games by hand.
    pub fn detached(fixed_delta_time: Duration) -> Self {
        let config = EngineConfig {
            fixed_timestep: fixed_delta_time,
            ..EngineConfig::default()
        };
        Self::new(&config, AudioSystem::unavailable())
    }

    /// Advance the clocks by one frame.
    pub fn update_time(&mut self, delta: Duration) {
        self.delta_time = delta;
        self.elapsed_time += delta;
        self.fixed_time_accumulator += delta;
    }

    /// Duration between the current and previous frames.
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Total time elapsed since the engine started running.
    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_time
    }

    /// Fixed timestep duration (1/60 second by default).
    pub fn fixed_delta_time(&self) -> Duration {
        self.fixed_delta_time
    }

    /// Check if a fixed timestep update should run and consume accumulated time.
    ///
    /// Call this in a loop until it returns `false` to handle multiple fixed
    /// updates per frame.
    pub fn should_run_fixed_update(&mut self) -> bool {
        if self.fixed_time_accumulator >= self.fixed_delta_time {
            self.fixed_time_accumulator -= self.fixed_delta_time;
            true
        } else {
            false
        }
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Request that the engine exit after the current frame.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Access the audio system for playing sounds and music.
    pub fn audio(&mut self) -> &mut AudioSystem {
        &mut self.audio
    }
}

/// Trait implemented by user code to hook into the engine lifecycle.
pub trait Game {
    /// Called once before the first frame.
    fn init(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Called once per frame.
    fn update(&mut self, ctx: &mut EngineContext) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::GestureEvent;
    use crate::math::Vec2;

    #[derive(Default)]
    struct Counter {
        inits: u32,
        frames: u32,
        fixed_steps: u32,
        gestures: usize,
        stop_after: Option<u32>,
    }

    impl Game for Counter {
        fn init(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            self.inits += 1;
            Ok(())
        }

        fn update(&mut self, ctx: &mut EngineContext) -> Result<()> {
            self.frames += 1;
            while ctx.should_run_fixed_update() {
                self.fixed_steps += 1;
            }
            self.gestures += ctx.input_mut().drain().len();
            if self.stop_after == Some(self.frames) {
                ctx.request_exit();
            }
            Ok(())
        }
    }

    struct TapOnce;

    impl InputSource for TapOnce {
        fn poll(&mut self, now: Duration, input: &mut InputState) {
            if now.is_zero() {
                input.touch_began(0, Vec2::ZERO);
                input.touch_ended(0);
            }
        }
    }

    #[test]
    fn runs_until_frame_limit() {
        let mut game = Counter::default();
        let frames = Engine::new()
            .with_max_frames(10)
            .run_with_audio(&mut game, &mut TapOnce, AudioSystem::unavailable())
            .unwrap();
        assert_eq!(frames, 10);
        assert_eq!(game.inits, 1);
        assert_eq!(game.frames, 10);
        assert_eq!(game.gestures, 2);
    }

    #[test]
    fn exit_request_stops_the_loop() {
        let mut game = Counter {
            stop_after: Some(3),
            ..Counter::default()
        };
        let frames = Engine::new()
            .with_max_frames(100)
            .run_with_audio(&mut game, &mut (), AudioSystem::unavailable())
            .unwrap();
        assert_eq!(frames, 3);
    }

    #[test]
    fn fixed_steps_follow_accumulated_time() {
        let mut game = Counter::default();
        Engine::new()
            .with_fixed_timestep(Duration::from_millis(10))
            .with_frame_time(Duration::from_millis(25))
            .with_max_frames(4)
            .run_with_audio(&mut game, &mut (), AudioSystem::unavailable())
            .unwrap();
        // 100 ms of frames at 10 ms per step.
        assert_eq!(game.fixed_steps, 10);
    }

    #[test]
    fn detached_context_queues_input() {
        let mut ctx = EngineContext::detached(Duration::from_millis(16));
        ctx.input_mut().push(GestureEvent::Began);
        assert_eq!(ctx.input().pending(), 1);
        assert!(!ctx.should_run_fixed_update());
        ctx.update_time(Duration::from_millis(16));
        assert!(ctx.should_run_fixed_update());
    }
}
