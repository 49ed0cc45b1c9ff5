//! The playing screen: drives a `GameScene` from the engine loop.

use std::rc::Rc;

use anyhow::Result;

use crate::config::GameConfig;
use crate::engine::EngineContext;
use crate::level::LevelDescriptor;
use crate::presentation::{AudioPresenter, Cue, Presentation, SoundBank};
use crate::scene::{GameScene, Outcome, Phase, SceneRequest};
use crate::state::{State, Transitions};

/// Settings shared by every level of a run.
#[derive(Debug)]
pub struct Session {
    pub config: GameConfig,
    pub level: LevelDescriptor,
    pub sounds: SoundBank,
}

impl Session {
    /// Load the level named by the config.
    pub fn new(config: GameConfig) -> Result<Rc<Self>> {
        let level = config.load_level()?;
        let sounds = SoundBank::in_dir(&config.asset_dir);
        Ok(Rc::new(Self {
            config,
            level,
            sounds,
        }))
    }
}

/// Plays one level. When the level is over it presents a fresh copy of itself.
pub struct PlayState {
    session: Rc<Session>,
    scene: GameScene,
    cues: Vec<Cue>,
    on_outcome: Option<Box<dyn FnMut(Outcome)>>,
}

impl PlayState {
    pub fn new(session: Rc<Session>) -> Result<Self> {
        let scene = GameScene::new(&session.config, &session.level)?;
        Ok(Self {
            session,
            scene,
            cues: Vec::new(),
            on_outcome: None,
        })
    }

    /// Call `f` with the outcome of every level played from here on.
    #[must_use]
    pub fn with_outcome_observer(mut self, f: impl FnMut(Outcome) + 'static) -> Self {
        self.on_outcome = Some(Box::new(f));
        self
    }

    pub fn scene(&self) -> &GameScene {
        &self.scene
    }

    fn flush_cues(&mut self, ctx: &mut EngineContext) {
        if self.cues.is_empty() {
            return;
        }
        let mut presenter = AudioPresenter::new(ctx.audio(), &self.session.sounds);
        for cue in self.cues.drain(..) {
            presenter.present(cue);
        }
    }
}

impl State for PlayState {
    fn on_enter(&mut self, ctx: &mut EngineContext) -> Result<()> {
        log::debug!("level started");
        if let Err(err) = ctx.audio().ensure_music_loop(&self.session.sounds.music) {
            log::debug!("background music not started: {err}");
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext, transitions: &mut dyn Transitions) -> Result<()> {
        let was_over = self.scene.is_level_over();

        let step = ctx.fixed_delta_time().as_secs_f32();
        while ctx.should_run_fixed_update() {
            self.scene.simulate(step, &mut self.cues);
        }

        let dt = ctx.delta_time().as_secs_f32();
        let request = self.scene.update(dt, &mut self.cues);

        for gesture in ctx.input_mut().drain() {
            self.scene.handle_gesture(gesture, &mut self.cues);
        }

        if !was_over {
            if let (Phase::LevelOver(outcome), Some(observer)) =
                (self.scene.phase(), self.on_outcome.as_mut())
            {
                observer(outcome);
            }
        }

        self.flush_cues(ctx);

        if let Some(SceneRequest::NextLevel(transition)) = request {
            log::debug!("next level ({transition:?})");
            let mut next = PlayState::new(Rc::clone(&self.session))?;
            next.on_outcome = self.on_outcome.take();
            transitions.present(Box::new(next));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use super::*;
    use crate::audio::AudioSystem;
    use crate::engine::{Engine, InputSource};
    use crate::input::InputState;
    use crate::math::Vec2;
    use crate::state::SceneDirector;

    /// Swipes across the whole scene at a few heights, on a fixed period.
    struct SlashAt {
        heights: Vec<f32>,
        every: Duration,
        next: Duration,
    }

    impl InputSource for SlashAt {
        fn poll(&mut self, now: Duration, input: &mut InputState) {
            if now < self.next {
                return;
            }
            self.next += self.every;
            for &y in &self.heights {
                input.touch_began(0, Vec2::new(0.0, y));
                input.touch_moved(0, Vec2::new(400.0, y));
                input.touch_ended(0);
            }
        }
    }

    fn session() -> Rc<Session> {
        let mut config = GameConfig::default().with_seed(5).with_multiple_cuts(true);
        config.layout.size = Vec2::new(400.0, 600.0);
        config.layout.crocodile_position = Vec2::new(0.0, 0.95);
        Session::new(config).unwrap()
    }

    #[test]
    fn lost_level_is_replaced_by_a_fresh_one() {
        let session = session();
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&outcomes);
        let state = PlayState::new(session)
            .unwrap()
            .with_outcome_observer(move |o| sink.borrow_mut().push(o));

        let mut director = SceneDirector::with_initial_state(Box::new(state));
        // Every bundled vine runs straight from a holder above y = 530 to the
        // attach point at y = 428, and the prize's top is at y = 460, so both
        // heights cross every vine and miss the prize.
        let mut source = SlashAt {
            heights: vec![500.0, 485.0],
            every: Duration::from_secs(4),
            next: Duration::from_millis(200),
        };
        Engine::new()
            .with_max_frames(60 * 7)
            .run_with_audio(&mut director, &mut source, AudioSystem::unavailable())
            .unwrap();

        assert_eq!(*outcomes.borrow(), vec![Outcome::Lost, Outcome::Lost]);
        assert!(director.presented() >= 2);
    }
}
