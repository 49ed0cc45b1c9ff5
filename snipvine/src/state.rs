use anyhow::Result;

use crate::engine::{EngineContext, Game};

/// Lets a state ask for the next one without holding the director.
pub trait Transitions {
    /// Replace the current state once this frame's update returns.
    fn present(&mut self, state: Box<dyn State>);

    /// Stop the engine once this frame's update returns.
    fn quit(&mut self);
}

/// A screen the director can present.
pub trait State {
    /// Called when this state becomes current.
    fn on_enter(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Called when this state is replaced.
    fn on_exit(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Update this state. Called every frame while it is current.
    fn update(&mut self, ctx: &mut EngineContext, transitions: &mut dyn Transitions) -> Result<()>;
}

/// Collects transition requests made during an update.
#[derive(Default)]
struct PendingTransitions {
    present: Option<Box<dyn State>>,
    quit: bool,
}

impl Transitions for PendingTransitions {
    fn present(&mut self, state: Box<dyn State>) {
        if self.present.is_some() {
            log::debug!("Presenting over a transition requested this frame");
        }
        self.present = Some(state);
    }

    fn quit(&mut self) {
        self.quit = true;
    }
}

/// Owns the current state and swaps it when asked.
///
/// Transitions are deferred until after the current update, so a state is
/// never dropped while it is running.
pub struct SceneDirector {
    current: Option<Box<dyn State>>,
    pending: PendingTransitions,
    presented: u64,
}

impl SceneDirector {
    pub fn new() -> Self {
        Self {
            current: None,
            pending: PendingTransitions::default(),
            presented: 0,
        }
    }

    /// Create a director with an initial state. It is entered in `init`.
    pub fn with_initial_state(initial: Box<dyn State>) -> Self {
        let mut director = Self::new();
        director.current = Some(initial);
        director
    }

    /// Present a state after the current update.
    pub fn present(&mut self, state: Box<dyn State>) {
        self.pending.present = Some(state);
    }

    pub fn has_state(&self) -> bool {
        self.current.is_some()
    }

    /// Number of states entered so far, the initial one included.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Apply pending transitions. Called by the engine after each update.
    pub fn apply_transitions(&mut self, ctx: &mut EngineContext) -> Result<()> {
        if std::mem::take(&mut self.pending.quit) {
            ctx.request_exit();
        }

        if let Some(mut next) = self.pending.present.take() {
            if let Some(mut old) = self.current.take() {
                old.on_exit(ctx)?;
            }
            next.on_enter(ctx)?;
            self.current = Some(next);
            self.presented += 1;
        }
        Ok(())
    }

    fn update_current(&mut self, ctx: &mut EngineContext) -> Result<()> {
        if let Some(state) = self.current.as_mut() {
            state.update(ctx, &mut self.pending)?;
        }
        Ok(())
    }

    fn enter_current(&mut self, ctx: &mut EngineContext) -> Result<()> {
        if let Some(state) = self.current.as_mut() {
            state.on_enter(ctx)?;
            self.presented += 1;
        }
        Ok(())
    }
}

impl Default for SceneDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for SceneDirector {
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
        self.enter_current(ctx)?;
        self.apply_transitions(ctx)
    }

    fn update(&mut self, ctx: &mut EngineContext) -> Result<()> {
        self.update_current(ctx)?;
        self.apply_transitions(ctx)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Scripted {
        name: &'static str,
        log: Log,
        frames: u32,
        next_after: Option<u32>,
    }

    impl Scripted {
        fn boxed(name: &'static str, log: &Log, next_after: Option<u32>) -> Box<dyn State> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
                frames: 0,
                next_after,
            })
        }
    }

    impl State for Scripted {
        fn on_enter(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            self.log.borrow_mut().push(format!("enter {}", self.name));
            Ok(())
        }

        fn on_exit(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            self.log.borrow_mut().push(format!("exit {}", self.name));
            Ok(())
        }

        fn update(&mut self, _ctx: &mut EngineContext, t: &mut dyn Transitions) -> Result<()> {
            self.frames += 1;
            self.log.borrow_mut().push(format!("update {}", self.name));
            if self.next_after == Some(self.frames) {
                t.present(Scripted::boxed("b", &self.log, None));
            }
            Ok(())
        }
    }

    #[test]
    fn presenting_replaces_the_state_after_the_update() {
        let log: Log = Rc::default();
        let mut director = SceneDirector::with_initial_state(Scripted::boxed("a", &log, Some(2)));
        let mut ctx = EngineContext::detached(Duration::from_millis(16));

        director.init(&mut ctx).unwrap();
        for _ in 0..3 {
            director.update(&mut ctx).unwrap();
        }

        assert_eq!(
            *log.borrow(),
            vec!["enter a", "update a", "update a", "exit a", "enter b", "update b"]
        );
        assert_eq!(director.presented(), 2);
    }

    struct Quitter;

    impl State for Quitter {
        fn update(&mut self, _ctx: &mut EngineContext, t: &mut dyn Transitions) -> Result<()> {
            t.quit();
            Ok(())
        }
    }

    #[test]
    fn quit_requests_engine_exit() {
        let mut director = SceneDirector::with_initial_state(Box::new(Quitter));
        let mut ctx = EngineContext::detached(Duration::from_millis(16));
        director.init(&mut ctx).unwrap();
        assert!(!ctx.exit_requested());
        director.update(&mut ctx).unwrap();
        assert!(ctx.exit_requested());
    }
}
