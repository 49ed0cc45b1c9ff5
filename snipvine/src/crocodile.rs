//! The crocodile's mouth: idle snapping, reopening on cuts, and the chomp.

use std::fmt;

/// Seconds between mouth steps of the chomp.
pub const CHOMP_STEP: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouthState {
    Open,
    Closed,
}

impl fmt::Display for MouthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouthState::Open => f.write_str("open"),
            MouthState::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Wait(f32),
    Set(MouthState),
}

/// Plays mouth scripts against the frame clock.
#[derive(Debug)]
pub struct Crocodile {
    mouth: MouthState,
    script: Vec<Step>,
    cursor: usize,
    repeat: bool,
    wait_left: Option<f32>,
    changes: Vec<MouthState>,
    rng: fastrand::Rng,
}

impl Crocodile {
    /// A crocodile with its mouth closed and no animation running.
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            mouth: MouthState::Closed,
            script: Vec::new(),
            cursor: 0,
            repeat: false,
            wait_left: None,
            changes: Vec::new(),
            rng,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(fastrand::Rng::with_seed(seed))
    }

    pub fn mouth(&self) -> MouthState {
        self.mouth
    }

    /// Whether a script is still running.
    pub fn is_animating(&self) -> bool {
        self.cursor < self.script.len() || (self.repeat && !self.script.is_empty())
    }

    /// Start the idle loop: wait, open, wait, close, forever. The wait is
    /// drawn once per call, between 2 and 4 seconds.
    pub fn animate_idle(&mut self) {
        let period = 2.0 + self.rng.f32() * 2.0;
        log::trace!("crocodile idle period {period:.2}s");
        self.run(
            vec![
                Step::Wait(period),
                Step::Set(MouthState::Open),
                Step::Wait(period),
                Step::Set(MouthState::Closed),
            ],
            true,
        );
    }

    /// A vine was cut: open up and restart the idle loop.
    pub fn open_after_cut(&mut self) {
        self.cancel();
        self.set(MouthState::Open);
        self.animate_idle();
    }

    /// The prize arrived: close, open, close with `delay` between steps.
    pub fn chomp(&mut self, delay: f32) {
        self.run(
            vec![
                Step::Set(MouthState::Closed),
                Step::Wait(delay),
                Step::Set(MouthState::Open),
                Step::Wait(delay),
                Step::Set(MouthState::Closed),
            ],
            false,
        );
    }

    /// Stop the running script. The mouth stays as it is.
    pub fn cancel(&mut self) {
        self.script.clear();
        self.cursor = 0;
        self.repeat = false;
        self.wait_left = None;
    }

    /// Run the script for `dt` seconds. Returns every mouth change since the
    /// last call, oldest first.
    pub fn advance(&mut self, dt: f32) -> Vec<MouthState> {
        let mut budget = dt.max(0.0);

        loop {
            if self.cursor >= self.script.len() {
                if self.repeat && !self.script.is_empty() {
                    self.cursor = 0;
                } else {
                    break;
                }
            }

            match self.script[self.cursor] {
                Step::Set(state) => {
                    self.set(state);
                    self.cursor += 1;
                }
                Step::Wait(duration) => {
                    let left = *self.wait_left.get_or_insert(duration);
                    if budget >= left {
                        budget -= left;
                        self.wait_left = None;
                        self.cursor += 1;
                    } else {
                        self.wait_left = Some(left - budget);
                        break;
                    }
                }
            }
        }

        std::mem::take(&mut self.changes)
    }

    fn run(&mut self, script: Vec<Step>, repeat: bool) {
        self.cancel();
        self.script = script;
        self.repeat = repeat;
    }

    fn set(&mut self, state: MouthState) {
        if self.mouth != state {
            self.mouth = state;
            self.changes.push(state);
        }
    }
}
