//! Snip the Vine - a small physics puzzle.
//!
//! A prize hangs from vines of pinned rigid segments. Swipes cut the vines;
//! the level is won when the prize lands in the crocodile and lost when it
//! falls in the water. Everything runs headless: input arrives as a gesture
//! stream and output leaves as presentation cues.

pub mod actions;
pub mod audio;
pub mod config;
pub mod crocodile;
pub mod cut;
pub mod engine;
pub mod input;
pub mod level;
pub mod math;
pub mod node;
pub mod physics;
pub mod play;
pub mod presentation;
pub mod scene;
pub mod state;
pub mod vine;
pub mod world;

pub use crate::audio::AudioSystem;
pub use crate::config::{GameConfig, SceneLayout};
pub use crate::engine::{Engine, EngineConfig, EngineContext, Game, InputSource};
pub use crate::input::{GestureEvent, InputState, Swipe};
pub use crate::level::{LevelDescriptor, LevelError, VineDescriptor};
pub use crate::math::Vec2;
pub use crate::physics::PhysicsWorld;
pub use crate::play::{PlayState, Session};
pub use crate::presentation::{Cue, Presentation};
pub use crate::scene::{GameScene, Outcome, Phase, SceneRequest};
pub use crate::state::{SceneDirector, State, Transitions};
pub use crate::world::{EntityId, World};
