//! Scene graph records: what each entity looks like and what it is.

use crate::math::Vec2;
use crate::vine::VineId;

/// Sprite names understood by the presentation layer.
pub mod image {
    pub const BACKGROUND: &str = "Background";
    pub const WATER: &str = "Water";
    pub const VINE_TEXTURE: &str = "VineTexture";
    pub const VINE_HOLDER: &str = "VineHolder";
    pub const CROC_MOUTH_CLOSED: &str = "CrocMouthClosed";
    pub const CROC_MOUTH_OPEN: &str = "CrocMouthOpen";
    pub const PRIZE: &str = "Pineapple";
}

/// Draw order, back to front.
pub mod layer {
    pub const BACKGROUND: f32 = 0.0;
    pub const CROCODILE: f32 = 1.0;
    pub const VINE: f32 = 1.0;
    pub const PRIZE: f32 = 2.0;
    pub const FOREGROUND: f32 = 3.0;
}

/// Visual record of an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub image: &'static str,
    pub z: f32,
    pub size: Vec2,
    pub scale: f32,
    /// Center in scene units. Bodies in the physics world report their own.
    pub position: Vec2,
}

impl Node {
    pub fn new(image: &'static str, z: f32, size: Vec2) -> Self {
        Self {
            image,
            z,
            size,
            scale: 1.0,
            position: Vec2::ZERO,
        }
    }

    #[must_use]
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }
}

/// What an entity is in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Scenery,
    Prize,
    Crocodile,
    VineHolder(VineId),
    VineSegment(VineId),
}
