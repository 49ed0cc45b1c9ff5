//! Turning swipes into severed vines.

use crate::input::Swipe;
use crate::math::Vec2;
use crate::physics::PhysicsWorld;
use crate::vine::{VineId, VineSet};
use crate::world::EntityId;

/// A vine severed by a swipe.
#[derive(Clone, Debug, PartialEq)]
pub struct SeveredVine {
    pub vine: VineId,
    /// Where the swipe crossed the vine.
    pub at: Vec2,
    pub segments: Vec<EntityId>,
}

/// Decides which vines a swipe severs.
///
/// Each swipe step is cast through the physics world from its previous to its
/// current point; hits are visited nearest to the previous point first. Unless
/// multiple cuts are allowed, the first cut latches for the rest of the
/// gesture and every later hit is ignored until the next `gesture_began`.
#[derive(Debug, Clone, Default)]
pub struct CutDetector {
    allow_multiple_cuts: bool,
    cut_this_gesture: bool,
}

impl CutDetector {
    pub fn new(allow_multiple_cuts: bool) -> Self {
        Self {
            allow_multiple_cuts,
            cut_this_gesture: false,
        }
    }

    pub fn gesture_began(&mut self) {
        self.cut_this_gesture = false;
    }

    pub fn has_cut_this_gesture(&self) -> bool {
        self.cut_this_gesture
    }

    pub fn swipe(
        &mut self,
        swipe: Swipe,
        vines: &mut VineSet,
        physics: &mut PhysicsWorld,
    ) -> Vec<SeveredVine> {
        let mut severed = Vec::new();

        for hit in physics.cast_segment(swipe.previous, swipe.current) {
            if self.cut_this_gesture && !self.allow_multiple_cuts {
                break;
            }
            // Holders, the prize and the crocodile belong to no vine.
            let Some(vine) = vines.owner_of(hit.entity) else {
                continue;
            };
            let Some(segments) = vines.sever(vine, physics) else {
                continue;
            };
            self.cut_this_gesture = true;
            severed.push(SeveredVine {
                vine,
                at: hit.point,
                segments,
            });
        }

        severed
    }
}
