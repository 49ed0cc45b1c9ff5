use std::collections::{HashMap, VecDeque};

use crate::math::Vec2;

/// One step of a swipe, in scene coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Swipe {
    pub previous: Vec2,
    pub current: Vec2,
}

impl Swipe {
    pub fn new(previous: Vec2, current: Vec2) -> Self {
        Self { previous, current }
    }
}

/// A gesture event ready for the game.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureEvent {
    Began,
    /// Every touch that moved since the last event, one swipe step each.
    Moved(Vec<Swipe>),
    Ended,
}

/// Identifier of a touch (or pointer) reported by the platform.
pub type TouchId = u64;

/// Tracks active touches and turns their movement into gesture events.
///
/// Events are queued in arrival order and drained once per frame.
#[derive(Debug, Default)]
pub struct InputState {
    touches: HashMap<TouchId, Vec2>,
    queue: VecDeque<GestureEvent>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A touch went down. Every new touch begins a gesture, so a second
    /// finger may cut again after the first one already has.
    pub fn touch_began(&mut self, id: TouchId, at: Vec2) {
        if self.touches.insert(id, at).is_none() {
            self.queue.push_back(GestureEvent::Began);
        }
    }

    /// A touch moved. Unknown touches are ignored.
    pub fn touch_moved(&mut self, id: TouchId, to: Vec2) {
        let Some(last) = self.touches.get_mut(&id) else {
            log::trace!("move for unknown touch {id}");
            return;
        };
        let swipe = Swipe::new(*last, to);
        *last = to;

        // Coalesce with a move already queued for this frame.
        if let Some(GestureEvent::Moved(swipes)) = self.queue.back_mut() {
            swipes.push(swipe);
        } else {
            self.queue.push_back(GestureEvent::Moved(vec![swipe]));
        }
    }

    /// A touch lifted. The gesture ends with the last touch.
    pub fn touch_ended(&mut self, id: TouchId) {
        if self.touches.remove(&id).is_some() && self.touches.is_empty() {
            self.queue.push_back(GestureEvent::Ended);
        }
    }

    /// Queue an already built event.
    pub fn push(&mut self, event: GestureEvent) {
        self.queue.push_back(event);
    }

    /// Returns true while at least one touch is down.
    pub fn is_touching(&self) -> bool {
        !self.touches.is_empty()
    }

    /// Number of events waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<GestureEvent> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_touch_gesture() {
        let mut input = InputState::new();
        input.touch_began(1, Vec2::new(0.0, 0.0));
        input.touch_moved(1, Vec2::new(10.0, 0.0));
        input.touch_moved(1, Vec2::new(20.0, 5.0));
        input.touch_ended(1);

        assert_eq!(
            input.drain(),
            vec![
                GestureEvent::Began,
                GestureEvent::Moved(vec![
                    Swipe::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)),
                    Swipe::new(Vec2::new(10.0, 0.0), Vec2::new(20.0, 5.0)),
                ]),
                GestureEvent::Ended,
            ]
        );
        assert_eq!(input.pending(), 0);
        assert!(!input.is_touching());
    }

    #[test]
    fn second_touch_begins_again_and_last_touch_ends() {
        let mut input = InputState::new();
        input.touch_began(1, Vec2::ZERO);
        input.touch_began(2, Vec2::new(50.0, 50.0));
        // A repeated report for a touch already down is not a new touch.
        input.touch_began(2, Vec2::new(55.0, 50.0));
        input.touch_ended(1);
        assert!(input.is_touching());
        input.touch_ended(2);

        assert_eq!(
            input.drain(),
            vec![GestureEvent::Began, GestureEvent::Began, GestureEvent::Ended]
        );
    }

    #[test]
    fn moves_of_unknown_touches_are_dropped() {
        let mut input = InputState::new();
        input.touch_moved(7, Vec2::new(1.0, 1.0));
        input.touch_ended(7);
        assert!(input.drain().is_empty());
    }
}
