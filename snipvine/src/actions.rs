//! Actions that run after a delay, driven by the frame clock.

/// Actions waiting for their due time.
///
/// Actions come back in due order; actions due at the same time come back in
/// the order they were scheduled.
#[derive(Debug)]
pub struct ActionQueue<A> {
    now: f32,
    next_seq: u64,
    pending: Vec<Scheduled<A>>,
}

#[derive(Debug)]
struct Scheduled<A> {
    due: f32,
    seq: u64,
    action: A,
}

impl<A> Default for ActionQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ActionQueue<A> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    /// Run `action` `delay` seconds from now. Negative delays count as zero.
    pub fn schedule(&mut self, delay: f32, action: A) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled {
            due: self.now + delay.max(0.0),
            seq,
            action,
        });
    }

    /// Move the clock forward and take every action now due.
    pub fn advance(&mut self, dt: f32) -> Vec<A> {
        self.now += dt.max(0.0);

        let now = self.now;
        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = waiting;

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|s| s.action).collect()
    }

    /// Drop every pending action.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Seconds advanced so far.
    pub fn now(&self) -> f32 {
        self.now
    }
}
