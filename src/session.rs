use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Processing = 1,
    ResultSent = 2,
}

// Low two bits hold the state, the rest a generation bumped on every claimed
// frame so a stale guard can never release a newer one.
const STATE_MASK: u64 = 0b11;

fn pack(state: SessionState, generation: u64) -> u64 {
    generation << 2 | state as u64
}

fn generation(packed: u64) -> u64 {
    packed >> 2
}

fn state_of(packed: u64) -> SessionState {
    match packed & STATE_MASK {
        0 => SessionState::Idle,
        1 => SessionState::Processing,
        _ => SessionState::ResultSent,
    }
}

#[derive(Debug)]
pub struct CaptureSession {
    state: AtomicU64,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: AtomicU64::new(pack(SessionState::Idle, 0)),
        }
    }

    pub fn state(&self) -> SessionState {
        state_of(self.state.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        self.state() == SessionState::ResultSent
    }

    /// `None` while another frame is being processed or once a result has
    /// been sent.
    pub fn try_begin(&self) -> Option<FrameGuard<'_>> {
        let mut token = 0;
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (state_of(current) == SessionState::Idle).then(|| {
                    token = pack(SessionState::Processing, generation(current).wrapping_add(1));
                    token
                })
            })
            .ok()
            .map(|_| FrameGuard {
                session: self,
                token,
                completed: false,
            })
    }

    /// Moves to `ResultSent` from `Idle` or `Processing`. Only the first
    /// caller succeeds.
    pub fn try_complete(&self) -> bool {
        let won = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (state_of(current) != SessionState::ResultSent)
                    .then(|| pack(SessionState::ResultSent, generation(current)))
            })
            .is_ok();
        if !won {
            log::debug!("Capture session already delivered a result");
        }
        won
    }

    /// Re-arms a finished session. A frame still in flight keeps the session,
    /// so this returns `false` unless a result had been sent.
    pub fn reset(&self) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (state_of(current) == SessionState::ResultSent)
                    .then(|| pack(SessionState::Idle, generation(current)))
            })
            .is_ok()
    }
}

#[derive(Debug)]
pub struct FrameGuard<'a> {
    session: &'a CaptureSession,
    token: u64,
    completed: bool,
}

impl FrameGuard<'_> {
    pub fn complete(mut self) -> bool {
        self.completed = true;
        self.session.try_complete()
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let _ = self.session.state.compare_exchange(
                self.token,
                pack(SessionState::Idle, generation(self.token)),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}
