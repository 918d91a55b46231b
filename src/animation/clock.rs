use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::foundation::core::Fps;
use crate::foundation::error::{OffsceneError, OffsceneResult};

/// Virtual time source that moves forward in fixed logical steps.
///
/// The clock never looks at wall time: after `n` calls to [`DeterministicClock::advance`],
/// [`DeterministicClock::elapsed`] is exactly `n * step_ms`, however long rendering took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeterministicClock {
    step_ms: u64,
    elapsed_ms: u64,
    advances: u64,
}

impl DeterministicClock {
    /// Create a clock at time zero with a fixed step in logical milliseconds.
    pub fn new(step_ms: u64) -> OffsceneResult<Self> {
        if step_ms == 0 {
            return Err(OffsceneError::validation("clock step must be > 0 ms"));
        }
        Ok(Self {
            step_ms,
            elapsed_ms: 0,
            advances: 0,
        })
    }

    /// Create a clock whose step is derived from a timeline's fps and length in ms.
    pub fn for_timeline(fps: Fps, duration_ms: u64) -> Self {
        Self {
            step_ms: step_for_timeline(fps, duration_ms),
            elapsed_ms: 0,
            advances: 0,
        }
    }

    /// Fixed step in logical milliseconds.
    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    /// Move forward by one step and return the new elapsed time.
    pub fn advance(&mut self) -> u64 {
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.step_ms);
        self.advances = self.advances.saturating_add(1);
        self.elapsed_ms
    }

    /// Elapsed logical milliseconds.
    pub fn elapsed(&self) -> u64 {
        self.elapsed_ms
    }

    /// Number of completed [`DeterministicClock::advance`] calls.
    pub fn advances(&self) -> u64 {
        self.advances
    }
}

/// Step size in logical ms for a timeline of `duration_ms` at `fps`.
///
/// The step is `1000 / corrected_fps` with `corrected_fps = (frames - 2) / duration`,
/// all in integer arithmetic over the real length, so fractional-second timelines keep
/// their rate. Two frames are deliberately under-counted so the scene settles on its final
/// state by the last frame. Static or very short timelines fall back to the rounded
/// nominal fps.
pub fn step_for_timeline(fps: Fps, duration_ms: u64) -> u64 {
    let corrected = if duration_ms > 0 {
        fps.frames_in_ms(duration_ms)
            .saturating_sub(2)
            .saturating_mul(1000)
            / duration_ms
    } else {
        0
    };
    let corrected = if corrected == 0 {
        (fps.as_f64().round() as u64).max(1)
    } else {
        corrected
    };
    (1000 / corrected).max(1)
}

thread_local! {
    static ACTIVE: RefCell<Option<Rc<Cell<DeterministicClock>>>> = const { RefCell::new(None) };
}

/// Scoped installation of a [`DeterministicClock`] as the calling thread's animation time.
///
/// Dropping the guard uninstalls the clock on every exit path, including `?` returns and
/// unwinding. The guard is `!Send`: it belongs to the thread that owns the scene.
#[derive(Debug)]
pub struct ClockGuard {
    shared: Rc<Cell<DeterministicClock>>,
}

impl ClockGuard {
    /// Install `clock` as the active time source of this thread.
    ///
    /// Fails when another clock is already installed.
    pub fn install(clock: DeterministicClock) -> OffsceneResult<Self> {
        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Err(OffsceneError::validation(
                    "a deterministic clock is already installed on this thread",
                ));
            }
            let shared = Rc::new(Cell::new(clock));
            *slot = Some(Rc::clone(&shared));
            tracing::debug!(step_ms = clock.step_ms(), "deterministic clock installed");
            Ok(Self { shared })
        })
    }

    /// Advance the installed clock by one step and return the new elapsed time.
    pub fn advance(&self) -> u64 {
        let mut clock = self.shared.get();
        let elapsed = clock.advance();
        self.shared.set(clock);
        elapsed
    }

    /// Elapsed logical milliseconds of the installed clock.
    pub fn elapsed(&self) -> u64 {
        self.shared.get().elapsed()
    }

    /// Advance count of the installed clock.
    pub fn advances(&self) -> u64 {
        self.shared.get().advances()
    }

    /// Current state of the installed clock.
    pub fn clock(&self) -> DeterministicClock {
        self.shared.get()
    }
}

impl Drop for ClockGuard {
    fn drop(&mut self) {
        // The slot may already be gone during thread teardown.
        let _ = ACTIVE.try_with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|s| Rc::ptr_eq(s, &self.shared)) {
                *slot = None;
                tracing::debug!(
                    advances = self.shared.get().advances(),
                    "deterministic clock uninstalled"
                );
            }
        });
    }
}

/// Elapsed time of the clock installed on this thread, if any.
pub fn active_time_ms() -> Option<u64> {
    ACTIVE
        .try_with(|slot| slot.borrow().as_ref().map(|c| c.get().elapsed()))
        .ok()
        .flatten()
}

/// Return `true` when a clock is installed on this thread.
pub fn is_installed() -> bool {
    ACTIVE
        .try_with(|slot| slot.borrow().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/clock.rs"]
mod tests;
