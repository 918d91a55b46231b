//! Single-slot reply channel between the render worker and its one waiting caller.
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::foundation::error::{OffsceneError, OffsceneResult};

pub(crate) struct Slot<T> {
    seq: u64,
    reply: Option<OffsceneResult<T>>,
}

/// Strict request/response rendezvous: one waiter, one signaler, one reply in flight.
///
/// The caller locks the slot before issuing a request and parks on the condition variable,
/// which releases the lock. The worker does its work without the lock and only takes it to
/// publish the reply, so the caller's timeout is always honoured.
pub(crate) struct Rendezvous<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Rendezvous<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                seq: 0,
                reply: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Lock the slot. A poisoned lock is recovered: the slot holds plain data.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the reply to request `seq` and wake the waiter.
    pub(crate) fn publish(&self, seq: u64, reply: OffsceneResult<T>) {
        let mut slot = self.lock();
        slot.seq = seq;
        slot.reply = Some(reply);
        drop(slot);
        self.ready.notify_one();
    }

    /// Block on `guard` until the reply to `seq` is published or `timeout` elapses.
    pub(crate) fn wait(
        &self,
        guard: MutexGuard<'_, Slot<T>>,
        seq: u64,
        timeout: Option<Duration>,
    ) -> OffsceneResult<T> {
        let pending = |slot: &mut Slot<T>| slot.seq != seq || slot.reply.is_none();
        let mut slot = match timeout {
            None => self
                .ready
                .wait_while(guard, pending)
                .unwrap_or_else(PoisonError::into_inner),
            Some(limit) => {
                let (mut slot, res) = self
                    .ready
                    .wait_timeout_while(guard, limit, pending)
                    .unwrap_or_else(PoisonError::into_inner);
                if res.timed_out() && pending(&mut slot) {
                    return Err(OffsceneError::Timeout(limit));
                }
                slot
            }
        };
        slot.reply.take().unwrap_or_else(|| {
            Err(OffsceneError::worker_faulted(
                "render worker woke the caller without a reply",
            ))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/rendezvous.rs"]
mod tests;
