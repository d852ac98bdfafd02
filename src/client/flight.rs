//! Single-flight gate for token refreshes.
//!
//! The gate holds at most one in-flight refresh handle. Joining is a synchronous check-and-set
//! under a short lock: the first caller installs a fresh handle and leads, every later caller
//! receives a clone of the same handle and waits on it. The leader holds the handle's write guard
//! for the whole refresh; releasing it (explicitly or by drop) clears the slot first and then
//! wakes every waiter at once.

// crates.io
use async_lock::RwLockWriteGuardArc;
// self
use crate::_prelude::*;

type Flight = Arc<AsyncRwLock<RefreshOutcome>>;

/// How an in-flight refresh settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// New credentials were stored (or another refresh had already rotated them).
	Rotated,
	/// The refresh call failed; stored credentials were not rotated.
	Failed,
	/// The leader went away before settling (cancelled future or storage error).
	Abandoned,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	slot: Mutex<Option<Flight>>,
}
impl RefreshGate {
	pub(crate) fn join(&self) -> Ticket<'_> {
		let mut slot = self.slot.lock();

		if let Some(flight) = slot.as_ref() {
			return Ticket::Wait(RefreshWaiter(flight.clone()));
		}

		let flight = Arc::new(AsyncRwLock::new(RefreshOutcome::Abandoned));

		match flight.try_write_arc() {
			Some(guard) => {
				*slot = Some(flight.clone());

				Ticket::Lead(RefreshLease { gate: self, flight, guard: Some(guard) })
			},
			// A lock nobody else has seen cannot be contended; fall back to waiting on it.
			None => Ticket::Wait(RefreshWaiter(flight)),
		}
	}

	pub(crate) fn is_refreshing(&self) -> bool {
		self.slot.lock().is_some()
	}
}

pub(crate) enum Ticket<'a> {
	Lead(RefreshLease<'a>),
	Wait(RefreshWaiter),
}

/// Exclusive right to perform the refresh; settles as [`RefreshOutcome::Abandoned`] on drop.
pub(crate) struct RefreshLease<'a> {
	gate: &'a RefreshGate,
	flight: Flight,
	guard: Option<RwLockWriteGuardArc<RefreshOutcome>>,
}
impl RefreshLease<'_> {
	pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
		if let Some(guard) = self.guard.as_mut() {
			**guard = outcome;
		}
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		{
			let mut slot = self.gate.slot.lock();

			if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &self.flight)) {
				*slot = None;
			}
		}

		self.guard.take();
	}
}

pub(crate) struct RefreshWaiter(Flight);
impl RefreshWaiter {
	pub(crate) async fn settled(self) -> RefreshOutcome {
		*self.0.read().await
	}
}
