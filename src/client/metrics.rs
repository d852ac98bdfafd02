// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for session renewal.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	waits: AtomicU64,
	forced_logouts: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh calls issued.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that rotated credentials.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refresh calls.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many requests waited on a refresh led by another request.
	pub fn waits(&self) -> u64 {
		self.waits.load(Ordering::Relaxed)
	}

	/// Returns how many forced logouts were performed.
	pub fn forced_logouts(&self) -> u64 {
		self.forced_logouts.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_wait(&self) {
		self.waits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_forced_logout(&self) {
		self.forced_logouts.fetch_add(1, Ordering::Relaxed);
	}
}
