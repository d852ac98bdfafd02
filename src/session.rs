//! Session teardown capability invoked when a renewal failure forces a logout.
//!
//! The client clears stored credentials itself; the handler only owns navigation, so the core
//! never depends on a UI framework.

// std
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Navigation hooks consulted on forced logout.
pub trait SessionHandler
where
	Self: Send + Sync,
{
	/// Returns `true` while the user is already looking at the login view.
	fn is_at_login(&self) -> bool;

	/// Navigates to the login view.
	fn redirect_to_login(&self);
}

/// Handler for headless callers that have no view to navigate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionHandler;
impl SessionHandler for NoopSessionHandler {
	fn is_at_login(&self) -> bool {
		true
	}

	fn redirect_to_login(&self) {}
}

/// Handler that tracks the current view in memory and counts redirects.
///
/// Useful for shells that poll the flag to switch screens, and for tests.
#[derive(Debug, Default)]
pub struct RecordingSessionHandler {
	at_login: AtomicBool,
	redirects: AtomicUsize,
}
impl RecordingSessionHandler {
	/// Creates a handler positioned on a regular (non-login) view.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a handler positioned on the login view.
	pub fn at_login() -> Self {
		Self { at_login: AtomicBool::new(true), redirects: AtomicUsize::new(0) }
	}

	/// Moves the tracked view away from the login screen.
	pub fn leave_login(&self) {
		self.at_login.store(false, Ordering::SeqCst);
	}

	/// Returns how many redirects were issued.
	pub fn redirects(&self) -> usize {
		self.redirects.load(Ordering::SeqCst)
	}
}
impl SessionHandler for RecordingSessionHandler {
	fn is_at_login(&self) -> bool {
		self.at_login.load(Ordering::SeqCst)
	}

	fn redirect_to_login(&self) {
		self.redirects.fetch_add(1, Ordering::SeqCst);
		self.at_login.store(true, Ordering::SeqCst);
	}
}
