//! Optional observability helpers for the session pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `donorlink.session` with the `op` (session
//!   operation) and `stage` (call site) fields, plus an event per recorded outcome.
//! - Enable `metrics` to increment the `donorlink_session_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Session operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOp {
	/// Token refresh call.
	Refresh,
	/// Replay of a request rejected with 401.
	Retry,
	/// Credential teardown after a failed renewal.
	ForcedLogout,
	/// Login or logout helper.
	Login,
}
impl SessionOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionOp::Refresh => "refresh",
			SessionOp::Retry => "retry",
			SessionOp::ForcedLogout => "forced_logout",
			SessionOp::Login => "login",
		}
	}
}
impl Display for SessionOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
	/// Entry to a session operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl SessionOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionOutcome::Attempt => "attempt",
			SessionOutcome::Success => "success",
			SessionOutcome::Failure => "failure",
		}
	}
}
impl Display for SessionOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
