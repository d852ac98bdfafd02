// self
use crate::{
	_prelude::*,
	obs::{SessionOp, SessionOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedSession<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedSession<F> = F;

/// A span builder used by session operations.
#[derive(Clone, Debug)]
pub struct SessionSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl SessionSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: SessionOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("donorlink.session", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedSession<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a structured event for a session outcome (when tracing is enabled).
pub(crate) fn trace_outcome(op: SessionOp, outcome: SessionOutcome) {
	#[cfg(feature = "tracing")]
	match outcome {
		SessionOutcome::Failure =>
			tracing::warn!(op = op.as_str(), outcome = outcome.as_str(), "session operation failed"),
		_ => tracing::debug!(op = op.as_str(), outcome = outcome.as_str(), "session operation"),
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = SessionSpan::new(SessionOp::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
