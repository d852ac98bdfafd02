// self
use crate::obs::{SessionOp, SessionOutcome};

/// Records a session outcome via the global metrics recorder (when enabled) and the tracing
/// subscriber (when enabled).
pub fn record_session_outcome(op: SessionOp, outcome: SessionOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"donorlink_session_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	crate::obs::trace_outcome(op, outcome);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_session_outcome_noop_without_metrics() {
		record_session_outcome(SessionOp::Refresh, SessionOutcome::Failure);
	}
}
