// self
use crate::obs::{FlowKind, FlowOutcome};

/// Metric name of the per-flow outcome counter.
pub const FLOW_COUNTER: &str = "console_session_flow_total";

/// Bumps [`FLOW_COUNTER`] for `kind` and `outcome`.
///
/// Without the `metrics` feature the call compiles to nothing.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
