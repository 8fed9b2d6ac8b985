//! Uniform outcome of dispatching one request to one target.

use crate::device::DeviceLocation;
use tracing::{debug, error, warn};

const COMPONENT: &str = "frame_router";

/// What happened to a request the router dispatched.
///
/// Outer RPCs report success for every variant; the distinction only reaches logs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DispatchOutcome {
    /// Installed on the owned device, or accepted by the child it was forwarded to.
    Applied,
    /// The child is registered but the nested call did not succeed.
    TargetUnreachable(String),
    /// No child is registered behind the requested port.
    TargetUnknown,
    /// The owned device refused the request.
    Rejected(String),
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Applied => "applied",
            DispatchOutcome::TargetUnreachable(_) => "target_unreachable",
            DispatchOutcome::TargetUnknown => "target_unknown",
            DispatchOutcome::Rejected(_) => "rejected",
        }
    }
}

pub(crate) fn log_outcome(
    event: &'static str,
    device: &DeviceLocation,
    port: i32,
    outcome: &DispatchOutcome,
) {
    match outcome {
        DispatchOutcome::Applied => debug!(
            event = event,
            component = COMPONENT,
            device = %device,
            port,
            outcome = outcome.label(),
            "dispatch applied"
        ),
        DispatchOutcome::TargetUnknown => warn!(
            event = event,
            component = COMPONENT,
            device = %device,
            port,
            outcome = outcome.label(),
            "unable to find child device"
        ),
        DispatchOutcome::TargetUnreachable(reason) | DispatchOutcome::Rejected(reason) => error!(
            event = event,
            component = COMPONENT,
            device = %device,
            port,
            outcome = outcome.label(),
            reason = reason.as_str(),
            "dispatch failed"
        ),
    }
}
