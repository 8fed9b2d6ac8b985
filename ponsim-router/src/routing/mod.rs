//! Routing layer.
//!
//! Hosts the service-facing dispatcher that decides, per call, whether a request is
//! handled by the owned device or fanned out to the children of a Terminal.

pub(crate) mod dispatch_outcome;
pub(crate) mod frame_router;
