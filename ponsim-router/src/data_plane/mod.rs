//! Data-plane layer.
//!
//! Owns the ingress relay that carries frames produced inside a Terminal device
//! out to the controller over a long-lived server stream.

pub(crate) mod ingress_relay;
