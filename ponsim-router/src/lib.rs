/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # ponsim-router
//!
//! `ponsim-router` serves the `PonSim` gRPC surface for one simulated PON device. A
//! node owns exactly one device: either a Terminal (OLT) with Subscriber (ONU)
//! children behind numbered ports, or a Subscriber.
//!
//! Controller frames are forwarded to the owned device, flow tables addressed to a
//! child port are relayed to that child, stats requests fan out to every child and
//! frames coming up from the PON are streamed back to the controller.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ponsim_router::device::{Device, DeviceLocation};
//! use ponsim_router::remote::{ChildTransportSecurity, GrpcChildConnector};
//! use ponsim_router::simulation::SimulatedSubscriber;
//! use ponsim_router::{FrameRouter, RouterSettings};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let onu = Arc::new(SimulatedSubscriber::new(DeviceLocation::new("onu-1", 50061)));
//! let connector = GrpcChildConnector::new(
//!     &ChildTransportSecurity::Plaintext,
//!     Duration::from_secs(2),
//!     Duration::from_secs(5),
//! )
//! .unwrap();
//! let router = FrameRouter::new(
//!     Device::subscriber(onu),
//!     Arc::new(connector),
//!     RouterSettings::default(),
//! );
//!
//! let info = router.device_info();
//! assert_eq!(info.nni_port, 0);
//! assert!(info.uni_ports.is_empty());
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Device model: the closed Terminal/Subscriber role set, child registry and counters
//! - Routing: per-call dispatch to the owned device or to children of a Terminal
//! - Remote: one short-lived gRPC connection per nested call
//! - Data plane: the ingress relay feeding `ReceiveFrames`
//! - Simulation: in-memory devices used by `ponsim-node` and the tests
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

/// Messages, client and server generated from `proto/ponsim.proto`.
pub mod proto {
    tonic::include_proto!("ponsim");
}

mod data_plane;
pub use data_plane::ingress_relay::{FrameSink, IngressStreamRelay, RelayError};

pub mod device;
pub mod frame;

#[doc(hidden)]
pub mod observability;
pub mod remote;

mod routing;
pub use routing::dispatch_outcome::DispatchOutcome;
pub use routing::frame_router::{
    FrameRouter, RouterSettings, DEFAULT_RELAY_BUFFER, DEFAULT_STATS_FANOUT_CONCURRENCY,
};

pub mod simulation;

#[cfg(test)]
mod test_support;
