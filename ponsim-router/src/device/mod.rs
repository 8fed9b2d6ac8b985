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

//! Device capability layer.
//!
//! A router owns exactly one [`Device`], whose role is fixed when it is constructed.
//! The role decides which operations exist: only a [`TerminalDevice`] has children
//! and an outgoing frame channel.

pub mod child_registry;
pub mod metrics;

use crate::frame::Frame;
use crate::proto::{FlowRule, PonSimMetrics};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub use child_registry::{ChildRegistry, ChildRegistryError, StaticChildRegistry};
pub use metrics::{DeviceMetrics, PacketCounters, PortKind};

/// Port value denoting the Terminal device itself rather than one of its children.
pub const UPLINK_PORT: i32 = 0;

/// Internal port on which frames submitted by the controller enter a device.
pub const EGRESS_FRAME_PORT: i32 = 2;

/// Network location of a device: its own identity, and how a parent reaches it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DeviceLocation {
    pub address: String,
    pub port: u16,
}

impl DeviceLocation {
    pub fn new(address: &str, port: u16) -> Self {
        Self {
            address: address.to_string(),
            port,
        }
    }

    /// `address:port`, as used for logging and TLS-less dialing.
    pub fn host(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn endpoint_uri(&self, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{}", self.host())
    }
}

impl Display for DeviceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.host())
    }
}

/// Failure reported by a device's own forwarding or flow installation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeviceError {
    PortNotFound(i32),
    FlowsRejected(String),
    Unavailable(String),
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::PortNotFound(port) => write!(f, "no such port: {port}"),
            DeviceError::FlowsRejected(reason) => write!(f, "flows rejected: {reason}"),
            DeviceError::Unavailable(reason) => write!(f, "device unavailable: {reason}"),
        }
    }
}

impl Error for DeviceError {}

/// Operations every simulated device supports, whatever its role.
///
/// Implementations own their state and serialize concurrent calls internally;
/// callers never lock on a device's behalf.
#[async_trait]
pub trait DeviceOps: Send + Sync {
    fn location(&self) -> &DeviceLocation;

    async fn forward(&self, port: i32, frame: Frame) -> Result<(), DeviceError>;

    /// Installs a complete flow set. Replace or merge semantics belong to the device.
    async fn install_flows(&self, flows: Vec<FlowRule>) -> Result<(), DeviceError>;

    /// Snapshot of the device's own counters.
    async fn metrics(&self) -> PonSimMetrics;
}

/// Line-terminal (OLT) role: routes to children and originates ingress frames.
pub trait TerminalDevice: DeviceOps {
    fn child_registry(&self) -> Arc<dyn ChildRegistry>;

    fn outgoing_frames(&self) -> OutgoingFrames;
}

/// Subscriber-terminal (ONU) role: a leaf without children.
pub trait SubscriberDevice: DeviceOps {}

/// The device a router serves, with its role selected once at construction.
#[derive(Clone)]
pub enum Device {
    Terminal(Arc<dyn TerminalDevice>),
    Subscriber(Arc<dyn SubscriberDevice>),
}

impl Device {
    pub fn terminal(device: Arc<dyn TerminalDevice>) -> Self {
        Device::Terminal(device)
    }

    pub fn subscriber(device: Arc<dyn SubscriberDevice>) -> Self {
        Device::Subscriber(device)
    }

    pub fn location(&self) -> &DeviceLocation {
        match self {
            Device::Terminal(device) => device.location(),
            Device::Subscriber(device) => device.location(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Device::Terminal(_) => crate::observability::fields::ROLE_TERMINAL,
            Device::Subscriber(_) => crate::observability::fields::ROLE_SUBSCRIBER,
        }
    }

    pub async fn forward(&self, port: i32, frame: Frame) -> Result<(), DeviceError> {
        match self {
            Device::Terminal(device) => device.forward(port, frame).await,
            Device::Subscriber(device) => device.forward(port, frame).await,
        }
    }

    pub async fn install_flows(&self, flows: Vec<FlowRule>) -> Result<(), DeviceError> {
        match self {
            Device::Terminal(device) => device.install_flows(flows).await,
            Device::Subscriber(device) => device.install_flows(flows).await,
        }
    }
}

/// Point-to-point handle on a Terminal's internal ingress channel.
///
/// Clones share one receiver, so every frame is delivered to exactly one reader.
/// Dropping a pending [`OutgoingFrames::next`] future releases the receiver.
#[derive(Clone)]
pub struct OutgoingFrames {
    receiver: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
}

impl OutgoingFrames {
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Creates a bounded channel and returns its producer along with the shared handle.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    /// Waits for the next frame; `None` once every producer has gone away.
    pub async fn next(&self) -> Option<Vec<u8>> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }
}
