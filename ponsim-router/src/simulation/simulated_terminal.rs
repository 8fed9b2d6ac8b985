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

use crate::device::{
    ChildRegistry, DeviceError, DeviceLocation, DeviceMetrics, DeviceOps, OutgoingFrames,
    PortKind, StaticChildRegistry, TerminalDevice, EGRESS_FRAME_PORT,
};
use crate::frame::Frame;
use crate::observability::{events, fields};
use crate::proto::{FlowRule, PonSimMetrics};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "simulated_terminal";

/// Simulated OLT.
///
/// Frames from the controller (the egress port) are counted as NNI receive and PON
/// transmit. Frames arriving from a child port are counted the other way round and
/// queued on the outgoing channel for the ingress relay.
///
/// Nothing inside the model generates PON traffic. The outgoing channel is fed only by
/// [`SimulatedTerminal::inject_ingress`]; without a caller, `ReceiveFrames` streams
/// nothing and stays open until [`SimulatedTerminal::close_ingress`].
pub struct SimulatedTerminal {
    location: DeviceLocation,
    registry: Arc<StaticChildRegistry>,
    flows: Mutex<Vec<FlowRule>>,
    metrics: Mutex<DeviceMetrics>,
    ingress: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    outgoing: OutgoingFrames,
}

impl SimulatedTerminal {
    pub fn new(location: DeviceLocation, registry: StaticChildRegistry, queue_size: usize) -> Self {
        let (ingress, outgoing) = OutgoingFrames::channel(queue_size.max(1));
        Self {
            metrics: Mutex::new(DeviceMetrics::new(&location.address)),
            location,
            registry: Arc::new(registry),
            flows: Mutex::new(Vec::new()),
            ingress: Mutex::new(Some(ingress)),
            outgoing,
        }
    }

    /// Delivers a frame that arrived from the child behind `port`.
    pub async fn inject_ingress(&self, port: i32, payload: Vec<u8>) -> Result<(), DeviceError> {
        self.forward(port, Frame::new(payload)).await
    }

    /// Drops the producer side of the outgoing channel; active relays then end.
    pub async fn close_ingress(&self) {
        self.ingress.lock().await.take();
    }

    pub async fn installed_flows(&self) -> Vec<FlowRule> {
        self.flows.lock().await.clone()
    }

    async fn queue_for_controller(&self, port: i32, frame: Frame) -> Result<(), DeviceError> {
        let ingress = self.ingress.lock().await;
        let Some(sender) = ingress.as_ref() else {
            return Err(DeviceError::Unavailable(
                "outgoing channel closed".to_string(),
            ));
        };

        match sender.try_send(frame.into_payload()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(
                    event = events::SIM_INGRESS_DROPPED,
                    component = COMPONENT,
                    device = %self.location,
                    port,
                    reason = "queue_full",
                    "dropping ingress frame"
                );
                Err(DeviceError::Unavailable("outgoing queue full".to_string()))
            }
            Err(TrySendError::Closed(_)) => Err(DeviceError::Unavailable(
                "outgoing channel closed".to_string(),
            )),
        }
    }
}

#[async_trait]
impl DeviceOps for SimulatedTerminal {
    fn location(&self) -> &DeviceLocation {
        &self.location
    }

    async fn forward(&self, port: i32, frame: Frame) -> Result<(), DeviceError> {
        let len = frame.len();
        if tracing::enabled!(Level::DEBUG) {
            let summary = fields::format_frame(&frame);
            debug!(
                event = events::SIM_FORWARD,
                component = COMPONENT,
                device = %self.location,
                port,
                frame = summary.as_str(),
                "forwarding frame"
            );
        }

        if port == EGRESS_FRAME_PORT {
            let mut metrics = self.metrics.lock().await;
            metrics.port_mut(PortKind::Nni).count_rx(len);
            metrics.port_mut(PortKind::Pon).count_tx(len);
            return Ok(());
        }

        if self.registry.child_location(port).is_none() {
            return Err(DeviceError::PortNotFound(port));
        }

        {
            let mut metrics = self.metrics.lock().await;
            metrics.port_mut(PortKind::Pon).count_rx(len);
        }
        self.queue_for_controller(port, frame).await?;
        self.metrics
            .lock()
            .await
            .port_mut(PortKind::Nni)
            .count_tx(len);
        Ok(())
    }

    async fn install_flows(&self, flows: Vec<FlowRule>) -> Result<(), DeviceError> {
        let count = flows.len();
        *self.flows.lock().await = flows;
        info!(
            event = events::SIM_FLOWS_INSTALLED,
            component = COMPONENT,
            device = %self.location,
            count,
            "flow table replaced"
        );
        Ok(())
    }

    async fn metrics(&self) -> PonSimMetrics {
        self.metrics.lock().await.to_proto()
    }
}

impl TerminalDevice for SimulatedTerminal {
    fn child_registry(&self) -> Arc<dyn ChildRegistry> {
        self.registry.clone()
    }

    fn outgoing_frames(&self) -> OutgoingFrames {
        self.outgoing.clone()
    }
}
