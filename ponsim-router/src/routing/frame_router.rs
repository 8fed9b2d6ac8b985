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

//! gRPC service that routes controller calls to the owned device or its children.

use crate::data_plane::ingress_relay::IngressStreamRelay;
use crate::device::{Device, DeviceError, DeviceLocation, EGRESS_FRAME_PORT, UPLINK_PORT};
use crate::frame::Frame;
use crate::observability::{events, fields};
use crate::proto::pon_sim_server::{PonSim, PonSimServer};
use crate::proto::{Empty, FlowTable, PonSimDeviceInfo, PonSimFrame, PonSimMetrics};
use crate::remote::{ChildConnector, RemoteCallError};
use crate::routing::dispatch_outcome::{log_outcome, DispatchOutcome};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, Level};

const COMPONENT: &str = "frame_router";

pub const DEFAULT_STATS_FANOUT_CONCURRENCY: usize = 4;
pub const DEFAULT_RELAY_BUFFER: usize = 64;

/// Tunables for one router instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouterSettings {
    /// Upper bound on concurrent nested stats calls; `1` keeps them sequential.
    pub stats_fanout_concurrency: usize,
    /// Frames buffered between the ingress relay and the gRPC response stream.
    pub relay_buffer: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            stats_fanout_concurrency: DEFAULT_STATS_FANOUT_CONCURRENCY,
            relay_buffer: DEFAULT_RELAY_BUFFER,
        }
    }
}

/// Serves the `PonSim` surface for exactly one device.
///
/// The router holds no mutable state of its own: the device serializes its own
/// operations and every nested call goes through a fresh connector call.
#[derive(Clone)]
pub struct FrameRouter {
    device: Device,
    connector: Arc<dyn ChildConnector>,
    settings: RouterSettings,
}

impl FrameRouter {
    pub fn new(
        device: Device,
        connector: Arc<dyn ChildConnector>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            device,
            connector,
            settings,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn into_service(self) -> PonSimServer<Self> {
        PonSimServer::new(self)
    }

    /// Hands a controller frame to the device on a detached task.
    ///
    /// The caller's cancellation never reaches the forward; its failures are only logged.
    pub fn submit_frame(&self, frame: Frame) -> JoinHandle<()> {
        let device = self.device.clone();

        if tracing::enabled!(Level::INFO) {
            let summary = fields::format_frame(&frame);
            info!(
                event = events::SEND_FRAME_RECEIVED,
                component = COMPONENT,
                device = %device.location(),
                frame = summary.as_str(),
                "constructed frame"
            );
        }

        tokio::spawn(async move {
            match device.forward(EGRESS_FRAME_PORT, frame).await {
                Ok(()) => debug!(
                    event = events::SEND_FRAME_FORWARD_OK,
                    component = COMPONENT,
                    device = %device.location(),
                    port = EGRESS_FRAME_PORT,
                    "frame forwarded"
                ),
                Err(err) => error!(
                    event = events::SEND_FRAME_FORWARD_FAILED,
                    component = COMPONENT,
                    device = %device.location(),
                    port = EGRESS_FRAME_PORT,
                    err = %err,
                    "frame forward failed"
                ),
            }
        })
    }

    pub fn device_info(&self) -> PonSimDeviceInfo {
        let info = match &self.device {
            Device::Terminal(terminal) => {
                let mut uni_ports: Vec<i32> = terminal
                    .child_registry()
                    .child_ports()
                    .into_iter()
                    .filter(|port| *port != UPLINK_PORT)
                    .collect();
                uni_ports.sort_unstable();
                PonSimDeviceInfo {
                    nni_port: UPLINK_PORT,
                    uni_ports,
                }
            }
            Device::Subscriber(_) => PonSimDeviceInfo::default(),
        };

        info!(
            event = events::DEVICE_INFO,
            component = COMPONENT,
            device = %self.device.location(),
            role = self.device.role(),
            nni_port = info.nni_port,
            uni_ports = ?info.uni_ports,
            "device information"
        );
        info
    }

    /// Installs or forwards a flow table according to the device role and target port.
    pub async fn dispatch_flow_table(&self, table: FlowTable) -> DispatchOutcome {
        let port = table.port;
        let flow_ids = fields::format_flow_ids(&table.flows);
        info!(
            event = events::FLOW_UPDATE_START,
            component = COMPONENT,
            device = %self.device.location(),
            role = self.device.role(),
            port,
            flows = flow_ids.as_str(),
            "updating flows"
        );

        let outcome = match &self.device {
            Device::Terminal(terminal) if port == UPLINK_PORT => {
                installed(terminal.install_flows(table.flows).await)
            }
            Device::Terminal(terminal) => match terminal.child_registry().child_location(port) {
                Some(child) => forwarded(self.connector.update_flow_table(&child, table).await),
                None => DispatchOutcome::TargetUnknown,
            },
            Device::Subscriber(subscriber) => {
                installed(subscriber.install_flows(table.flows).await)
            }
        };

        log_outcome(
            events::FLOW_DISPATCH_OUTCOME,
            self.device.location(),
            port,
            &outcome,
        );
        info!(
            event = events::FLOW_UPDATE_DONE,
            component = COMPONENT,
            device = %self.device.location(),
            port,
            outcome = outcome.label(),
            "updated flows"
        );
        outcome
    }

    /// Fans a stats request out to every child, then returns the owned device's counters.
    ///
    /// Child responses are logged and discarded.
    pub async fn collect_stats(&self) -> PonSimMetrics {
        info!(
            event = events::STATS_START,
            component = COMPONENT,
            device = %self.device.location(),
            role = self.device.role(),
            "retrieving stats"
        );

        let metrics = match &self.device {
            Device::Terminal(terminal) => {
                let registry = terminal.child_registry();
                let children: Vec<(i32, DeviceLocation)> = registry
                    .child_ports()
                    .into_iter()
                    .filter_map(|port| registry.child_location(port).map(|child| (port, child)))
                    .collect();

                self.fan_out_stats(children).await;
                terminal.metrics().await
            }
            // Subscriber counters are not surfaced through this path.
            Device::Subscriber(_) => PonSimMetrics::default(),
        };

        debug!(
            event = events::STATS_DONE,
            component = COMPONENT,
            device = %self.device.location(),
            metrics = ?metrics,
            "retrieved stats"
        );
        metrics
    }

    async fn fan_out_stats(&self, children: Vec<(i32, DeviceLocation)>) {
        let connector = self.connector.as_ref();
        let owner = self.device.location();
        let limit = self.settings.stats_fanout_concurrency.max(1);

        futures::stream::iter(children)
            .for_each_concurrent(limit, |(port, child)| async move {
                let outcome = match connector.get_stats(&child).await {
                    Ok(child_metrics) => {
                        debug!(
                            event = events::STATS_CHILD_OUTCOME,
                            component = COMPONENT,
                            device = %owner,
                            child = %child,
                            metrics = ?child_metrics,
                            "child stats received"
                        );
                        DispatchOutcome::Applied
                    }
                    Err(err) => DispatchOutcome::TargetUnreachable(err.to_string()),
                };
                log_outcome(events::STATS_CHILD_OUTCOME, owner, port, &outcome);
            })
            .await;
    }
}

fn installed(result: Result<(), DeviceError>) -> DispatchOutcome {
    match result {
        Ok(()) => DispatchOutcome::Applied,
        Err(err) => DispatchOutcome::Rejected(err.to_string()),
    }
}

fn forwarded(result: Result<(), RemoteCallError>) -> DispatchOutcome {
    match result {
        Ok(()) => DispatchOutcome::Applied,
        Err(err) => DispatchOutcome::TargetUnreachable(err.to_string()),
    }
}

#[tonic::async_trait]
impl PonSim for FrameRouter {
    async fn send_frame(&self, request: Request<PonSimFrame>) -> Result<Response<Empty>, Status> {
        let frame = Frame::new(request.into_inner().payload);
        // The ack does not wait for the device.
        let _forward = self.submit_frame(frame);
        Ok(Response::new(Empty {}))
    }

    type ReceiveFramesStream = ReceiverStream<Result<PonSimFrame, Status>>;

    async fn receive_frames(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ReceiveFramesStream>, Status> {
        let (tx, rx) = mpsc::channel(self.settings.relay_buffer.max(1));
        let relay = IngressStreamRelay::new(self.device.clone());

        tokio::spawn(async move {
            if let Err(err) = relay.run(&tx).await {
                // Surfaces the terminal condition if the controller is still listening.
                let _ = tx.send(Err(err.to_status())).await;
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn get_device_info(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<PonSimDeviceInfo>, Status> {
        Ok(Response::new(self.device_info()))
    }

    async fn update_flow_table(
        &self,
        request: Request<FlowTable>,
    ) -> Result<Response<Empty>, Status> {
        let _outcome = self.dispatch_flow_table(request.into_inner()).await;
        Ok(Response::new(Empty {}))
    }

    async fn get_stats(&self, _request: Request<Empty>) -> Result<Response<PonSimMetrics>, Status> {
        Ok(Response::new(self.collect_stats().await))
    }
}
