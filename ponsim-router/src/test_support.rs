//! Fake devices and connectors shared by unit tests.

use crate::device::{
    ChildRegistry, DeviceError, DeviceLocation, DeviceOps, OutgoingFrames, StaticChildRegistry,
    SubscriberDevice, TerminalDevice,
};
use crate::frame::Frame;
use crate::proto::{FlowRule, FlowTable, PonSimMetrics, PonSimPacketCounter, PonSimPortMetrics};
use crate::remote::{ChildConnector, RemoteCallError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};

fn metrics_with(device: &str, value: i64) -> PonSimMetrics {
    PonSimMetrics {
        device: device.to_string(),
        metrics: vec![PonSimPortMetrics {
            port_name: "nni".to_string(),
            packets: vec![PonSimPacketCounter {
                name: "rx_64_pkts".to_string(),
                value,
            }],
        }],
    }
}

#[derive(Default)]
struct DeviceRecorder {
    forwarded: Mutex<Vec<(i32, Vec<u8>)>>,
    installed: Mutex<Vec<Vec<FlowRule>>>,
    forward_notify: Notify,
}

impl DeviceRecorder {
    async fn record_forward(&self, port: i32, frame: Frame) {
        self.forwarded.lock().await.push((port, frame.into_payload()));
        self.forward_notify.notify_one();
    }
}

pub(crate) struct FakeTerminal {
    location: DeviceLocation,
    registry: Arc<StaticChildRegistry>,
    outgoing: OutgoingFrames,
    _ingress: Option<mpsc::Sender<Vec<u8>>>,
    recorder: DeviceRecorder,
}

impl FakeTerminal {
    pub(crate) fn with_children<I>(address: &str, children: I) -> Self
    where
        I: IntoIterator<Item = (i32, DeviceLocation)>,
    {
        let (ingress, outgoing) = OutgoingFrames::channel(8);
        Self {
            location: DeviceLocation::new(address, 50060),
            registry: Arc::new(
                StaticChildRegistry::from_children(children).expect("valid test children"),
            ),
            outgoing,
            _ingress: Some(ingress),
            recorder: DeviceRecorder::default(),
        }
    }

    pub(crate) fn with_outgoing(address: &str, outgoing: OutgoingFrames) -> Self {
        Self {
            location: DeviceLocation::new(address, 50060),
            registry: Arc::new(StaticChildRegistry::new()),
            outgoing,
            _ingress: None,
            recorder: DeviceRecorder::default(),
        }
    }

    pub(crate) fn own_metrics(&self) -> PonSimMetrics {
        metrics_with(&self.location.address, 42)
    }

    pub(crate) async fn forwarded(&self) -> Vec<(i32, Vec<u8>)> {
        self.recorder.forwarded.lock().await.clone()
    }

    pub(crate) async fn wait_for_forward(&self) -> (i32, Vec<u8>) {
        loop {
            if let Some(first) = self.recorder.forwarded.lock().await.first().cloned() {
                return first;
            }
            self.recorder.forward_notify.notified().await;
        }
    }

    pub(crate) async fn installed(&self) -> Vec<Vec<FlowRule>> {
        self.recorder.installed.lock().await.clone()
    }
}

#[async_trait]
impl DeviceOps for FakeTerminal {
    fn location(&self) -> &DeviceLocation {
        &self.location
    }

    async fn forward(&self, port: i32, frame: Frame) -> Result<(), DeviceError> {
        self.recorder.record_forward(port, frame).await;
        Ok(())
    }

    async fn install_flows(&self, flows: Vec<FlowRule>) -> Result<(), DeviceError> {
        self.recorder.installed.lock().await.push(flows);
        Ok(())
    }

    async fn metrics(&self) -> PonSimMetrics {
        self.own_metrics()
    }
}

impl TerminalDevice for FakeTerminal {
    fn child_registry(&self) -> Arc<dyn ChildRegistry> {
        self.registry.clone()
    }

    fn outgoing_frames(&self) -> OutgoingFrames {
        self.outgoing.clone()
    }
}

pub(crate) struct FakeSubscriber {
    location: DeviceLocation,
    failing: bool,
    recorder: DeviceRecorder,
}

impl FakeSubscriber {
    pub(crate) fn new(address: &str) -> Self {
        Self {
            location: DeviceLocation::new(address, 50061),
            failing: false,
            recorder: DeviceRecorder::default(),
        }
    }

    /// A subscriber whose forward and install operations always fail.
    pub(crate) fn failing(address: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(address)
        }
    }

    pub(crate) async fn forwarded(&self) -> Vec<(i32, Vec<u8>)> {
        self.recorder.forwarded.lock().await.clone()
    }

    pub(crate) async fn installed(&self) -> Vec<Vec<FlowRule>> {
        self.recorder.installed.lock().await.clone()
    }
}

#[async_trait]
impl DeviceOps for FakeSubscriber {
    fn location(&self) -> &DeviceLocation {
        &self.location
    }

    async fn forward(&self, port: i32, frame: Frame) -> Result<(), DeviceError> {
        self.recorder.record_forward(port, frame).await;
        if self.failing {
            return Err(DeviceError::Unavailable("powered off".to_string()));
        }
        Ok(())
    }

    async fn install_flows(&self, flows: Vec<FlowRule>) -> Result<(), DeviceError> {
        if self.failing {
            return Err(DeviceError::FlowsRejected("table full".to_string()));
        }
        self.recorder.installed.lock().await.push(flows);
        Ok(())
    }

    async fn metrics(&self) -> PonSimMetrics {
        metrics_with(&self.location.address, 7)
    }
}

impl SubscriberDevice for FakeSubscriber {}

/// Connector that records every nested call instead of dialing.
#[derive(Default)]
pub(crate) struct RecordingConnector {
    unreachable: HashSet<String>,
    flow_calls: Mutex<Vec<(DeviceLocation, FlowTable)>>,
    stats_calls: Mutex<Vec<DeviceLocation>>,
}

impl RecordingConnector {
    /// Calls to any of `addresses` fail as if the child could not be reached.
    pub(crate) fn unreachable(addresses: &[&str]) -> Self {
        Self {
            unreachable: addresses.iter().map(|address| address.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) async fn flow_calls(&self) -> Vec<(DeviceLocation, FlowTable)> {
        self.flow_calls.lock().await.clone()
    }

    pub(crate) async fn stats_calls(&self) -> Vec<DeviceLocation> {
        self.stats_calls.lock().await.clone()
    }

    fn check_reachable(&self, location: &DeviceLocation) -> Result<(), RemoteCallError> {
        if self.unreachable.contains(&location.address) {
            return Err(RemoteCallError::Rpc {
                host: location.host(),
                status: tonic::Status::unavailable("connection refused"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChildConnector for RecordingConnector {
    async fn update_flow_table(
        &self,
        location: &DeviceLocation,
        table: FlowTable,
    ) -> Result<(), RemoteCallError> {
        self.flow_calls.lock().await.push((location.clone(), table));
        self.check_reachable(location)
    }

    async fn get_stats(&self, location: &DeviceLocation) -> Result<PonSimMetrics, RemoteCallError> {
        self.stats_calls.lock().await.push(location.clone());
        self.check_reachable(location)?;
        Ok(metrics_with(&location.address, 1_000))
    }
}
