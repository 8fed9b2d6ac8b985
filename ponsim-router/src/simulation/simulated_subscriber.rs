use crate::device::{
    DeviceError, DeviceLocation, DeviceMetrics, DeviceOps, PortKind, SubscriberDevice,
    EGRESS_FRAME_PORT,
};
use crate::frame::Frame;
use crate::observability::{events, fields};
use crate::proto::{FlowRule, PonSimMetrics};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, Level};

const COMPONENT: &str = "simulated_subscriber";

/// Simulated ONU. Controller frames arrive on its PON side; anything else is
/// treated as subscriber-side (UNI) traffic and counted on the NNI counters.
pub struct SimulatedSubscriber {
    location: DeviceLocation,
    flows: Mutex<Vec<FlowRule>>,
    metrics: Mutex<DeviceMetrics>,
}

impl SimulatedSubscriber {
    pub fn new(location: DeviceLocation) -> Self {
        Self {
            metrics: Mutex::new(DeviceMetrics::new(&location.address)),
            location,
            flows: Mutex::new(Vec::new()),
        }
    }

    pub async fn installed_flows(&self) -> Vec<FlowRule> {
        self.flows.lock().await.clone()
    }
}

#[async_trait]
impl DeviceOps for SimulatedSubscriber {
    fn location(&self) -> &DeviceLocation {
        &self.location
    }

    async fn forward(&self, port: i32, frame: Frame) -> Result<(), DeviceError> {
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

        let side = if port == EGRESS_FRAME_PORT {
            PortKind::Pon
        } else {
            PortKind::Nni
        };
        self.metrics.lock().await.port_mut(side).count_rx(frame.len());
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

impl SubscriberDevice for SimulatedSubscriber {}
