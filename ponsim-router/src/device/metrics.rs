//! Per-port packet counters binned by frame size.

use crate::proto::{PonSimMetrics, PonSimPacketCounter, PonSimPortMetrics};

const SIZE_BIN_UPPER_BOUNDS: [usize; 6] = [64, 127, 255, 511, 1023, 1518];
const SIZE_BIN_SUFFIXES: [&str; 7] = [
    "64_pkts",
    "65_127_pkts",
    "128_255_pkts",
    "256_511_pkts",
    "512_1023_pkts",
    "1024_1518_pkts",
    "1519_9k_pkts",
];
const SIZE_BIN_COUNT: usize = SIZE_BIN_SUFFIXES.len();

/// Which side of a device a frame crossed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PortKind {
    /// Towards the controller / network.
    Nni,
    /// Towards the passive optical network.
    Pon,
}

impl PortKind {
    pub fn name(&self) -> &'static str {
        match self {
            PortKind::Nni => "nni",
            PortKind::Pon => "pon",
        }
    }
}

fn size_bin(len: usize) -> usize {
    SIZE_BIN_UPPER_BOUNDS
        .iter()
        .position(|upper| len <= *upper)
        .unwrap_or(SIZE_BIN_COUNT - 1)
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PacketCounters {
    tx: [u64; SIZE_BIN_COUNT],
    rx: [u64; SIZE_BIN_COUNT],
}

impl PacketCounters {
    pub fn count_tx(&mut self, len: usize) {
        self.tx[size_bin(len)] += 1;
    }

    pub fn count_rx(&mut self, len: usize) {
        self.rx[size_bin(len)] += 1;
    }

    fn to_packet_counters(&self) -> Vec<PonSimPacketCounter> {
        let tx = self
            .tx
            .iter()
            .zip(SIZE_BIN_SUFFIXES)
            .map(|(value, suffix)| counter(&format!("tx_{suffix}"), *value));
        let rx = self
            .rx
            .iter()
            .zip(SIZE_BIN_SUFFIXES)
            .map(|(value, suffix)| counter(&format!("rx_{suffix}"), *value));
        tx.chain(rx).collect()
    }
}

fn counter(name: &str, value: u64) -> PonSimPacketCounter {
    PonSimPacketCounter {
        name: name.to_string(),
        value: i64::try_from(value).unwrap_or(i64::MAX),
    }
}

/// Accumulator owned by a single device and mutated only by its own operations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceMetrics {
    device: String,
    nni: PacketCounters,
    pon: PacketCounters,
}

impl DeviceMetrics {
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            ..Default::default()
        }
    }

    pub fn port(&self, kind: PortKind) -> &PacketCounters {
        match kind {
            PortKind::Nni => &self.nni,
            PortKind::Pon => &self.pon,
        }
    }

    pub fn port_mut(&mut self, kind: PortKind) -> &mut PacketCounters {
        match kind {
            PortKind::Nni => &mut self.nni,
            PortKind::Pon => &mut self.pon,
        }
    }

    pub fn to_proto(&self) -> PonSimMetrics {
        PonSimMetrics {
            device: self.device.clone(),
            metrics: [PortKind::Pon, PortKind::Nni]
                .into_iter()
                .map(|kind| PonSimPortMetrics {
                    port_name: kind.name().to_string(),
                    packets: self.port(kind).to_packet_counters(),
                })
                .collect(),
        }
    }
}
