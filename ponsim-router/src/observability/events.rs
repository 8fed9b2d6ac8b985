//! Canonical structured event names used across `ponsim-router`.

// Egress (controller -> device) events.
pub const SEND_FRAME_RECEIVED: &str = "send_frame_received";
pub const SEND_FRAME_FORWARD_OK: &str = "send_frame_forward_ok";
pub const SEND_FRAME_FORWARD_FAILED: &str = "send_frame_forward_failed";

// Ingress relay (device -> controller) events.
pub const RELAY_START: &str = "relay_start";
pub const RELAY_NOT_TERMINAL: &str = "relay_not_terminal";
pub const RELAY_FRAME_RECEIVED: &str = "relay_frame_received";
pub const RELAY_FRAME_SENT: &str = "relay_frame_sent";
pub const RELAY_SEND_FAILED: &str = "relay_send_failed";
pub const RELAY_SOURCE_CLOSED: &str = "relay_source_closed";
pub const RELAY_STREAM_CLOSED: &str = "relay_stream_closed";

// Topology and flow programming events.
pub const DEVICE_INFO: &str = "device_info";
pub const FLOW_UPDATE_START: &str = "flow_update_start";
pub const FLOW_UPDATE_DONE: &str = "flow_update_done";
pub const FLOW_DISPATCH_OUTCOME: &str = "flow_dispatch_outcome";

// Statistics events.
pub const STATS_START: &str = "stats_start";
pub const STATS_CHILD_OUTCOME: &str = "stats_child_outcome";
pub const STATS_DONE: &str = "stats_done";

// Remote device client events.
pub const REMOTE_CONNECT_START: &str = "remote_connect_start";
pub const REMOTE_CONNECT_FAILED: &str = "remote_connect_failed";
pub const REMOTE_CALL_FAILED: &str = "remote_call_failed";
pub const REMOTE_PLAINTEXT_TRANSPORT: &str = "remote_plaintext_transport";

// Simulated device events.
pub const SIM_FORWARD: &str = "sim_forward";
pub const SIM_FLOWS_INSTALLED: &str = "sim_flows_installed";
pub const SIM_INGRESS_DROPPED: &str = "sim_ingress_dropped";
