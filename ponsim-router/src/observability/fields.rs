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

//! Canonical structured field keys and value-format helpers.

use crate::frame::Frame;
use crate::proto::FlowRule;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const DEVICE: &str = "device";
pub const ROLE: &str = "role";
pub const PORT: &str = "port";
pub const HOST: &str = "host";
pub const FRAME: &str = "frame";
pub const FLOWS: &str = "flows";
pub const OUTCOME: &str = "outcome";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const ROLE_TERMINAL: &str = "terminal";
pub const ROLE_SUBSCRIBER: &str = "subscriber";
pub const REASON_SOURCE_CLOSED: &str = "source_closed";
pub const REASON_STREAM_CLOSED: &str = "stream_closed";

/// Renders the diagnostic view of a frame, falling back to its length when undecodable.
pub fn format_frame(frame: &Frame) -> String {
    match frame.summary() {
        Ok(summary) => summary.to_string(),
        Err(err) => format!("undecodable ({err}, {} bytes)", frame.len()),
    }
}

/// Renders a flow set as a compact list of rule identifiers.
pub fn format_flow_ids(flows: &[FlowRule]) -> String {
    if flows.is_empty() {
        return NONE.to_string();
    }

    let ids: Vec<String> = flows.iter().map(|flow| flow.id.to_string()).collect();
    format!("[{}]", ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::{format_flow_ids, format_frame, NONE};
    use crate::frame::Frame;
    use crate::proto::FlowRule;

    #[test]
    fn format_flow_ids_lists_rule_ids_in_order() {
        let flows = vec![
            FlowRule {
                id: 7,
                ..Default::default()
            },
            FlowRule {
                id: 3,
                ..Default::default()
            },
        ];

        assert_eq!(format_flow_ids(&flows), "[7,3]");
        assert_eq!(format_flow_ids(&[]), NONE);
    }

    #[test]
    fn format_frame_reports_length_for_truncated_frames() {
        let frame = Frame::new(vec![0xff; 5]);

        assert!(format_frame(&frame).contains("5 bytes"));
    }
}
