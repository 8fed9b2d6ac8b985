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

//! Ethernet frames exchanged with simulated devices.
//!
//! The router never inspects frames for routing decisions. [`Frame::summary`] exists
//! only to enrich logs, so a frame that fails to decode is still forwarded untouched.

use std::error::Error;
use std::fmt::{Display, Formatter};

const MAC_ADDRESS_LEN: usize = 6;
const ETHERTYPE_LEN: usize = 2;
const ETHERNET_HEADER_LEN: usize = 2 * MAC_ADDRESS_LEN + ETHERTYPE_LEN;
const VLAN_TAG_LEN: usize = 4;
const MAX_VLAN_TAGS: usize = 2;

const TPID_CUSTOMER_VLAN: u16 = 0x8100;
const TPID_SERVICE_VLAN: u16 = 0x88a8;
const TPID_LEGACY_QINQ: u16 = 0x9100;

/// Raw Ethernet frame. The bytes are never modified after construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    payload: Vec<u8>,
}

impl Frame {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Decodes the Ethernet II header and any stacked VLAN tags.
    pub fn summary(&self) -> Result<FrameSummary, FrameDecodeError> {
        if self.payload.len() < ETHERNET_HEADER_LEN {
            return Err(FrameDecodeError::Truncated {
                needed: ETHERNET_HEADER_LEN,
                actual: self.payload.len(),
            });
        }

        let destination = MacAddress::from_slice(&self.payload[..MAC_ADDRESS_LEN]);
        let source = MacAddress::from_slice(&self.payload[MAC_ADDRESS_LEN..2 * MAC_ADDRESS_LEN]);

        let mut offset = 2 * MAC_ADDRESS_LEN;
        let mut ethertype = read_u16(&self.payload, offset);
        let mut vlan_ids = Vec::new();

        while is_vlan_tpid(ethertype) && vlan_ids.len() < MAX_VLAN_TAGS {
            let needed = offset + VLAN_TAG_LEN + ETHERTYPE_LEN;
            if self.payload.len() < needed {
                return Err(FrameDecodeError::Truncated {
                    needed,
                    actual: self.payload.len(),
                });
            }
            let tci = read_u16(&self.payload, offset + ETHERTYPE_LEN);
            vlan_ids.push(tci & 0x0fff);
            offset += VLAN_TAG_LEN;
            ethertype = read_u16(&self.payload, offset);
        }

        Ok(FrameSummary {
            destination,
            source,
            ethertype,
            vlan_ids,
        })
    }
}

impl From<Vec<u8>> for Frame {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn is_vlan_tpid(ethertype: u16) -> bool {
    matches!(
        ethertype,
        TPID_CUSTOMER_VLAN | TPID_SERVICE_VLAN | TPID_LEGACY_QINQ
    )
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MacAddress([u8; MAC_ADDRESS_LEN]);

impl MacAddress {
    fn from_slice(bytes: &[u8]) -> Self {
        let mut octets = [0u8; MAC_ADDRESS_LEN];
        octets.copy_from_slice(bytes);
        Self(octets)
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Decoded header fields of a [`Frame`], used for diagnostics only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameSummary {
    pub destination: MacAddress,
    pub source: MacAddress,
    /// Ethertype of the innermost payload, after any VLAN tags.
    pub ethertype: u16,
    /// VLAN identifiers, outermost first.
    pub vlan_ids: Vec<u16>,
}

impl Display for FrameSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "src={} dst={} ethertype=0x{:04x}",
            self.source, self.destination, self.ethertype
        )?;
        if !self.vlan_ids.is_empty() {
            write!(f, " vlans={:?}", self.vlan_ids)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FrameDecodeError {
    Truncated { needed: usize, actual: usize },
}

impl Display for FrameDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameDecodeError::Truncated { needed, actual } => {
                write!(f, "truncated frame: need {needed} bytes, got {actual}")
            }
        }
    }
}

impl Error for FrameDecodeError {}
