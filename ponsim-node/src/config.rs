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

use anyhow::{bail, Context};
use ponsim_router::device::UPLINK_PORT;
use ponsim_router::remote::ChildTransportSecurity;
use ponsim_router::{DEFAULT_RELAY_BUFFER, DEFAULT_STATS_FANOUT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 5000;
const DEFAULT_OUTGOING_QUEUE_SIZE: usize = 1024;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) device: DeviceConfig,
    #[serde(default)]
    pub(crate) children: Vec<ChildConfig>,
    pub(crate) child_transport: ChildTransportSecurity,
    #[serde(default)]
    pub(crate) server_tls: Option<ServerTlsConfig>,
    #[serde(default)]
    pub(crate) router: RouterConfig,
    #[serde(default = "default_outgoing_queue_size")]
    pub(crate) outgoing_queue_size: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Terminal,
    Subscriber,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub(crate) role: DeviceRole,
    pub(crate) name: String,
    /// Address other nodes use to reach this one; the server listens on all interfaces.
    pub(crate) address: String,
    pub(crate) port: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ChildConfig {
    pub(crate) uni_port: i32,
    pub(crate) address: String,
    pub(crate) port: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerTlsConfig {
    pub(crate) certificate: String,
    pub(crate) key: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(default = "default_stats_fanout_concurrency")]
    pub(crate) stats_fanout_concurrency: usize,
    #[serde(default = "default_relay_buffer")]
    pub(crate) relay_buffer: usize,
    #[serde(default = "default_connect_timeout_ms")]
    pub(crate) connect_timeout_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub(crate) call_timeout_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            stats_fanout_concurrency: default_stats_fanout_concurrency(),
            relay_buffer: default_relay_buffer(),
            connect_timeout_ms: default_connect_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

fn default_stats_fanout_concurrency() -> usize {
    DEFAULT_STATS_FANOUT_CONCURRENCY
}

fn default_relay_buffer() -> usize {
    DEFAULT_RELAY_BUFFER
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_outgoing_queue_size() -> usize {
    DEFAULT_OUTGOING_QUEUE_SIZE
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = json5::from_str(contents).context("unable to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.device.role == DeviceRole::Subscriber && !self.children.is_empty() {
            bail!(
                "subscriber {} cannot declare children",
                self.device.name
            );
        }

        let mut seen = HashSet::new();
        for child in &self.children {
            if child.uni_port == UPLINK_PORT {
                bail!(
                    "child {}:{} uses reserved port {UPLINK_PORT}",
                    child.address,
                    child.port
                );
            }
            if !seen.insert(child.uni_port) {
                bail!("duplicate child port {}", child.uni_port);
            }
        }

        if self.router.stats_fanout_concurrency == 0 {
            bail!("router.stats_fanout_concurrency must be at least 1");
        }
        if self.router.connect_timeout_ms == 0 || self.router.call_timeout_ms == 0 {
            bail!("router.connect_timeout_ms and router.call_timeout_ms must be at least 1");
        }
        if self.router.relay_buffer == 0 || self.outgoing_queue_size == 0 {
            bail!("relay_buffer and outgoing_queue_size must be at least 1");
        }
        Ok(())
    }
}
