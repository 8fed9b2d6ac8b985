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

#![allow(dead_code)]

use ponsim_router::proto::pon_sim_client::PonSimClient;
use ponsim_router::proto::{Empty, FlowRule, PonSimMetrics};
use std::future::Future;
use std::time::Duration;
use tonic::transport::Channel;

pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

pub fn flow(id: u64) -> FlowRule {
    FlowRule {
        id,
        table_id: 0,
        priority: 1000,
        cookie: id,
        ..Default::default()
    }
}

pub fn counter(metrics: &PonSimMetrics, port: &str, name: &str) -> Option<i64> {
    metrics
        .metrics
        .iter()
        .find(|entry| entry.port_name == port)?
        .packets
        .iter()
        .find(|packet| packet.name == name)
        .map(|packet| packet.value)
}

/// Polls `check` until it returns `true` or [`WAIT_LIMIT`] elapses.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

pub async fn stats(client: &mut PonSimClient<Channel>) -> PonSimMetrics {
    client
        .get_stats(Empty {})
        .await
        .expect("GetStats always succeeds")
        .into_inner()
}
