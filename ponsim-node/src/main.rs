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

mod config;

use crate::config::{Config, DeviceRole};
use anyhow::Context;
use clap::Parser;
use ponsim_router::device::{Device, DeviceLocation, StaticChildRegistry};
use ponsim_router::remote::GrpcChildConnector;
use ponsim_router::simulation::{SimulatedSubscriber, SimulatedTerminal};
use ponsim_router::{FrameRouter, RouterSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Serve one simulated PON device over gRPC")]
struct NodeArgs {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();

    let args = NodeArgs::parse();
    let config = Config::load(&args.config)?;

    let location = DeviceLocation::new(&config.device.address, config.device.port);
    let device = build_device(&config, location.clone())?;

    let connector = GrpcChildConnector::new(
        &config.child_transport,
        Duration::from_millis(config.router.connect_timeout_ms),
        Duration::from_millis(config.router.call_timeout_ms),
    )
    .context("unable to set up child connections")?;
    let settings = RouterSettings {
        stats_fanout_concurrency: config.router.stats_fanout_concurrency,
        relay_buffer: config.router.relay_buffer,
    };
    let router = FrameRouter::new(device, Arc::new(connector), settings);

    let mut server = Server::builder();
    if let Some(tls) = &config.server_tls {
        let certificate = std::fs::read_to_string(&tls.certificate)
            .with_context(|| format!("unable to read server certificate {}", tls.certificate))?;
        let key = std::fs::read_to_string(&tls.key)
            .with_context(|| format!("unable to read server key {}", tls.key))?;
        server = server
            .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(certificate, key)))
            .context("invalid server TLS configuration")?;
    }

    let listen = SocketAddr::from(([0, 0, 0, 0], config.device.port));
    info!(
        name = config.device.name.as_str(),
        role = router.device().role(),
        device = %location,
        %listen,
        "Started ponsim-node"
    );

    server
        .add_service(router.into_service())
        .serve_with_shutdown(listen, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("gRPC server failed")?;

    Ok(())
}

/// Builds the simulated device the node serves.
///
/// The node has no packet source of its own: a Terminal's outgoing channel is only fed
/// through `SimulatedTerminal::inject_ingress`, so `ReceiveFrames` on a standalone node
/// stays open without yielding frames.
fn build_device(config: &Config, location: DeviceLocation) -> anyhow::Result<Device> {
    match config.device.role {
        DeviceRole::Terminal => {
            let registry = StaticChildRegistry::from_children(config.children.iter().map(
                |child| {
                    (
                        child.uni_port,
                        DeviceLocation::new(&child.address, child.port),
                    )
                },
            ))
            .context("invalid child list")?;
            info!(
                name = config.device.name.as_str(),
                children = registry.len(),
                "provisioned terminal children"
            );
            let terminal = SimulatedTerminal::new(location, registry, config.outgoing_queue_size);
            Ok(Device::terminal(Arc::new(terminal)))
        }
        DeviceRole::Subscriber => Ok(Device::subscriber(Arc::new(SimulatedSubscriber::new(
            location,
        )))),
    }
}
