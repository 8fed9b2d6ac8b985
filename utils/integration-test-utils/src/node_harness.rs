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

use ponsim_router::device::{Device, DeviceLocation, StaticChildRegistry};
use ponsim_router::proto::pon_sim_client::PonSimClient;
use ponsim_router::remote::{ChildTransportSecurity, GrpcChildConnector};
use ponsim_router::simulation::{SimulatedSubscriber, SimulatedTerminal};
use ponsim_router::{FrameRouter, RouterSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};
use tracing::debug;

const LOOPBACK: &str = "127.0.0.1";
const TEST_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const TEST_CALL_TIMEOUT: Duration = Duration::from_secs(1);
const TEST_QUEUE_SIZE: usize = 16;

/// Installs a test-writer subscriber once per process; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ponsim_router=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn plaintext_connector() -> Arc<GrpcChildConnector> {
    Arc::new(
        GrpcChildConnector::new(
            &ChildTransportSecurity::Plaintext,
            TEST_CONNECT_TIMEOUT,
            TEST_CALL_TIMEOUT,
        )
        .expect("plaintext connector needs no material"),
    )
}

/// A loopback location nothing is listening on.
pub async fn unreachable_location() -> DeviceLocation {
    let listener = TcpListener::bind((LOOPBACK, 0))
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    DeviceLocation::new(LOOPBACK, port)
}

/// A loopback child that accepts connections and never answers on them.
///
/// Connections are held until the returned task is aborted or the runtime shuts down.
pub async fn silent_child() -> (DeviceLocation, JoinHandle<()>) {
    let listener = TcpListener::bind((LOOPBACK, 0))
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    let holder = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (DeviceLocation::new(LOOPBACK, port), holder)
}

/// A router served on an ephemeral loopback port until stopped or dropped.
pub struct RunningNode {
    location: DeviceLocation,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<Result<(), tonic::transport::Error>>>,
}

impl RunningNode {
    pub fn location(&self) -> &DeviceLocation {
        &self.location
    }

    pub async fn client(&self) -> PonSimClient<Channel> {
        PonSimClient::connect(self.location.endpoint_uri(false))
            .await
            .expect("connect to in-process node")
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(server) = self.server.take() {
            server
                .await
                .expect("server task panicked")
                .expect("server failed");
        }
    }
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Binds a loopback port, builds the router for that location and serves it.
pub async fn spawn_router<F>(build: F) -> RunningNode
where
    F: FnOnce(DeviceLocation) -> FrameRouter,
{
    let listener = TcpListener::bind((LOOPBACK, 0))
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    let location = DeviceLocation::new(LOOPBACK, port);
    let router = build(location.clone());

    let (shutdown, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::builder()
            .add_service(router.into_service())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = stopped.await;
            }),
    );
    debug!(node = %location, "in-process node serving");

    RunningNode {
        location,
        shutdown: Some(shutdown),
        server: Some(server),
    }
}

pub async fn spawn_subscriber() -> (RunningNode, Arc<SimulatedSubscriber>) {
    let mut device = None;
    let node = spawn_router(|location| {
        let subscriber = Arc::new(SimulatedSubscriber::new(location));
        device = Some(subscriber.clone());
        FrameRouter::new(
            Device::subscriber(subscriber),
            plaintext_connector(),
            RouterSettings::default(),
        )
    })
    .await;
    (node, device.expect("router was built"))
}

pub async fn spawn_terminal(
    children: Vec<(i32, DeviceLocation)>,
    settings: RouterSettings,
) -> (RunningNode, Arc<SimulatedTerminal>) {
    let registry = StaticChildRegistry::from_children(children).expect("valid child ports");
    let mut device = None;
    let node = spawn_router(|location| {
        let terminal = Arc::new(SimulatedTerminal::new(location, registry, TEST_QUEUE_SIZE));
        device = Some(terminal.clone());
        FrameRouter::new(
            Device::terminal(terminal),
            plaintext_connector(),
            settings,
        )
    })
    .await;
    (node, device.expect("router was built"))
}
