//! gRPC-backed [`ChildConnector`] with one short-lived connection per call.

use crate::device::DeviceLocation;
use crate::observability::events;
use crate::proto::pon_sim_client::PonSimClient;
use crate::proto::{Empty, FlowTable, PonSimMetrics};
use crate::remote::{ChildConnector, ChildTransportSecurity, RemoteCallError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, warn};

const COMPONENT: &str = "remote_client";

/// A connection to one child device, good for a single call.
///
/// Each call consumes the client, so the channel is dropped as soon as the
/// response (or error) is in hand.
pub struct RemoteDeviceClient {
    host: String,
    client: PonSimClient<Channel>,
}

impl RemoteDeviceClient {
    pub async fn connect(
        location: &DeviceLocation,
        tls: Option<&ClientTlsConfig>,
        connect_timeout: Duration,
    ) -> Result<Self, RemoteCallError> {
        let host = location.host();
        debug!(
            event = events::REMOTE_CONNECT_START,
            component = COMPONENT,
            host = host.as_str(),
            secure = tls.is_some(),
            "opening child connection"
        );

        let mut endpoint = Endpoint::from_shared(location.endpoint_uri(tls.is_some()))
            .map_err(|source| RemoteCallError::InvalidEndpoint {
                host: host.clone(),
                source,
            })?
            .connect_timeout(connect_timeout);

        if let Some(tls) = tls {
            endpoint = endpoint.tls_config(tls.clone()).map_err(|source| {
                RemoteCallError::InvalidEndpoint {
                    host: host.clone(),
                    source,
                }
            })?;
        }

        let channel = endpoint.connect().await.map_err(|source| {
            warn!(
                event = events::REMOTE_CONNECT_FAILED,
                component = COMPONENT,
                host = host.as_str(),
                err = %source,
                "child connection failed"
            );
            RemoteCallError::Connect {
                host: host.clone(),
                source,
            }
        })?;

        Ok(Self {
            host,
            client: PonSimClient::new(channel),
        })
    }

    pub async fn update_flow_table(mut self, table: FlowTable) -> Result<(), RemoteCallError> {
        let host = self.host;
        self.client
            .update_flow_table(table)
            .await
            .map(|_| ())
            .map_err(|status| RemoteCallError::Rpc { host, status })
    }

    pub async fn get_stats(mut self) -> Result<PonSimMetrics, RemoteCallError> {
        let host = self.host;
        self.client
            .get_stats(Empty {})
            .await
            .map(|response| response.into_inner())
            .map_err(|status| RemoteCallError::Rpc { host, status })
    }
}

/// Dials children over gRPC using the configured [`ChildTransportSecurity`].
///
/// `connect_timeout` bounds the TCP connect alone; `call_timeout` bounds a whole nested
/// call, connection setup included, so a child that accepts but never answers surfaces
/// as [`RemoteCallError::Timeout`].
#[derive(Clone)]
pub struct GrpcChildConnector {
    tls: Option<ClientTlsConfig>,
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl GrpcChildConnector {
    pub fn new(
        security: &ChildTransportSecurity,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self, RemoteCallError> {
        let tls = match security {
            ChildTransportSecurity::Plaintext => {
                warn!(
                    event = events::REMOTE_PLAINTEXT_TRANSPORT,
                    component = COMPONENT,
                    "child connections are unencrypted and unauthenticated; simulation use only"
                );
                None
            }
            ChildTransportSecurity::Tls {
                ca_certificate,
                domain_name,
            } => {
                let pem = std::fs::read_to_string(ca_certificate).map_err(|source| {
                    RemoteCallError::TlsMaterial {
                        path: ca_certificate.clone(),
                        source,
                    }
                })?;
                Some(
                    ClientTlsConfig::new()
                        .ca_certificate(Certificate::from_pem(pem))
                        .domain_name(domain_name.clone()),
                )
            }
        };

        Ok(Self {
            tls,
            connect_timeout,
            call_timeout,
        })
    }

    async fn connect(
        &self,
        location: &DeviceLocation,
    ) -> Result<RemoteDeviceClient, RemoteCallError> {
        RemoteDeviceClient::connect(location, self.tls.as_ref(), self.connect_timeout).await
    }

    async fn bounded<T, F>(
        &self,
        location: &DeviceLocation,
        call: F,
    ) -> Result<T, RemoteCallError>
    where
        F: Future<Output = Result<T, RemoteCallError>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(RemoteCallError::Timeout {
                    host: location.host(),
                    after: self.call_timeout,
                })
            })
    }
}

#[async_trait]
impl ChildConnector for GrpcChildConnector {
    async fn update_flow_table(
        &self,
        location: &DeviceLocation,
        table: FlowTable,
    ) -> Result<(), RemoteCallError> {
        let call = async {
            let client = self.connect(location).await?;
            client.update_flow_table(table).await
        };
        self.bounded(location, call).await.inspect_err(|err| {
            warn!(
                event = events::REMOTE_CALL_FAILED,
                component = COMPONENT,
                host = %location,
                err = %err,
                "forwarding flow table to child failed"
            );
        })
    }

    async fn get_stats(&self, location: &DeviceLocation) -> Result<PonSimMetrics, RemoteCallError> {
        let call = async {
            let client = self.connect(location).await?;
            client.get_stats().await
        };
        self.bounded(location, call).await.inspect_err(|err| {
            warn!(
                event = events::REMOTE_CALL_FAILED,
                component = COMPONENT,
                host = %location,
                err = %err,
                "forwarding stats request to child failed"
            );
        })
    }
}
