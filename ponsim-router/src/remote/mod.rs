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

//! Outbound calls from a Terminal's router to the routers of its children.
//!
//! Every nested call opens its own connection and releases it before returning.
//! Nothing here is pooled or reused across calls.

pub(crate) mod remote_client;

use crate::device::DeviceLocation;
use crate::proto::{FlowTable, PonSimMetrics};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub use remote_client::{GrpcChildConnector, RemoteDeviceClient};

/// How nested calls authenticate the child they dial.
///
/// Has no default; every deployment names one.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChildTransportSecurity {
    /// Unencrypted HTTP/2 without any server identity check. Simulation only.
    Plaintext,
    /// TLS with the child's certificate verified against `ca_certificate`.
    Tls {
        ca_certificate: String,
        domain_name: String,
    },
}

/// Failures of one nested call to a child device.
#[derive(Debug)]
pub enum RemoteCallError {
    InvalidEndpoint {
        host: String,
        source: tonic::transport::Error,
    },
    TlsMaterial {
        path: String,
        source: std::io::Error,
    },
    Connect {
        host: String,
        source: tonic::transport::Error,
    },
    Rpc {
        host: String,
        status: tonic::Status,
    },
    /// The child did not complete the call within the configured call timeout.
    Timeout {
        host: String,
        after: Duration,
    },
}

impl Display for RemoteCallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteCallError::InvalidEndpoint { host, source } => {
                write!(f, "invalid endpoint for {host}: {source}")
            }
            RemoteCallError::TlsMaterial { path, source } => {
                write!(f, "unable to read TLS material {path}: {source}")
            }
            RemoteCallError::Connect { host, source } => {
                write!(f, "unable to connect to {host}: {source}")
            }
            RemoteCallError::Rpc { host, status } => write!(
                f,
                "call to {host} failed: {:?} {}",
                status.code(),
                status.message()
            ),
            RemoteCallError::Timeout { host, after } => {
                write!(f, "call to {host} timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl Error for RemoteCallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RemoteCallError::InvalidEndpoint { source, .. } => Some(source),
            RemoteCallError::TlsMaterial { source, .. } => Some(source),
            RemoteCallError::Connect { source, .. } => Some(source),
            RemoteCallError::Rpc { status, .. } => Some(status),
            RemoteCallError::Timeout { .. } => None,
        }
    }
}

/// Issues the nested calls a Terminal's router fans out to its children.
///
/// Each method performs exactly one outbound call against `location`.
#[async_trait]
pub trait ChildConnector: Send + Sync {
    async fn update_flow_table(
        &self,
        location: &DeviceLocation,
        table: FlowTable,
    ) -> Result<(), RemoteCallError>;

    async fn get_stats(&self, location: &DeviceLocation) -> Result<PonSimMetrics, RemoteCallError>;
}
