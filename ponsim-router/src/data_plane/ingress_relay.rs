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

//! Ingress relay that drains a Terminal's outgoing frames onto a controller stream.

use crate::device::Device;
use crate::frame::Frame;
use crate::observability::{events, fields};
use crate::proto::PonSimFrame;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;
use tonic::Status;
use tracing::{debug, error, info, warn, Level};

const COMPONENT: &str = "ingress_relay";

/// Terminal condition of a relay that reached the streaming state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelayError {
    /// The device's outgoing channel has no more producers.
    SourceClosed,
    /// The controller stream could not accept a frame.
    StreamWrite(String),
}

impl RelayError {
    pub fn to_status(&self) -> Status {
        match self {
            RelayError::SourceClosed => Status::unavailable("incoming data channel has closed"),
            RelayError::StreamWrite(reason) => {
                Status::aborted(format!("failed to send incoming data: {reason}"))
            }
        }
    }
}

impl Display for RelayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::SourceClosed => write!(f, "incoming data channel has closed"),
            RelayError::StreamWrite(reason) => write!(f, "stream write failed: {reason}"),
        }
    }
}

impl Error for RelayError {}

/// Destination of relayed frames, usually the response half of a gRPC stream.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn write(&self, frame: PonSimFrame) -> Result<(), RelayError>;

    /// Resolves once the consumer has gone away and no further write can succeed.
    async fn closed(&self);
}

#[async_trait]
impl FrameSink for mpsc::Sender<Result<PonSimFrame, Status>> {
    async fn write(&self, frame: PonSimFrame) -> Result<(), RelayError> {
        self.send(Ok(frame))
            .await
            .map_err(|_| RelayError::StreamWrite(fields::REASON_STREAM_CLOSED.to_string()))
    }

    async fn closed(&self) {
        mpsc::Sender::closed(self).await
    }
}

/// Relays ingress frames for one stream call.
pub struct IngressStreamRelay {
    device: Device,
}

impl IngressStreamRelay {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Streams frames in arrival order until the source closes or the sink fails.
    ///
    /// Returns `Ok(())` only when the device is not a Terminal, in which case nothing
    /// is streamed. A Terminal relay always ends with a [`RelayError`].
    pub async fn run<S>(&self, sink: &S) -> Result<(), RelayError>
    where
        S: FrameSink + ?Sized,
    {
        let terminal = match &self.device {
            Device::Terminal(terminal) => terminal.clone(),
            Device::Subscriber(subscriber) => {
                error!(
                    event = events::RELAY_NOT_TERMINAL,
                    component = COMPONENT,
                    device = %subscriber.location(),
                    role = fields::ROLE_SUBSCRIBER,
                    "not handling an OLT device; no frames to relay"
                );
                return Ok(());
            }
        };

        let device_id = terminal.location().address.clone();
        let source = terminal.outgoing_frames();

        info!(
            event = events::RELAY_START,
            component = COMPONENT,
            device = device_id.as_str(),
            "receiving frames from OLT device"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = sink.closed() => {
                    info!(
                        event = events::RELAY_STREAM_CLOSED,
                        component = COMPONENT,
                        device = device_id.as_str(),
                        reason = fields::REASON_STREAM_CLOSED,
                        "controller stream closed; releasing outgoing channel"
                    );
                    return Err(RelayError::StreamWrite(
                        fields::REASON_STREAM_CLOSED.to_string(),
                    ));
                }
                next = source.next() => next,
            };

            let Some(payload) = next else {
                warn!(
                    event = events::RELAY_SOURCE_CLOSED,
                    component = COMPONENT,
                    device = device_id.as_str(),
                    reason = fields::REASON_SOURCE_CLOSED,
                    "incoming data channel has closed"
                );
                return Err(RelayError::SourceClosed);
            };

            let frame = Frame::new(payload);
            let summary = tracing::enabled!(Level::DEBUG).then(|| fields::format_frame(&frame));
            if let Some(summary) = summary.as_deref() {
                debug!(
                    event = events::RELAY_FRAME_RECEIVED,
                    component = COMPONENT,
                    device = device_id.as_str(),
                    frame = summary,
                    "received incoming data"
                );
            }

            let envelope = PonSimFrame {
                id: device_id.clone(),
                payload: frame.into_payload(),
            };
            if let Err(err) = sink.write(envelope).await {
                error!(
                    event = events::RELAY_SEND_FAILED,
                    component = COMPONENT,
                    device = device_id.as_str(),
                    err = %err,
                    "failed to send incoming data"
                );
                return Err(err);
            }

            if let Some(summary) = summary.as_deref() {
                debug!(
                    event = events::RELAY_FRAME_SENT,
                    component = COMPONENT,
                    device = device_id.as_str(),
                    frame = summary,
                    "sent incoming data"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameSink, IngressStreamRelay, RelayError};
    use crate::device::{Device, OutgoingFrames};
    use crate::proto::PonSimFrame;
    use crate::test_support::{FakeSubscriber, FakeTerminal};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex, Notify};

    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<PonSimFrame>>,
        fail_on_write: Option<usize>,
        attempts: Mutex<usize>,
        closed: Notify,
    }

    impl RecordingSink {
        fn failing_on(write_index: usize) -> Self {
            Self {
                fail_on_write: Some(write_index),
                ..Default::default()
            }
        }

        async fn payloads(&self) -> Vec<Vec<u8>> {
            self.written
                .lock()
                .await
                .iter()
                .map(|frame| frame.payload.clone())
                .collect()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn write(&self, frame: PonSimFrame) -> Result<(), RelayError> {
            let mut attempts = self.attempts.lock().await;
            let index = *attempts;
            *attempts += 1;
            if self.fail_on_write == Some(index) {
                return Err(RelayError::StreamWrite("broken pipe".to_string()));
            }
            self.written.lock().await.push(frame);
            Ok(())
        }

        async fn closed(&self) {
            self.closed.notified().await
        }
    }

    fn terminal_with_frames(frames: Vec<Vec<u8>>) -> Device {
        let (tx, outgoing) = OutgoingFrames::channel(frames.len().max(1));
        for frame in frames {
            tx.try_send(frame).expect("channel has capacity");
        }
        drop(tx);
        Device::Terminal(Arc::new(FakeTerminal::with_outgoing("olt-1", outgoing)))
    }

    #[tokio::test]
    async fn relays_in_order_then_signals_source_closed() {
        let relay =
            IngressStreamRelay::new(terminal_with_frames(vec![b"A".to_vec(), b"B".to_vec()]));
        let sink = RecordingSink::default();

        let result = relay.run(&sink).await;

        assert_eq!(result, Err(RelayError::SourceClosed));
        assert_eq!(sink.payloads().await, vec![b"A".to_vec(), b"B".to_vec()]);
        let written = sink.written.lock().await;
        assert!(written.iter().all(|frame| frame.id == "olt-1"));
    }

    #[tokio::test]
    async fn write_failure_terminates_without_redelivery() {
        let relay = IngressStreamRelay::new(terminal_with_frames(vec![
            b"A".to_vec(),
            b"B".to_vec(),
            b"C".to_vec(),
        ]));
        let sink = RecordingSink::failing_on(1);

        let result = relay.run(&sink).await;

        assert_eq!(
            result,
            Err(RelayError::StreamWrite("broken pipe".to_string()))
        );
        assert_eq!(sink.payloads().await, vec![b"A".to_vec()]);
        assert_eq!(*sink.attempts.lock().await, 2);
    }

    #[tokio::test]
    async fn subscriber_returns_without_streaming() {
        let relay = IngressStreamRelay::new(Device::Subscriber(Arc::new(FakeSubscriber::new(
            "onu-1",
        ))));
        let sink = RecordingSink::default();

        assert_eq!(relay.run(&sink).await, Ok(()));
        assert!(sink.payloads().await.is_empty());
    }

    #[tokio::test]
    async fn undecodable_frames_are_relayed_verbatim() {
        let relay = IngressStreamRelay::new(terminal_with_frames(vec![vec![0x01, 0x02]]));
        let sink = RecordingSink::default();

        let _ = relay.run(&sink).await;

        assert_eq!(sink.payloads().await, vec![vec![0x01, 0x02]]);
    }

    #[tokio::test]
    async fn controller_disconnect_releases_the_outgoing_channel() {
        let (tx, outgoing) = OutgoingFrames::channel(4);
        let device = Device::Terminal(Arc::new(FakeTerminal::with_outgoing(
            "olt-1",
            outgoing.clone(),
        )));
        let (stream_tx, stream_rx) = mpsc::channel::<Result<PonSimFrame, tonic::Status>>(4);

        let relay_task = tokio::spawn(async move {
            IngressStreamRelay::new(device).run(&stream_tx).await
        });
        drop(stream_rx);

        let result = tokio::time::timeout(Duration::from_secs(2), relay_task)
            .await
            .expect("relay should stop promptly")
            .expect("relay task should not panic");
        assert!(matches!(result, Err(RelayError::StreamWrite(_))));

        // The subscription was released: another reader can take the next frame.
        tx.send(b"late".to_vec()).await.expect("channel open");
        let next = tokio::time::timeout(Duration::from_secs(2), outgoing.next())
            .await
            .expect("receiver should not be held by the stopped relay");
        assert_eq!(next, Some(b"late".to_vec()));
    }

    #[tokio::test]
    async fn mpsc_sink_reports_closed_receiver_as_write_failure() {
        let (stream_tx, stream_rx) = mpsc::channel::<Result<PonSimFrame, tonic::Status>>(1);
        drop(stream_rx);

        let result = stream_tx.write(PonSimFrame::default()).await;
        assert!(matches!(result, Err(RelayError::StreamWrite(_))));
    }
}
