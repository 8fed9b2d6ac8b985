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

mod support;

use integration_test_utils::{spawn_subscriber, spawn_terminal};
use ponsim_router::device::DeviceLocation;
use ponsim_router::proto::Empty;
use ponsim_router::RouterSettings;
use std::sync::Arc;
use std::time::Duration;
use support::WAIT_LIMIT;
use tokio::time::timeout;
use tonic::Code;

fn child() -> Vec<(i32, DeviceLocation)> {
    vec![(128, DeviceLocation::new("127.0.0.1", 1))]
}

#[tokio::test(flavor = "multi_thread")]
async fn frames_from_the_pon_are_streamed_in_order() {
    integration_test_utils::init_logging();

    let (olt, olt_device) = spawn_terminal(child(), RouterSettings::default()).await;
    let mut stream = olt
        .client()
        .await
        .receive_frames(Empty {})
        .await
        .expect("ReceiveFrames")
        .into_inner();

    for payload in [b"A".to_vec(), b"B".to_vec()] {
        olt_device
            .inject_ingress(128, payload)
            .await
            .expect("ingress frame queued");
    }

    let first = timeout(WAIT_LIMIT, stream.message())
        .await
        .expect("first frame in time")
        .expect("stream healthy")
        .expect("frame present");
    let second = timeout(WAIT_LIMIT, stream.message())
        .await
        .expect("second frame in time")
        .expect("stream healthy")
        .expect("frame present");

    assert_eq!(first.payload, b"A".to_vec());
    assert_eq!(second.payload, b"B".to_vec());
    assert_eq!(first.id, "127.0.0.1");
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_ingress_channel_ends_the_stream_with_unavailable() {
    integration_test_utils::init_logging();

    let (olt, olt_device) = spawn_terminal(child(), RouterSettings::default()).await;
    let mut stream = olt
        .client()
        .await
        .receive_frames(Empty {})
        .await
        .expect("ReceiveFrames")
        .into_inner();

    olt_device.close_ingress().await;

    let status = timeout(WAIT_LIMIT, stream.message())
        .await
        .expect("stream ends in time")
        .expect_err("stream ends with a status");
    assert_eq!(status.code(), Code::Unavailable);
}

#[tokio::test(flavor = "multi_thread")]
async fn subscriber_stream_completes_without_frames() {
    integration_test_utils::init_logging();

    let (onu, _) = spawn_subscriber().await;
    let mut stream = onu
        .client()
        .await
        .receive_frames(Empty {})
        .await
        .expect("ReceiveFrames")
        .into_inner();

    let next = timeout(WAIT_LIMIT, stream.message())
        .await
        .expect("stream ends in time")
        .expect("clean end of stream");
    assert!(next.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn a_new_controller_stream_takes_over_after_disconnect() {
    integration_test_utils::init_logging();

    let (olt, olt_device) = spawn_terminal(child(), RouterSettings::default()).await;
    let mut client = olt.client().await;

    let first = client
        .receive_frames(Empty {})
        .await
        .expect("ReceiveFrames")
        .into_inner();
    drop(first);

    let mut second = client
        .receive_frames(Empty {})
        .await
        .expect("ReceiveFrames")
        .into_inner();

    // A frame may still be claimed by the old relay before it notices the disconnect.
    let producer = Arc::clone(&olt_device);
    let feeder = tokio::spawn(async move {
        loop {
            let _ = producer.inject_ingress(128, b"late".to_vec()).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let frame = timeout(WAIT_LIMIT, second.message())
        .await
        .expect("frame in time")
        .expect("stream healthy")
        .expect("frame present");
    feeder.abort();

    assert_eq!(frame.payload, b"late".to_vec());
}
