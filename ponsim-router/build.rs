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

const PONSIM_PROTO: &str = "proto/ponsim.proto";
const PROTO_INCLUDE_DIR: &str = "proto";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // use vendored protoc instead of relying on user provided protobuf installation
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());

    println!("cargo:rerun-if-changed={PONSIM_PROTO}");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&[PONSIM_PROTO], &[PROTO_INCLUDE_DIR])?;

    Ok(())
}
