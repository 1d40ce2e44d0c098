// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request(model: &str) -> CortexRequest {
    CortexRequest {
        model: model.into(),
        prompt: "compress these three memories".into(),
        max_tokens: 512,
        timeout_ms: 5_000,
    }
}

#[tokio::test]
async fn command_adapter_completes_with_empty_output() {
    let adapter = CommandCortexAdapter::new(vec!["true".into()]);
    let response = adapter.complete(&request("haiku")).await.unwrap();
    assert_eq!(response.model, "haiku");
    assert_eq!(response.text, "");
}

#[tokio::test]
async fn failing_command_maps_to_provider_error() {
    let adapter = CommandCortexAdapter::new(vec!["false".into()]);
    let err = adapter.complete(&request("haiku")).await.unwrap_err();
    assert!(matches!(err, CortexError::Provider { status: 500, .. }));
}

#[tokio::test]
async fn missing_binary_is_transport_error() {
    let adapter = CommandCortexAdapter::new(vec!["no-such-cortex-shim".into()]);
    let err = adapter.complete(&request("haiku")).await.unwrap_err();
    assert!(matches!(err, CortexError::Transport(_)));
}

#[tokio::test]
async fn slow_command_times_out() {
    let adapter = CommandCortexAdapter::new(vec!["sh".into(), "-c".into(), "sleep 5".into()]);
    let mut req = request("haiku");
    req.timeout_ms = 50;
    let err = adapter.complete(&req).await.unwrap_err();
    assert!(matches!(err, CortexError::Timeout(50)));
}
