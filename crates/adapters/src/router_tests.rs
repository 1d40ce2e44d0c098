// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::FakeCortexAdapter;
use medulla_core::FakeClock;

fn config() -> CortexConfig {
    let mut config = CortexConfig::default();
    config.default_model = "haiku".into();
    config.fallback_models = vec!["sonnet".into(), "opus".into()];
    config.attempt_budget = 3;
    config
        .task_policies
        .insert("distill".into(), "sonnet".into());
    config
}

fn router(adapter: FakeCortexAdapter) -> CortexRouter<FakeCortexAdapter, FakeClock> {
    CortexRouter::new(Arc::new(adapter), config(), FakeClock::new())
}

#[test]
fn chain_prefers_override_then_policy_then_default() {
    let r = router(FakeCortexAdapter::new());

    let chain = r.candidates("distill", Some("opus"));
    assert_eq!(chain[0], ("opus".to_string(), RouteType::UserOverride));

    let chain = r.candidates("distill", None);
    assert_eq!(chain[0], ("sonnet".to_string(), RouteType::TaskPolicy));
    // sonnet also appears in fallbacks; dedup keeps one entry
    assert_eq!(chain.iter().filter(|(m, _)| m == "sonnet").count(), 1);

    let chain = r.candidates("unknown-task", None);
    assert_eq!(chain[0], ("haiku".to_string(), RouteType::SystemDefault));
    assert_eq!(chain.len(), 3);
}

#[tokio::test]
async fn first_success_short_circuits() {
    let adapter = FakeCortexAdapter::new();
    adapter.push_text("fine");
    let r = router(adapter.clone());

    let response = r.complete("x", None, "prompt here", 128).await.unwrap();
    assert_eq!(response.text, "fine");
    assert_eq!(adapter.requests().len(), 1);
    assert_eq!(adapter.requests()[0].model, "haiku");
}

#[tokio::test]
async fn falls_back_down_the_chain_and_fires_telemetry() {
    let adapter = FakeCortexAdapter::new();
    adapter.push_error(CortexError::Timeout(30_000));
    adapter.push_error(CortexError::Provider {
        status: 529,
        message: "overloaded".into(),
    });
    adapter.push_text("third time lucky");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let r = router(adapter.clone()).with_telemetry(tx);

    let response = r.complete("x", None, "prompt", 128).await.unwrap();
    assert_eq!(response.text, "third time lucky");
    assert_eq!(response.model, "opus");

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 3);
    assert!(!events[0].success);
    assert_eq!(events[0].fallback_reason.as_deref(), Some("Timeout"));
    assert!(!events[1].success);
    assert!(events[2].success);
    assert_eq!(events[2].selected_model, "opus");
}

#[tokio::test]
async fn budget_bounds_attempts() {
    let adapter = FakeCortexAdapter::new();
    for _ in 0..5 {
        adapter.push_error(CortexError::Capacity("full".into()));
    }
    let mut cfg = config();
    cfg.attempt_budget = 2;
    let r = CortexRouter::new(Arc::new(adapter.clone()), cfg, FakeClock::new());

    let err = r.complete("x", None, "prompt", 128).await.unwrap_err();
    assert!(matches!(err, CortexError::Capacity(_)));
    assert_eq!(adapter.requests().len(), 2);
}

#[test]
fn error_classification_covers_the_signatures() {
    assert_eq!(
        classify_cortex_error(&CortexError::Timeout(1)),
        CortexFailureKind::Timeout
    );
    assert_eq!(
        classify_cortex_error(&CortexError::Provider {
            status: 503,
            message: "unavailable".into()
        }),
        CortexFailureKind::Provider5xx
    );
    assert_eq!(
        classify_cortex_error(&CortexError::Provider {
            status: 429,
            message: "capacity exceeded".into()
        }),
        CortexFailureKind::Capacity
    );
    assert_eq!(
        classify_cortex_error(&CortexError::Capacity("x".into())),
        CortexFailureKind::Capacity
    );
    assert_eq!(
        classify_cortex_error(&CortexError::PolicyRejected("no".into())),
        CortexFailureKind::PolicyOverride
    );
    assert_eq!(
        classify_cortex_error(&CortexError::Transport("conn reset".into())),
        CortexFailureKind::Provider5xx
    );
}
