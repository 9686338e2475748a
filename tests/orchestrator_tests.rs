mod common;

use axum::http::StatusCode;
use std::time::Duration;

use common::*;
use itmo_answer::admission::AdmissionController;
use itmo_answer::error::{Failure, Service};

async fn run(
    orchestrator: &itmo_answer::orchestrator::Orchestrator,
    id: i64,
    query: &str,
) -> Result<itmo_answer::data_models::ResultPayload, Failure> {
    let admission = AdmissionController::new(1, None, Duration::ZERO);
    let slot = admission.admit().await.unwrap();
    orchestrator.run(&slot, id, query).await
}

#[tokio::test]
async fn test_successful_run_echoes_id() {
    let upstream = MockUpstream::start(MockConfig {
        completion_body: completion_body("3 — Кронверкский проспект, 49"),
        ..MockConfig::default()
    })
    .await;
    let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);

    let payload = run(&orchestrator, 1234567, "Где главный корпус?").await.unwrap();

    assert_eq!(payload.id, 1234567);
    assert_eq!(payload.answer, Some(3));
    assert_eq!(
        payload.reasoning,
        "3 — Кронверкский проспект, 49\nСделано в YandexGPT."
    );
    assert_eq!(
        payload.sources,
        vec!["https://itmo.ru/history", "https://itmo.ru/about"]
    );
}

#[tokio::test]
async fn test_search_failures_short_circuit() {
    let cases = [
        MockConfig {
            search_status: StatusCode::BAD_GATEWAY,
            ..MockConfig::default()
        },
        MockConfig {
            search_body: search_body("", &[], &[]),
            ..MockConfig::default()
        },
        MockConfig {
            search_body: "{}".into(),
            ..MockConfig::default()
        },
    ];

    for config in cases {
        let upstream = MockUpstream::start(config).await;
        let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);

        let result = run(&orchestrator, 1, "q").await;

        assert!(result.is_err());
        assert_eq!(upstream.search_hits(), 1);
        assert_eq!(upstream.completion_hits(), 0);
    }
}

#[tokio::test]
async fn test_failure_kinds() {
    let upstream = MockUpstream::start(MockConfig {
        search_status: StatusCode::SERVICE_UNAVAILABLE,
        ..MockConfig::default()
    })
    .await;
    let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);
    assert!(matches!(
        run(&orchestrator, 1, "q").await,
        Err(Failure::UpstreamStatus {
            service: Service::Search,
            status: 503
        })
    ));

    let upstream = MockUpstream::start(MockConfig {
        search_body: search_body("", &[], &[]),
        ..MockConfig::default()
    })
    .await;
    let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);
    assert!(matches!(
        run(&orchestrator, 1, "q").await,
        Err(Failure::EmptyContent)
    ));

    let upstream = MockUpstream::start(MockConfig {
        completion_status: StatusCode::UNAUTHORIZED,
        ..MockConfig::default()
    })
    .await;
    let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);
    assert!(matches!(
        run(&orchestrator, 1, "q").await,
        Err(Failure::UpstreamStatus {
            service: Service::Completion,
            status: 401
        })
    ));

    let upstream = MockUpstream::start(MockConfig {
        completion_body: r#"{"result": {"alternatives": []}}"#.into(),
        ..MockConfig::default()
    })
    .await;
    let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);
    assert!(matches!(
        run(&orchestrator, 1, "q").await,
        Err(Failure::EmptyCompletion)
    ));

    let unreachable = unreachable_base_url();
    let orchestrator = build_orchestrator(&unreachable, &unreachable);
    assert!(matches!(
        run(&orchestrator, 1, "q").await,
        Err(Failure::Network {
            service: Service::Search,
            ..
        })
    ));

    let upstream = MockUpstream::start(MockConfig::default()).await;
    let orchestrator = build_orchestrator(&upstream.base_url, &unreachable);
    assert!(matches!(
        run(&orchestrator, 1, "q").await,
        Err(Failure::Network {
            service: Service::Completion,
            ..
        })
    ));

    let upstream = MockUpstream::start(MockConfig {
        completion_body: "not json".into(),
        ..MockConfig::default()
    })
    .await;
    let orchestrator = build_orchestrator(&upstream.base_url, &upstream.base_url);
    let failure = run(&orchestrator, 1, "q").await.unwrap_err();
    assert!(matches!(
        failure,
        Failure::MalformedResponse {
            service: Service::Completion,
            ..
        }
    ));
    assert!(failure.in_band().is_none());
}
