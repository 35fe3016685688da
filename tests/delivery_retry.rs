mod common;

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::http::StatusCode;
use common::{closed_endpoint, failing_stub, settings, slow_stub, spawn_stub, wait_until};
use rstest::rstest;
use snsim::{ActivityEntry, ActivityStatus, EventType, SnsService};

fn final_deliveries(svc: &SnsService) -> Vec<Arc<ActivityEntry>> {
    svc.activity()
        .entries_by_event_type(EventType::Delivery)
        .into_iter()
        .filter(|e| e.status != ActivityStatus::Retrying)
        .collect()
}

fn retries(svc: &SnsService) -> Vec<Arc<ActivityEntry>> {
    svc.activity()
        .entries_by_event_type(EventType::Delivery)
        .into_iter()
        .filter(|e| e.status == ActivityStatus::Retrying)
        .collect()
}

fn service_with_subscriber(
    max_retries: u32,
    backoff_ms: u64,
    endpoint: &str,
) -> (SnsService, String) {
    let svc = SnsService::new(&settings(max_retries, backoff_ms)).unwrap();
    let topic = svc.create_topic("orders", HashMap::new()).unwrap().topic_arn;
    svc.subscribe(&topic, "http", endpoint).unwrap();
    (svc, topic)
}

/// Always-500 endpoint with three retries and a 100 ms base: four attempts,
/// three retry entries with doubling waits, one final failure.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_errors_retried_with_backoff() {
    let stub = failing_stub(StatusCode::INTERNAL_SERVER_ERROR).await;
    let (svc, topic) = service_with_subscriber(3, 100, &stub.url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(stub.hits(), 4);

    let retries = retries(&svc);
    let waits: Vec<u64> = retries.iter().map(|e| e.duration_ms()).collect();
    assert_eq!(waits, vec![100, 200, 400]);
    let texts: Vec<&str> = retries.iter().filter_map(|e| e.error.as_deref()).collect();
    assert_eq!(
        texts,
        vec!["retry attempt 1/3", "retry attempt 2/3", "retry attempt 3/3"]
    );

    let finals = final_deliveries(&svc);
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].status, ActivityStatus::Failed);
    let error = finals[0].error.as_deref().unwrap();
    assert!(
        error.starts_with("delivery failed after 4 attempts: endpoint returned status 500"),
        "{error}"
    );
    assert!(finals[0].duration >= Duration::from_millis(700));
}

/// Non-retryable statuses fail on the first attempt.
#[rstest]
#[case(StatusCode::NOT_FOUND)]
#[case(StatusCode::BAD_REQUEST)]
#[case(StatusCode::FORBIDDEN)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_errors_not_retried(#[case] status: StatusCode) {
    let stub = failing_stub(status).await;
    let (svc, topic) = service_with_subscriber(3, 100, &stub.url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(stub.hits(), 1);
    assert!(retries(&svc).is_empty());

    let finals = final_deliveries(&svc);
    assert_eq!(finals[0].status, ActivityStatus::Failed);
    let expected = format!("endpoint returned status {}: stub failure 1", status.as_u16());
    assert_eq!(finals[0].error.as_deref(), Some(expected.as_str()));
}

/// 429 and 408 count as transient.
#[rstest]
#[case(StatusCode::TOO_MANY_REQUESTS)]
#[case(StatusCode::REQUEST_TIMEOUT)]
#[case(StatusCode::SERVICE_UNAVAILABLE)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transient_then_success(#[case] status: StatusCode) {
    let stub = spawn_stub(2, status, "ok").await;
    let (svc, topic) = service_with_subscriber(3, 10, &stub.url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(stub.hits(), 3);
    assert_eq!(retries(&svc).len(), 2);
    let finals = final_deliveries(&svc);
    assert_eq!(finals[0].status, ActivityStatus::Success);
    assert!(finals[0].error.is_none());
}

/// Connection failures are retried like 5xx answers.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transport_failure_exhausts() {
    let url = closed_endpoint().await;
    let (svc, topic) = service_with_subscriber(2, 10, &url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(retries(&svc).len(), 2);
    let error = final_deliveries(&svc)[0].error.clone().unwrap();
    assert!(
        error.starts_with("delivery failed after 3 attempts: HTTP request failed"),
        "{error}"
    );
}

/// Zero retries means exactly one attempt.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_retries() {
    let stub = failing_stub(StatusCode::BAD_GATEWAY).await;
    let (svc, topic) = service_with_subscriber(0, 100, &stub.url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(stub.hits(), 1);
    assert!(retries(&svc).is_empty());
    assert!(final_deliveries(&svc)[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("delivery failed after 1 attempts"));
}

/// Shutdown during a backoff wait ends the delivery at once.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_cancels_backoff() {
    let stub = failing_stub(StatusCode::INTERNAL_SERVER_ERROR).await;
    let (svc, topic) = service_with_subscriber(3, 10_000, &stub.url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| retries(&svc).len() == 1).await;

    svc.shutdown();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(stub.hits(), 1);
    let finals = final_deliveries(&svc);
    assert_eq!(finals[0].status, ActivityStatus::Failed);
    assert_eq!(finals[0].error.as_deref(), Some("delivery cancelled"));
    assert!(finals[0].duration < Duration::from_secs(5));
}

/// Shutdown while a request is still waiting on the endpoint aborts it
/// without further attempts.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_cancels_in_flight_request() {
    let stub = slow_stub(Duration::from_secs(10)).await;
    let (svc, topic) = service_with_subscriber(3, 10, &stub.url);

    svc.publish(&topic, None, "hello").unwrap();
    wait_until(|| stub.hits() == 1).await;

    svc.shutdown();
    wait_until(|| !final_deliveries(&svc).is_empty()).await;

    assert_eq!(stub.hits(), 1);
    assert!(retries(&svc).is_empty());
    let finals = final_deliveries(&svc);
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].status, ActivityStatus::Failed);
    assert_eq!(finals[0].error.as_deref(), Some("delivery cancelled"));
    assert!(finals[0].duration < Duration::from_secs(2));
}
