//! Integration tests for job polling against mocked platform APIs.

use std::time::{Duration, Instant};

use gpu_jobs::{
    Config, Credentials, JobError, JobHandle, JobOptions, JobRunner, Platform, PollPolicy, Task,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVAL: Duration = Duration::from_millis(20);

fn runner_for(server: &MockServer, timeout: Option<Duration>) -> JobRunner {
    let config = Config::new(Credentials::new(
        Some("lightning-key".to_string()),
        Some("paperspace-key".to_string()),
        None,
    ))
    .with_base_url(Platform::Lightning, server.uri())
    .with_base_url(Platform::Paperspace, server.uri())
    .with_poll_policy(PollPolicy {
        interval: INTERVAL,
        timeout,
    });
    JobRunner::new(config)
}

fn handle(platform: Platform, job_id: &str) -> JobHandle {
    JobHandle {
        job_id: job_id.to_string(),
        platform,
    }
}

async fn mount_status(server: &MockServer, job_id: &str, body: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/jobs/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_lightning_polls_until_completed() {
    let server = MockServer::start().await;
    mount_status(&server, "abc", json!({ "id": "abc", "status": "running" }), 2).await;
    mount_status(&server, "abc", json!({ "id": "abc", "status": "completed" }), 1).await;

    let runner = runner_for(&server, Some(Duration::from_secs(10)));
    let started = Instant::now();
    let result = runner.monitor(&handle(Platform::Lightning, "abc")).await.unwrap();

    assert_eq!(result.job_id, "abc");
    assert_eq!(result.platform, Platform::Lightning);
    assert_eq!(result.status, "completed");

    // Three polls, two sleeps in between.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert!(started.elapsed() >= INTERVAL * 2);
}

#[tokio::test]
async fn test_lightning_failure_states() {
    for state in ["failed", "cancelled"] {
        let server = MockServer::start().await;
        mount_status(&server, "job-1", json!({ "status": state }), 1).await;

        let runner = runner_for(&server, None);
        let err = runner
            .monitor(&handle(Platform::Lightning, "job-1"))
            .await
            .unwrap_err();

        match err {
            JobError::JobFailed { job_id, state: observed } => {
                assert_eq!(job_id, "job-1");
                assert_eq!(observed, state);
            }
            other => panic!("expected job failure, got {other}"),
        }
    }
}

#[tokio::test]
async fn test_paperspace_error_state_fails() {
    let server = MockServer::start().await;
    mount_status(&server, "ps-1", json!({ "state": "error" }), 1).await;

    let runner = runner_for(&server, None);
    let err = runner
        .monitor(&handle(Platform::Paperspace, "ps-1"))
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        JobError::JobFailed { job_id, state } if job_id == "ps-1" && state == "error"
    ));
    assert_eq!(err.to_string(), "Job ps-1 error");
}

#[tokio::test]
async fn test_paperspace_polls_until_stopped() {
    let server = MockServer::start().await;
    mount_status(&server, "ps-2", json!({ "state": "pending" }), 1).await;
    // Lightning's terminal values must not stop a Paperspace job.
    mount_status(&server, "ps-2", json!({ "state": "completed" }), 1).await;
    mount_status(&server, "ps-2", json!({ "state": "stopped" }), 1).await;

    let runner = runner_for(&server, Some(Duration::from_secs(10)));
    let result = runner
        .monitor(&handle(Platform::Paperspace, "ps-2"))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({ "job_id": "ps-2", "platform": "paperspace", "status": "completed" })
    );
}

#[tokio::test]
async fn test_missing_status_field_keeps_polling() {
    let server = MockServer::start().await;
    mount_status(&server, "abc", json!({ "id": "abc" }), 1).await;
    mount_status(&server, "abc", json!({ "status": "completed" }), 1).await;

    let runner = runner_for(&server, Some(Duration::from_secs(10)));
    let result = runner.monitor(&handle(Platform::Lightning, "abc")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_status_check_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/gone"))
        .and(header("Authorization", "Bearer lightning-key"))
        .respond_with(ResponseTemplate::new(404).set_body_string("job not found"))
        .expect(1)
        .mount(&server)
        .await;

    let runner = runner_for(&server, None);
    let err = runner
        .monitor(&handle(Platform::Lightning, "gone"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        JobError::StatusCheck { status: 404, ref body } if body == "job not found"
    ));
}

#[tokio::test]
async fn test_deadline_bounds_the_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "running" })))
        .mount(&server)
        .await;

    let runner = runner_for(&server, Some(Duration::from_millis(100)));
    let err = runner
        .monitor(&handle(Platform::Lightning, "slow"))
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Timeout { ref job_id, .. } if job_id == "slow"));
    assert!(server.received_requests().await.unwrap().len() >= 2);
}

#[tokio::test]
async fn test_cancellation_interrupts_the_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/long"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "running" })))
        .mount(&server)
        .await;

    let config = Config::new(Credentials::new(None, Some("paperspace-key".to_string()), None))
        .with_base_url(Platform::Paperspace, server.uri())
        .with_poll_policy(PollPolicy {
            interval: Duration::from_secs(3600),
            timeout: None,
        });
    let runner = JobRunner::new(config);

    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let err = runner
        .monitor(&handle(Platform::Paperspace, "long"))
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Cancelled { ref job_id } if job_id == "long"));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_run_submits_then_monitors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "run-1" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_status(&server, "run-1", json!({ "status": "completed" }), 1).await;

    let runner = runner_for(&server, Some(Duration::from_secs(10)));
    let result = runner
        .run(Platform::Lightning, Task::Finetune, "phi-2", &JobOptions::default())
        .await
        .unwrap();

    assert_eq!(result.job_id, "run-1");
}
