#![cfg(unix)]

mod common;

use axum::http::StatusCode;
use common::{
    TestApp, TestOptions, DOCX_BYTES, FAILING_ENGINE, PDF_BYTES, SELECTIVE_SLOW_ENGINE,
    STALLED_ENGINE,
};
use conversion_service::dtos::{TaskResponse, TaskSubmittedResponse};
use conversion_service::models::TaskStatus;
use std::time::{Duration, Instant};

const SLOW_ENGINE: &str = "sleep 3\nexit 1\n";

async fn submit(app: &TestApp, path: &str, filename: &str, data: &[u8]) -> TaskSubmittedResponse {
    let response = app.upload(path, filename, data).await;
    assert_eq!(StatusCode::ACCEPTED, response.status());
    response.json().await.expect("Failed to parse JSON")
}

async fn status(app: &TestApp, task_id: &str) -> (StatusCode, Option<TaskResponse>) {
    let response = app
        .client
        .get(format!(
            "{}/api/convert/task/status?taskId={}",
            app.address, task_id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    let code = response.status();
    if code == StatusCode::OK {
        (code, Some(response.json().await.expect("Failed to parse JSON")))
    } else {
        (code, None)
    }
}

/// Poll until the task reaches a terminal state.
async fn wait_for_task(app: &TestApp, task_id: &str) -> TaskResponse {
    for _ in 0..100 {
        let (_, task) = status(app, task_id).await;
        let task = task.expect("Task disappeared");
        if task.status.is_terminal() {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Task {} did not finish in time", task_id);
}

#[tokio::test]
async fn word_to_pdf_task_completes_and_downloads() {
    let app = TestApp::spawn().await;

    let submitted = submit(&app, "/api/convert/word-to-pdf", "contract.docx", DOCX_BYTES).await;
    assert_eq!(submitted.status, TaskStatus::Pending);
    assert_eq!(
        submitted.status_url,
        format!("/api/convert/task/status?taskId={}", submitted.task_id)
    );

    let task = wait_for_task(&app, &submitted.task_id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.original_filename, "contract.docx");
    let file_url = task.file_url.expect("Completed task without file_url");
    assert_eq!(
        file_url,
        format!("/api/convert/task/{}/download", submitted.task_id)
    );

    let response = app
        .client
        .get(format!("{}{}", app.address, file_url))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(response.headers()["content-type"], "application/pdf");
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("filename=\"contract.pdf\""));
    assert!(response.bytes().await.unwrap().starts_with(b"%PDF"));
}

#[tokio::test]
async fn pdf_to_doc_task_produces_doc() {
    let app = TestApp::spawn().await;

    let submitted = submit(&app, "/api/convert/pdf-to-doc", "thesis.pdf", PDF_BYTES).await;
    let task = wait_for_task(&app, &submitted.task_id).await;
    assert_eq!(task.status, TaskStatus::Completed);

    let response = app
        .client
        .get(format!(
            "{}/api/convert/task/{}/download",
            app.address, submitted.task_id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(response.headers()["content-type"], "application/msword");
}

#[tokio::test]
async fn failed_task_reports_error() {
    let app = TestApp::spawn_with(TestOptions {
        engine: FAILING_ENGINE,
        ..Default::default()
    })
    .await;

    let submitted = submit(&app, "/api/convert/pdf-to-word", "scan.pdf", PDF_BYTES).await;
    let task = wait_for_task(&app, &submitted.task_id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.file_url.is_none());
    assert!(task.error_message.is_some());

    // Nothing is kept for failed tasks
    assert_eq!(app.leftover_files(), 0);
}

#[tokio::test]
async fn download_before_completion_is_rejected() {
    let app = TestApp::spawn_with(TestOptions {
        engine: SLOW_ENGINE,
        ..Default::default()
    })
    .await;

    let submitted = submit(&app, "/api/convert/word-to-pdf", "slow.docx", DOCX_BYTES).await;

    let response = app
        .client
        .get(format!(
            "{}/api/convert/task/{}/download",
            app.address, submitted.task_id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Task is not completed");
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let app = TestApp::spawn().await;

    let (code, _) = status(&app, "does-not-exist").await;
    assert_eq!(StatusCode::NOT_FOUND, code);

    let response = app
        .client
        .get(format!(
            "{}/api/convert/task/does-not-exist/download",
            app.address
        ))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
async fn empty_task_id_fails_validation() {
    let app = TestApp::spawn().await;

    let (code, _) = status(&app, "").await;
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, code);
}

#[tokio::test]
async fn disabled_worker_pool_is_unavailable() {
    let app = TestApp::spawn_with(TestOptions {
        workers_enabled: false,
        ..Default::default()
    })
    .await;

    let response = app
        .upload("/api/convert/word-to-pdf", "contract.docx", DOCX_BYTES)
        .await;

    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, response.status());
}

#[tokio::test]
async fn invalid_task_upload_is_rejected_before_queueing() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/api/convert/pdf-to-doc", "contract.docx", DOCX_BYTES)
        .await;

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    assert_eq!(app.leftover_files(), 0);
}

#[tokio::test]
async fn slow_job_does_not_hold_back_idle_workers() {
    let app = TestApp::spawn_with(TestOptions {
        engine: SELECTIVE_SLOW_ENGINE,
        worker_count: 2,
        ..Default::default()
    })
    .await;

    let slow = submit(&app, "/api/convert/word-to-pdf", "slow-1.docx", DOCX_BYTES).await;
    let mut fast = Vec::new();
    for i in 0..5 {
        let filename = format!("fast-{}.docx", i);
        fast.push(submit(&app, "/api/convert/word-to-pdf", &filename, DOCX_BYTES).await);
    }

    // The slow job holds one worker for 4s; the other must drain the rest
    let started = Instant::now();
    for submitted in &fast {
        let task = wait_for_task(&app, &submitted.task_id).await;
        assert_eq!(task.status, TaskStatus::Completed);
    }
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "fast jobs waited behind the slow one: {:?}",
        started.elapsed()
    );

    let (_, slow_task) = status(&app, &slow.task_id).await;
    assert!(!slow_task.expect("Slow task missing").status.is_terminal());
}

#[tokio::test]
async fn full_queue_rejects_and_rolls_back() {
    let app = TestApp::spawn_with(TestOptions {
        engine: STALLED_ENGINE,
        worker_count: 1,
        queue_size: 1,
        ..Default::default()
    })
    .await;

    let mut accepted = 0;
    let mut rejected = None;
    for i in 0..5 {
        let response = app
            .upload("/api/convert/word-to-pdf", &format!("doc-{}.docx", i), DOCX_BYTES)
            .await;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            rejected = Some(response);
            break;
        }
        assert_eq!(StatusCode::ACCEPTED, response.status());
        accepted += 1;
    }

    let response = rejected.expect("Queue never filled up");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["details"], "Conversion queue is full");

    // One running plus one queued at most, and the rejected upload left nothing behind
    assert!((1..=2).contains(&accepted), "accepted {}", accepted);
    assert_eq!(app.leftover_files(), accepted);
}

#[tokio::test]
async fn expired_tasks_are_evicted_with_their_output() {
    let app = TestApp::spawn_with(TestOptions {
        task_ttl_secs: 0,
        ..Default::default()
    })
    .await;

    let submitted = submit(&app, "/api/convert/word-to-pdf", "contract.docx", DOCX_BYTES).await;

    // The record goes first, then the directory
    let mut evicted = false;
    for _ in 0..50 {
        let (code, _) = status(&app, &submitted.task_id).await;
        if code == StatusCode::NOT_FOUND && app.leftover_files() == 0 {
            evicted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(evicted, "task or its output outlived the TTL");
}
