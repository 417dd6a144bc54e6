mod common;

use std::sync::Arc;
use std::time::Duration;

use common::init_logging;
use extraction_core::{
    BatchKind, DocumentUpload, JobStatus, PollPolicy, Priority, ProcessingJob,
};
use extraction_engine::{
    batch_key, BackendSettings, ExtractionBackend, FailureKind, PipelineSession, ReqwestBackend,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer, token: Option<&str>) -> ReqwestBackend {
    ReqwestBackend::new(BackendSettings {
        base_url: format!("{}/api", server.uri()),
        token: token.map(str::to_string),
        ..BackendSettings::default()
    })
    .expect("valid base url")
}

#[tokio::test]
async fn upload_sends_multipart_file_with_bearer_token() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/documents/upload"))
        .and(header("authorization", "Bearer s3cret"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"spec.pdf\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 55,
            "status": "PENDING",
            "originalFilename": "spec.pdf",
            "fileType": "application/pdf",
            "fileSizeBytes": 13,
            "createdAt": "2026-10-18T09:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Some("s3cret"));
    let upload = DocumentUpload::new("spec.pdf", "application/pdf", b"%PDF-1.4 fake".to_vec());
    let job = backend.submit_document(7, &upload).await.unwrap();

    assert_eq!(job.id, 55);
    assert_eq!(job.project_id, 7);
    assert_eq!(job.status(), &JobStatus::Pending);
    assert_eq!(job.details().original_filename.as_deref(), Some("spec.pdf"));
    assert_eq!(job.details().file_size_bytes, Some(13));
}

#[tokio::test]
async fn status_response_maps_to_report() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents/55/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 55,
            "status": "COMPLETED",
            "extractedTasksCount": 5,
            "processingStartedAt": "2026-10-18T09:30:05Z",
            "processingCompletedAt": "2026-10-18T09:30:20Z"
        })))
        .mount(&server)
        .await;

    let report = backend_for(&server, None).job_status(7, 55).await.unwrap();

    assert_eq!(report.job_id, 55);
    assert_eq!(
        report.status,
        JobStatus::Completed {
            extracted_tasks_count: 5
        }
    );
    assert!(report.details.processing_completed_at.is_some());
}

#[tokio::test]
async fn suggestions_are_parsed_in_server_order() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents/55/suggestions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 101,
                "suggestedTitle": "Draft API section",
                "suggestedDescription": "Cover the upload endpoint",
                "suggestedPriority": "HIGH",
                "suggestedDueDate": "2026-11-02",
                "suggestedEstimatedHours": 4,
                "confidenceScore": 0.91,
                "extractionMethod": "pattern",
                "lineNumber": 12,
                "rawTextSnippet": "TODO: draft API section by Nov 2"
            },
            {
                "id": 102,
                "suggestedTitle": "Review budget",
                "confidenceScore": 0.55
            }
        ])))
        .mount(&server)
        .await;

    let suggestions = backend_for(&server, None)
        .list_suggestions(7, 55)
        .await
        .unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].id, 101);
    assert_eq!(suggestions[0].priority, Some(Priority::High));
    assert_eq!(suggestions[0].estimated_hours, Some(4));
    assert_eq!(suggestions[0].confidence_percent(), 91);
    assert_eq!(suggestions[1].priority, None);
    assert_eq!(suggestions[1].description, None);
}

#[tokio::test]
async fn commit_posts_ids_with_idempotency_key() {
    init_logging();
    let server = MockServer::start().await;
    let key = batch_key(7, 55, BatchKind::Accept, &[101, 102]);
    Mock::given(method("POST"))
        .and(path("/api/projects/7/documents/55/create-tasks"))
        .and(body_json(json!({ "suggestionIds": [101, 102] })))
        .and(header("idempotency-key", key.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Tasks created",
            "count": 2,
            "tasks": [{ "id": 9001 }, { "id": 9002 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = backend_for(&server, None)
        .commit_suggestions(7, 55, &[101, 102])
        .await
        .unwrap();

    assert_eq!(created.count, 2);
    assert_eq!(created.task_ids, vec![9001, 9002]);
}

#[tokio::test]
async fn reject_posts_ids() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/documents/55/reject-suggestions"))
        .and(body_json(json!({ "suggestionIds": [103, 104] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    backend_for(&server, None)
        .reject_suggestions(7, 55, &[103, 104])
        .await
        .unwrap();
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/documents/upload"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "File type not supported" })),
        )
        .mount(&server)
        .await;

    let upload = DocumentUpload::new("a.png", "image/png", vec![1, 2, 3]);
    let err = backend_for(&server, None)
        .submit_document(7, &upload)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "File type not supported");
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents/55/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = backend_for(&server, None)
        .job_status(7, 55)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    init_logging();
    let backend = ReqwestBackend::new(BackendSettings {
        base_url: "http://127.0.0.1:9/api".to_string(),
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(2),
        ..BackendSettings::default()
    })
    .unwrap();

    let err = backend.list_jobs(7).await.unwrap_err();
    assert!(matches!(
        err.kind,
        FailureKind::Network | FailureKind::Timeout
    ));
}

#[tokio::test]
async fn job_list_maps_every_entry() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 54, "status": "FAILED", "errorMessage": "empty document" },
            { "id": 55, "status": "PROCESSING" }
        ])))
        .mount(&server)
        .await;

    let jobs: Vec<ProcessingJob> = backend_for(&server, None).list_jobs(7).await.unwrap();
    let summary: Vec<(u64, &str)> = jobs
        .iter()
        .map(|job| (job.id, job.status().label()))
        .collect();
    assert_eq!(summary, vec![(54, "FAILED"), (55, "PROCESSING")]);
    assert_eq!(jobs[0].error_message(), Some("empty document"));
}

#[tokio::test]
async fn session_runs_end_to_end_over_http() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/documents/upload"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 55, "status": "PENDING" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents/55/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": 55, "status": "PROCESSING" })),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents/55/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 55,
            "status": "COMPLETED",
            "extractedTasksCount": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/documents/55/suggestions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 101, "suggestedTitle": "One", "confidenceScore": 0.9 },
            { "id": 102, "suggestedTitle": "Two", "confidenceScore": 0.7 }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/documents/55/create-tasks"))
        .and(body_json(json!({ "suggestionIds": [102] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let backend: Arc<dyn ExtractionBackend> = Arc::new(backend_for(&server, None));
    let session = PipelineSession::new(backend, 7).with_policy(PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts: 10,
    });

    session
        .submit(DocumentUpload::new("spec.pdf", "application/pdf", b"%PDF".to_vec()))
        .await
        .unwrap();
    let completed = session.wait_for_completion().await.unwrap();
    assert_eq!(completed.extracted_tasks_count, 2);
    assert_eq!(completed.suggestions_loaded, 2);

    session.toggle_selection(102).unwrap();
    let outcome = session.accept_selected(55).await.unwrap();
    assert_eq!(outcome.created.count, 1);
}
