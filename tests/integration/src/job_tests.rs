//! Job submission and lifecycle flows against a mocked platform.

use std::collections::BTreeMap;
use std::time::Duration;

use modelgrid_sdk::jobs::DEFAULT_POLL_TIMEOUT;
use modelgrid_sdk::{Error, FileInput, FileSources, JobStatus};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::fixtures::*;
use crate::helpers::*;

/// Test the submit-poll-complete flow end to end, matching the exact
/// submission body on the wire
#[tokio::test]
async fn test_submit_then_wait_until_completed() {
    init_tracing();
    let platform = MockPlatform::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(body_json(text_submission_body(
            json!({"job": {"input.txt": "Modzy is great!"}}),
            false,
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("flow-job", "SUBMITTED")))
        .expect(1)
        .mount(platform.server())
        .await;
    platform
        .mount_job_lifecycle("flow-job", &["SUBMITTED", "IN_PROGRESS", "COMPLETED"])
        .await;

    let client = platform.client();
    let job = client
        .jobs()
        .submit_text(
            TEST_MODEL,
            TEST_VERSION,
            json!({"input.txt": "Modzy is great!"}),
            false,
        )
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Submitted);

    let done = client
        .jobs()
        .block_until_complete(
            &job.job_identifier,
            Some(DEFAULT_POLL_TIMEOUT),
            Duration::from_millis(5),
        )
        .await
        .unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.completed, Some(1));
    platform.verify().await;
}

/// Test that a chunked upload reads the payload from disk and splits it
/// into chunks of the platform's reported maximum
#[tokio::test]
async fn test_file_upload_reads_from_disk() {
    let platform = MockPlatform::start().await;
    let file = TempFile::with_contents(b"It was the best of times, it was..");

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(body_json(open_submission_body(false)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("upload-job", "SUBMITTED")),
        )
        .expect(1)
        .mount(platform.server())
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/features"))
        .respond_with(ResponseTemplate::new(200).set_body_json(features_json("16i")))
        .expect(1)
        .mount(platform.server())
        .await;
    // 34 bytes at 16 bytes per chunk is three uploads.
    Mock::given(method("POST"))
        .and(path("/jobs/upload-job/job/input.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(platform.server())
        .await;
    Mock::given(method("POST"))
        .and(path("/jobs/upload-job/close"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("upload-job", "SUBMITTED")),
        )
        .expect(1)
        .mount(platform.server())
        .await;

    let job = platform
        .client()
        .jobs()
        .submit_file(
            TEST_MODEL,
            TEST_VERSION,
            FileSources::single([("input.txt", file.path())]),
            false,
        )
        .await
        .unwrap();
    assert_eq!(job.job_identifier, "upload-job");
    platform.verify().await;
}

/// Test that a named multi-source upload posts every input under its own
/// source path and closes the job once
#[tokio::test]
async fn test_multi_source_upload_posts_every_input() {
    let platform = MockPlatform::start().await;
    let sources: FileSources = BTreeMap::from([
        (
            "first".to_string(),
            BTreeMap::from([(
                "a.txt".to_string(),
                FileInput::from(b"payload a".to_vec()),
            )]),
        ),
        (
            "second".to_string(),
            BTreeMap::from([(
                "b.txt".to_string(),
                FileInput::from(b"payload b".to_vec()),
            )]),
        ),
    ])
    .into();

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("multi-job", "SUBMITTED")))
        .mount(platform.server())
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/features"))
        .respond_with(ResponseTemplate::new(200).set_body_json(features_json("1M")))
        .mount(platform.server())
        .await;
    Mock::given(method("POST"))
        .and(path("/jobs/multi-job/first/a.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(platform.server())
        .await;
    Mock::given(method("POST"))
        .and(path("/jobs/multi-job/second/b.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(platform.server())
        .await;
    Mock::given(method("POST"))
        .and(path("/jobs/multi-job/close"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("multi-job", "SUBMITTED")))
        .expect(1)
        .mount(platform.server())
        .await;

    platform
        .client()
        .jobs()
        .submit_file(TEST_MODEL, TEST_VERSION, sources, false)
        .await
        .unwrap();
    platform.verify().await;
}

/// Test that waiting on a stalled job gives up at the deadline
#[tokio::test]
async fn test_wait_times_out_when_job_stalls() {
    let platform = MockPlatform::start().await;
    platform.mount_job_lifecycle("stuck-job", &["IN_PROGRESS"]).await;

    let err = platform
        .client()
        .jobs()
        .block_until_complete(
            "stuck-job",
            Some(Duration::from_millis(40)),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    if let Error::Timeout { waited } = err {
        assert!(waited >= Duration::from_millis(10));
    }
}

/// Test that a rejected submission surfaces the platform's message
#[tokio::test]
async fn test_unauthorized_submission_surfaces_platform_message() {
    let platform = MockPlatform::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "API key is expired"
        })))
        .mount(platform.server())
        .await;

    let err = platform
        .client()
        .jobs()
        .submit_text(
            TEST_MODEL,
            TEST_VERSION,
            json!({"input.txt": "Modzy is great!"}),
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
    assert!(err.to_string().contains("API key is expired"));
}

/// Test that history filters appear in the query string
#[tokio::test]
async fn test_history_filters_reach_the_query_string() {
    use chrono::TimeZone;
    use wiremock::matchers::query_param;

    let platform = MockPlatform::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/history"))
        .and(query_param("startDate", "2026-02-01T00:00:00.000Z"))
        .and(query_param("status", "all"))
        .and(query_param("per-page", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            job_json("old-job", "COMPLETED")
        ])))
        .expect(1)
        .mount(platform.server())
        .await;

    let start = chrono::Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let jobs = platform
        .client()
        .jobs()
        .history(
            &modelgrid_sdk::JobHistoryParams::new()
                .start_date(start)
                .per_page(25),
        )
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_identifier, "old-job");
    platform.verify().await;
}
