//! Result retrieval flows against a mocked platform.

use std::time::Duration;

use modelgrid_sdk::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::fixtures::*;
use crate::helpers::*;

/// Test the full pipeline: submit, wait for the job, read the outputs
#[tokio::test]
async fn test_text_pipeline_end_to_end() {
    init_tracing();
    let platform = MockPlatform::start().await;
    platform
        .mount_submission(&job_json("pipeline-job", "SUBMITTED"))
        .await;
    platform
        .mount_job_lifecycle("pipeline-job", &["IN_PROGRESS", "COMPLETED"])
        .await;
    Mock::given(method("GET"))
        .and(path("/results/pipeline-job"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(running_result_json("pipeline-job")),
        )
        .up_to_n_times(1)
        .mount(platform.server())
        .await;
    platform
        .mount_results("pipeline-job", &finished_result_json("pipeline-job"))
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
    client
        .jobs()
        .block_until_complete(&job.job_identifier, None, Duration::from_millis(5))
        .await
        .unwrap();

    let result = client
        .results()
        .block_until_complete(&job.job_identifier, None, Duration::from_millis(5))
        .await
        .unwrap();
    assert!(result.finished);
    assert_eq!(result.completed, Some(1));

    let outputs = result.first_outputs().unwrap();
    assert_eq!(
        outputs["results.json"]["data"]["result"]["classPredictions"][0]["class"],
        json!("positive")
    );
}

/// Test that the results poller tolerates the record appearing late
#[tokio::test]
async fn test_results_follow_job_after_submission_lag() {
    let platform = MockPlatform::start().await;
    Mock::given(method("GET"))
        .and(path("/results/lagging-job"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "results not found"
        })))
        .up_to_n_times(1)
        .mount(platform.server())
        .await;
    platform
        .mount_results("lagging-job", &finished_result_json("lagging-job"))
        .await;
    // The poller confirms the job exists before ignoring the 404.
    Mock::given(method("GET"))
        .and(path("/jobs/lagging-job"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("lagging-job", "IN_PROGRESS")),
        )
        .expect(1)
        .mount(platform.server())
        .await;

    let result = platform
        .client()
        .results()
        .block_until_complete("lagging-job", None, Duration::from_millis(5))
        .await
        .unwrap();
    assert!(result.finished);
    platform.verify().await;
}

/// Test that a failed source surfaces the model's error message
#[tokio::test]
async fn test_failed_source_error_over_the_wire() {
    let platform = MockPlatform::start().await;
    platform
        .mount_results(
            "failed-job",
            &failed_result_json("failed-job", "input could not be read"),
        )
        .await;

    let result = platform.client().results().get("failed-job").await.unwrap();
    assert_eq!(result.failed, Some(1));

    let err = result.source_outputs("my-input").unwrap_err();
    match err {
        Error::SourceFailed {
            source_name,
            message,
        } => {
            assert_eq!(source_name, "my-input");
            assert_eq!(message, "input could not be read");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // With no successful sources, the first outputs are the failure too.
    assert!(matches!(
        result.first_outputs(),
        Err(Error::SourceFailed { .. })
    ));
}

/// Test that partial outputs are readable before the job finishes
#[tokio::test]
async fn test_partial_results_before_finish() {
    let platform = MockPlatform::start().await;
    platform
        .mount_results(
            "partial-job",
            &json!({
                "jobIdentifier": "partial-job",
                "finished": false,
                "total": 2,
                "completed": 1,
                "failed": 0,
                "results": {
                    "first-input": {"results.json": {"label": "positive"}}
                },
                "failures": {}
            }),
        )
        .await;

    let result = platform.client().results().get("partial-job").await.unwrap();
    assert!(!result.finished);
    assert_eq!(
        result.source_outputs("first-input").unwrap(),
        &json!({"results.json": {"label": "positive"}})
    );
    assert!(matches!(
        result.source_outputs("second-input"),
        Err(Error::SourceNotFound { .. })
    ));
}
