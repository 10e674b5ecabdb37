//! Test fixtures and sample data for integration tests

use serde_json::{json, Value};

/// Model identifier used across tests.
pub const TEST_MODEL: &str = "ed542963de";

/// Model version used across tests.
pub const TEST_VERSION: &str = "0.0.27";

/// API key used by clients pointed at the mock platform.
pub const TEST_API_KEY: &str = "test-key-id.test-key-body";

/// A job record in the shape the platform returns it.
pub fn job_json(identifier: &str, status: &str) -> Value {
    json!({
        "jobIdentifier": identifier,
        "status": status,
        "model": {
            "identifier": TEST_MODEL,
            "version": TEST_VERSION,
            "name": "Sentiment Analysis"
        },
        "explain": false,
        "submittedBy": "test-key-id",
        "accountIdentifier": "test-account",
        "createdAt": "2026-03-01T12:00:00.000Z",
        "submittedAt": "2026-03-01T12:00:00.000Z",
        "total": 1,
        "completed": if status == "COMPLETED" { 1 } else { 0 },
        "failed": 0
    })
}

/// The body a text submission puts on the wire.
pub fn text_submission_body(sources: Value, explain: bool) -> Value {
    json!({
        "model": {"identifier": TEST_MODEL, "version": TEST_VERSION},
        "explain": explain,
        "input": {"type": "text", "sources": sources}
    })
}

/// The body a chunked upload sends when opening a job without inputs.
pub fn open_submission_body(explain: bool) -> Value {
    json!({
        "model": {"identifier": TEST_MODEL, "version": TEST_VERSION},
        "explain": explain
    })
}

/// Platform limits as reported by the job features endpoint.
pub fn features_json(input_chunk_maximum_size: &str) -> Value {
    json!({
        "input_chunk_maximum_size": input_chunk_maximum_size,
        "maximum_input_chunks": 100,
        "maximum_inputs_per_job": 1000
    })
}

/// A finished result with one successful source named `my-input`.
pub fn finished_result_json(identifier: &str) -> Value {
    json!({
        "jobIdentifier": identifier,
        "accountIdentifier": "test-account",
        "finished": true,
        "explained": false,
        "total": 1,
        "completed": 1,
        "failed": 0,
        "submittedAt": "2026-03-01T12:00:00.000Z",
        "elapsedTime": 1870,
        "initialQueueTime": 140,
        "totalQueueTime": 140,
        "averageModelLatency": 83.5,
        "totalModelLatency": 83.5,
        "inputSize": 16,
        "results": {
            "my-input": {
                "results.json": {
                    "data": {"result": {"classPredictions": [
                        {"class": "positive", "score": 0.81},
                        {"class": "neutral", "score": 0.14}
                    ]}}
                }
            }
        },
        "failures": {}
    })
}

/// A result that is still being processed.
pub fn running_result_json(identifier: &str) -> Value {
    json!({
        "jobIdentifier": identifier,
        "finished": false,
        "total": 1,
        "completed": 0,
        "failed": 0,
        "results": {},
        "failures": {}
    })
}

/// A finished result where the only source failed.
pub fn failed_result_json(identifier: &str, error: &str) -> Value {
    json!({
        "jobIdentifier": identifier,
        "finished": true,
        "total": 1,
        "completed": 0,
        "failed": 1,
        "results": {},
        "failures": {"my-input": {"error": error}}
    })
}

/// A catalog entry for the test model.
pub fn model_json() -> Value {
    json!({
        "modelId": TEST_MODEL,
        "name": "Sentiment Analysis",
        "description": "Classifies text as positive, negative or neutral.",
        "author": "Open Source",
        "latestVersion": TEST_VERSION,
        "versions": [TEST_VERSION, "0.0.26"],
        "isActive": true,
        "isRecommended": true,
        "tags": [
            {"identifier": "language_and_text", "name": "Language and Text", "dataType": "Text"}
        ]
    })
}

/// Version detail for the test model.
pub fn model_version_json() -> Value {
    json!({
        "version": TEST_VERSION,
        "createdAt": "2026-01-15T09:30:00.000Z",
        "isActive": true,
        "inputs": [{
            "name": "input.txt",
            "acceptedMediaTypes": "text/plain",
            "maximumSize": 1024,
            "description": "Text to classify"
        }],
        "outputs": [{
            "name": "results.json",
            "mediaType": "application/json",
            "maximumSize": 1024
        }],
        "sampleInput": {"input": {"type": "text", "sources": {"my-input": {"input.txt": "Modzy is great!"}}}},
        "sampleOutput": {"my-input": {"results.json": {"classPredictions": []}}},
        "timeout": {"status": 60000, "run": 60000}
    })
}

/// The entitlement list granted to the test account.
pub fn entitlements_json() -> Value {
    json!([
        {
            "identifier": "CAN_SUBMIT_JOBS",
            "name": "Submit jobs",
            "description": "Allows submitting inference jobs"
        },
        {
            "identifier": "CAN_CONVERT_MODELS",
            "name": "Convert models",
            "description": "Allows importing models through the converter"
        }
    ])
}

/// A converter status response.
pub fn converter_status_json(status: &str, message: &str) -> Value {
    json!({
        "jobStatus": status,
        "message": message
    })
}
