//! Test helper utilities for integration tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use modelgrid_sdk::Client;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::{job_json, TEST_API_KEY};

/// Counter for unique temp file names
static FILE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// A mocked platform deployment backed by wiremock.
///
/// Wraps a [`MockServer`] with shortcuts for the endpoints most flows
/// touch. Tests mount their own mocks through [`MockPlatform::server`] for
/// anything beyond these.
pub struct MockPlatform {
    server: MockServer,
}

impl MockPlatform {
    /// Starts a fresh mock deployment.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the mock deployment.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying mock server, for mounting custom mocks.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// A client pointed at this deployment.
    pub fn client(&self) -> Client {
        Client::builder()
            .base_url(self.server.uri())
            .api_key(TEST_API_KEY)
            .build()
            .expect("client must build against the mock server")
    }

    /// Serves each status once in order; the last one repeats afterwards.
    pub async fn mount_job_lifecycle(&self, identifier: &str, statuses: &[&str]) {
        let Some((final_status, leading)) = statuses.split_last() else {
            return;
        };
        for status in leading {
            Mock::given(method("GET"))
                .and(path(format!("/jobs/{identifier}")))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(job_json(identifier, status)),
                )
                .up_to_n_times(1)
                .mount(&self.server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/jobs/{identifier}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(job_json(identifier, final_status)),
            )
            .mount(&self.server)
            .await;
    }

    /// Accepts any `POST /jobs` and answers with the given job record.
    pub async fn mount_submission(&self, job: &Value) {
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job.clone()))
            .mount(&self.server)
            .await;
    }

    /// Serves a result body for `GET /results/{identifier}`.
    pub async fn mount_results(&self, identifier: &str, body: &Value) {
        Mock::given(method("GET"))
            .and(path(format!("/results/{identifier}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&self.server)
            .await;
    }

    /// Checks every expectation registered on mounted mocks.
    pub async fn verify(&self) {
        self.server.verify().await;
    }
}

/// A file on disk that removes itself when dropped.
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Writes `contents` to a fresh file under the system temp directory.
    pub fn with_contents(contents: &[u8]) -> Self {
        let counter = FILE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "modelgrid-test-{}-{counter}.bin",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("temp file must be writable");
        Self { path }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Assert that a JSON value contains all fields of `expected`, recursing
/// into nested objects.
pub fn assert_json_contains(actual: &Value, expected: &Value) {
    for (key, value) in expected.as_object().expect("expected an object") {
        assert!(
            actual.get(key).is_some(),
            "missing key '{}' in {}",
            key,
            actual
        );
        if value.is_object() {
            assert_json_contains(&actual[key], value);
        } else {
            assert_eq!(
                &actual[key], value,
                "mismatch for key '{}': expected {:?}, got {:?}",
                key, value, actual[key]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_mock_platform_client_reaches_server() {
        init_tracing();
        let platform = MockPlatform::start().await;
        platform
            .mount_job_lifecycle("helper-job", &["SUBMITTED"])
            .await;

        let job = platform.client().jobs().get("helper-job").await.unwrap();
        assert_eq!(job.job_identifier, "helper-job");
    }

    #[test]
    fn test_temp_file_removes_itself() {
        let path = {
            let file = TempFile::with_contents(b"scratch");
            assert_eq!(std::fs::read(file.path()).unwrap(), b"scratch");
            file.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_assert_json_contains_nested() {
        assert_json_contains(
            &json!({"a": {"b": 1, "c": 2}, "d": 3}),
            &json!({"a": {"b": 1}}),
        );
    }
}
