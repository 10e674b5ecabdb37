//! Input source shapes for job submissions.
//!
//! The platform expects submission sources as a two-level mapping of
//! `source name -> input name -> value`. Callers may also hand over a
//! one-level mapping of `input name -> value`, which is wrapped under the
//! implicit source name before submission.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::util::{encode_data_uri, OCTET_STREAM};

/// Source name used when a one-level mapping is wrapped.
pub const IMPLICIT_SOURCE_NAME: &str = "job";

/// Nesting depth of a JSON value: objects are one deeper than their deepest
/// member, everything else is depth zero.
fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Wraps `sources` under [`IMPLICIT_SOURCE_NAME`] when it is a one-level
/// mapping.
///
/// `shifted` raises the wrap threshold by one for source values that are
/// themselves objects (S3 locators), so `{"input": {"bucket", "key"}}` still
/// counts as a single unnamed source.
fn normalize_sources(sources: Value, shifted: bool) -> Result<Map<String, Value>> {
    let source_depth = depth(&sources);
    let Value::Object(map) = sources else {
        return Err(Error::invalid_sources("input sources must be a JSON object"));
    };
    if source_depth == 1 + usize::from(shifted) {
        let mut wrapped = Map::new();
        wrapped.insert(IMPLICIT_SOURCE_NAME.to_string(), Value::Object(map));
        Ok(wrapped)
    } else {
        Ok(map)
    }
}

/// Normalizes text sources and checks that every input value is a string.
pub fn normalize_text_sources(sources: Value) -> Result<Map<String, Value>> {
    let normalized = normalize_sources(sources, false)?;
    for (source, inputs) in &normalized {
        let Value::Object(inputs) = inputs else {
            return Err(Error::invalid_sources(format!(
                "source {source:?} must map input names to values"
            )));
        };
        for (input, value) in inputs {
            if !value.is_string() {
                return Err(Error::invalid_sources(format!(
                    "text input {source:?}/{input:?} must be a string"
                )));
            }
        }
    }
    Ok(normalized)
}

/// Normalizes S3 sources and checks that every input value names a bucket
/// and a key.
pub fn normalize_s3_sources(sources: Value) -> Result<Map<String, Value>> {
    let normalized = normalize_sources(sources, true)?;
    for (source, inputs) in &normalized {
        let Value::Object(inputs) = inputs else {
            return Err(Error::invalid_sources(format!(
                "source {source:?} must map input names to values"
            )));
        };
        for (input, value) in inputs {
            let locator = value.as_object().ok_or_else(|| {
                Error::invalid_sources(format!(
                    "S3 input {source:?}/{input:?} must be an object with bucket and key"
                ))
            })?;
            for field in ["bucket", "key"] {
                if !locator.get(field).is_some_and(Value::is_string) {
                    return Err(Error::invalid_sources(format!(
                        "S3 input {source:?}/{input:?} is missing a string {field:?}"
                    )));
                }
            }
        }
    }
    Ok(normalized)
}

/// Encodes every byte payload as a base64 data URI under its source name.
pub fn encode_embedded_sources(sources: ByteSources) -> Map<String, Value> {
    let mut encoded = Map::new();
    for (source, inputs) in sources.into_groups() {
        let mut items = Map::new();
        for (input, data) in inputs {
            items.insert(input, Value::String(encode_data_uri(&data, OCTET_STREAM)));
        }
        encoded.insert(source, Value::Object(items));
    }
    encoded
}

/// In-memory payloads for an embedded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteSources {
    /// One unnamed source mapping input names to payloads.
    Single(BTreeMap<String, Vec<u8>>),
    /// Explicitly named sources, each mapping input names to payloads.
    Named(BTreeMap<String, BTreeMap<String, Vec<u8>>>),
}

impl ByteSources {
    /// Builds a single-source mapping from `(input name, payload)` pairs.
    pub fn single<K, V>(inputs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        ByteSources::Single(
            inputs
                .into_iter()
                .map(|(name, data)| (name.into(), data.into()))
                .collect(),
        )
    }

    pub(crate) fn into_groups(self) -> BTreeMap<String, BTreeMap<String, Vec<u8>>> {
        match self {
            ByteSources::Single(inputs) => {
                BTreeMap::from([(IMPLICIT_SOURCE_NAME.to_string(), inputs)])
            }
            ByteSources::Named(groups) => groups,
        }
    }
}

impl From<BTreeMap<String, Vec<u8>>> for ByteSources {
    fn from(inputs: BTreeMap<String, Vec<u8>>) -> Self {
        ByteSources::Single(inputs)
    }
}

impl From<BTreeMap<String, BTreeMap<String, Vec<u8>>>> for ByteSources {
    fn from(groups: BTreeMap<String, BTreeMap<String, Vec<u8>>>) -> Self {
        ByteSources::Named(groups)
    }
}

/// One payload for a chunked file submission.
#[derive(Debug, Clone)]
pub enum FileInput {
    /// Read the payload from a file on disk.
    Path(PathBuf),
    /// Use an in-memory payload.
    Bytes(Bytes),
}

impl From<PathBuf> for FileInput {
    fn from(path: PathBuf) -> Self {
        FileInput::Path(path)
    }
}

impl From<&Path> for FileInput {
    fn from(path: &Path) -> Self {
        FileInput::Path(path.to_path_buf())
    }
}

impl From<Bytes> for FileInput {
    fn from(data: Bytes) -> Self {
        FileInput::Bytes(data)
    }
}

impl From<Vec<u8>> for FileInput {
    fn from(data: Vec<u8>) -> Self {
        FileInput::Bytes(Bytes::from(data))
    }
}

/// Payloads for a chunked file submission.
#[derive(Debug, Clone)]
pub enum FileSources {
    /// One unnamed source mapping input names to payloads.
    Single(BTreeMap<String, FileInput>),
    /// Explicitly named sources, each mapping input names to payloads.
    Named(BTreeMap<String, BTreeMap<String, FileInput>>),
}

impl FileSources {
    /// Builds a single-source mapping from `(input name, payload)` pairs.
    pub fn single<K, V>(inputs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FileInput>,
    {
        FileSources::Single(
            inputs
                .into_iter()
                .map(|(name, input)| (name.into(), input.into()))
                .collect(),
        )
    }

    pub(crate) fn into_groups(self) -> BTreeMap<String, BTreeMap<String, FileInput>> {
        match self {
            FileSources::Single(inputs) => {
                BTreeMap::from([(IMPLICIT_SOURCE_NAME.to_string(), inputs)])
            }
            FileSources::Named(groups) => groups,
        }
    }
}

impl From<BTreeMap<String, FileInput>> for FileSources {
    fn from(inputs: BTreeMap<String, FileInput>) -> Self {
        FileSources::Single(inputs)
    }
}

impl From<BTreeMap<String, BTreeMap<String, FileInput>>> for FileSources {
    fn from(groups: BTreeMap<String, BTreeMap<String, FileInput>>) -> Self {
        FileSources::Named(groups)
    }
}
