//! Queue-entry encoding for jobs.
//!
//! Each job is stored as a single JSON document carrying a format version,
//! every job field, and the payload in standard base64. JSON keeps entries
//! self-describing for operators inspecting a topic; base64 keeps arbitrary
//! payload bytes lossless.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{error::DecodeError, Job, JobId};

/// Version tag written into every entry.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EntryRef<'a> {
    v: u32,
    id: &'a str,
    partition_key: u32,
    primary_key: &'a str,
    callback_url: &'a str,
    correlation_id: &'a str,
    payload: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Entry {
    v: u32,
    id: String,
    partition_key: u32,
    primary_key: String,
    callback_url: String,
    correlation_id: String,
    payload: String,
}

/// Encodes a job into a queue entry.
pub fn encode(job: &Job) -> String {
    let entry = EntryRef {
        v: FORMAT_VERSION,
        id: job.id.as_str(),
        partition_key: job.partition_key,
        primary_key: &job.primary_key,
        callback_url: &job.callback_url,
        correlation_id: &job.correlation_id,
        payload: STANDARD.encode(&job.payload),
    };

    // Serializing plain strings and integers into a String cannot fail.
    serde_json::to_string(&entry).unwrap_or_default()
}

/// Decodes a queue entry back into a job.
///
/// # Errors
///
/// Returns [`DecodeError`] when the entry is not valid JSON, lacks a field,
/// carries an unknown version, has a payload that is not base64, or has an
/// empty primary key. Never panics on malformed input.
pub fn decode(token: &str) -> Result<Job, DecodeError> {
    let entry: Entry =
        serde_json::from_str(token).map_err(|e| DecodeError::malformed(e.to_string()))?;

    if entry.v != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion { version: entry.v });
    }

    if entry.primary_key.is_empty() {
        return Err(DecodeError::MissingPrimaryKey);
    }

    let payload = STANDARD
        .decode(entry.payload.as_bytes())
        .map_err(|e| DecodeError::InvalidPayload { message: e.to_string() })?;

    Ok(Job {
        id: JobId(entry.id),
        partition_key: entry.partition_key,
        primary_key: entry.primary_key,
        callback_url: entry.callback_url,
        correlation_id: entry.correlation_id,
        payload: Bytes::from(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job {
            id: JobId::from("job-1"),
            partition_key: 3,
            primary_key: "customer-9".to_string(),
            callback_url: "https://example.com/hook".to_string(),
            correlation_id: "corr-7".to_string(),
            payload: Bytes::from_static(b"{\"amount\":10}"),
        }
    }

    #[test]
    fn round_trip_preserves_empty_fields() {
        let mut job = sample_job();
        job.correlation_id = String::new();
        job.payload = Bytes::new();

        assert_eq!(decode(&encode(&job)).unwrap(), job);
    }

    #[test]
    fn round_trip_preserves_binary_payload() {
        let mut job = sample_job();
        job.payload = Bytes::from(vec![0u8, 255, 10, b':', 0x80]);

        assert_eq!(decode(&encode(&job)).unwrap(), job);
    }

    #[test]
    fn entry_is_self_describing_json() {
        let value: serde_json::Value = serde_json::from_str(&encode(&sample_job())).unwrap();
        assert_eq!(value["v"], 1);
        assert_eq!(value["primary_key"], "customer-9");
        assert_eq!(value["payload"], STANDARD.encode(b"{\"amount\":10}"));
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "not json", "{", "[]", "null", "customer-9:corr-7:e30="] {
            assert!(
                matches!(decode(token), Err(DecodeError::Malformed { .. })),
                "expected malformed for {token:?}"
            );
        }
    }

    #[test]
    fn missing_field_is_malformed() {
        let token = r#"{"v":1,"id":"a","partition_key":0,"primary_key":"k","callback_url":""}"#;
        assert!(matches!(decode(token), Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let token = encode(&sample_job()).replacen("\"v\":1", "\"v\":9", 1);
        assert_eq!(decode(&token), Err(DecodeError::UnsupportedVersion { version: 9 }));
    }

    #[test]
    fn invalid_base64_payload_is_rejected() {
        let token = r#"{"v":1,"id":"a","partition_key":0,"primary_key":"k","callback_url":"","correlation_id":"","payload":"***"}"#;
        assert!(matches!(decode(token), Err(DecodeError::InvalidPayload { .. })));
    }

    #[test]
    fn empty_primary_key_is_rejected() {
        let mut job = sample_job();
        job.primary_key = String::new();
        assert_eq!(decode(&encode(&job)), Err(DecodeError::MissingPrimaryKey));
    }
}
