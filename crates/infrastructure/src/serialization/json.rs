//! JSON serialization helpers for deterministic output.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// JSON deserialization failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Same as [`to_json_stable`] but returns bytes for direct file writing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    Ok(to_json_stable(value)?.into_bytes())
}

/// Deserializes JSON from a string.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    serde_json::from_str(json).map_err(SerializationError::Deserialize)
}

/// Deserializes JSON from bytes.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_stable_output_is_sorted_and_indented() {
        let mut entries = BTreeMap::new();
        entries.insert("booknest_refresh_token", "r");
        entries.insert("booknest_access_token", "a");

        let json = to_json_stable(&entries).expect("serialization should work");

        assert!(json.ends_with('\n'));
        assert!(json.contains("  \"booknest_access_token\""));
        let access = json.find("access").expect("access key present");
        let refresh = json.find("refresh").expect("refresh key present");
        assert!(access < refresh);
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut entries = BTreeMap::new();
        entries.insert("key".to_string(), "value".to_string());

        let bytes = to_json_stable_bytes(&entries).expect("serialization should work");
        let restored: BTreeMap<String, String> =
            from_json_bytes(&bytes).expect("deserialization should work");

        assert_eq!(entries, restored);
    }

    #[test]
    fn test_invalid_json_is_a_deserialize_error() {
        let result: Result<BTreeMap<String, String>, _> = from_json("{\"key\": }");
        assert!(matches!(result, Err(SerializationError::Deserialize(_))));
    }
}
