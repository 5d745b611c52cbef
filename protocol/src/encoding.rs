use serde::{Serialize, de::DeserializeOwned};

/// JSON is used for request and response bodies, cookie payloads and
/// encrypted token payloads alike.
pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

pub fn serialize_to_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

pub fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}
