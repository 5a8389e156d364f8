// Wire types for the JUNG HOME gateway.
//
// Field names follow the gateway's JSON exactly. Unknown fields are
// captured in `extra` where the gateway is known to add vendor data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

// ── Functions (devices) ──────────────────────────────────────────────

/// One entry of `GET /api/junghome/functions/` and of the `functions`
/// socket frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub datapoints: Vec<DatapointPayload>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A device catalog decoded entry by entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub functions: Vec<FunctionPayload>,
    /// Ids of entries that failed to decode. The gateway still lists
    /// these devices.
    pub unparsed: Vec<String>,
}

impl Catalog {
    /// Decode each catalog entry on its own. Entries that do not fit are
    /// skipped, keeping their `id` when one can be read.
    pub fn from_entries(entries: Vec<Value>) -> Self {
        let mut unparsed = Vec::new();
        let functions = decode_each(entries, |entry, e| {
            let id = entry_id(entry);
            warn!(
                device_id = id.as_deref().unwrap_or("?"),
                error = %e,
                "skipping malformed catalog entry"
            );
            unparsed.extend(id);
        });
        Self {
            functions,
            unparsed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.unparsed.is_empty()
    }
}

impl From<Vec<FunctionPayload>> for Catalog {
    fn from(functions: Vec<FunctionPayload>) -> Self {
        Self {
            functions,
            unparsed: Vec::new(),
        }
    }
}

/// Decode every element independently. `on_error` sees each element
/// that fails, and the rest are returned in order.
pub fn decode_each<T: DeserializeOwned>(
    items: Vec<Value>,
    mut on_error: impl FnMut(&Value, &serde_json::Error),
) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match T::deserialize(&item) {
            Ok(v) => Some(v),
            Err(e) => {
                on_error(&item, &e);
                None
            }
        })
        .collect()
}

/// `id` of a raw record, string or number.
pub fn entry_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A datapoint nested inside a function payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointPayload {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

/// A single `{key, value}` pair. The gateway sends values as strings, but
/// numbers and booleans are tolerated and normalised to their text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(deserialize_with = "string_or_scalar")]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn string_or_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Payload of a `datapoint` socket frame: the new values for one datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointUpdate {
    pub id: String,
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

/// Response of `GET .../functions/{device}/datapoints/{datapoint}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointValues {
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

impl DatapointValues {
    /// The first value carrying `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }
}

/// Body of a datapoint PATCH: `{"data": [{"key": .., "value": ..}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchBody {
    pub data: Vec<KeyValue>,
}

impl PatchBody {
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data: vec![KeyValue::new(key, value)],
        }
    }
}

/// Result of a successful PATCH.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    /// The gateway echoed JSON back.
    Echo(Value),
    /// Success with an empty or non-JSON body.
    Accepted,
}

impl PatchOutcome {
    /// The JSON form the gateway would have returned; `Accepted` becomes
    /// `{"success": true}`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Echo(v) => v,
            Self::Accepted => serde_json::json!({ "success": true }),
        }
    }
}

// ── Hub configuration ────────────────────────────────────────────────

/// `GET /api/junghome/config/`. Every field is optional; firmware
/// revisions add and drop keys freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub version_release: Option<String>,
    #[serde(default)]
    pub version_build: Option<String>,
    #[serde(default)]
    pub version_beta: Option<bool>,
    #[serde(default)]
    pub version_smartphone: Option<String>,
    #[serde(default)]
    pub version_up_to_date: Option<bool>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub ip_dhcp: Option<bool>,
    #[serde(default)]
    pub ip_subnet: Option<String>,
    #[serde(default)]
    pub ip_dns: Option<String>,
    #[serde(default)]
    pub ip_gateway: Option<String>,
    #[serde(default)]
    pub ip_error: Option<bool>,
    #[serde(default)]
    pub cloud_register: Option<bool>,
    #[serde(default)]
    pub cloud_connect: Option<bool>,
    #[serde(default)]
    pub cloud_error: Option<bool>,
    #[serde(default)]
    pub cloud_username: Option<String>,
    #[serde(default)]
    pub system_serial: Option<String>,
    #[serde(default)]
    pub update_auto: Option<bool>,
    #[serde(default)]
    pub update_progress: Option<Value>,
    #[serde(default)]
    pub update_download: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
