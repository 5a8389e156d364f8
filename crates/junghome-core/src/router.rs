// ── Message router ──
//
// Classifies decoded socket envelopes by their `type` and hands them to
// the reconciler. Frames arrive one at a time from the supervisor's read
// loop; nothing is buffered here.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use junghome_api::{Catalog, DatapointUpdate, RawFrame};

use crate::error::CoreError;
use crate::reconciler::Reconciler;

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Free-text notice from the gateway.
    Message(Value),
    /// Firmware/version announcement.
    Version(Value),
    /// Full device catalog.
    Functions(Catalog),
    Groups(Vec<Value>),
    Scenes(Vec<Value>),
    /// One or more single-datapoint deltas.
    Datapoint(Vec<DatapointUpdate>),
    /// Devices were added; the next catalog should be diffed.
    DevicesNew,
    /// Devices were deleted; the next catalog should be diffed.
    DevicesDeleted,
    Unknown(String),
}

/// Classify a raw envelope. A payload that does not fit its declared type
/// is a decode error; the caller drops the frame and keeps reading.
pub fn classify(raw: RawFrame) -> Result<Frame, CoreError> {
    let RawFrame { kind, data } = raw;
    let frame = match kind.as_str() {
        "message" => Frame::Message(data),
        "version" => Frame::Version(data),
        "functions" => Frame::Functions(Catalog::from_entries(array(&kind, data)?)),
        "groups" => Frame::Groups(array(&kind, data)?),
        "scenes" => Frame::Scenes(array(&kind, data)?),
        "datapoint" => {
            let updates = if data.is_array() {
                decode_each(&kind, data)?
            } else {
                vec![decode(&kind, data)?]
            };
            Frame::Datapoint(updates)
        }
        "devices-new" => Frame::DevicesNew,
        "devices-deleted" => Frame::DevicesDeleted,
        _ => Frame::Unknown(kind),
    };
    Ok(frame)
}

/// Dispatch a classified frame.
pub fn route(frame: Frame, reconciler: &mut Reconciler) {
    match frame {
        Frame::Message(data) => info!(message = %data, "gateway message"),
        Frame::Version(data) => info!(version = %data, "gateway version"),
        Frame::Functions(catalog) => {
            reconciler.apply_catalog(catalog);
        }
        Frame::Groups(records) => reconciler.apply_groups(records),
        Frame::Scenes(records) => reconciler.apply_scenes(records),
        Frame::Datapoint(updates) => {
            for update in updates {
                reconciler.apply_delta(update);
            }
        }
        Frame::DevicesNew | Frame::DevicesDeleted => {
            debug!("device membership changed, diffing next catalog");
            reconciler.mark_membership_pending();
        }
        Frame::Unknown(kind) => debug!(kind = %kind, "ignoring unknown frame type"),
    }
}

fn decode<T: DeserializeOwned>(kind: &str, data: Value) -> Result<T, CoreError> {
    serde_json::from_value(data).map_err(|e| CoreError::Decode {
        message: format!("{kind} frame: {e}"),
    })
}

fn array(kind: &str, data: Value) -> Result<Vec<Value>, CoreError> {
    match data {
        Value::Array(items) => Ok(items),
        other => Err(CoreError::Decode {
            message: format!("{kind} frame: expected an array, got {}", json_type(&other)),
        }),
    }
}

/// Decode every element on its own so one malformed entry does not sink
/// the rest of the frame.
fn decode_each<T: DeserializeOwned>(kind: &str, data: Value) -> Result<Vec<T>, CoreError> {
    let items = array(kind, data)?;
    Ok(junghome_api::models::decode_each(items, |_, e| {
        warn!(kind, error = %e, "skipping malformed entry");
    }))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::fanout::{FanOut, LoggingRegistry};
    use crate::store::DeviceStore;

    fn raw(kind: &str, data: Value) -> RawFrame {
        RawFrame {
            kind: kind.into(),
            data,
        }
    }

    fn reconciler() -> (Reconciler, Arc<DeviceStore>) {
        let store = Arc::new(DeviceStore::new());
        let rec = Reconciler::new(
            Arc::clone(&store),
            Arc::new(FanOut::new()),
            Arc::new(LoggingRegistry),
        );
        (rec, store)
    }

    #[test]
    fn datapoint_accepts_object_or_array() {
        let one = classify(raw("datapoint", json!({ "id": "dp1", "values": [] }))).unwrap();
        assert!(matches!(one, Frame::Datapoint(ref u) if u.len() == 1));

        let many = classify(raw(
            "datapoint",
            json!([{ "id": "dp1", "values": [] }, { "id": "dp2", "values": [] }]),
        ))
        .unwrap();
        assert!(matches!(many, Frame::Datapoint(ref u) if u.len() == 2));
    }

    #[test]
    fn unknown_types_are_kept_for_logging() {
        let frame = classify(raw("weather", json!({}))).unwrap();
        assert_eq!(frame, Frame::Unknown("weather".into()));
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let err = classify(raw("functions", json!({ "id": "f1" }))).unwrap_err();
        assert!(matches!(err, CoreError::Decode { .. }));
        let err = classify(raw("datapoint", json!("dp1"))).unwrap_err();
        assert!(matches!(err, CoreError::Decode { .. }));
    }

    #[test]
    fn malformed_catalog_entry_is_skipped() {
        let frame = classify(raw(
            "functions",
            json!([
                { "id": "f1", "type": "OnOff", "label": "Hall" },
                { "label": "missing id and type" }
            ]),
        ))
        .unwrap();
        let Frame::Functions(catalog) = frame else {
            panic!("expected functions frame");
        };
        assert_eq!(catalog.functions.len(), 1);
        assert_eq!(catalog.functions[0].id, "f1");
        assert!(catalog.unparsed.is_empty());
    }

    #[test]
    fn routed_frames_reach_the_table() {
        let (mut rec, store) = reconciler();

        let frames = [
            raw(
                "functions",
                json!([{
                    "id": "f1", "type": "OnOff", "label": "Hall",
                    "datapoints": [{ "id": "dp1", "type": "switch", "values": [{ "key": "switch", "value": "0" }] }]
                }]),
            ),
            raw("datapoint", json!({ "id": "dp1", "values": [{ "key": "switch", "value": "1" }] })),
            raw("groups", json!([{ "id": "g1" }])),
            raw("message", json!("hello")),
        ];
        for f in frames {
            route(classify(f).unwrap(), &mut rec);
        }

        assert!(store.get("f1").unwrap().is_on());
        assert!(store.groups().contains_key("g1"));
    }

    #[test]
    fn device_with_malformed_datapoint_survives_membership_diff() {
        let (mut rec, store) = reconciler();
        let device = |id: &str| json!({ "id": id, "type": "Socket", "label": id });

        route(
            classify(raw("functions", json!([device("a"), device("b")]))).unwrap(),
            &mut rec,
        );
        route(classify(raw("devices-new", Value::Null)).unwrap(), &mut rec);
        route(
            classify(raw(
                "functions",
                json!([
                    device("a"),
                    { "id": "b", "type": "Socket", "label": "b", "datapoints": [{ "type": "switch" }] },
                    device("c")
                ]),
            ))
            .unwrap(),
            &mut rec,
        );

        assert_eq!(store.len(), 3);
        assert!(store.get("b").is_some(), "listed device must stay in the table");
        assert!(store.get("c").is_some());
    }

    #[test]
    fn devices_deleted_primes_membership_diff() {
        let (mut rec, store) = reconciler();
        let catalog = |ids: &[&str]| {
            raw(
                "functions",
                Value::Array(
                    ids.iter()
                        .map(|id| json!({ "id": id, "type": "Socket", "label": id }))
                        .collect(),
                ),
            )
        };

        route(classify(catalog(&["a", "b"])).unwrap(), &mut rec);
        route(classify(raw("devices-deleted", Value::Null)).unwrap(), &mut rec);
        route(classify(catalog(&["b"])).unwrap(), &mut rec);

        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 1);
    }
}
