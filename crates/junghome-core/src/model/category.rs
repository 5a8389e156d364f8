// ── Consumer categories ──

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use super::device::{Device, QuantityKind};

/// Fixed set of categories consumers subscribe to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Cover,
    Light,
    Sensor,
    BinarySensor,
    Switch,
}

impl Category {
    /// Whether `device` belongs to this category.
    ///
    /// A socket with recognised energy readings is both a `switch` and a
    /// `sensor`. Binary sensors come from the hub, never from devices.
    pub fn matches(self, device: &Device) -> bool {
        let t = &device.device_type;
        match self {
            Self::Cover => t.is_cover(),
            Self::Light => t.is_light(),
            Self::Switch => t.is_socket(),
            Self::Sensor => {
                t.is_socket()
                    && device
                        .quantities()
                        .iter()
                        .any(|q| q.kind != QuantityKind::Other)
            }
            Self::BinarySensor => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use junghome_api::FunctionPayload;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn device(kind: &str, datapoints: serde_json::Value) -> Device {
        let payload: FunctionPayload = serde_json::from_value(json!({
            "id": "x", "type": kind, "label": "x", "datapoints": datapoints
        }))
        .unwrap();
        Device::from_payload(payload)
    }

    #[test]
    fn category_names_are_snake_case() {
        assert_eq!(Category::BinarySensor.to_string(), "binary_sensor");
        assert_eq!("cover".parse::<Category>().unwrap(), Category::Cover);
        assert_eq!(Category::iter().count(), 5);
    }

    #[test]
    fn predicates_follow_device_type() {
        let blind = device("PositionAndAngle", json!([]));
        let lamp = device("ColorLight", json!([]));
        let socket = device("Socket", json!([]));

        assert!(Category::Cover.matches(&blind));
        assert!(Category::Light.matches(&lamp));
        assert!(Category::Switch.matches(&socket));
        assert!(!Category::Light.matches(&socket));
        assert!(!Category::Sensor.matches(&socket));
    }

    #[test]
    fn energy_socket_is_also_a_sensor() {
        let socket = device(
            "SocketEnergy",
            json!([{
                "id": "q", "type": "quantity",
                "values": [
                    { "key": "quantity_label", "value": "Active Power Loadside" },
                    { "key": "quantity_unit", "value": "W" },
                    { "key": "quantity", "value": "4" }
                ]
            }]),
        );
        assert!(Category::Sensor.matches(&socket));
        assert!(Category::Switch.matches(&socket));
    }
}
