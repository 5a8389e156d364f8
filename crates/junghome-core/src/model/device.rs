// ── Device domain types ──

use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

use junghome_api::{DatapointPayload, FunctionPayload};

use crate::derive;

/// Function type as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
pub enum DeviceType {
    OnOff,
    DimmerLight,
    ColorLight,
    Socket,
    SocketEnergy,
    Position,
    PositionAndAngle,
    /// Anything outside the observed taxonomy, kept verbatim.
    #[strum(default)]
    Other(String),
}

impl DeviceType {
    pub fn is_cover(&self) -> bool {
        matches!(self, Self::Position | Self::PositionAndAngle)
    }

    pub fn is_light(&self) -> bool {
        matches!(self, Self::OnOff | Self::DimmerLight | Self::ColorLight)
    }

    pub fn is_dimmable(&self) -> bool {
        matches!(self, Self::DimmerLight | Self::ColorLight)
    }

    pub fn is_socket(&self) -> bool {
        matches!(self, Self::Socket | Self::SocketEnergy)
    }

    /// Types whose on/off state comes from a `switch` datapoint.
    pub fn has_switch(&self) -> bool {
        self.is_light() || self.is_socket()
    }
}

impl From<&str> for DeviceType {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Self::Other(s.to_owned()))
    }
}

impl Serialize for DeviceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Datapoint type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DatapointKind {
    Switch,
    Brightness,
    Level,
    LevelMove,
    Quantity,
    #[strum(default)]
    Other(String),
}

impl From<&str> for DatapointKind {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Self::Other(s.to_owned()))
    }
}

impl Serialize for DatapointKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One raw `{key, value}` pair. Values stay strings; `"NaN"` is possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatapointValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datapoint {
    pub id: String,
    pub kind: DatapointKind,
    pub values: Vec<DatapointValue>,
}

impl Datapoint {
    /// First value carrying `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.value.as_str())
    }

    /// First value regardless of key (single-valued datapoints).
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(|v| v.value.as_str())
    }

    pub(crate) fn replace_values(&mut self, values: Vec<junghome_api::KeyValue>) {
        self.values = values.into_iter().map(DatapointValue::from).collect();
    }
}

impl From<junghome_api::KeyValue> for DatapointValue {
    fn from(kv: junghome_api::KeyValue) -> Self {
        Self {
            key: kv.key,
            value: kv.value,
        }
    }
}

impl From<DatapointPayload> for Datapoint {
    fn from(p: DatapointPayload) -> Self {
        Self {
            id: p.id,
            kind: DatapointKind::from(p.kind.as_str()),
            values: p.values.into_iter().map(DatapointValue::from).collect(),
        }
    }
}

/// Cover motion direction carried by the `level_move` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelMove {
    Opening,
    #[default]
    Idle,
    Closing,
}

impl LevelMove {
    pub fn from_raw(v: i64) -> Option<Self> {
        match v {
            -1 => Some(Self::Opening),
            0 => Some(Self::Idle),
            1 => Some(Self::Closing),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i8 {
        match self {
            Self::Opening => -1,
            Self::Idle => 0,
            Self::Closing => 1,
        }
    }
}

/// Recognised energy readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    DeviceInputPower,
    ActivePowerLoadside,
    Other,
}

impl QuantityKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Present Device Input Power" => Self::DeviceInputPower,
            "Active Power Loadside" => Self::ActivePowerLoadside,
            _ => Self::Other,
        }
    }
}

/// An energy reading from a `quantity` datapoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub datapoint_id: String,
    pub label: String,
    pub unit: String,
    /// `None` while the gateway reports `"NaN"`.
    pub value: Option<f64>,
    pub kind: QuantityKind,
}

/// Fields computed from the datapoints. Never set by consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedState {
    pub(crate) is_on: bool,
    pub(crate) brightness: u8,
    pub(crate) current_position: u8,
    pub(crate) level_move: LevelMove,
    pub(crate) available: bool,
    pub(crate) quantities: Vec<Quantity>,
}

impl Default for DerivedState {
    fn default() -> Self {
        Self {
            is_on: false,
            brightness: 0,
            current_position: 50,
            level_move: LevelMove::Idle,
            available: true,
            quantities: Vec::new(),
        }
    }
}

/// A synchronised gateway function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: String,
    pub device_type: DeviceType,
    pub label: String,
    pub(crate) datapoints: Vec<Datapoint>,
    #[serde(flatten)]
    pub(crate) state: DerivedState,
}

impl Device {
    /// Build a device from its catalog payload and derive its state.
    pub fn from_payload(payload: FunctionPayload) -> Self {
        let mut device = Self {
            device_type: DeviceType::from(payload.kind.as_str()),
            id: payload.id,
            label: payload.label,
            datapoints: payload.datapoints.into_iter().map(Datapoint::from).collect(),
            state: DerivedState::default(),
        };
        device.rederive();
        device
    }

    /// Replace the raw payload, keeping the previous derived state as the
    /// fallback for anything the new values cannot supply.
    pub(crate) fn absorb(&mut self, payload: FunctionPayload) {
        self.device_type = DeviceType::from(payload.kind.as_str());
        self.label = payload.label;
        self.datapoints = payload.datapoints.into_iter().map(Datapoint::from).collect();
        self.rederive();
    }

    pub(crate) fn rederive(&mut self) {
        self.state = derive::derive(&self.device_type, &self.datapoints, &self.state);
    }

    pub(crate) fn datapoint_mut(&mut self, datapoint_id: &str) -> Option<&mut Datapoint> {
        self.datapoints.iter_mut().find(|dp| dp.id == datapoint_id)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn datapoints(&self) -> &[Datapoint] {
        &self.datapoints
    }

    /// First datapoint of `kind`; later ones are never consulted.
    pub fn datapoint(&self, kind: &DatapointKind) -> Option<&Datapoint> {
        self.datapoints.iter().find(|dp| &dp.kind == kind)
    }

    pub fn has_datapoint(&self, datapoint_id: &str) -> bool {
        self.datapoints.iter().any(|dp| dp.id == datapoint_id)
    }

    pub fn is_on(&self) -> bool {
        self.state.is_on
    }

    /// 0–255.
    pub fn brightness(&self) -> u8 {
        self.state.brightness
    }

    /// 0 (closed) – 100 (open).
    pub fn current_position(&self) -> u8 {
        self.state.current_position
    }

    pub fn level_move(&self) -> LevelMove {
        self.state.level_move
    }

    pub fn available(&self) -> bool {
        self.state.available
    }

    pub fn quantities(&self) -> &[Quantity] {
        &self.state.quantities
    }

    pub fn state(&self) -> &DerivedState {
        &self.state
    }
}
