// ── Derivation rules ──
//
// Derived device fields are recomputed from the datapoints on every write.
// Each rule starts from the previous derived state so that an unparsable
// value leaves the old field in place.

use crate::model::{
    Datapoint, DatapointKind, DerivedState, DeviceType, LevelMove, Quantity, QuantityKind,
};

/// Value the gateway reports for unknown readings.
pub const SENTINEL: &str = "NaN";

const KEY_LEVEL: &str = "level";
const KEY_LEVEL_MOVE: &str = "level_move";
const KEY_QUANTITY: &str = "quantity";
const KEY_QUANTITY_LABEL: &str = "quantity_label";
const KEY_QUANTITY_UNIT: &str = "quantity_unit";

pub(crate) fn is_sentinel(raw: &str) -> bool {
    raw.trim() == SENTINEL
}

/// Parse an integer-like or float-like string.
///
/// `"NaN"` and other non-finite spellings are not numbers here; callers
/// check the sentinel first.
pub(crate) fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn clamp_u8(n: f64, max: u8) -> u8 {
    n.clamp(0.0, f64::from(max)) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn to_i64(n: f64) -> i64 {
    n.round() as i64
}

/// Gateway level (0 = open, 100 = closed) to exposed position (100 = open).
pub fn position_from_level(level: f64) -> u8 {
    clamp_u8(100.0 - level.floor(), 100)
}

/// Exposed position (100 = open) to gateway level.
pub fn level_from_position(position: u8) -> u8 {
    100 - position.min(100)
}

/// Gateway brightness percentage to 0–255.
pub fn brightness_from_percent(percent: f64) -> u8 {
    clamp_u8((percent / 100.0 * 255.0).round(), 255)
}

/// 0–255 brightness to the gateway's percentage.
pub fn percent_from_brightness(brightness: u8) -> u8 {
    clamp_u8((f64::from(brightness) / 255.0 * 100.0).round(), 100)
}

/// Recompute every derived field of a device of type `kind`.
pub(crate) fn derive(kind: &DeviceType, datapoints: &[Datapoint], prev: &DerivedState) -> DerivedState {
    let mut next = prev.clone();
    next.available = true;

    let first = |k: DatapointKind| datapoints.iter().find(|dp| dp.kind == k);

    if kind.is_cover() {
        if let Some(dp) = first(DatapointKind::Level) {
            derive_position(dp, &mut next);
        }
    }

    if kind.has_switch() {
        if let Some(dp) = first(DatapointKind::Switch) {
            derive_switch(dp, &mut next);
        }
    }

    if kind.is_dimmable() {
        match first(DatapointKind::Brightness) {
            Some(dp) => derive_brightness(dp, &mut next),
            None => next.brightness = if next.is_on { 255 } else { 0 },
        }
    } else if kind.is_light() {
        next.brightness = if next.is_on { 255 } else { 0 };
    }

    if kind.is_socket() {
        next.quantities = derive_quantities(datapoints, &prev.quantities);
    }

    next
}

fn derive_position(dp: &Datapoint, next: &mut DerivedState) {
    if dp.values.iter().any(|v| is_sentinel(&v.value)) {
        next.available = false;
        return;
    }
    if let Some(level) = dp.value(KEY_LEVEL).and_then(parse_numeric) {
        next.current_position = position_from_level(level);
    }
    if let Some(mv) = dp
        .value(KEY_LEVEL_MOVE)
        .and_then(parse_numeric)
        .and_then(|n| LevelMove::from_raw(to_i64(n)))
    {
        next.level_move = mv;
    }
}

fn derive_switch(dp: &Datapoint, next: &mut DerivedState) {
    let Some(raw) = dp.first_value() else {
        return;
    };
    if is_sentinel(raw) {
        next.is_on = false;
        next.available = false;
        return;
    }
    if let Some(n) = parse_numeric(raw) {
        // round(n) != 0
        next.is_on = n.abs() >= 0.5;
    }
}

fn derive_brightness(dp: &Datapoint, next: &mut DerivedState) {
    let Some(raw) = dp.first_value() else {
        return;
    };
    if is_sentinel(raw) {
        next.available = false;
        return;
    }
    if let Some(n) = parse_numeric(raw) {
        next.brightness = brightness_from_percent(n);
    }
}

fn derive_quantities(datapoints: &[Datapoint], prev: &[Quantity]) -> Vec<Quantity> {
    datapoints
        .iter()
        .filter(|dp| dp.kind == DatapointKind::Quantity)
        .filter_map(|dp| {
            let label = dp.value(KEY_QUANTITY_LABEL)?.trim().to_owned();
            if label.is_empty() {
                return None;
            }
            let unit = dp.value(KEY_QUANTITY_UNIT).unwrap_or_default().trim().to_owned();
            let previous = prev.iter().find(|q| q.datapoint_id == dp.id);
            let value = match dp.value(KEY_QUANTITY) {
                Some(raw) if is_sentinel(raw) => None,
                Some(raw) => parse_numeric(raw).or_else(|| previous.and_then(|q| q.value)),
                None => previous.and_then(|q| q.value),
            };
            Some(Quantity {
                datapoint_id: dp.id.clone(),
                kind: QuantityKind::from_label(&label),
                label,
                unit,
                value,
            })
        })
        .collect()
}
