// src/anchor_decoder.rs
//
// Turns raw host tracking events into typed observations. Pure functions,
// no state. Missing or malformed fields decode to `None`; they degrade
// confidence downstream but never fail.

use crate::transform::ColumnMajorTransform;
use crate::types::{Alignment, AnchorObservation, Extent, TrackingState, Vec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Native enum value the host uses for "tracking normal".
const NATIVE_TRACKING_NORMAL: i64 = 3;

/// A plane-detected / plane-updated event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnchorEvent {
    #[serde(alias = "anchorId")]
    pub anchor_id: String,
    pub alignment: String,
    #[serde(default)]
    pub center: Option<Vec3>,
    #[serde(default)]
    pub position: Option<Vec3>,
    /// Raw extent in one of several shapes, see [`decode_extent`]
    #[serde(default)]
    pub extent: Option<Value>,
    #[serde(default)]
    pub transform: Option<Vec<f32>>,
}

/// Decodes the host's tracking state: `"TRACKING_NORMAL"` or native `3`
/// are normal, everything else is not.
pub fn decode_tracking_state(raw: &Value) -> TrackingState {
    let normal = match raw {
        Value::String(s) => s.eq_ignore_ascii_case("TRACKING_NORMAL"),
        Value::Number(n) => n.as_i64() == Some(NATIVE_TRACKING_NORMAL),
        _ => false,
    };
    if normal {
        TrackingState::Normal
    } else {
        TrackingState::NotTracking
    }
}

/// Extracts (width, depth) from the known raw shapes:
/// `[w, d]`, `[w, h, d]`, `{"width": w, "height": d}`, `{"x": w, "z": d}`.
pub fn decode_extent(raw: &Value) -> Option<Extent> {
    let (width, depth) = match raw {
        Value::Array(items) => match items.len() {
            2 => (items[0].as_f64()?, items[1].as_f64()?),
            3 => (items[0].as_f64()?, items[2].as_f64()?),
            _ => return None,
        },
        Value::Object(map) => {
            if let (Some(w), Some(h)) = (map.get("width"), map.get("height")) {
                (w.as_f64()?, h.as_f64()?)
            } else if let (Some(x), Some(z)) = (map.get("x"), map.get("z")) {
                (x.as_f64()?, z.as_f64()?)
            } else {
                return None;
            }
        }
        _ => return None,
    };

    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if !valid(width) || !valid(depth) {
        return None;
    }
    Some(Extent::new(width as f32, depth as f32))
}

/// Builds an observation from a raw event whose alignment has already been
/// resolved.
pub fn decode_observation(raw: &RawAnchorEvent, alignment: Alignment) -> AnchorObservation {
    let transform = raw
        .transform
        .as_deref()
        .and_then(ColumnMajorTransform::from_slice);

    let anchor_position = raw
        .position
        .filter(Vec3::is_finite)
        .or_else(|| transform.map(|t| t.translation()));
    let center = raw.center.filter(Vec3::is_finite).or(anchor_position);

    AnchorObservation {
        alignment,
        center,
        anchor_position,
        extent: raw.extent.as_ref().and_then(decode_extent),
        up_normal: transform.and_then(|t| t.up_normal()),
        rotation_euler: transform.and_then(|t| t.rotation_euler_degrees()),
        source_id: raw.anchor_id.clone(),
    }
}

/// Resolves the alignment string and decodes. Unknown alignments are skipped.
pub fn decode(raw: &RawAnchorEvent) -> Option<AnchorObservation> {
    let alignment = Alignment::from_raw(&raw.alignment)?;
    Some(decode_observation(raw, alignment))
}
