// src/types.rs

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stability: StabilityConfig,
    pub acceptance: AcceptanceConfig,
    pub selector: SelectorConfig,
    pub feedback: FeedbackConfig,
    pub placement: PlacementConfig,
    pub replay: ReplayConfig,
    pub logging: LoggingConfig,
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Largest frame-to-frame center displacement still treated as the same surface
    pub max_displacement_m: f32,
    /// Saturation point of the consecutive stable frame counter
    pub frame_cap: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            max_displacement_m: 0.03,
            frame_cap: 30,
        }
    }
}

/// Whether the host platform reports plane extent at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtentCapability {
    /// Stability-only acceptance until the first extent is seen, then extent is required
    Auto,
    /// Extent is always required; a momentarily missing extent blocks acceptance
    Supported,
    /// Extent is never required
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    pub min_stable_frames: u32,
    pub min_extent_m: f32,
    /// Minimum world-up component of the plane normal
    pub min_up_normal_y: f32,
    pub extent_capability: ExtentCapability,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            min_stable_frames: 6,
            min_extent_m: 0.30,
            min_up_normal_y: 0.90,
            extent_capability: ExtentCapability::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Candidates further than this from camera height are discarded
    pub height_band_m: f32,
    /// Margin a candidate must clear when no camera height is available
    pub no_camera_margin_m: f32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            height_band_m: 2.0,
            no_camera_margin_m: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub base_opacity: f32,
    pub peak_opacity: f32,
    pub min_size_m: f32,
    pub max_size_m: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            base_opacity: 0.12,
            peak_opacity: 0.48,
            min_size_m: 0.30,
            max_size_m: 1.50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub fallback_timeout_ms: u64,
    pub flush_tolerance_m: f32,
    pub footprint_safety_factor: f32,
    pub min_scale_factor: f32,
    pub max_scale_factor: f32,
    pub event_bus_capacity: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            fallback_timeout_ms: 2000,
            flush_tolerance_m: 0.03,
            footprint_safety_factor: 0.9,
            min_scale_factor: 0.5,
            max_scale_factor: 2.2,
            event_bus_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub input_dir: String,
    pub extension: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input_dir: "recordings".to_string(),
            extension: "jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// World-space vector in meters. Serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        (*self - *other).length()
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Unit vector, or `None` for a degenerate (near-zero or non-finite) input.
    pub fn normalized(&self) -> Option<Vec3> {
        let len = self.length();
        if !len.is_finite() || len < 1e-6 {
            return None;
        }
        Some(*self * (1.0 / len))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ============================================================================
// TRACKING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    Horizontal,
    Vertical,
}

impl Alignment {
    /// Accepts the host's alignment names ("Horizontal", "HorizontalUpward",
    /// "horizontal_downward", "Vertical", ...), case-insensitively.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        if lower.starts_with("horizontal") {
            Some(Alignment::Horizontal)
        } else if lower.starts_with("vertical") {
            Some(Alignment::Vertical)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Horizontal => "HORIZONTAL",
            Alignment::Vertical => "VERTICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    NotTracking,
    Normal,
}

impl TrackingState {
    pub fn is_normal(&self) -> bool {
        matches!(self, TrackingState::Normal)
    }
}

/// Measured plane size on the surface, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub depth: f32,
}

impl Extent {
    pub fn new(width: f32, depth: f32) -> Self {
        Self { width, depth }
    }

    pub fn min_side(&self) -> f32 {
        self.width.min(self.depth)
    }
}

/// One decoded plane-tracking event. Built fresh per frame, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorObservation {
    pub alignment: Alignment,
    /// Plane center in world space
    pub center: Option<Vec3>,
    /// Anchor origin in world space (transform translation)
    pub anchor_position: Option<Vec3>,
    pub extent: Option<Extent>,
    pub up_normal: Option<Vec3>,
    /// Degrees, XYZ order
    pub rotation_euler: Option<Vec3>,
    pub source_id: String,
}

impl AnchorObservation {
    /// Point the model is placed at before flush adjustment.
    pub fn raw_placement_point(&self) -> Option<Vec3> {
        self.anchor_position.or(self.center)
    }
}

/// Result of the host's camera pose query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackingStatus {
    pub is_tracking: bool,
    pub plane_detected: bool,
    pub anchor_found: bool,
}

// ============================================================================
// MODELS & PLACEMENT
// ============================================================================

/// A selectable 3D model and its placement hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub name: String,
    pub default_scale: Vec3,
    #[serde(default)]
    pub default_rotation: Vec3,
    /// Fallback distance in front of the camera
    #[serde(default)]
    pub default_placement_meters: Option<f32>,
    /// Pivot compensation so the base sits flush on horizontal planes
    #[serde(default)]
    pub base_y_offset_meters: Option<f32>,
    /// Approximate footprint width at `default_scale`
    #[serde(default)]
    pub footprint_meters: Option<f32>,
}

impl ModelSpec {
    pub fn placement_distance(&self) -> f32 {
        self.default_placement_meters.unwrap_or(1.0)
    }

    pub fn base_y_offset(&self) -> f32 {
        self.base_y_offset_meters.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementSource {
    Surface { source_id: String },
    Fallback,
}

/// The single placement decision emitted per model selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementCommand {
    pub model_id: String,
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Vec3,
    pub source: PlacementSource,
    pub committed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_from_raw_names() {
        assert_eq!(Alignment::from_raw("Horizontal"), Some(Alignment::Horizontal));
        assert_eq!(
            Alignment::from_raw("HorizontalUpward"),
            Some(Alignment::Horizontal)
        );
        assert_eq!(Alignment::from_raw("vertical"), Some(Alignment::Vertical));
        assert_eq!(Alignment::from_raw("slanted"), None);
    }

    #[test]
    fn test_normalized_rejects_degenerate() {
        assert!(Vec3::new(0.0, 1e-9, 0.0).normalized().is_none());
        assert!(Vec3::new(f32::NAN, 1.0, 0.0).normalized().is_none());
        let n = Vec3::new(0.0, 2.0, 0.0).normalized().unwrap();
        assert!((n.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vec3_serializes_as_array() {
        let v: Vec3 = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1.0,2.0,3.0]");
    }
}
