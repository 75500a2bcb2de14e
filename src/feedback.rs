// src/feedback.rs
//
// Presentation-only mapping from plane confidence to the ground-plane
// indicator. Has no influence on acceptance or placement.

use crate::types::{Extent, FeedbackConfig};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackSignal {
    pub opacity: f32,
    pub size_m: f32,
    pub confidence: f32,
    pub plane_visible: bool,
}

pub fn map_feedback(
    config: &FeedbackConfig,
    confidence: f32,
    plane_visible: bool,
    extent: Option<Extent>,
) -> FeedbackSignal {
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let opacity = if plane_visible {
        config.base_opacity + (config.peak_opacity - config.base_opacity) * confidence
    } else {
        config.base_opacity
    };

    let size_m = extent
        .map(|e| e.min_side())
        .filter(|s| s.is_finite())
        .unwrap_or(config.min_size_m)
        .clamp(config.min_size_m, config.max_size_m);

    FeedbackSignal {
        opacity,
        size_m,
        confidence,
        plane_visible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity_spans_range() {
        let cfg = FeedbackConfig::default();
        assert_eq!(map_feedback(&cfg, 0.0, true, None).opacity, 0.12);
        assert!((map_feedback(&cfg, 1.0, true, None).opacity - 0.48).abs() < 1e-6);
        assert!((map_feedback(&cfg, 0.5, true, None).opacity - 0.30).abs() < 1e-6);
    }

    #[test]
    fn test_invisible_plane_stays_at_base() {
        let cfg = FeedbackConfig::default();
        assert_eq!(map_feedback(&cfg, 1.0, false, None).opacity, 0.12);
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let cfg = FeedbackConfig::default();
        assert!((map_feedback(&cfg, 7.0, true, None).opacity - 0.48).abs() < 1e-6);
        assert_eq!(map_feedback(&cfg, f32::NAN, true, None).confidence, 0.0);
    }

    #[test]
    fn test_size_clamped_to_bounds() {
        let cfg = FeedbackConfig::default();
        assert_eq!(map_feedback(&cfg, 1.0, true, Some(Extent::new(4.0, 3.0))).size_m, 1.5);
        assert_eq!(map_feedback(&cfg, 1.0, true, Some(Extent::new(0.1, 0.2))).size_m, 0.3);
        assert_eq!(map_feedback(&cfg, 1.0, true, Some(Extent::new(0.9, 0.7))).size_m, 0.7);
        assert_eq!(map_feedback(&cfg, 1.0, true, None).size_m, 0.3);
    }
}
