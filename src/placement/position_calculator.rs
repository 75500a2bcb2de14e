// src/placement/position_calculator.rs

use crate::types::{Alignment, CameraPose, Extent, PlacementConfig, Vec3};

/// Where the model's pivot goes so its base rests on the surface.
///
/// Horizontal: Y snaps to the plane center when within `tolerance`, is clamped
/// to the tolerance band otherwise, then `base_offset` is added. X/Z pass
/// through. Vertical surfaces are returned unchanged.
pub fn flush_position(
    raw: Vec3,
    plane_center_y: Option<f32>,
    alignment: Alignment,
    base_offset: f32,
    tolerance: f32,
) -> Vec3 {
    if alignment == Alignment::Vertical {
        return raw;
    }

    let plane_y = plane_center_y.unwrap_or(raw.y);
    let y = if (raw.y - plane_y).abs() <= tolerance {
        plane_y
    } else {
        raw.y.clamp(plane_y - tolerance, plane_y + tolerance)
    };

    Vec3::new(raw.x, y + base_offset, raw.z)
}

/// Scale factor fitting the model footprint to the measured surface.
/// `None` when either the extent or the footprint is unknown.
pub fn scale_factor(
    extent: Option<Extent>,
    footprint_m: Option<f32>,
    config: &PlacementConfig,
) -> Option<f32> {
    let extent = extent?;
    let footprint = footprint_m.filter(|f| f.is_finite() && *f > 0.0)?;

    let target = extent.min_side() * config.footprint_safety_factor;
    Some((target / footprint).clamp(config.min_scale_factor, config.max_scale_factor))
}

/// Applies the same factor to every axis of the model's base scale.
pub fn surface_scale(
    base_scale: Vec3,
    extent: Option<Extent>,
    footprint_m: Option<f32>,
    config: &PlacementConfig,
) -> Vec3 {
    match scale_factor(extent, footprint_m, config) {
        Some(factor) => base_scale * factor,
        None => base_scale,
    }
}

/// `distance` meters along the camera's forward vector, or a fixed
/// camera-space offset when no usable pose is available.
pub fn fallback_position(pose: Option<&CameraPose>, distance: f32) -> Vec3 {
    pose.and_then(|p| {
        let forward = p.forward.normalized()?;
        p.position.is_finite().then(|| p.position + forward * distance)
    })
    .unwrap_or(Vec3::new(0.0, 0.0, -distance))
}
