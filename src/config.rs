use crate::types::{Config, ModelSpec};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config = Self::from_yaml(&contents)?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents).context("Invalid config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("stability.max_displacement_m", self.stability.max_displacement_m)?;
        if self.stability.frame_cap == 0 {
            bail!("stability.frame_cap must be at least 1");
        }
        if self.acceptance.min_stable_frames > self.stability.frame_cap {
            bail!(
                "acceptance.min_stable_frames ({}) exceeds stability.frame_cap ({})",
                self.acceptance.min_stable_frames,
                self.stability.frame_cap
            );
        }
        require_positive("acceptance.min_extent_m", self.acceptance.min_extent_m)?;
        if !(0.0..=1.0).contains(&self.acceptance.min_up_normal_y) {
            bail!("acceptance.min_up_normal_y must be within [0, 1]");
        }
        require_positive("selector.height_band_m", self.selector.height_band_m)?;
        require_non_negative("selector.no_camera_margin_m", self.selector.no_camera_margin_m)?;

        require_non_negative("feedback.base_opacity", self.feedback.base_opacity)?;
        require_non_negative("feedback.peak_opacity", self.feedback.peak_opacity)?;
        if self.feedback.base_opacity > self.feedback.peak_opacity {
            bail!("feedback.base_opacity exceeds feedback.peak_opacity");
        }
        require_non_negative("feedback.min_size_m", self.feedback.min_size_m)?;
        require_non_negative("feedback.max_size_m", self.feedback.max_size_m)?;
        if self.feedback.min_size_m > self.feedback.max_size_m {
            bail!("feedback.min_size_m exceeds feedback.max_size_m");
        }

        if self.placement.fallback_timeout_ms == 0 {
            bail!("placement.fallback_timeout_ms must be positive");
        }
        require_non_negative("placement.flush_tolerance_m", self.placement.flush_tolerance_m)?;
        require_positive(
            "placement.footprint_safety_factor",
            self.placement.footprint_safety_factor,
        )?;
        require_positive("placement.min_scale_factor", self.placement.min_scale_factor)?;
        require_positive("placement.max_scale_factor", self.placement.max_scale_factor)?;
        if self.placement.min_scale_factor > self.placement.max_scale_factor {
            bail!("placement scale factor bounds are invalid");
        }
        if self.placement.event_bus_capacity == 0 {
            bail!("placement.event_bus_capacity must be at least 1");
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.id.as_str()) {
                bail!("Duplicate model id '{}'", model.id);
            }
        }
        Ok(())
    }

    pub fn model(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == id)
    }
}

fn require_positive(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} must be a positive number, got {}", name, value);
    }
    Ok(())
}

fn require_non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{} must be a non-negative number, got {}", name, value);
    }
    Ok(())
}
