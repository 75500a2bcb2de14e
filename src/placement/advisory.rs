// src/placement/advisory.rs
//
// User-facing text produced by the placement core, and the filter that keeps
// benign content-load noise away from the user.

/// Shown after a fallback placement.
pub const FALLBACK_ADVISORY: &str =
    "Couldn't find a surface, so the model was placed in front of you. Move it if it looks off.";

/// Message categories raised by the renderer during reloads that are not real failures.
const BENIGN_ERROR_MARKERS: [&str; 2] = ["abort", "cancel"];

pub fn is_benign_content_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    BENIGN_ERROR_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_and_cancel_are_benign() {
        assert!(is_benign_content_error("AbortError: The operation was aborted."));
        assert!(is_benign_content_error("Request CANCELLED during reload"));
        assert!(is_benign_content_error("load canceled"));
    }

    #[test]
    fn test_real_failures_surface() {
        assert!(!is_benign_content_error("Failed to parse GLB header"));
        assert!(!is_benign_content_error(""));
    }
}
