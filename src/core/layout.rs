//! Geometry-based layout classification of OCR output.
//!
//! Decides whether recognized blocks read as one coherent passage (unified)
//! or as spatially distinct regions (scattered). This is a best-effort
//! heuristic over bounding boxes, not a layout parser: scattering a genuine
//! paragraph or unifying separate UI labels are both possible outcomes.

use serde::{Deserialize, Serialize};

use crate::shared::types::TextBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Unified,
    Scattered,
}

/// Tunable classification thresholds, all relative to mean block dimensions.
#[derive(Debug, Clone, Copy)]
pub struct LayoutThresholds {
    /// Vertical gap above `gap_factor * mean_height` splits a paragraph.
    pub gap_factor: f64,
    /// Vertical gap below `-overlap_factor * mean_height` means the blocks
    /// overlap, which stacked lines of one paragraph never do.
    pub overlap_factor: f64,
    /// Max left-edge offset above `indent_factor * mean_width` breaks the
    /// consistent left-alignment expected of a single paragraph.
    pub indent_factor: f64,
}

impl Default for LayoutThresholds {
    fn default() -> Self {
        Self {
            gap_factor: 2.0,
            overlap_factor: 0.3,
            indent_factor: 0.4,
        }
    }
}

/// Classify OCR blocks as one passage or several independent regions.
pub fn classify(blocks: &[TextBlock], thresholds: &LayoutThresholds) -> LayoutKind {
    let mut valid: Vec<&TextBlock> = blocks
        .iter()
        .filter(|block| block.bounding_box.has_area())
        .collect();

    if valid.len() < 2 {
        return LayoutKind::Unified;
    }

    let mean_height = valid
        .iter()
        .map(|block| block.bounding_box.height)
        .sum::<f64>()
        / valid.len() as f64;
    let mean_width = valid
        .iter()
        .map(|block| block.bounding_box.width)
        .sum::<f64>()
        / valid.len() as f64;

    valid.sort_by(|a, b| {
        a.bounding_box
            .y
            .partial_cmp(&b.bounding_box.y)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut max_indent: f64 = 0.0;
    for pair in valid.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);

        let gap = lower.bounding_box.y - upper.bounding_box.bottom();
        if gap > thresholds.gap_factor * mean_height {
            log::debug!("[Layout] Vertical gap {:.1} exceeds threshold; scattered", gap);
            return LayoutKind::Scattered;
        }
        if gap < -thresholds.overlap_factor * mean_height {
            log::debug!("[Layout] Blocks overlap by {:.1}; scattered", -gap);
            return LayoutKind::Scattered;
        }

        let indent = (lower.bounding_box.x - upper.bounding_box.x).abs();
        max_indent = max_indent.max(indent);
    }

    if max_indent > thresholds.indent_factor * mean_width {
        log::debug!("[Layout] Left-edge offset {:.1} breaks alignment; scattered", max_indent);
        return LayoutKind::Scattered;
    }

    LayoutKind::Unified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::BoundingBox;

    fn block(x: f64, y: f64, width: f64, height: f64) -> TextBlock {
        TextBlock::new("text", BoundingBox::new(x, y, width, height))
    }

    /// Three 100x20 blocks stacked with a given vertical gap and x offsets.
    fn stack(gap: f64, xs: [f64; 3]) -> Vec<TextBlock> {
        let height = 20.0;
        (0..3)
            .map(|i| block(xs[i], i as f64 * (height + gap), 100.0, height))
            .collect()
    }

    #[test]
    fn test_single_block_is_unified() {
        let blocks = vec![block(0.0, 0.0, 100.0, 20.0)];
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Unified);
        assert_eq!(classify(&[], &LayoutThresholds::default()), LayoutKind::Unified);
    }

    #[test]
    fn test_degenerate_boxes_are_unified() {
        let blocks = vec![
            block(0.0, 0.0, 0.0, 0.0),
            block(0.0, 500.0, 0.0, 0.0),
            block(900.0, 0.0, 100.0, 20.0),
        ];
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Unified);
    }

    #[test]
    fn test_tight_stack_is_unified() {
        // Gaps of 0.5x mean height, zero horizontal offset
        let blocks = stack(10.0, [0.0, 0.0, 0.0]);
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Unified);
    }

    #[test]
    fn test_indented_stack_is_scattered() {
        // Same stack with one block shifted by 0.5x mean width
        let blocks = stack(10.0, [0.0, 50.0, 0.0]);
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Scattered);
    }

    #[test]
    fn test_wide_vertical_gap_is_scattered() {
        // Gap of 2.5x mean height between stacked blocks
        let blocks = stack(50.0, [0.0, 0.0, 0.0]);
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Scattered);
    }

    #[test]
    fn test_overlapping_blocks_are_scattered() {
        let blocks = vec![
            block(0.0, 0.0, 100.0, 20.0),
            block(0.0, 10.0, 100.0, 20.0),
        ];
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Scattered);
    }

    #[test]
    fn test_gap_at_threshold_is_unified() {
        // Exactly 2.0x mean height is not "exceeds"
        let blocks = stack(40.0, [0.0, 0.0, 0.0]);
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Unified);
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = LayoutThresholds {
            gap_factor: 0.4,
            ..LayoutThresholds::default()
        };
        let blocks = stack(10.0, [0.0, 0.0, 0.0]);
        assert_eq!(classify(&blocks, &strict), LayoutKind::Scattered);
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_y() {
        let mut blocks = stack(10.0, [0.0, 0.0, 0.0]);
        blocks.reverse();
        assert_eq!(classify(&blocks, &LayoutThresholds::default()), LayoutKind::Unified);
    }
}
