//! Region Merger & Caption Binder.
//!
//! Regions from different sources often describe the same thing: a table
//! drawn with ruling lines shows up once as a table and again as a shape
//! cluster. Overlapping regions are merged greedily in detection order,
//! then each survivor is probed for a caption in the band beneath it.
//!
//! The merge repeats until no pair of regions on the same page overlaps, so
//! running it again on its own output changes nothing.

use crate::document::TextBlock;
use crate::pipeline::regions::FigureRegion;
use crate::pipeline::text::{text_in_band, TextPatterns};
use tracing::debug;

/// Merge overlapping regions. Boxes that only touch count as overlapping.
///
/// Regions are scanned in order; each unconsumed region becomes an
/// accumulator that absorbs every later unconsumed region it overlaps,
/// re-scanning as it grows. The merged type and confidence come from the
/// contributor with the highest confidence (the earliest on ties). Passes
/// repeat until nothing merges. Ordinals are renumbered.
pub fn merge_regions(regions: &[FigureRegion]) -> Vec<FigureRegion> {
    let mut current = regions.to_vec();
    loop {
        let (merged, changed) = merge_pass(&current);
        current = merged;
        if !changed {
            break;
        }
    }
    for (i, region) in current.iter_mut().enumerate() {
        region.ordinal_index = i;
    }
    current
}

fn merge_pass(regions: &[FigureRegion]) -> (Vec<FigureRegion>, bool) {
    let mut consumed = vec![false; regions.len()];
    let mut out = Vec::with_capacity(regions.len());
    let mut changed = false;

    for i in 0..regions.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        let mut acc = regions[i].clone();

        loop {
            let mut grew = false;
            for j in (i + 1)..regions.len() {
                let other = &regions[j];
                if consumed[j]
                    || other.page_index != acc.page_index
                    || !acc.bbox.overlaps(&other.bbox)
                {
                    continue;
                }
                acc.bbox = acc.bbox.union(&other.bbox);
                if other.confidence > acc.confidence {
                    acc.region_type = other.region_type;
                    acc.confidence = other.confidence;
                }
                if acc.caption.is_none() {
                    acc.caption = other.caption.clone();
                }
                consumed[j] = true;
                grew = true;
                changed = true;
            }
            if !grew {
                break;
            }
        }
        out.push(acc);
    }
    (out, changed)
}

/// Attach a caption to each region from the text in the `band_height` strip
/// beneath it. A region whose band has no caption keeps the caption it
/// already carries.
pub fn bind_captions(
    regions: &mut [FigureRegion],
    text_blocks: &[TextBlock],
    patterns: &TextPatterns,
    band_height: f64,
) {
    for region in regions.iter_mut() {
        let band = region.bbox.band_below(band_height);
        let band_text = text_in_band(text_blocks, &band);
        if let Some(caption) = patterns.find_caption(&band_text) {
            debug!(
                "Page {}: region {} captioned {:?}",
                region.page_index + 1,
                region.ordinal_index,
                caption
            );
            region.caption = Some(caption);
        }
    }
}

/// [`merge_regions`] then [`bind_captions`].
pub fn merge_and_caption(
    regions: &[FigureRegion],
    text_blocks: &[TextBlock],
    patterns: &TextPatterns,
    band_height: f64,
) -> Vec<FigureRegion> {
    let mut merged = merge_regions(regions);
    bind_captions(&mut merged, text_blocks, patterns, band_height);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use crate::geometry::BBox;
    use crate::pipeline::regions::RegionType;

    fn region(x0: f64, y0: f64, x1: f64, y1: f64, t: RegionType, conf: f64) -> FigureRegion {
        FigureRegion {
            bbox: BBox::new(x0, y0, x1, y1),
            region_type: t,
            confidence: conf,
            page_index: 0,
            ordinal_index: 0,
            caption: None,
        }
    }

    fn patterns() -> TextPatterns {
        TextPatterns::from_config(&TriageConfig::default()).unwrap()
    }

    #[test]
    fn overlapping_regions_take_stronger_type() {
        let merged = merge_regions(&[
            region(0.0, 0.0, 100.0, 100.0, RegionType::Figure, 0.7),
            region(50.0, 50.0, 200.0, 200.0, RegionType::Table, 0.9),
            region(400.0, 400.0, 500.0, 500.0, RegionType::Image, 0.95),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].bbox, BBox::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(merged[0].region_type, RegionType::Table);
        assert_eq!(merged[0].confidence, 0.9);
        assert_eq!(merged[1].ordinal_index, 1);
    }

    #[test]
    fn chain_merges_through_growth() {
        // The second region only overlaps once the third has been absorbed.
        let merged = merge_regions(&[
            region(0.0, 0.0, 100.0, 100.0, RegionType::Figure, 0.7),
            region(250.0, 0.0, 300.0, 100.0, RegionType::Figure, 0.7),
            region(90.0, 0.0, 260.0, 50.0, RegionType::Table, 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, BBox::new(0.0, 0.0, 300.0, 100.0));
    }

    #[test]
    fn later_accumulators_can_merge_in_a_second_pass() {
        // Neither the second nor the third region touches the first, but
        // their union does.
        let regions = [
            region(0.0, 0.0, 100.0, 100.0, RegionType::Figure, 0.7),
            region(150.0, 0.0, 250.0, 200.0, RegionType::Image, 0.95),
            region(0.0, 150.0, 200.0, 250.0, RegionType::Figure, 0.7),
        ];
        let merged = merge_regions(&regions);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, BBox::new(0.0, 0.0, 250.0, 250.0));
        assert_eq!(merged[0].region_type, RegionType::Image);
        assert_eq!(merge_regions(&merged), merged);
    }

    #[test]
    fn caption_read_from_band() {
        let blocks = vec![
            TextBlock {
                bbox: BBox::new(100.0, 120.0, 300.0, 132.0),
                text: "ラベル".into(),
            },
            TextBlock {
                bbox: BBox::new(100.0, 210.0, 300.0, 222.0),
                text: "図2-1：処理の流れ".into(),
            },
        ];
        let out = merge_and_caption(
            &[region(100.0, 100.0, 300.0, 200.0, RegionType::Figure, 0.7)],
            &blocks,
            &patterns(),
            50.0,
        );
        assert_eq!(out[0].caption.as_deref(), Some("図2-1：処理の流れ"));
    }

    #[test]
    fn text_beyond_band_ignored() {
        let blocks = vec![TextBlock {
            bbox: BBox::new(100.0, 260.0, 300.0, 272.0),
            text: "図2-1：処理の流れ".into(),
        }];
        let out = merge_and_caption(
            &[region(100.0, 100.0, 300.0, 200.0, RegionType::Figure, 0.7)],
            &blocks,
            &patterns(),
            50.0,
        );
        assert_eq!(out[0].caption, None);
    }

    #[test]
    fn merge_and_caption_is_idempotent() {
        let blocks = vec![TextBlock {
            bbox: BBox::new(0.0, 205.0, 300.0, 217.0),
            text: "Figure 3: Pipeline".into(),
        }];
        let p = patterns();
        let once = merge_and_caption(
            &[
                region(0.0, 0.0, 100.0, 200.0, RegionType::Figure, 0.7),
                region(100.0, 0.0, 200.0, 150.0, RegionType::Table, 0.9),
            ],
            &blocks,
            &p,
            50.0,
        );
        let twice = merge_and_caption(&once, &blocks, &p, 50.0);
        assert_eq!(once, twice);
        assert_eq!(once[0].caption.as_deref(), Some("Figure 3: Pipeline"));
    }
}
