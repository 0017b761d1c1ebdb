//! Figure-number analysis of page text and the quick text-only screen.
//!
//! A page that says "図1-1の通り" or "see Figure 3" mentions a figure without
//! containing one. Telling such references apart from real captions is what
//! keeps prose-heavy pages on the cheap text path.
//!
//! Each line is judged on its own:
//!
//! 1. A line matching any reference template is a reference line. Every
//!    figure number on it is a reference.
//! 2. Otherwise a figure-number match is an *actual caption* when it is
//!    positioned like one: only whitespace (ideographic space included)
//!    before it, and after it whitespace, a colon, a period or the end of
//!    the line (full-width forms included).
//!    That covers captions at line start, alone on their line, or indented.
//! 3. Any other match is a reference.

use crate::config::TriageConfig;
use crate::document::TextBlock;
use crate::error::TriageError;
use crate::geometry::{BBox, PageBounds};
use crate::pipeline::features::FeatureCache;
use regex::Regex;
use serde::Serialize;

/// Compiled pattern lists from [`TriageConfig`].
#[derive(Debug, Clone)]
pub struct TextPatterns {
    figure_numbers: Vec<Regex>,
    references: Vec<Regex>,
    captions: Vec<Regex>,
}

/// What the figure-number scan found on a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FigureMentions {
    /// At least one figure/table number matched anywhere.
    pub has_figure_number: bool,
    /// At least one match was classified as a reference.
    pub has_reference: bool,
    /// At least one match was positioned like a caption.
    pub has_actual_caption: bool,
}

impl TextPatterns {
    pub fn from_config(config: &TriageConfig) -> Result<Self, TriageError> {
        Ok(Self {
            figure_numbers: compile("figure_number_patterns", &config.figure_number_patterns)?,
            references: compile("reference_patterns", &config.reference_patterns)?,
            captions: compile("caption_patterns", &config.caption_patterns)?,
        })
    }

    /// Classify every figure-number match in `text`.
    pub fn classify_mentions(&self, text: &str) -> FigureMentions {
        let mut mentions = FigureMentions::default();
        for line in text.lines() {
            let matches: Vec<(usize, usize)> = self
                .figure_numbers
                .iter()
                .flat_map(|re| re.find_iter(line).map(|m| (m.start(), m.end())))
                .collect();
            if matches.is_empty() {
                continue;
            }
            mentions.has_figure_number = true;

            if self.references.iter().any(|re| re.is_match(line)) {
                mentions.has_reference = true;
                continue;
            }

            if matches
                .iter()
                .any(|&(start, end)| is_caption_position(line, start, end))
            {
                mentions.has_actual_caption = true;
            } else {
                mentions.has_reference = true;
            }
        }
        mentions
    }

    /// First caption in `band_text`: patterns are tried in order, and the
    /// first one that matches anywhere decides. The whole match, trimmed, is
    /// the caption.
    pub fn find_caption(&self, band_text: &str) -> Option<String> {
        self.captions.iter().find_map(|re| {
            re.find(band_text)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }
}

fn compile(field: &str, patterns: &[String]) -> Result<Vec<Regex>, TriageError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                TriageError::InvalidConfig(format!("{field}: bad pattern {p:?}: {e}"))
            })
        })
        .collect()
}

fn is_caption_position(line: &str, start: usize, end: usize) -> bool {
    let before = &line[..start];
    let after = &line[end..];
    before.chars().all(char::is_whitespace)
        && after
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || matches!(c, ':' | '：' | '.' | '．'))
}

/// Summed text-block area over page area. Zero when the bounds are unknown.
///
/// Blocks are not de-overlapped, so heavily overlapping blocks can push the
/// value above 1.0.
pub fn text_density(blocks: &[TextBlock], bounds: PageBounds) -> f64 {
    if bounds.is_empty() {
        return 0.0;
    }
    let covered: f64 = blocks
        .iter()
        .filter(|b| !b.bbox.is_degenerate())
        .map(|b| b.bbox.area())
        .sum();
    covered / bounds.area()
}

/// Text of every block that overlaps `band` and whose centre is not above
/// the band's top edge, in block order. Labels inside the region the band
/// hangs from are therefore left out.
pub fn text_in_band(blocks: &[TextBlock], band: &BBox) -> String {
    blocks
        .iter()
        .filter(|b| b.bbox.overlaps(band) && b.bbox.center().y >= band.y0)
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of distinct keywords present in `text`.
pub fn count_keywords(text: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| !k.is_empty() && text.contains(k.as_str()))
        .count()
}

/// Quick-screen features of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickScreen {
    pub text_density: f64,
    pub mentions: FigureMentions,
    /// Embedded images with more pixels than `quick_image_pixel_threshold`.
    pub large_image_count: usize,
    /// First configured force keyword found in the text.
    pub force_keyword: Option<String>,
}

impl QuickScreen {
    /// The text-only gate: dense text, no real caption, no large image and
    /// no force keyword.
    pub fn is_text_only(&self, density_threshold: f64) -> bool {
        self.text_density > density_threshold
            && !self.mentions.has_actual_caption
            && self.large_image_count == 0
            && self.force_keyword.is_none()
    }
}

pub fn quick_screen(
    cache: &FeatureCache,
    patterns: &TextPatterns,
    config: &TriageConfig,
) -> QuickScreen {
    QuickScreen {
        text_density: text_density(cache.text_blocks(), cache.bounds()),
        mentions: patterns.classify_mentions(cache.text()),
        large_image_count: cache
            .images()
            .iter()
            .filter(|img| img.pixel_count() > config.quick_image_pixel_threshold)
            .count(),
        force_keyword: config
            .force_image_keywords
            .iter()
            .find(|k| !k.is_empty() && cache.text().contains(k.as_str()))
            .cloned(),
    }
}
