//! Output types: per-page reports and document statistics.

use crate::error::{DetectorFault, Signal};
use crate::pipeline::fusion::{PageClassification, PageEvidence};
use crate::pipeline::regions::{FigureRegion, RegionType};
use crate::pipeline::strategy::{ProcessingDecision, ProcessingMethod};
use serde::Serialize;

/// Everything triage decided about one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// 1-indexed.
    pub page_num: usize,
    pub classification: PageClassification,
    pub decision: ProcessingDecision,
    /// All merged, captioned regions on the page, whatever the method.
    pub regions: Vec<FigureRegion>,
    pub evidence: PageEvidence,
    pub detector_faults: Vec<DetectorFault>,
    pub unavailable_signals: Vec<Signal>,
    pub duration_ms: u64,
}

impl PageReport {
    /// 0-indexed page number.
    pub fn page_index(&self) -> usize {
        self.page_num.saturating_sub(1)
    }
}

/// Result of triaging a document.
#[derive(Debug, Clone, Serialize)]
pub struct TriageOutput {
    /// Sorted by page number.
    pub pages: Vec<PageReport>,
    pub stats: TriageStats,
}

/// Document-level counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriageStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages selected and triaged.
    pub triaged_pages: usize,
    pub text_only_pages: usize,
    pub extract_images_pages: usize,
    pub full_page_pages: usize,
    pub hybrid_pages: usize,
    pub high_priority_pages: usize,
    pub table_regions: usize,
    pub image_regions: usize,
    pub figure_regions: usize,
    pub captioned_regions: usize,
    pub detector_faults: usize,
    /// Signal queries that failed, summed over pages.
    pub unavailable_signals: usize,
    /// Sum of the per-page cost estimates.
    pub estimated_cost: f64,
    pub total_duration_ms: u64,
}

impl TriageStats {
    pub fn from_reports(reports: &[PageReport], total_pages: usize, total_duration_ms: u64) -> Self {
        let mut stats = TriageStats {
            total_pages,
            triaged_pages: reports.len(),
            total_duration_ms,
            ..Default::default()
        };
        for r in reports {
            match r.decision.method {
                ProcessingMethod::TextOnly => stats.text_only_pages += 1,
                ProcessingMethod::ExtractImages => stats.extract_images_pages += 1,
                ProcessingMethod::FullPage => stats.full_page_pages += 1,
                ProcessingMethod::Hybrid => stats.hybrid_pages += 1,
            }
            if r.decision.high_priority {
                stats.high_priority_pages += 1;
            }
            for region in &r.regions {
                match region.region_type {
                    RegionType::Table => stats.table_regions += 1,
                    RegionType::Image => stats.image_regions += 1,
                    RegionType::Figure => stats.figure_regions += 1,
                }
                if region.caption.is_some() {
                    stats.captioned_regions += 1;
                }
            }
            stats.detector_faults += r.detector_faults.len();
            stats.unavailable_signals += r.unavailable_signals.len();
            stats.estimated_cost += r.decision.estimated_cost;
        }
        stats
    }

    /// Pages that need any rendering at all.
    pub fn rasterised_pages(&self) -> usize {
        self.extract_images_pages + self.full_page_pages + self.hybrid_pages
    }
}
