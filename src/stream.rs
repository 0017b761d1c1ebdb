//! Streaming triage API: emit page reports as they complete.
//!
//! ## Why stream?
//!
//! A downstream exporter can start cropping and rasterising the first pages
//! while later ones are still being classified. Unlike the eager
//! [`crate::triage::triage_document`], [`triage_stream`] yields each
//! [`PageReport`] as soon as its page is done. Pages arrive in completion
//! order; sort by `page_num` if order matters.

use crate::document::DocumentAccess;
use crate::error::TriageError;
use crate::output::PageReport;
use crate::triage::TriageEngine;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page reports.
pub type PageStream = Pin<Box<dyn Stream<Item = PageReport> + Send>>;

/// Triage the selected pages of `doc`, streaming reports as they are ready.
///
/// The progress callback is not invoked; the stream itself is the progress
/// signal.
///
/// # Errors
/// Only when the page selection matches no page.
pub fn triage_stream(
    doc: Arc<dyn DocumentAccess>,
    engine: TriageEngine,
) -> Result<PageStream, TriageError> {
    let indices = engine.selected_pages(doc.as_ref())?;
    let workers = engine.config().worker_count();
    info!(
        "Streaming triage of {} pages with {} workers",
        indices.len(),
        workers
    );

    let s = stream::iter(indices.into_iter().map(move |idx| {
        let doc = Arc::clone(&doc);
        let engine = engine.clone();
        async move { engine.triage_page_concurrent(doc, idx).await }
    }))
    .buffer_unordered(workers);

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageSelection, TriageConfig};
    use crate::document::{DocumentSnapshot, PageSnapshot};

    #[tokio::test]
    async fn streams_every_selected_page() {
        let doc: Arc<dyn DocumentAccess> = Arc::new(DocumentSnapshot::new(vec![
            PageSnapshot::a4(),
            PageSnapshot::a4(),
            PageSnapshot::a4(),
        ]));
        let engine = TriageEngine::new(
            TriageConfig::builder()
                .pages(PageSelection::Set(vec![1, 3]))
                .build()
                .unwrap(),
        )
        .unwrap();
        let mut pages: Vec<usize> = triage_stream(doc, engine)
            .unwrap()
            .map(|r| r.page_num)
            .collect()
            .await;
        pages.sort_unstable();
        assert_eq!(pages, vec![1, 3]);
    }

    #[test]
    fn empty_document_is_an_error() {
        let doc: Arc<dyn DocumentAccess> = Arc::new(DocumentSnapshot::default());
        let engine = TriageEngine::new(TriageConfig::default()).unwrap();
        assert!(triage_stream(doc, engine).is_err());
    }
}
