//! Prompt templates for the vision-language analysis step.
//!
//! Triage never calls a model. It tags every [`crate::FigureRegion`] and
//! [`crate::ProcessingDecision`] with a [`PromptKind`]; the caller that
//! crops or rasterises the page looks the template up here and sends it
//! along with the image.
//!
//! Keeping the templates in one place means tuning a prompt touches exactly
//! one constant, and tests can check that every kind has one.

use serde::{Deserialize, Serialize};

/// Which template fits an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Table,
    Figure,
    Image,
    FullPage,
    HybridPage,
}

impl PromptKind {
    pub fn template(self) -> &'static str {
        match self {
            PromptKind::Table => TABLE_PROMPT,
            PromptKind::Figure => FIGURE_PROMPT,
            PromptKind::Image => IMAGE_PROMPT,
            PromptKind::FullPage => FULL_PAGE_PROMPT,
            PromptKind::HybridPage => HYBRID_PAGE_PROMPT,
        }
    }

    /// The template with a caption line appended when one was found.
    pub fn render(self, caption: Option<&str>) -> String {
        match caption {
            Some(c) if !c.trim().is_empty() => format!(
                "{}\n\nThe image is captioned: \"{}\". Use it to anchor your description.",
                self.template(),
                c.trim()
            ),
            _ => self.template().to_string(),
        }
    }
}

pub const TABLE_PROMPT: &str = r#"The image is a table cropped from a document page.

1. Reproduce the table as a GFM pipe table.
2. Keep every row and column, including empty cells.
3. Preserve merged header text by repeating it in each spanned column.
4. Output ONLY the table, with no commentary."#;

pub const FIGURE_PROMPT: &str = r#"The image is a figure (diagram, flowchart or chart) cropped from a document page.

1. State what kind of figure it is in one sentence.
2. List every labelled element in reading order.
3. For flowcharts, describe each step and each branch with its condition.
4. Transcribe all text inside the figure exactly.
5. Output plain Markdown, with no preamble."#;

pub const IMAGE_PROMPT: &str = r#"The image is a picture embedded in a document page.

1. Describe what it shows in two or three sentences.
2. Transcribe any visible text exactly.
3. Output plain Markdown, with no preamble."#;

pub const FULL_PAGE_PROMPT: &str = r#"The image is a full document page that contains tables or figures.

1. Transcribe all body text in reading order.
2. Convert tables to GFM pipe tables.
3. Replace each figure with a short description in a blockquote.
4. Ignore page numbers and repeated headers or footers.
5. Output ONLY the Markdown content."#;

pub const HYBRID_PAGE_PROMPT: &str = r#"The image is a full document page whose text has already been extracted.

1. Do NOT transcribe body text.
2. Describe every figure, table and picture on the page, in reading order.
3. Start each description with its caption when the page shows one.
4. Output plain Markdown, with no preamble."#;
