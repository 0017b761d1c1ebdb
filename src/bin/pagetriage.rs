//! CLI binary for edgequake-pagetriage.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TriageConfig`, triages a document snapshot and prints the plan.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pagetriage::{
    triage_document, triage_to_file, DetectorFault, DocumentAccess, DocumentSnapshot, PageReport,
    PageSelection, ProcessingMethod, ProgressCallback, TriageConfig, TriageEngine,
    TriageProgressCallback, TriageStats,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── Terminal colours ─────────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn method_label(method: ProcessingMethod) -> String {
    match method {
        ProcessingMethod::TextOnly => dim("text_only"),
        ProcessingMethod::ExtractImages => cyan("extract_images"),
        ProcessingMethod::FullPage => yellow("full_page"),
        ProcessingMethod::Hybrid => bold(&yellow("hybrid")),
    }
}

// ── Progress bar ─────────────────────────────────────────────────────────────

/// Live progress bar plus one log line per page. Pages complete out of
/// order, so nothing here assumes sequential page numbers.
struct CliProgressCallback {
    bar: ProgressBar,
    faults: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Triaging");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            faults: AtomicUsize::new(0),
        })
    }
}

impl TriageProgressCallback for CliProgressCallback {
    fn on_triage_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Triaging {total_pages} pages…"))
        ));
    }

    fn on_detector_fault(&self, page_num: usize, fault: &DetectorFault) {
        self.faults.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            yellow("⚠"),
            page_num,
            dim(&fault.to_string())
        ));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, method: ProcessingMethod) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            method_label(method)
        ));
        self.bar.inc(1);
    }

    fn on_triage_complete(&self, total_pages: usize, rasterised_pages: usize) {
        self.bar.finish_and_clear();
        let faults = self.faults.load(Ordering::SeqCst);
        eprintln!(
            "{} {} pages triaged, {} need rendering{}",
            green("✔"),
            bold(&total_pages.to_string()),
            bold(&rasterised_pages.to_string()),
            if faults > 0 {
                format!("  ({} detector faults)", yellow(&faults.to_string()))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Triage every page of a signal dump, print a summary table
  pagetriage document.signals.json

  # Full JSON report to a file
  pagetriage document.signals.json -o plan.json

  # Only pages 3-10, stricter text-only screen
  pagetriage --pages 3-10 --density-threshold 0.9 document.signals.json

  # Thresholds from a JSON config, report on stdout
  pagetriage --config triage.json --json document.signals.json > plan.json

INPUT FORMAT:
  A JSON document snapshot: { "pages": [ { "bounds", "text", "text_blocks",
  "shapes", "tables", "images" }, … ] }. A signal recorded as null is
  treated as unavailable for that page and the page is still triaged.

METHODS:
  text_only        read the text layer, no rendering
  extract_images   crop the embedded pictures only
  full_page        rasterise the whole page (tables or figures)
  hybrid           text layer + page image + cropped pictures
"#;

/// Decide per page whether to read text, crop pictures or rasterise.
#[derive(Parser, Debug)]
#[command(
    name = "pagetriage",
    version,
    about = "Decide per page whether to read text, crop pictures or rasterise",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document snapshot (JSON).
    input: PathBuf,

    /// Write the JSON report to this file instead of stdout.
    #[arg(short, long, env = "PAGETRIAGE_OUTPUT")]
    output: Option<PathBuf>,

    /// JSON config file; flags below override it.
    #[arg(long, env = "PAGETRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Pages to triage: all, 5, 3-15 or 1,3,5.
    #[arg(long, env = "PAGETRIAGE_PAGES", default_value = "all")]
    pages: String,

    /// Worker pool cap.
    #[arg(short, long, env = "PAGETRIAGE_WORKERS")]
    workers: Option<usize>,

    /// Text density above which a page may skip visual processing (0–1].
    #[arg(long, env = "PAGETRIAGE_DENSITY_THRESHOLD")]
    density_threshold: Option<f64>,

    /// Minimum region area to keep.
    #[arg(long, env = "PAGETRIAGE_MIN_FIGURE_AREA")]
    min_figure_area: Option<f64>,

    /// Shape clustering distance.
    #[arg(long, env = "PAGETRIAGE_CLUSTER_DISTANCE")]
    cluster_distance: Option<f64>,

    /// Per-detector timeout in milliseconds.
    #[arg(long, env = "PAGETRIAGE_DETECTOR_TIMEOUT_MS")]
    detector_timeout_ms: Option<u64>,

    /// Output the full JSON report instead of a summary table.
    #[arg(long, env = "PAGETRIAGE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGETRIAGE_NO_PROGRESS")]
    no_progress: bool,

    /// Debug-level logs on stderr.
    #[arg(short, long, env = "PAGETRIAGE_VERBOSE")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, env = "PAGETRIAGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let doc: Arc<dyn DocumentAccess> = Arc::new(
        DocumentSnapshot::from_path(&cli.input)
            .with_context(|| format!("Failed to load snapshot {}", cli.input.display()))?,
    );

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn TriageProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let engine = TriageEngine::new(config).context("Invalid configuration")?;

    // ── Run triage ───────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = triage_to_file(doc, &engine, output_path)
            .await
            .context("Triage failed")?;
        if !cli.quiet {
            print_stats(&stats);
            eprintln!("   →  {}", bold(&output_path.display().to_string()));
        }
    } else {
        let output = triage_document(doc, &engine)
            .await
            .context("Triage failed")?;
        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            for page in &output.pages {
                println!("{}", summary_line(page));
            }
            if !cli.quiet {
                print_stats(&output.stats);
            }
        }
    }

    Ok(())
}

/// Map CLI args onto the (optional) config file.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TriageConfig> {
    let mut config = match cli.config {
        Some(ref path) => TriageConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TriageConfig::default(),
    };

    config.pages = parse_pages(&cli.pages)?;
    if let Some(n) = cli.workers {
        config.max_workers = n;
    }
    if let Some(d) = cli.density_threshold {
        config.quick_text_density_threshold = d;
    }
    if let Some(a) = cli.min_figure_area {
        config.min_figure_area = a;
    }
    if let Some(d) = cli.cluster_distance {
        config.cluster_distance_threshold = d;
    }
    if let Some(ms) = cli.detector_timeout_ms {
        config.detector_timeout_ms = ms;
    }
    config.progress_callback = progress;

    Ok(config)
}

fn summary_line(page: &PageReport) -> String {
    let regions = page
        .regions
        .iter()
        .map(|r| match r.caption {
            Some(ref c) => format!("{:?} \"{}\"", r.region_type, c),
            None => format!("{:?}", r.region_type),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{:>4}  {:<24} {:>5.2}  {:<10}  {}",
        page.page_num,
        method_label(page.decision.method),
        page.decision.confidence,
        format!("{:?}", page.classification.primary_type),
        if regions.is_empty() {
            dim("-")
        } else {
            regions
        }
    )
}

fn print_stats(stats: &TriageStats) {
    eprintln!(
        "{}  {}/{} pages  text {}  images {}  full {}  hybrid {}  cost {:.2}  {}ms",
        green("✔"),
        stats.triaged_pages,
        stats.total_pages,
        stats.text_only_pages,
        stats.extract_images_pages,
        stats.full_page_pages,
        stats.hybrid_pages,
        stats.estimated_cost,
        stats.total_duration_ms
    );
}

/// `--pages` grammar: `all`, `N`, `A-B` or `A,B,C` (1-indexed).
fn parse_pages(raw: &str) -> Result<PageSelection> {
    let sel = raw.trim().to_ascii_lowercase();
    let number = |part: &str| -> Result<usize> {
        let n: usize = part
            .trim()
            .parse()
            .with_context(|| format!("'{}' is not a page number", part.trim()))?;
        if n == 0 {
            anyhow::bail!("page numbers start at 1");
        }
        Ok(n)
    };

    if sel == "all" {
        Ok(PageSelection::All)
    } else if let Some((a, b)) = sel.split_once('-') {
        let (first, last) = (number(a)?, number(b)?);
        if first > last {
            anyhow::bail!("page range {first}-{last} runs backwards");
        }
        Ok(PageSelection::Range(first, last))
    } else if sel.contains(',') {
        let pages = sel.split(',').map(number).collect::<Result<Vec<_>>>()?;
        Ok(PageSelection::Set(pages))
    } else {
        Ok(PageSelection::Single(number(sel.as_str())?))
    }
}
