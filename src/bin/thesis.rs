//! CLI binary for edgequake-thesis.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ThesisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_thesis::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use edgequake_thesis::{
    assess, categories_found, check_renderer, classify_deck, inspect, render_report,
    write_report, Assessment, AssessmentProgressCallback, Category, ProgressCallback,
    ThesisConfig, ThesisError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over the classification calls,
/// then a spinner while the analysis call runs.
struct CliProgressCallback {
    bar: ProgressBar,
    unclassified: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until the slide count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading deck…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            unclassified: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} slides  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Classifying");
        self.bar.reset_eta();
    }
}

impl AssessmentProgressCallback for CliProgressCallback {
    fn on_extraction_complete(&self, total_slides: usize) {
        self.activate_bar(total_slides);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Classifying {total_slides} slides…"))
        ));
    }

    fn on_slide_start(&self, slide: usize, _total_slides: usize) {
        self.bar.set_message(format!("slide {slide}"));
    }

    fn on_slide_classified(&self, slide: usize, total_slides: usize, category: Category) {
        self.bar.println(format!(
            "  {} Slide {:>2}/{:<2}  {}",
            green("✓"),
            slide,
            total_slides,
            category
        ));
        self.bar.inc(1);
    }

    fn on_slide_unclassified(&self, slide: usize, total_slides: usize, reason: &str) {
        self.unclassified.fetch_add(1, Ordering::SeqCst);
        let msg: String = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} Slide {:>2}/{:<2}  {}  {}",
            yellow("?"),
            slide,
            total_slides,
            Category::Unclassified,
            dim(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_analysis_start(&self, categories_found: &[Category]) {
        let names: Vec<&str> = categories_found.iter().map(|c| c.as_str()).collect();
        let skipped = self.unclassified.load(Ordering::SeqCst);
        self.bar.println(format!(
            "{} Categories found: {}  {}",
            cyan("◆"),
            bold(&names.join(", ")),
            dim(&format!("({skipped} unclassified)"))
        ));
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        self.bar.set_prefix("Analyzing");
        self.bar.set_message("waiting for the investment thesis…");
    }

    fn on_analysis_complete(&self, warnings: usize) {
        self.finish();
        if warnings == 0 {
            eprintln!("{} Thesis parsed", green("✔"));
        } else {
            eprintln!(
                "{} Thesis parsed with {} validation warnings",
                yellow("⚠"),
                warnings
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Assess a deck and write the PDF report to the current directory
  thesis pitch.pptx --startup-name Acme

  # Write the report elsewhere
  thesis pitch.pptx --startup-name Acme -o reports/

  # Assess a deck from a URL, JSON on stdout, no PDF
  thesis https://example.com/pitch.pptx --json --no-pdf > thesis.json

  # Only label the slides (no analysis call)
  thesis --classify-only pitch.pptx

  # Inspect the deck (no API key needed)
  thesis --inspect-only pitch.pptx

DECK REQUIREMENTS:
  .pptx only, at most 50 MB, 5–20 slides, and at least 3 slides about
  distinct topics among: Problem, Solution, Market, Business Model,
  Competition, Team, Financials, Traction, Funding Ask.

ENVIRONMENT VARIABLES:
  GROQ_API_KEY                 API key for the completion endpoint (also read from .env)
  EDGEQUAKE_THESIS_ENDPOINT    Override the chat-completion endpoint URL
  EDGEQUAKE_THESIS_MODEL       Override the model ID
  PDFIUM_LIB_PATH              Path to libpdfium (file or directory) for the PDF report
  RUST_LOG                     Override log filtering (e.g. edgequake_thesis=debug)

SETUP:
  1. Set API key:     export GROQ_API_KEY=gsk_...
  2. Assess:          thesis pitch.pptx --startup-name Acme
"#;

/// Generate an investment thesis from a pitch deck using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "thesis",
    version,
    about = "Generate an investment thesis report from a .pptx pitch deck using an LLM",
    long_about = "Extract the slides of a .pptx pitch deck, classify each slide into a fixed \
pitch-deck taxonomy, ask the model for a structured investment thesis and render it as a \
PDF report. Works with any OpenAI-compatible chat-completion endpoint (Groq by default).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .pptx file path or HTTP/HTTPS URL.
    input: String,

    /// Directory for the PDF report.
    #[arg(short, long, env = "THESIS_OUTPUT_DIR", default_value = ".")]
    output: PathBuf,

    /// Startup name used in the report and its file name.
    #[arg(long, env = "THESIS_STARTUP_NAME", default_value = "DemoStartup")]
    startup_name: String,

    /// Model ID.
    #[arg(long, env = "EDGEQUAKE_THESIS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible chat-completion endpoint.
    #[arg(long, env = "EDGEQUAKE_THESIS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// API key (prefer the environment variable).
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, hide = true)]
    api_key: Option<String>,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "THESIS_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "THESIS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Distinct categories required before the analysis runs (1–9).
    #[arg(long, env = "THESIS_MIN_CATEGORIES", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(1..=9))]
    min_categories: u8,

    /// Output the full assessment as JSON on stdout.
    #[arg(long, env = "THESIS_JSON")]
    json: bool,

    /// Skip the PDF report.
    #[arg(long)]
    no_pdf: bool,

    /// Print deck facts only, no model calls.
    #[arg(long, conflicts_with = "classify_only")]
    inspect_only: bool,

    /// Classify slides only, no analysis call.
    #[arg(long)]
    classify_only: bool,

    /// Print the raw analysis response.
    #[arg(long)]
    raw_output: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "THESIS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "THESIS_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "THESIS_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the key may come from the real environment.
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect deck")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", meta.source);
            println!("Size:         {} bytes", meta.file_size);
            println!("Slides:       {}", meta.slide_count);
            let in_range = (config.min_slides..=config.max_slides).contains(&meta.slide_count);
            println!(
                "Assessable:   {}",
                if in_range {
                    green("yes")
                } else {
                    red(&format!(
                        "no (needs {}–{} slides)",
                        config.min_slides, config.max_slides
                    ))
                }
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let cli_cb = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn AssessmentProgressCallback>);
    let config = build_config(&cli, progress_cb)?;
    let finish_progress = || {
        if let Some(ref cb) = cli_cb {
            cb.finish();
        }
    };

    // ── Classify-only mode ───────────────────────────────────────────────
    if cli.classify_only {
        let classified = classify_deck(&cli.input, &config).await;
        // No analysis follows, so close the bar here.
        finish_progress();
        let (meta, slides) = classified.context("Classification failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&slides).context("Failed to serialise slides")?
            );
        } else if !cli.quiet {
            println!("{} ({} slides)", bold(&meta.source), meta.slide_count);
            for s in &slides {
                let label = s.category.to_string();
                println!(
                    "  {:>2}  {}",
                    s.index,
                    if s.category.is_known() {
                        label
                    } else {
                        dim(&label)
                    }
                );
            }
        }

        let found = categories_found(&slides);
        let names: Vec<&str> = found.iter().map(|c| c.as_str()).collect();
        if found.len() < config.min_categories {
            anyhow::bail!(
                "Only {} valid categories found: {}",
                found.len(),
                names.join(", ")
            );
        }
        if !cli.quiet {
            eprintln!(
                "{} Classification complete. Categories found: {}",
                green("✔"),
                names.join(", ")
            );
        }
        return Ok(());
    }

    // ── Check the renderer before paying for model calls ──────────────────
    if !cli.no_pdf {
        if let Err(e) = check_renderer().await {
            finish_progress();
            return Err(anyhow::Error::new(e)
                .context("PDF renderer unavailable (use --no-pdf to skip the report)"));
        }
    }

    // ── Run assessment ───────────────────────────────────────────────────
    let assessment = match assess(&cli.input, &config).await {
        Ok(a) => a,
        Err(e) => {
            finish_progress();
            report_failure(&e);
            return Err(anyhow::Error::new(e).context("Assessment failed"));
        }
    };

    // The thesis is printed before rendering so a render failure cannot lose it.
    if cli.raw_output {
        eprintln!("{}", bold("Raw LLM output:"));
        eprintln!("{}", assessment.raw_analysis);
    }

    if cli.json {
        let json =
            serde_json::to_string_pretty(&assessment).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&assessment);
    }

    // ── Render report ────────────────────────────────────────────────────
    let report_path = if cli.no_pdf {
        None
    } else {
        let report = render_report(&assessment.thesis, &cli.startup_name)
            .await
            .context("Failed to render the PDF report")?;
        Some(
            write_report(&cli.output, &report)
                .await
                .context("Failed to write the PDF report")?,
        )
    };

    if !cli.quiet {
        if let Some(path) = report_path {
            eprintln!(
                "{}  report  →  {}",
                green("✔"),
                bold(&path.display().to_string())
            );
        }
        eprintln!(
            "   {} slides ({} unclassified)  —  {}ms total",
            assessment.stats.total_slides,
            assessment.stats.unclassified_slides,
            assessment.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ThesisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ThesisConfig> {
    let mut builder = ThesisConfig::builder()
        .endpoint(cli.endpoint.clone())
        .model(cli.model.clone())
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .min_categories(cli.min_categories as usize);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Extra context for failures the user can act on.
fn report_failure(e: &ThesisError) {
    if let Some(raw) = e.raw_output() {
        eprintln!("{}", bold("Raw LLM output (for debugging):"));
        eprintln!("{raw}");
    }
}

/// Human-readable thesis summary on stdout.
fn print_summary(a: &Assessment) {
    let t = &a.thesis;
    println!("{}", bold("Investment Thesis Summary"));
    println!("  Recommendation:    {}", bold(&t.recommendation.to_string()));
    println!("  Overall Score:     {}", t.overall_score);
    println!("  Confidence Score:  {}", t.confidence_score);
    println!("  Processing Date:   {}", t.processing_date);

    println!();
    println!("{}", bold("Strengths"));
    for s in &t.strengths {
        println!("  - {s}");
    }
    println!("{}", bold("Weaknesses"));
    for w in &t.weaknesses {
        println!("  - {w}");
    }
    println!("{}", bold("Recommendations"));
    println!("  {}", t.recommendations);

    println!();
    println!("{}", bold("Category-wise Analysis"));
    println!("  {:<16} {:>5} {:>10}", "Category", "Score", "Weight (%)");
    for c in &t.categories {
        println!("  {:<16} {:>5} {:>10}", c.name, c.score, c.weight);
    }

    if !a.warnings.is_empty() {
        println!();
        println!("{}", yellow("Validation warnings"));
        for w in &a.warnings {
            println!("  {} {}", yellow("⚠"), w);
        }
    }
}
