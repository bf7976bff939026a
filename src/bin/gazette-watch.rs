//! CLI binary for gazette-watch.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `WatchConfig`, runs once, and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use gazette_watch::config::{
    DEFAULT_LINK_ATTRIBUTE, DEFAULT_LINK_PATTERN, DEFAULT_LINK_SELECTOR, DEFAULT_PAGE_URL,
    DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, DEFAULT_SUBJECT, DEFAULT_TERM,
};
use gazette_watch::pipeline::scan::DEFAULT_SNIPPET_RADIUS;
use gazette_watch::{
    run, scan_file, LinkStrategy, ProgressCallback, RunProgressCallback, RunReport, ScanResult,
    Stage, WatchConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that shows the running stage and logs one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.label());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.label(),
            dim(detail)
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Keep long transport errors on one terminal line.
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<20} {}", red("✗"), stage.label(), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One run with settings from the environment (cron-friendly)
  EMAIL_REMETENTE=me@gmail.com EMAIL_SENHA=app-pass gazette-watch

  # Several recipients, different phrase
  gazette-watch --term "licitação" --recipients "a@x.com,b@x.com"

  # Everything except sending; print the report as JSON
  gazette-watch --dry-run --json

  # Search a PDF already on disk (no network, no mail settings needed)
  gazette-watch --scan-file edition.pdf --term "conservação de pavimento"

  # Pages whose link is built by JavaScript (build with --features browser)
  gazette-watch --strategy browser --browser-settle 8

ENVIRONMENT VARIABLES:
  EMAIL_REMETENTE        Sender address, also the SMTP login
  EMAIL_SENHA            SMTP password (app password for Gmail)
  EMAIL_DESTINO          Comma-separated recipients (default: sender)
  GAZETTE_URL            Index page linking the current edition
  GAZETTE_TERM           Phrase to search for
  RUST_LOG               Overrides the log filter (e.g. gazette_watch=debug)

SCHEDULING:
  gazette-watch performs exactly one run and exits. Schedule it externally:
    0 8 * * 1-5  /usr/local/bin/gazette-watch --quiet
"#;

/// Watch an official gazette PDF for a phrase and e-mail the hits.
#[derive(Parser, Debug)]
#[command(
    name = "gazette-watch",
    version,
    about = "Watch an official gazette PDF for a phrase and e-mail the hits",
    long_about = "Find today's gazette PDF on its index page, download it, search every page for \
a phrase (case- and line-break-insensitive), and send one e-mail with a per-page summary and the \
PDF attached. The downloaded file is always removed before exiting.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Index page that links the current edition.
    #[arg(long, env = "GAZETTE_URL", default_value = DEFAULT_PAGE_URL)]
    url: String,

    /// Phrase to search for.
    #[arg(short, long, env = "GAZETTE_TERM", default_value = DEFAULT_TERM)]
    term: String,

    /// How the PDF link is located on the index page.
    #[arg(long, env = "GAZETTE_STRATEGY", value_enum, default_value = "dom")]
    strategy: StrategyArg,

    /// CSS selector of the PDF anchor (browser and dom strategies).
    #[arg(long, env = "GAZETTE_LINK_SELECTOR", default_value = DEFAULT_LINK_SELECTOR)]
    link_selector: String,

    /// Attribute holding the link (browser and dom strategies).
    #[arg(long, env = "GAZETTE_LINK_ATTRIBUTE", default_value = DEFAULT_LINK_ATTRIBUTE)]
    link_attribute: String,

    /// Regular expression for the regex strategy; the first capture group is the link.
    #[arg(long, env = "GAZETTE_LINK_PATTERN", default_value = DEFAULT_LINK_PATTERN,
          hide_default_value = true)]
    link_pattern: String,

    /// Seconds to let page scripts run before reading the link (browser strategy).
    #[arg(long, env = "GAZETTE_BROWSER_SETTLE", default_value_t = 5)]
    browser_settle: u64,

    /// Index page timeout in seconds.
    #[arg(long, env = "GAZETTE_PAGE_TIMEOUT", default_value_t = 30)]
    page_timeout: u64,

    /// PDF download timeout in seconds.
    #[arg(long, env = "GAZETTE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Write the PDF here instead of a temporary directory (still removed afterwards).
    #[arg(long, env = "GAZETTE_DOWNLOAD_PATH")]
    download_path: Option<PathBuf>,

    /// Characters of context on each side of a match.
    #[arg(long, env = "GAZETTE_SNIPPET_RADIUS", default_value_t = DEFAULT_SNIPPET_RADIUS)]
    snippet_radius: usize,

    /// Sender address, also used as the SMTP login.
    #[arg(long, env = "EMAIL_REMETENTE", default_value = "")]
    sender: String,

    /// SMTP password.
    #[arg(long, env = "EMAIL_SENHA", default_value = "", hide_env_values = true,
          hide_default_value = true)]
    password: String,

    /// Comma-separated recipients. Default: the sender.
    #[arg(long, env = "EMAIL_DESTINO")]
    recipients: Option<String>,

    /// SMTP server.
    #[arg(long, env = "SMTP_HOST", default_value = DEFAULT_SMTP_HOST)]
    smtp_host: String,

    /// SMTP port: 465 uses implicit TLS, anything else STARTTLS.
    #[arg(long, env = "SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    smtp_port: u16,

    /// E-mail subject.
    #[arg(long, env = "EMAIL_SUBJECT", default_value = DEFAULT_SUBJECT)]
    subject: String,

    /// Compose the e-mail but do not send it.
    #[arg(long, env = "GAZETTE_DRY_RUN")]
    dry_run: bool,

    /// Search a local PDF instead of running the pipeline.
    #[arg(long, value_name = "PATH")]
    scan_file: Option<PathBuf>,

    /// Output a JSON report instead of text.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Browser,
    Dom,
    Regex,
}

impl From<StrategyArg> for LinkStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Browser => LinkStrategy::Browser,
            StrategyArg::Dom => LinkStrategy::Dom,
            StrategyArg::Regex => LinkStrategy::Regex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // While the spinner is visible it carries the stage feedback, so the
    // library's INFO lines are held back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.scan_file.is_none();
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

    // ── Offline scan mode ────────────────────────────────────────────────
    if let Some(ref path) = cli.scan_file {
        let result = scan_file(path, &cli.term, cli.snippet_radius)
            .await
            .with_context(|| format!("Failed to scan {}", path.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialise result")?
            );
        } else if !cli.quiet {
            print_occurrences(&cli.term, &result);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .as_ref()
        .map(|cb| Arc::clone(cb) as Arc<dyn RunProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = run(&config).await;
    if let Some(ref cb) = spinner {
        cb.finish();
    }
    let report = outcome.context("Gazette run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `WatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<WatchConfig> {
    let mut builder = WatchConfig::builder()
        .page_url(&cli.url)
        .term(&cli.term)
        .strategy(cli.strategy.into())
        .link_selector(&cli.link_selector)
        .link_attribute(&cli.link_attribute)
        .link_pattern(&cli.link_pattern)
        .browser_settle_secs(cli.browser_settle)
        .page_timeout_secs(cli.page_timeout)
        .download_timeout_secs(cli.download_timeout)
        .snippet_radius(cli.snippet_radius)
        .dry_run(cli.dry_run)
        .sender(&cli.sender)
        .password(&cli.password)
        .smtp_host(&cli.smtp_host)
        .smtp_port(cli.smtp_port)
        .subject(&cli.subject);

    if let Some(ref path) = cli.download_path {
        builder = builder.download_path(path.clone());
    }
    if let Some(ref list) = cli.recipients {
        builder = builder.recipients(list);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_occurrences(term: &str, result: &ScanResult) {
    if result.is_empty() {
        println!(
            "'{}' not found ({} pages scanned)",
            term, result.pages_scanned
        );
        return;
    }
    for occurrence in result {
        println!(
            "{} {}",
            bold(&format!("Page {:>4}:", occurrence.page)),
            occurrence.snippet
        );
    }
    println!(
        "{} occurrence(s) on {} page(s), {} pages scanned",
        result.len(),
        result.pages_with_hits().len(),
        result.pages_scanned
    );
}

fn print_summary(report: &RunReport) {
    print_occurrences(&report.term, &report.scan);
    if report.dry_run {
        eprintln!("{}  dry run, e-mail not sent", dim("–"));
    } else {
        eprintln!(
            "{}  e-mail sent to {}",
            green("✔"),
            bold(&report.recipients.join(", "))
        );
    }
    eprintln!(
        "   {}",
        dim(&format!(
            "{} bytes from {} ({}ms total)",
            report.document_bytes, report.source, report.timings.total_ms
        ))
    );
}
