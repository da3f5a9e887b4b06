//! CLI binary for medical-facilitator.
//!
//! A thin shim over the library crate: maps CLI flags to
//! `FacilitatorConfig`, drives one `Session` run, and prints or saves the
//! report.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use medical_facilitator::config::api_key_from_env;
use medical_facilitator::{AgentStatus, DocumentSource, FacilitatorConfig, RunOutput, Session};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Report to stdout
  medfac --image chest.jpg --document notes.txt

  # Inline text, save report into a directory
  medfac --image chest.png --text "Patient: Jane Doe, Age 45, Chief complaint: cough" -o reports/

  # Document from stdin, image from a URL
  cat notes.txt | medfac --image https://example.org/xray.webp --document -

  # Show the extracted data as well, no save delay
  medfac --image chest.jpg --document notes.txt --show-structured --save-delay-ms 0

  # JSON output (RunOutput)
  medfac --image chest.jpg --document notes.txt --json > run.json

  # Another vision-capable provider through edgequake-llm
  medfac --provider openai --model gpt-4.1-mini --image chest.jpg --document notes.txt

ENVIRONMENT VARIABLES:
  API_KEY                 Gemini API key (checked first)
  GEMINI_API_KEY          Gemini API key (fallback)
  MEDFAC_MODEL            Model for both stages (default: gemini-2.5-flash)
  MEDFAC_PROVIDER         Use an edgequake-llm provider instead of native Gemini
  RUST_LOG                Override the log filter

STAGES:
  Data Retriever Agent: Processing Document
  Medical Facilitator Agent: Analyzing and Generating Report
  Saving Report
  Done
"#;

/// Generate an integrated medical report from a document and an X-ray image.
#[derive(Parser, Debug)]
#[command(
    name = "medfac",
    version,
    about = "Generate an integrated medical report from a document and an X-ray image",
    long_about = "Runs two agents against a multimodal model: a Data Retriever Agent that \
structures the medical document text, and a Medical Facilitator Agent that combines the \
structured data with the X-ray image into a final report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP,
    group(ArgGroup::new("doc").required(true).args(["document", "text"]))
)]
struct Cli {
    /// X-ray image (PNG, JPEG or WEBP): local path or HTTP/HTTPS URL.
    #[arg(long, env = "MEDFAC_IMAGE")]
    image: String,

    /// Medical document text file, or `-` for stdin.
    #[arg(long, env = "MEDFAC_DOCUMENT")]
    document: Option<String>,

    /// Medical document text given inline.
    #[arg(long)]
    text: Option<String>,

    /// Save the report to this file or directory instead of stdout.
    #[arg(short, long, env = "MEDFAC_OUTPUT")]
    output: Option<PathBuf>,

    /// Gemini API key. Falls back to GEMINI_API_KEY.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model for both stages (e.g. gemini-2.5-flash, gemini-2.5-pro).
    #[arg(long, env = "MEDFAC_MODEL")]
    model: Option<String>,

    /// Model for the extraction stage only.
    #[arg(long, env = "MEDFAC_EXTRACTION_MODEL")]
    extraction_model: Option<String>,

    /// Model for the synthesis stage only (must accept images).
    #[arg(long, env = "MEDFAC_SYNTHESIS_MODEL")]
    synthesis_model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "MEDFAC_PROVIDER",
        long_help = "Use an edgequake-llm provider instead of the native Gemini client.\n\
          The provider reads its own key (OPENAI_API_KEY, ANTHROPIC_API_KEY, …)."
    )]
    provider: Option<String>,

    /// Gemini API base URL.
    #[arg(long, env = "MEDFAC_BASE_URL", hide = true)]
    base_url: Option<String>,

    /// Sampling temperature (0.0–2.0). Default: model default.
    #[arg(long, env = "MEDFAC_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens per call. Default: model default.
    #[arg(long, env = "MEDFAC_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Per-call model timeout in seconds. Default: none.
    #[arg(long, env = "MEDFAC_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Length of the "Saving Report" step in milliseconds.
    #[arg(long, env = "MEDFAC_SAVE_DELAY_MS", default_value_t = 1500)]
    save_delay_ms: u64,

    /// HTTP download timeout in seconds for image URLs.
    #[arg(long, env = "MEDFAC_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (RunOutput) instead of Markdown.
    #[arg(long, env = "MEDFAC_JSON")]
    json: bool,

    /// Also print the extracted structured data (to stderr).
    #[arg(long)]
    show_structured: bool,

    /// Disable the status spinner.
    #[arg(long, env = "MEDFAC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDFAC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MEDFAC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the status; library INFO logs would only scroll
    // it away.
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

    // ── Build config & session ───────────────────────────────────────────
    // A missing key is fatal here, before any input is read.
    let config = build_config(&cli)?;
    let mut session = Session::new(&config)?;

    // ── Inputs ───────────────────────────────────────────────────────────
    session
        .select_image(&cli.image)
        .await
        .with_context(|| format!("Failed to load image '{}'", cli.image))?;

    // clap guarantees one of --text / --document.
    let source = match cli.text {
        Some(ref text) => DocumentSource::Inline(text.clone()),
        None => DocumentSource::from_arg(cli.document.as_deref().unwrap_or("-")),
    };
    let text = source.load().await.context("Failed to read document")?;
    session.set_document_text(text);

    // ── Run ──────────────────────────────────────────────────────────────
    let handle = session.start_run()?;
    let spinner = show_progress.then(|| status_spinner(&session));

    let result = handle.wait().await;

    if let Some((bar, task)) = spinner {
        task.abort();
        bar.finish_and_clear();
    }

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            // Cause was already logged by the library; the user sees only
            // the generic message.
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    };

    // ── Output ───────────────────────────────────────────────────────────
    if cli.show_structured && !cli.json {
        eprintln!("{}", bold("Structured data"));
        eprintln!("{}", output.structured_data.trim_end());
        eprintln!();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if let Some(ref target) = cli.output {
        let path = session
            .export_report(target)
            .await
            .context("Failed to save report")?;
        if !cli.quiet {
            print_summary(&output, Some(&path));
        }
    } else {
        if !cli.json {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.final_report.as_bytes())
                .context("Failed to write to stdout")?;
            if !output.final_report.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
        if !cli.quiet && !cli.json {
            print_summary(&output, None);
        }
    }

    Ok(())
}

/// Map CLI args to `FacilitatorConfig`.
fn build_config(cli: &Cli) -> Result<FacilitatorConfig> {
    let mut builder = FacilitatorConfig::builder()
        .save_delay_ms(cli.save_delay_ms)
        .download_timeout_secs(cli.download_timeout);

    if let Some(key) = cli.api_key.clone().or_else(api_key_from_env) {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.as_str());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref model) = cli.extraction_model {
        builder = builder.extraction_model(model.as_str());
    }
    if let Some(ref model) = cli.synthesis_model {
        builder = builder.synthesis_model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    Ok(builder.build()?)
}

/// Spinner that follows the session's status until aborted.
fn status_spinner(session: &Session) -> (ProgressBar, JoinHandle<()>) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.enable_steady_tick(Duration::from_millis(80));

    let mut statuses = Box::pin(session.status_stream());
    let task_bar = bar.clone();
    let task = tokio::spawn(async move {
        while let Some(status) = statuses.next().await {
            if status == AgentStatus::Idle {
                continue;
            }
            task_bar.set_message(status.label());
            if status != AgentStatus::Done {
                task_bar.println(format!("{} {}", cyan("◆"), status.label()));
            }
        }
    });

    (bar, task)
}

fn print_summary(output: &RunOutput, saved_to: Option<&PathBuf>) {
    let stats = &output.stats;
    match saved_to {
        Some(path) => eprintln!(
            "{}  {} sections  {}ms  →  {}",
            green("✔"),
            output.report_sections.len(),
            stats.total_ms,
            bold(&path.display().to_string()),
        ),
        None => eprintln!(
            "{}  {} sections  {}ms",
            green("✔"),
            output.report_sections.len(),
            stats.total_ms
        ),
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  (extract {}ms, synthesize {}ms)",
        dim(&stats.input_tokens.to_string()),
        dim(&stats.output_tokens.to_string()),
        stats.extraction_ms,
        stats.synthesis_ms,
    );
}
