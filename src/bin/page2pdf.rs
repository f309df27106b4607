//! CLI binary for edgequake-page2pdf.
//!
//! A thin shim over the library crate for the parts that need no browser:
//! checking target URLs, estimating run cost, normalising request bodies and
//! password-protecting an existing PDF.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use edgequake_page2pdf::{estimate, is_valid_target, protect, CostMetrics, RenderRequest};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Is this a renderable target?
  page2pdf check-url https://example.com/report

  # What does a 4.2 s render at 2 GB cost in Frankfurt?
  page2pdf estimate --duration-ms 4200 --memory-mb 2048 --region eu-central-1

  # Normalise a request body (passwords are redacted)
  page2pdf inspect request.json
  cat request.json | page2pdf inspect -

  # Password-protect an existing PDF
  page2pdf protect report.pdf -o report.locked.pdf --password s3cret

ENVIRONMENT VARIABLES:
  AWS_REGION                        Default pricing region
  AWS_LAMBDA_FUNCTION_MEMORY_SIZE   Default memory for estimates (MB)
  PAGE2PDF_EPHEMERAL_STORAGE_MB     Default ephemeral disk for estimates (MB)
  PAGE2PDF_PASSWORD                 Default opening password for `protect`
  PAGE2PDF_OWNER_PASSWORD           Default owner password for `protect`
  RUST_LOG                          Log filter (overrides --verbose/--quiet)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "page2pdf",
    version,
    about = "Web page to PDF pipeline utilities",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug-level logs on stderr.
    #[arg(short, long, global = true, env = "PAGE2PDF_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, env = "PAGE2PDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exit 0 if URL is an absolute http(s) URL, 1 otherwise.
    CheckUrl { url: String },

    /// Estimate the cost of one render.
    Estimate {
        /// Wall-clock duration of the run.
        #[arg(long)]
        duration_ms: u64,

        #[arg(long, env = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE", default_value_t = 2048)]
        memory_mb: u64,

        #[arg(long, env = "PAGE2PDF_EPHEMERAL_STORAGE_MB", default_value_t = 512)]
        disk_mb: u64,

        #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
        region: String,

        /// Print the full estimate as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse a request body and print it normalised, passwords redacted.
    Inspect {
        /// Path to a JSON file, or `-` for stdin.
        input: String,
    },

    /// Password-protect a PDF file.
    Protect {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Password needed to open the document.
        #[arg(long, env = "PAGE2PDF_PASSWORD")]
        password: Option<String>,

        /// Password granting full permissions. Defaults to --password.
        #[arg(long, env = "PAGE2PDF_OWNER_PASSWORD")]
        owner_password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    match cli.command {
        Command::CheckUrl { url } => {
            if is_valid_target(&url) {
                println!("{} {}", green("✔"), url);
                Ok(())
            } else {
                eprintln!("{} {} {}", red("✘"), url, dim("(not an absolute http/https URL)"));
                std::process::exit(1);
            }
        }
        Command::Estimate {
            duration_ms,
            memory_mb,
            disk_mb,
            region,
            json,
        } => {
            let metrics = estimate(duration_ms, memory_mb, disk_mb, &region);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&metrics).context("Failed to serialize estimate")?
                );
            } else {
                print_estimate(&metrics);
            }
            Ok(())
        }
        Command::Inspect { input } => {
            let body = read_input(&input)?;
            let request = RenderRequest::from_json(&body).context("Invalid request body")?;
            if !is_valid_target(&request.page_url) {
                eprintln!(
                    "{} pageUrl would be rejected: {}",
                    red("⚠"),
                    request.page_url
                );
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&request.redacted())
                    .context("Failed to serialize request")?
            );
            Ok(())
        }
        Command::Protect {
            input,
            output,
            password,
            owner_password,
        } => {
            if password.is_none() && owner_password.is_none() {
                bail!("protect needs --password and/or --owner-password");
            }
            let pdf = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let protected = tokio::task::spawn_blocking(move || {
                protect(pdf, password.as_deref(), owner_password.as_deref())
            })
            .await
            .context("Encryption task failed")?;
            if !protected.applied {
                bail!(
                    "Could not protect {} (see log for the reason)",
                    input.display()
                );
            }
            write_atomic(&output, &protected.bytes).await?;
            info!("Wrote {} bytes to {}", protected.bytes.len(), output.display());
            eprintln!("{} {}", green("✔"), bold(&output.display().to_string()));
            Ok(())
        }
    }
}

fn print_estimate(m: &CostMetrics) {
    println!("Region:       {}", m.region);
    println!("Duration:     {}s", m.duration_seconds);
    println!("Memory:       {} MB", m.memory_mb);
    println!("Disk:         {} MB", m.disk_mb);
    println!("  compute     ${:.7}", m.breakdown.compute_cost);
    println!("  storage     ${:.7}", m.breakdown.storage_cost);
    println!("  request     ${:.7}", m.breakdown.request_cost);
    println!("  upload      ${:.7}", m.breakdown.upload_cost);
    println!("{}", bold(&format!("Total:        ${:.7}", m.estimated_cost_usd)));
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut body = String::new();
        io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read stdin")?;
        Ok(body)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

/// Write to a temp sibling, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
    Ok(())
}
