use crate::engine::RosterClient;
use crate::model::{HeaderMode, RosterConfig, SortKey, Student};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "roster-cli",
    version,
    about = "Fetch, sort and upload a student roster with optional TUI"
)]
pub struct Cli {
    /// URL of the roster resource (GET to fetch, PUT to upload)
    #[arg(long, env = "ROSTER_URL")]
    pub url: String,

    /// Access token sent in the x-access-token header
    #[arg(long, env = "ROSTER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout (e.g. 10s); no timeout when omitted
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Treat the first line of the roster as data instead of a header
    #[arg(long)]
    pub no_header: bool,

    /// Sort the roster after fetching
    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,

    /// Sort in descending order
    #[arg(long)]
    pub descending: bool,

    /// Upload the (sorted) roster back after fetching
    #[arg(long)]
    pub upload: bool,

    /// Send the upload without gzip compression
    #[arg(long)]
    pub no_gzip: bool,

    /// Print the roster as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print the roster as a text table and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,

    /// Export the roster as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Export the roster as CSV
    #[arg(long)]
    pub export_csv: Option<std::path::PathBuf>,

    /// Save a timestamped JSON snapshot to the data directory
    #[arg(long)]
    pub save: bool,

    /// Fetch the roster as soon as the TUI starts
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub fetch_on_launch: bool,
}

impl Cli {
    pub fn is_tui(&self) -> bool {
        !(self.silent || self.json || self.text)
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    if args.is_tui() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args).await;
    }

    run_text(args).await
}

/// Build a `RosterConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RosterConfig {
    RosterConfig {
        url: args.url.clone(),
        token: args.token.clone(),
        timeout: args.timeout.map(Into::into),
        header: if args.no_header {
            HeaderMode::Absent
        } else {
            HeaderMode::Skip
        },
        gzip_upload: !args.no_gzip,
        user_agent: format!("roster-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Fetch, post-process and optionally upload. Shared by the JSON and text modes.
async fn fetch_and_process(
    args: &Cli,
    out_tx: Option<&mpsc::UnboundedSender<OutputLine>>,
) -> Result<Vec<Student>> {
    let client = RosterClient::new(&build_config(args))?;
    let students = client
        .fetch_students()
        .await
        .with_context(|| format!("failed to fetch roster from {}", client.url()))?;

    let processed = crate::orchestrator::process_fetch(args, args.save, students);
    if args.save && processed.saved_path.is_none() {
        return Err(anyhow::anyhow!("failed to save roster snapshot"));
    }

    if let Some(tx) = out_tx {
        for msg in &processed.export_messages {
            let _ = tx.send(OutputLine::Stderr(msg.clone()));
        }
        if let Some(p) = processed.saved_path.as_ref() {
            let _ = tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
        }
    }
    if let Some(failed) = processed.export_errors.first() {
        return Err(anyhow::anyhow!("{failed}"));
    }

    if args.upload {
        let status = client
            .upload_students(&processed.students)
            .await
            .context("failed to upload roster")?;
        if let Some(tx) = out_tx {
            let _ = tx.send(OutputLine::Stderr(format!(
                "Uploaded {} student(s): {}",
                processed.students.len(),
                status
            )));
        }
    }

    Ok(processed.students)
}

async fn run_json(args: Cli) -> Result<()> {
    if args.silent {
        fetch_and_process(&args, None).await?;
        return Ok(());
    }

    let (out_tx, out_handle) = spawn_output_writer();
    let res = fetch_and_process(&args, Some(&out_tx)).await;
    if let Ok(students) = res.as_ref() {
        let out = serde_json::to_string_pretty(students)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }
    drop(out_tx);
    let _ = out_handle.await;
    res.map(|_| ())
}

async fn run_text(args: Cli) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let res = fetch_and_process(&args, Some(&out_tx)).await;
    if let Ok(students) = res.as_ref() {
        let sorted_by = args
            .sort
            .map(|key| (key, crate::orchestrator::sort_order(&args)));
        let summary = crate::text_summary::build_text_summary(students, sorted_by);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    res.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_server::{self, TOKEN};
    use std::time::Duration;

    #[test]
    fn config_reflects_flags() {
        let args = Cli::parse_from([
            "roster-cli",
            "--url",
            "http://localhost/roster",
            "--token",
            "abc",
            "--timeout",
            "3s",
            "--no-header",
            "--no-gzip",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.token.as_deref(), Some("abc"));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(3)));
        assert_eq!(cfg.header, HeaderMode::Absent);
        assert!(!cfg.gzip_upload);
        assert!(cfg.user_agent.starts_with("roster-cli/"));
    }

    #[test]
    fn defaults_skip_header_and_compress() {
        let args = Cli::parse_from(["roster-cli", "--url", "http://localhost/roster"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.header, HeaderMode::Skip);
        assert!(cfg.gzip_upload);
        assert!(cfg.timeout.is_none());
        assert!(args.is_tui());
    }

    #[tokio::test]
    async fn silent_requires_json() {
        let args = Cli::parse_from(["roster-cli", "--url", "http://localhost/roster", "--silent"]);
        assert!(run(args).await.is_err());
    }

    #[tokio::test]
    async fn fetch_sort_upload_pipeline() {
        let (url, recorded) = test_server::spawn().await;
        let args = Cli::parse_from([
            "roster-cli",
            "--url",
            url.as_str(),
            "--token",
            TOKEN,
            "--sort",
            "first-name",
            "--upload",
            "--json",
            "--silent",
        ]);
        let students = fetch_and_process(&args, None).await.unwrap();
        let names: Vec<_> = students.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, ["Amy", "Bob", "Zoe"]);

        let uploads = recorded.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0], students);
    }
}
