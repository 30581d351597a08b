//! vimkeys entrypoint.
//!
//! Replays a Vim key-notation string against a file or literal text through a
//! session task and prints the resulting buffer, mode and cursor.
use anyhow::{Context, Result, bail};
use clap::Parser;
use core_actions::{Engine, ExecutionReport, KeyOutcome};
use core_config::{Config, InputConfig, load_from};
use core_events::{CHANNEL_SEND_FAILURES, KEYPRESS_TOTAL, parse_key_sequence};
use core_input::{SessionUpdate, UpdateKind, spawn_session};
use core_text::{Buffer, TextBuffer};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE: &str = "vimkeys.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "vimkeys", version, about = "Replay Vim keystrokes against text")]
struct Args {
    /// UTF-8 file to load. Mutually exclusive with `--text`.
    pub path: Option<PathBuf>,
    /// Literal buffer content. Mutually exclusive with PATH.
    #[arg(long, conflicts_with = "path")]
    pub text: Option<String>,
    /// Keys to replay, in Vim notation (`3Rxy<Esc>`).
    #[arg(long)]
    pub keys: String,
    /// Configuration file path (overrides discovery of `vimkeys.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Override `[input] timeoutlen` in milliseconds.
    #[arg(long)]
    pub timeoutlen: Option<u32>,
}

/// Everything worth reporting about one replay.
#[derive(Debug, Default)]
struct RunSummary {
    executed: Vec<&'static str>,
    warnings: Vec<String>,
    failures: Vec<String>,
    timeouts: usize,
}

impl RunSummary {
    fn record(&mut self, update: &SessionUpdate) {
        match &update.kind {
            UpdateKind::Key(outcome) => self.record_outcome(outcome),
            UpdateKind::Timeout(outcome) => {
                self.timeouts += 1;
                self.record_outcome(outcome);
            }
            UpdateKind::Failed { action, error } => {
                self.failures.push(format!("{action}: {error}"));
            }
        }
    }

    fn record_outcome(&mut self, outcome: &KeyOutcome) {
        if let KeyOutcome::Executed(reports) = outcome {
            reports.iter().for_each(|r| self.record_report(r));
        }
    }

    fn record_report(&mut self, report: &ExecutionReport) {
        self.executed.push(report.action);
        for dropped in &report.dropped {
            self.warnings.push(format!(
                "{}: dropped {} ({})",
                report.action,
                dropped.transformation.kind(),
                dropped.reason
            ));
        }
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn load_buffer(args: &Args) -> Result<Buffer> {
    let (name, content) = match (&args.text, &args.path) {
        (Some(text), _) => ("[text]".to_string(), text.clone()),
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            (path.display().to_string(), content)
        }
        (None, None) => bail!("either a PATH or --text is required"),
    };
    Ok(Buffer::from_str(name, &content)?)
}

fn effective_input(config: &Config, timeoutlen: Option<u32>) -> InputConfig {
    let mut input = config.input().clone();
    if let Some(ms) = timeoutlen {
        input.timeoutlen = ms;
    }
    input
}

/// Feed every key through a session, then resolve whatever is still pending
/// as if the wait had expired.
async fn replay(
    engine: Engine<Buffer>,
    input: &InputConfig,
    notation: &str,
) -> Result<(Engine<Buffer>, RunSummary)> {
    let tokens = parse_key_sequence(notation).context("parsing --keys")?;
    let (handle, mut updates, join) = spawn_session(engine, input);

    let feeder = tokio::spawn(async move {
        handle.send_keys(tokens).await?;
        handle.close().await
    });

    let mut summary = RunSummary::default();
    while let Some(update) = updates.recv().await {
        summary.record(&update);
    }
    feeder.await?.context("session closed early")?;
    let mut engine = join.await?;

    if !engine.pending_keys().is_empty() {
        let outcome = engine.flush_pending(Instant::now())?;
        summary.record_outcome(&outcome);
    }
    Ok((engine, summary))
}

fn render(engine: &Engine<Buffer>, summary: &RunSummary) -> String {
    let mut out = engine.buffer().text();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    let cursor = engine.cursor();
    let _ = writeln!(
        out,
        "[{}] {}:{}",
        engine.mode(),
        cursor.line + 1,
        cursor.character + 1
    );
    for warning in &summary.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    for failure in &summary.failures {
        let _ = writeln!(out, "error: {failure}");
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = load_from(args.config.clone())?;
    let input = effective_input(&config, args.timeoutlen);
    let buffer = load_buffer(&args)?;
    info!(
        target: "runtime",
        buffer = buffer.name.as_str(),
        timeout = input.timeout,
        timeoutlen = input.timeoutlen,
        config_override = args.config.is_some(),
        config_path = ?config.path,
        "bootstrap_complete"
    );

    let engine = Engine::new(buffer)?;
    let (engine, summary) = replay(engine, &input, &args.keys).await?;
    if !summary.warnings.is_empty() {
        warn!(target: "runtime", count = summary.warnings.len(), "dropped_transformations");
    }
    info!(
        target: "runtime",
        executed = summary.executed.len(),
        timeouts = summary.timeouts,
        keypresses = KEYPRESS_TOTAL.load(Ordering::Relaxed),
        send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
        "shutdown"
    );
    print!("{}", render(&engine, &summary));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::Mode;
    use core_text::Position;
    use pretty_assertions::assert_eq;

    fn engine(text: &str) -> Engine<Buffer> {
        Engine::new(Buffer::from_str("t", text).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn replay_applies_counted_replace() {
        let (engine, summary) = replay(engine("abcdef"), &InputConfig::default(), "3Rxy<Esc>")
            .await
            .unwrap();
        assert_eq!(engine.buffer().text(), "xyxyxycdef");
        assert_eq!(engine.cursor(), Position::new(0, 5));
        assert_eq!(
            summary.executed,
            vec![
                "enter_replace_mode",
                "replace_in_replace_mode",
                "replace_in_replace_mode",
                "exit_replace_mode"
            ]
        );
        assert_eq!(
            render(&engine, &summary),
            "xyxyxycdef\n[Normal] 1:6\n"
        );
    }

    #[tokio::test]
    async fn trailing_ambiguous_keys_are_flushed() {
        // `d` alone is only a prefix of `dd`; nothing runs and the buffer stays put.
        let (engine, summary) = replay(engine("one\ntwo"), &InputConfig::default(), "ld")
            .await
            .unwrap();
        assert!(engine.pending_keys().is_empty());
        assert_eq!(engine.buffer().text(), "one\ntwo");
        assert_eq!(engine.mode(), Mode::Normal);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn bad_notation_is_an_error() {
        let err = replay(engine("abc"), &InputConfig::default(), "<Nope>")
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("--keys"));
    }

    #[test]
    fn timeoutlen_flag_overrides_config() {
        let config = Config::with_input(InputConfig {
            timeout: true,
            timeoutlen: 1000,
        });
        assert_eq!(effective_input(&config, Some(25)).timeoutlen, 25);
        assert_eq!(effective_input(&config, None).timeoutlen, 1000);
    }

    #[test]
    fn args_reject_path_with_text() {
        let err = Args::try_parse_from(["vimkeys", "file.txt", "--text", "x", "--keys", "x"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        let parsed = Args::try_parse_from(["vimkeys", "--text", "abc", "--keys", "x"]).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("abc"));
    }
}
