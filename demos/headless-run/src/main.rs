//! Run one agent headlessly and print host notifications as JSON lines.
//!
//! Run with: cargo run -p headless-run -- --output-kind text -- /bin/sh -c 'echo hi'
//!
//! Logs go to stderr; set `RUST_LOG=debug` for per-session detail.
//! Ctrl-C kills the agent and waits for its exit.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::Parser;
use headless_agents_core::{HeadlessConfig, HostNotification, OutputKind};
use headless_agents_session::{HeadlessManager, SpawnRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Identifier for the agent session.
    #[arg(long, default_value = "demo")]
    agent_id: String,

    /// Working directory for the agent (defaults to the current one).
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// How the agent's stdout is interpreted: `stream-json` or `text`.
    #[arg(long, default_value_t = OutputKind::StreamJson)]
    output_kind: OutputKind,

    /// Extra environment variable, as KEY=VALUE. Repeatable.
    #[arg(long = "env", value_parser = parse_env)]
    env: Vec<(String, String)>,

    /// Directory for transcript logs (overrides the environment).
    #[arg(long)]
    transcript_dir: Option<PathBuf>,

    /// Agent binary.
    binary: PathBuf,

    /// Arguments passed to the agent.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn parse_env(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = HeadlessConfig::from_env();
    if let Some(dir) = args.transcript_dir {
        config = config.with_transcript_dir(dir);
    }
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to resolve working directory")?,
    };

    let (manager, mut rx) = HeadlessManager::with_channel(config);
    let mut request = SpawnRequest::new(&args.agent_id, cwd, args.binary)
        .args(args.args)
        .output_kind(args.output_kind);
    for (key, value) in args.env {
        request = request.env(key, value);
    }
    manager.spawn(request).await;

    let exit_code = loop {
        tokio::select! {
            notification = rx.recv() => {
                let Some(notification) = notification else {
                    anyhow::bail!("Notification channel closed before exit");
                };
                println!("{}", serde_json::to_string(&notification)?);
                if let HostNotification::Exit { agent_id, exit_code } = notification {
                    if agent_id == args.agent_id {
                        break exit_code;
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted; killing agent");
                manager.kill(&args.agent_id).await;
            }
        }
    };

    if let Some(summary) = manager.transcript_summary(&args.agent_id).await {
        println!("{}", serde_json::to_string(&summary)?);
    }
    let path = manager.config().transcript_path(&args.agent_id);
    tracing::info!(path = %path.display(), exit_code, "Transcript written");

    Ok(ExitCode::from(u8::try_from(exit_code).unwrap_or(1)))
}
