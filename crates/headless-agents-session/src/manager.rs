//! Registry of headless agent sessions, keyed by agent id.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use futures::stream::BoxStream;
use headless_agents_core::{
    ChannelSink, HeadlessConfig, HostNotification, NotificationSink, OutputKind, SessionId,
    TranscriptEntry, TranscriptStore, TranscriptSummary,
};
use headless_agents_executor::{adapter_for, claude::ResultMessage};
use headless_agents_launcher::{LaunchSpec, launch};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    session::{FAILED_EXIT_CODE, SessionRunner},
    storage::TranscriptLog,
};

/// Everything needed to start one agent run.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// Caller-chosen agent identifier.
    pub agent_id: String,
    /// Binary, arguments, working directory, and extra environment.
    pub launch: LaunchSpec,
    /// How stdout should be interpreted.
    pub output_kind: OutputKind,
}

impl SpawnRequest {
    /// Request with no arguments, no extra environment, and stream-json output.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        cwd: impl Into<PathBuf>,
        binary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            launch: LaunchSpec::new(binary, cwd),
            output_kind: OutputKind::default(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.launch = self.launch.args(args);
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.launch = self.launch.env(key, value);
        self
    }

    /// Select the output kind.
    #[must_use]
    pub const fn output_kind(mut self, kind: OutputKind) -> Self {
        self.output_kind = kind;
        self
    }
}

/// Handle to a running session, held while it is live.
struct LiveSession {
    session_id: SessionId,
    kill_tx: Option<oneshot::Sender<oneshot::Sender<()>>>,
}

impl LiveSession {
    /// Ask the session task to terminate.
    ///
    /// Returns a receiver that resolves once the process group has been
    /// signalled, or `None` if termination was already requested or the
    /// task has stopped listening.
    fn request_termination(&mut self) -> Option<oneshot::Receiver<()>> {
        let kill_tx = self.kill_tx.take()?;
        let (ack_tx, ack_rx) = oneshot::channel();
        kill_tx.send(ack_tx).ok()?;
        Some(ack_rx)
    }
}

/// Per-agent state. The transcript outlives the process until the next spawn.
struct AgentRecord {
    transcript: Arc<TranscriptStore>,
    live: Option<LiveSession>,
}

pub(crate) struct Registry {
    config: HeadlessConfig,
    sink: Arc<dyn NotificationSink>,
    agents: Mutex<HashMap<String, AgentRecord>>,
}

impl Registry {
    /// Drop the live handle, unless a newer session already replaced it.
    pub(crate) async fn deregister(&self, agent_id: &str, session_id: SessionId) {
        let mut agents = self.agents.lock().await;
        if let Some(record) = agents.get_mut(agent_id) {
            if record
                .live
                .as_ref()
                .is_some_and(|live| live.session_id == session_id)
            {
                record.live = None;
            }
        }
    }
}

/// Manages headless agent sessions.
///
/// Cloning is cheap; clones share one registry. When the last clone is
/// dropped, every live session is asked to terminate.
#[derive(Clone)]
pub struct HeadlessManager {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for HeadlessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessManager")
            .field("config", &self.registry.config)
            .finish_non_exhaustive()
    }
}

impl HeadlessManager {
    /// Create a manager that reports to `sink`.
    #[must_use]
    pub fn new(config: HeadlessConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            registry: Arc::new(Registry {
                config,
                sink,
                agents: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a manager whose notifications arrive on a channel.
    #[must_use]
    pub fn with_channel(
        config: HeadlessConfig,
    ) -> (Self, mpsc::UnboundedReceiver<HostNotification>) {
        let (sink, rx) = ChannelSink::new();
        (Self::new(config, Arc::new(sink)), rx)
    }

    /// Settings this manager was created with.
    #[must_use]
    pub fn config(&self) -> &HeadlessConfig {
        &self.registry.config
    }

    /// Start an agent run, replacing any session already running under the same id.
    ///
    /// Never fails: a process that cannot be started is reported as an
    /// exit with code 1.
    pub async fn spawn(&self, request: SpawnRequest) {
        let SpawnRequest {
            agent_id,
            launch: spec,
            output_kind,
        } = request;
        let registry = &self.registry;
        let mut agents = registry.agents.lock().await;

        if let Some(mut previous) = agents
            .get_mut(&agent_id)
            .and_then(|record| record.live.take())
        {
            tracing::info!(
                agent_id = %agent_id,
                session_id = %previous.session_id,
                "Replacing running headless session"
            );
            // The old group is signalled before the new process exists.
            if let Some(ack) = previous.request_termination() {
                if ack.await.is_err() {
                    tracing::debug!(agent_id = %agent_id, "Previous session exited before signalling");
                }
            }
        }

        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("headless_session", agent_id = %agent_id, %session_id);
        let transcript = Arc::new(TranscriptStore::new());
        let log = open_log(&registry.config, &agent_id)
            .instrument(span.clone())
            .await;

        let mut runner = SessionRunner::new(
            agent_id.clone(),
            session_id,
            adapter_for(output_kind),
            Arc::clone(&transcript),
            log,
            Arc::clone(&registry.sink),
            registry.config.read_buffer_size,
        );
        runner.start().instrument(span.clone()).await;

        match launch(&spec) {
            Ok(process) => {
                tracing::info!(
                    parent: &span,
                    pid = process.group.id(),
                    output_kind = %output_kind,
                    "Headless session started"
                );
                let (kill_tx, kill_rx) = oneshot::channel();
                agents.insert(
                    agent_id,
                    AgentRecord {
                        transcript,
                        live: Some(LiveSession {
                            session_id,
                            kill_tx: Some(kill_tx),
                        }),
                    },
                );
                drop(agents);

                let registry = Arc::downgrade(&self.registry);
                tokio::spawn(runner.run(process, kill_rx, registry).instrument(span));
            }
            Err(e) => {
                tracing::error!(parent: &span, "Failed to launch headless agent: {e}");
                agents.insert(
                    agent_id,
                    AgentRecord {
                        transcript,
                        live: None,
                    },
                );
                drop(agents);

                let final_hooks = runner.shutdown().instrument(span.clone()).await;
                span.in_scope(|| runner.report_exit(final_hooks, FAILED_EXIT_CODE));
            }
        }
    }

    /// Whether a session for `agent_id` is currently running.
    pub async fn is_headless(&self, agent_id: &str) -> bool {
        self.registry
            .agents
            .lock()
            .await
            .get(agent_id)
            .is_some_and(|record| record.live.is_some())
    }

    /// Ask the running session for `agent_id` to terminate. No-op if none.
    ///
    /// Returns immediately; the exit notification follows once the process is gone.
    pub async fn kill(&self, agent_id: &str) {
        let mut agents = self.registry.agents.lock().await;
        if let Some(live) = agents
            .get_mut(agent_id)
            .and_then(|record| record.live.as_mut())
        {
            if live.request_termination().is_some() {
                tracing::info!(agent_id, session_id = %live.session_id, "Kill requested");
            }
        }
    }

    /// Ask every running session to terminate.
    pub async fn kill_all(&self) {
        let mut agents = self.registry.agents.lock().await;
        for (agent_id, record) in agents.iter_mut() {
            if let Some(live) = record.live.as_mut() {
                if live.request_termination().is_some() {
                    tracing::info!(agent_id = %agent_id, session_id = %live.session_id, "Kill requested");
                }
            }
        }
    }

    /// Ids of agents with a running session, sorted.
    pub async fn live_agents(&self) -> Vec<String> {
        let agents = self.registry.agents.lock().await;
        let mut ids: Vec<String> = agents
            .iter()
            .filter(|(_, record)| record.live.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Transcript of the latest session as JSONL, or `None` if never spawned.
    pub async fn read_transcript(&self, agent_id: &str) -> Option<String> {
        self.transcript(agent_id).await.map(|t| t.to_jsonl())
    }

    /// Summary of the latest `result` entry, if any.
    pub async fn transcript_summary(&self, agent_id: &str) -> Option<TranscriptSummary> {
        let transcript = self.transcript(agent_id).await?;
        let entry = transcript.last_of_kind("result")?;
        let result = ResultMessage::from_entry(&entry)?;
        Some(TranscriptSummary {
            summary: result.result.clone().unwrap_or_default(),
            cost_usd: result.cost(),
            duration_ms: result.duration_ms(),
        })
    }

    /// Entries recorded so far followed by live ones, ending when the session exits.
    pub async fn transcript_stream(
        &self,
        agent_id: &str,
    ) -> Option<BoxStream<'static, TranscriptEntry>> {
        self.transcript(agent_id)
            .await
            .map(|t| t.history_plus_stream())
    }

    async fn transcript(&self, agent_id: &str) -> Option<Arc<TranscriptStore>> {
        self.registry
            .agents
            .lock()
            .await
            .get(agent_id)
            .map(|record| Arc::clone(&record.transcript))
    }
}

async fn open_log(config: &HeadlessConfig, agent_id: &str) -> Option<TranscriptLog> {
    let path = config.transcript_path(agent_id);
    match TranscriptLog::open(&path).await {
        Ok(log) => Some(log),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Transcript log unavailable: {e}");
            None
        }
    }
}
