//! Per-session task: pumps process output through the adapter, then tears
//! the session down exactly once.

use std::{
    io,
    process::ExitStatus,
    sync::{Arc, Weak},
    time::Instant,
};

use headless_agents_core::{
    HookEvent, NotificationSink, SessionId, TranscriptEntry, TranscriptStore,
};
use headless_agents_executor::{AdapterEvent, OutputAdapter};
use headless_agents_launcher::LaunchedProcess;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::oneshot,
};

use crate::{manager::Registry, storage::TranscriptLog};

/// Termination request; the sender is acknowledged once the group is signalled.
pub(crate) type KillReceiver = oneshot::Receiver<oneshot::Sender<()>>;

/// Exit code reported when the process could not be started or reaped.
pub(crate) const FAILED_EXIT_CODE: i32 = 1;

pub(crate) struct SessionRunner {
    agent_id: String,
    session_id: SessionId,
    adapter: Box<dyn OutputAdapter>,
    transcript: Arc<TranscriptStore>,
    log: Option<TranscriptLog>,
    sink: Arc<dyn NotificationSink>,
    started_at: Instant,
    read_buffer_size: usize,
}

impl SessionRunner {
    pub(crate) fn new(
        agent_id: String,
        session_id: SessionId,
        adapter: Box<dyn OutputAdapter>,
        transcript: Arc<TranscriptStore>,
        log: Option<TranscriptLog>,
        sink: Arc<dyn NotificationSink>,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            agent_id,
            session_id,
            adapter,
            transcript,
            log,
            sink,
            started_at: Instant::now(),
            read_buffer_size: read_buffer_size.max(1),
        }
    }

    pub(crate) async fn start(&mut self) {
        let events = self.adapter.on_start();
        self.dispatch(events).await;
    }

    /// Drive the process to completion, deregister, and report the exit.
    pub(crate) async fn run(
        mut self,
        process: LaunchedProcess,
        kill_rx: KillReceiver,
        registry: Weak<Registry>,
    ) {
        let exit_code = self.drive(process, kill_rx).await;
        let final_hooks = self.shutdown().await;
        if let Some(registry) = registry.upgrade() {
            registry.deregister(&self.agent_id, self.session_id).await;
        }
        self.report_exit(final_hooks, exit_code);
    }

    async fn drive(&mut self, process: LaunchedProcess, mut kill_rx: KillReceiver) -> i32 {
        let LaunchedProcess {
            mut group,
            stdout,
            stderr,
        } = process;
        let mut stdout = Some(stdout);
        let mut stderr = Some(stderr);
        let mut out_buf = vec![0u8; self.read_buffer_size];
        let mut err_buf = vec![0u8; self.read_buffer_size];
        let mut termination_requested = false;

        loop {
            tokio::select! {
                read = read_chunk(stdout.as_mut(), &mut out_buf), if stdout.is_some() => match read {
                    Ok(0) => stdout = None,
                    Ok(n) => {
                        let events = self.adapter.on_stdout(&out_buf[..n]);
                        self.dispatch(events).await;
                    }
                    Err(e) => {
                        tracing::warn!("stdout read failed: {e}");
                        stdout = None;
                    }
                },
                read = read_chunk(stderr.as_mut(), &mut err_buf), if stderr.is_some() => match read {
                    Ok(0) => stderr = None,
                    Ok(n) => {
                        let events = self.adapter.on_stderr(&err_buf[..n]);
                        self.dispatch(events).await;
                    }
                    Err(e) => {
                        tracing::warn!("stderr read failed: {e}");
                        stderr = None;
                    }
                },
                request = &mut kill_rx, if !termination_requested => {
                    termination_requested = true;
                    match group.request_termination() {
                        Ok(()) => tracing::info!("Termination requested"),
                        Err(e) => tracing::warn!("Failed to signal process group: {e}"),
                    }
                    match request {
                        Ok(ack) => {
                            let _ = ack.send(());
                        }
                        Err(_) => tracing::debug!("Manager dropped; terminated session"),
                    }
                }
                status = group.wait(), if stdout.is_none() && stderr.is_none() => {
                    return match status {
                        Ok(status) => exit_code(status),
                        Err(e) => {
                            tracing::warn!("Failed to reap process: {e}");
                            FAILED_EXIT_CODE
                        }
                    };
                }
            }
        }
    }

    /// Flush the adapter, seal the transcript, and close the log.
    ///
    /// Hooks produced by the flush are returned rather than emitted; they
    /// go out with the exit, once the session is no longer registered.
    pub(crate) async fn shutdown(&mut self) -> Vec<HookEvent> {
        let mut final_hooks = Vec::new();
        for event in self.adapter.on_close(self.started_at.elapsed()) {
            match event {
                AdapterEvent::Hook(hook) => final_hooks.push(hook),
                AdapterEvent::Entry(entry) => self.record(entry).await,
            }
        }
        self.transcript.seal();

        if let Some(log) = self.log.take() {
            if let Err(e) = log.close().await {
                tracing::warn!("Failed to close transcript log: {e}");
            }
        }
        final_hooks
    }

    pub(crate) fn report_exit(&self, final_hooks: Vec<HookEvent>, exit_code: i32) {
        for hook in final_hooks {
            self.emit(hook);
        }
        tracing::info!(
            exit_code,
            entries = self.transcript.len(),
            elapsed_ms = u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Headless session exited"
        );
        self.sink.exited(&self.agent_id, exit_code);
    }

    async fn dispatch(&mut self, events: Vec<AdapterEvent>) {
        for event in events {
            match event {
                AdapterEvent::Hook(hook) => self.emit(hook),
                AdapterEvent::Entry(entry) => self.record(entry).await,
            }
        }
    }

    fn emit(&self, hook: HookEvent) {
        tracing::trace!(kind = hook.kind(), "Hook event");
        self.sink.hook_event(&self.agent_id, hook);
    }

    async fn record(&mut self, entry: TranscriptEntry) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.append(&entry).await {
                tracing::warn!("Transcript log write failed, continuing in memory only: {e}");
                self.log = None;
            }
        }
        self.transcript.push(entry);
    }
}

async fn read_chunk<R>(reader: Option<&mut R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}

/// Exit code for a finished process; signal deaths map to `128 + signal`.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    FAILED_EXIT_CODE
}
