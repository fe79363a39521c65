use std::{io, path::Path};

use headless_agents_core::TranscriptEntry;
use tokio::{
    fs::OpenOptions,
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
};

/// Append-only JSONL mirror of a transcript.
pub struct TranscriptLog {
    writer: BufWriter<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl std::fmt::Debug for TranscriptLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptLog").finish_non_exhaustive()
    }
}

impl TranscriptLog {
    /// Wrap an arbitrary writer.
    #[must_use]
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: BufWriter::new(Box::new(writer)),
        }
    }

    /// Open `path` for appending, creating it and its parent directories.
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be created.
    pub async fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::new(file))
    }

    /// Write one entry as a line and flush it.
    ///
    /// # Errors
    /// Returns error if the write fails.
    pub async fn append(&mut self, entry: &TranscriptEntry) -> io::Result<()> {
        self.writer.write_all(entry.to_string().as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Flush and release the underlying writer.
    ///
    /// # Errors
    /// Returns error if the final flush fails.
    pub async fn close(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(value: serde_json::Value) -> TranscriptEntry {
        TranscriptEntry::try_from(value).unwrap()
    }

    #[tokio::test]
    async fn test_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agent.jsonl");

        let mut log = TranscriptLog::open(&path).await.unwrap();
        log.append(&entry(json!({"type": "system"}))).await.unwrap();
        log.append(&entry(json!({"type": "result", "result": "ok"})))
            .await
            .unwrap();
        log.close().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["result"], "ok");
    }

    #[tokio::test]
    async fn test_lines_keep_original_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.jsonl");
        let raw = r#"{"type":"system","subtype":"init","tools":["Edit"],"a":1}"#;

        let mut log = TranscriptLog::open(&path).await.unwrap();
        log.append(&TranscriptEntry::parse_line(raw.as_bytes()).unwrap())
            .await
            .unwrap();
        log.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{raw}\n"));
    }

    #[tokio::test]
    async fn test_reopen_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.jsonl");

        for _ in 0..2 {
            let mut log = TranscriptLog::open(&path).await.unwrap();
            log.append(&entry(json!({"type": "result"}))).await.unwrap();
            log.close().await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_writer() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut log = TranscriptLog::new(client);
        log.append(&entry(json!({"type": "user"}))).await.unwrap();
        log.close().await.unwrap();

        let mut out = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut server, &mut out)
            .await
            .unwrap();
        assert_eq!(out, "{\"type\":\"user\"}\n");
    }
}
