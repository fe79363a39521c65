//! Host-facing notification messages and a channel-backed sink.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{HookEvent, NotificationSink};

/// Message from the session manager to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostNotification {
    /// Live activity signal for an agent.
    #[serde(rename_all = "camelCase")]
    HookEvent { agent_id: String, event: HookEvent },
    /// Terminal exit signal for an agent's session.
    #[serde(rename_all = "camelCase")]
    Exit { agent_id: String, exit_code: i32 },
}

impl HostNotification {
    /// Agent this notification belongs to.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        match self {
            Self::HookEvent { agent_id, .. } | Self::Exit { agent_id, .. } => agent_id,
        }
    }
}

/// Sink forwarding every notification into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<HostNotification>,
}

impl ChannelSink {
    /// Create a sink and the receiver the host reads from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: HostNotification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}

impl NotificationSink for ChannelSink {
    fn hook_event(&self, agent_id: &str, event: HookEvent) {
        self.send(HostNotification::HookEvent {
            agent_id: agent_id.to_string(),
            event,
        });
    }

    fn exited(&self, agent_id: &str, exit_code: i32) {
        self.send(HostNotification::Exit {
            agent_id: agent_id.to_string(),
            exit_code,
        });
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.hook_event("a1", HookEvent::notification("hello"));
        sink.exited("a1", 3);

        assert_eq!(
            rx.try_recv().unwrap(),
            HostNotification::HookEvent {
                agent_id: "a1".to_string(),
                event: HookEvent::notification("hello"),
            }
        );
        let exit = rx.try_recv().unwrap();
        assert_eq!(exit.agent_id(), "a1");
        assert!(matches!(exit, HostNotification::Exit { exit_code: 3, .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.exited("a1", 0);
    }

    #[test]
    fn test_notification_serialization() {
        let msg = HostNotification::Exit {
            agent_id: "a1".to_string(),
            exit_code: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"type": "exit", "agentId": "a1", "exitCode": 1}));

        let hook = HostNotification::HookEvent {
            agent_id: "a1".to_string(),
            event: HookEvent::Stop {
                message: "done".to_string(),
            },
        };
        let json = serde_json::to_string(&hook).unwrap();
        let parsed: HostNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hook);
    }
}
