use serde::{Deserialize, Serialize};

/// Change notifications emitted by a conversation session.
///
/// Events carry ids only; the presentation layer re-reads the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Thread list changed (created, renamed, deleted, reordered)
    ThreadsChanged,

    CurrentThreadChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },

    /// A message was appended to, or the message list was reloaded for, a thread
    MessagesChanged {
        thread_id: String,
    },

    /// Sending flag flipped. `thread_id` is `None` for a send that is still creating its thread.
    LoadingChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
        loading: bool,
    },

    CustomModelsChanged,

    /// Transient, toast-style notification
    Notice(Notice),

    SignedIn {
        user_id: String,
    },

    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::LoadingChanged {
            thread_id: Some("t1".to_string()),
            loading: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "loading_changed");
        assert_eq!(json["thread_id"], "t1");
        assert_eq!(json["loading"], true);
    }

    #[test]
    fn test_notice_event_serialization() {
        let event = SessionEvent::Notice(Notice::error("Failed to save message"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "notice");
        assert_eq!(json["level"], "error");
        assert_eq!(json["text"], "Failed to save message");
    }
}
