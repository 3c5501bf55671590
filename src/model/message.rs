use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TaskId;
use crate::error::ParseError;

/// Inbound stream frame. Exactly one kind per frame, selected by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Output {
        #[serde(default)]
        task_id: Option<TaskId>,
        #[serde(default)]
        output: String,
        #[serde(default)]
        timestamp: Option<f64>,
    },
    Ping {
        #[serde(default)]
        timestamp: Option<f64>,
    },
    StatusUpdate {
        #[serde(default)]
        task_id: Option<TaskId>,
        #[serde(default)]
        active_tasks: Vec<TaskId>,
        #[serde(default)]
        timestamp: Option<f64>,
    },
    Error {
        #[serde(default)]
        task_id: Option<TaskId>,
        #[serde(default)]
        error: String,
        #[serde(default)]
        timestamp: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Output,
    Ping,
    StatusUpdate,
    Error,
}

impl MessageKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "output" => Some(MessageKind::Output),
            "ping" => Some(MessageKind::Ping),
            "status_update" => Some(MessageKind::StatusUpdate),
            "error" => Some(MessageKind::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Output => "output",
            MessageKind::Ping => "ping",
            MessageKind::StatusUpdate => "status_update",
            MessageKind::Error => "error",
        }
    }
}

impl StreamMessage {
    /// Decode one text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames of a kind this client does not
    /// know; those are skipped rather than treated as failures.
    pub fn decode(text: &str) -> Result<Option<Self>, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError::InvalidFormat("frame has no \"type\" field".into()))?;

        if MessageKind::from_tag(tag).is_none() {
            return Ok(None);
        }

        serde_json::from_value(value).map(Some).map_err(ParseError::from)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            StreamMessage::Output { .. } => MessageKind::Output,
            StreamMessage::Ping { .. } => MessageKind::Ping,
            StreamMessage::StatusUpdate { .. } => MessageKind::StatusUpdate,
            StreamMessage::Error { .. } => MessageKind::Error,
        }
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            StreamMessage::Output { task_id, .. }
            | StreamMessage::StatusUpdate { task_id, .. }
            | StreamMessage::Error { task_id, .. } => task_id.as_ref(),
            StreamMessage::Ping { .. } => None,
        }
    }

    pub fn output(task_id: impl Into<TaskId>, chunk: impl Into<String>) -> Self {
        StreamMessage::Output {
            task_id: Some(task_id.into()),
            output: chunk.into(),
            timestamp: None,
        }
    }

    pub fn ping() -> Self {
        StreamMessage::Ping { timestamp: None }
    }

    pub fn status_update(active_tasks: Vec<TaskId>) -> Self {
        StreamMessage::StatusUpdate {
            task_id: None,
            active_tasks,
            timestamp: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        StreamMessage::Error {
            task_id: None,
            error: error.into(),
            timestamp: None,
        }
    }

    /// Encode as the JSON text a server would send.
    pub fn to_frame(&self) -> String {
        // Enum of strings, floats and ids; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
