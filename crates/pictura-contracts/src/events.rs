use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Everything a session records about its work, one JSON line each.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        store_root: String,
        model: String,
    },
    KeyChecked {
        key: String,
        valid: bool,
    },
    UploadSaved {
        artifact: String,
        bytes: usize,
    },
    FilterApplied {
        style: String,
        artifact: String,
    },
    FilterFailed {
        style: String,
        reason: String,
    },
    GenerationAttempt {
        attempt: u32,
        response_chars: usize,
        accepted: bool,
    },
    ValidationRejected {
        attempt: u32,
        reasons: Vec<String>,
    },
    TransformFinished {
        style: String,
        attempts: u32,
        accepted: bool,
        error_kind: Option<String>,
        filtered: Option<String>,
    },
    ChatReply {
        prompt_chars: usize,
        reply_chars: usize,
        with_image: bool,
    },
    ChatFailed {
        error_kind: String,
        message: String,
    },
    SweepFinished {
        removed: usize,
        kept: usize,
        failed: usize,
    },
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::KeyChecked { .. } => "key_checked",
            Self::UploadSaved { .. } => "upload_saved",
            Self::FilterApplied { .. } => "filter_applied",
            Self::FilterFailed { .. } => "filter_failed",
            Self::GenerationAttempt { .. } => "generation_attempt",
            Self::ValidationRejected { .. } => "validation_rejected",
            Self::TransformFinished { .. } => "transform_finished",
            Self::ChatReply { .. } => "chat_reply",
            Self::ChatFailed { .. } => "chat_failed",
            Self::SweepFinished { .. } => "sweep_finished",
        }
    }
}

/// Append-only writer for `events.jsonl`.
///
/// Each line carries `type`, `session_id` and `ts` alongside the event's
/// own fields. Clones share one file lock.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn record(&self, event: &SessionEvent) -> anyhow::Result<Value> {
        let fields = match serde_json::to_value(event)? {
            Value::Object(fields) => fields,
            other => anyhow::bail!("event did not serialize to an object: {other}"),
        };

        let mut line = Map::new();
        line.insert("type".to_string(), Value::String(event.kind().to_string()));
        line.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        line.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in fields {
            if key != "type" {
                line.insert(key, value);
            }
        }
        let encoded = serde_json::to_string(&line)?;

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(encoded.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(line))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::{EventWriter, SessionEvent};

    #[test]
    fn record_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        let recorded = writer.record(&SessionEvent::FilterApplied {
            style: "neon".to_string(),
            artifact: "filtered/1_abcd0123_neon.png".to_string(),
        })?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, recorded);
        assert_eq!(parsed["type"], json!("filter_applied"));
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["style"], json!("neon"));
        assert!(!line.contains('\n'));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn record_keeps_optional_fields_as_null() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "session-123");

        let recorded = writer.record(&SessionEvent::TransformFinished {
            style: "sketch".to_string(),
            attempts: 2,
            accepted: false,
            error_kind: Some("permission_denied".to_string()),
            filtered: None,
        })?;

        assert_eq!(recorded["attempts"], json!(2));
        assert_eq!(recorded["error_kind"], json!("permission_denied"));
        assert_eq!(recorded["filtered"], Value::Null);
        Ok(())
    }

    #[test]
    fn record_appends_lines_and_creates_parent_dirs() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        writer.record(&SessionEvent::KeyChecked {
            key: "AIza...abcd".to_string(),
            valid: true,
        })?;
        writer.clone().record(&SessionEvent::SweepFinished {
            removed: 1,
            kept: 2,
            failed: 0,
        })?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0])?;
        let second: Value = serde_json::from_str(lines[1])?;
        assert_eq!(first["type"], json!("key_checked"));
        assert_eq!(second["type"], json!("sweep_finished"));
        assert_eq!(second["kept"], json!(2));
        Ok(())
    }

    #[test]
    fn line_holds_envelope_and_event_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");
        writer.record(&SessionEvent::KeyChecked {
            key: "AIza...abcd".to_string(),
            valid: false,
        })?;

        let line: Value = serde_json::from_str(fs::read_to_string(&path)?.trim_end())?;
        let mut keys: Vec<&str> = line
            .as_object()
            .map(|fields| fields.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        assert_eq!(keys, ["key", "session_id", "ts", "type", "valid"]);
        assert_eq!(line["session_id"], json!("session-123"));
        Ok(())
    }

    #[test]
    fn kind_matches_serialized_tag() -> anyhow::Result<()> {
        let event = SessionEvent::ChatReply {
            prompt_chars: 5,
            reply_chars: 10,
            with_image: false,
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], json!(event.kind()));
        Ok(())
    }
}
