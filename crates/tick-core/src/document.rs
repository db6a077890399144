use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::datetime::{self, iso8601_serde};
use crate::error::LoadError;
use crate::task::{Statistics, Task, TaskId};

/// Largest id a JavaScript client can hold exactly (`Number.MAX_SAFE_INTEGER`).
pub const MAX_SAFE_ID: TaskId = (1 << 53) - 1;

/// Top-level fields the store carries but never interprets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Passthrough {
    pub categories: Option<Value>,
    pub priorities: Option<Value>,
    pub settings: Option<Value>,
}

impl Passthrough {
    fn take_from(map: &mut Map<String, Value>) -> Self {
        Self {
            categories: map.remove("categories"),
            priorities: map.remove("priorities"),
            settings: map.remove("settings"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.priorities.is_none() && self.settings.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Malformed(String),
    MissingTimestamp,
    BadTimestamp(String),
    ZeroId,
    IdTooLarge(TaskId),
    BlankText,
    DuplicateId(TaskId),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed(msg) => write!(f, "malformed task: {msg}"),
            SkipReason::MissingTimestamp => write!(f, "missing createdAt"),
            SkipReason::BadTimestamp(raw) => write!(f, "unparsable createdAt {raw:?}"),
            SkipReason::ZeroId => write!(f, "id must be positive"),
            SkipReason::IdTooLarge(id) => write!(f, "id {id} exceeds {MAX_SAFE_ID}"),
            SkipReason::BlankText => write!(f, "text is blank"),
            SkipReason::DuplicateId(id) => write!(f, "duplicate id {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedElement {
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct DecodedDocument {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedElement>,
    pub passthrough: Passthrough,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    id: TaskId,
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default, rename = "createdAt")]
    created_at: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Decodes a load document. Document-level problems are errors; a bad element
/// is recorded in `skipped` and decoding carries on with the next one.
#[tracing::instrument(skip(raw), fields(len = raw.len()))]
pub fn decode_document(raw: &str) -> Result<DecodedDocument, LoadError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut map) = value else {
        return Err(LoadError::NotAnObject);
    };

    let items = match map.remove("tasks") {
        None | Some(Value::Null) => return Err(LoadError::MissingTasks),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(LoadError::InvalidTasks),
    };

    let passthrough = Passthrough::take_from(&mut map);
    if !map.is_empty() {
        debug!(
            ignored = ?map.keys().collect::<Vec<_>>(),
            "ignoring unrecognized top-level fields"
        );
    }

    let mut seen = BTreeSet::new();
    let mut out = DecodedDocument {
        tasks: Vec::with_capacity(items.len()),
        skipped: vec![],
        passthrough,
    };

    for (index, item) in items.into_iter().enumerate() {
        match decode_task(item, &seen) {
            Ok(task) => {
                seen.insert(task.id);
                out.tasks.push(task);
            }
            Err(reason) => {
                warn!(index, %reason, "skipping task element");
                out.skipped.push(SkippedElement { index, reason });
            }
        }
    }

    debug!(
        loaded = out.tasks.len(),
        skipped = out.skipped.len(),
        "decoded load document"
    );
    Ok(out)
}

fn decode_task(item: Value, seen: &BTreeSet<TaskId>) -> Result<Task, SkipReason> {
    let raw: RawTask =
        serde_json::from_value(item).map_err(|err| SkipReason::Malformed(err.to_string()))?;

    if raw.id == 0 {
        return Err(SkipReason::ZeroId);
    }
    if raw.id > MAX_SAFE_ID {
        return Err(SkipReason::IdTooLarge(raw.id));
    }
    if seen.contains(&raw.id) {
        return Err(SkipReason::DuplicateId(raw.id));
    }

    let text = raw.text.trim();
    if text.is_empty() {
        return Err(SkipReason::BlankText);
    }

    let stamp = raw.created_at.ok_or(SkipReason::MissingTimestamp)?;
    let created_at =
        datetime::parse_timestamp(&stamp).map_err(|err| SkipReason::BadTimestamp(err.raw))?;

    Ok(Task {
        id: raw.id,
        text: text.to_string(),
        completed: raw.completed,
        created_at,
        extra: raw.extra,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub tasks: Vec<Task>,
    #[serde(with = "iso8601_serde")]
    pub exported_at: DateTime<Utc>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

impl ExportDocument {
    pub fn new(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let stats = Statistics::from_tasks(tasks);
        Self {
            tasks: tasks.to_vec(),
            exported_at: datetime::normalize(now),
            total_tasks: stats.total,
            completed_tasks: stats.completed,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{ExportDocument, MAX_SAFE_ID, SkipReason, decode_document};
    use crate::error::LoadError;
    use crate::task::Task;

    #[test]
    fn rejects_non_list_tasks() {
        let err = decode_document(r#"{"tasks": "not-a-list"}"#).expect_err("invalid");
        assert!(matches!(err, LoadError::InvalidTasks));
    }

    #[test]
    fn rejects_missing_tasks_and_non_objects() {
        assert!(matches!(
            decode_document(r#"{"settings": {}}"#),
            Err(LoadError::MissingTasks)
        ));
        assert!(matches!(
            decode_document("[1, 2]"),
            Err(LoadError::NotAnObject)
        ));
        assert!(matches!(decode_document("{tasks"), Err(LoadError::Json(_))));
    }

    #[test]
    fn skips_bad_elements_and_keeps_the_rest() {
        let raw = json!({
            "tasks": [
                {"id": 1, "text": "ok", "completed": true, "createdAt": "2024-01-15T10:30:00.000Z"},
                {"id": 2, "text": "bad date", "createdAt": "not a date"},
                {"id": 3, "text": "no date"},
                {"id": 1, "text": "dup", "createdAt": "2024-01-15T10:30:00.000Z"},
                {"id": 0, "text": "zero", "createdAt": "2024-01-15T10:30:00.000Z"},
                {"id": 4, "text": "   ", "createdAt": "2024-01-15T10:30:00.000Z"},
                "just a string",
                {"id": 5, "text": "  padded  ", "createdAt": "2024-01-16"}
            ]
        })
        .to_string();

        let decoded = decode_document(&raw).expect("decode");
        let ids: Vec<u64> = decoded.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(decoded.tasks[1].text, "padded");
        assert!(!decoded.tasks[1].completed);

        let reasons: Vec<SkipReason> = decoded.skipped.into_iter().map(|s| s.reason).collect();
        assert_eq!(reasons.len(), 6);
        assert_eq!(reasons[0], SkipReason::BadTimestamp("not a date".to_string()));
        assert_eq!(reasons[1], SkipReason::MissingTimestamp);
        assert_eq!(reasons[2], SkipReason::DuplicateId(1));
        assert_eq!(reasons[3], SkipReason::ZeroId);
        assert_eq!(reasons[4], SkipReason::BlankText);
        assert!(matches!(reasons[5], SkipReason::Malformed(_)));
    }

    #[test]
    fn ids_beyond_the_safe_integer_range_are_skipped() {
        let raw = json!({
            "tasks": [
                {"id": u64::MAX, "text": "huge", "createdAt": "2024-01-15T10:30:00.000Z"},
                {"id": MAX_SAFE_ID + 1, "text": "just over", "createdAt": "2024-01-15T10:30:00.000Z"},
                {"id": MAX_SAFE_ID, "text": "edge", "createdAt": "2024-01-15T10:30:00.000Z"}
            ]
        })
        .to_string();

        let decoded = decode_document(&raw).expect("decode");
        let ids: Vec<u64> = decoded.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![MAX_SAFE_ID]);
        let reasons: Vec<SkipReason> = decoded.skipped.into_iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::IdTooLarge(u64::MAX),
                SkipReason::IdTooLarge(MAX_SAFE_ID + 1)
            ]
        );
    }

    #[test]
    fn unknown_task_fields_are_kept() {
        let raw = json!({
            "tasks": [
                {"id": 1, "text": "a", "createdAt": "2024-01-15T10:30:00.000Z", "priority": "high", "category": "work"}
            ]
        })
        .to_string();

        let decoded = decode_document(&raw).expect("decode");
        let extra = &decoded.tasks[0].extra;
        assert_eq!(extra.get("priority"), Some(&json!("high")));
        assert_eq!(extra.get("category"), Some(&json!("work")));
        assert!(!extra.contains_key("createdAt"));

        let doc = ExportDocument::new(&decoded.tasks, Utc::now());
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["tasks"][0]["priority"], "high");
        assert_eq!(value["tasks"][0]["category"], "work");
    }

    #[test]
    fn keeps_passthrough_fields_verbatim() {
        let raw = json!({
            "tasks": [],
            "categories": ["home", "work"],
            "settings": {"theme": "dark"},
            "unknown": 1
        })
        .to_string();

        let decoded = decode_document(&raw).expect("decode");
        assert_eq!(decoded.passthrough.categories, Some(json!(["home", "work"])));
        assert_eq!(decoded.passthrough.priorities, None);
        assert_eq!(decoded.passthrough.settings, Some(json!({"theme": "dark"})));
    }

    #[test]
    fn export_document_shape() {
        let now = Utc
            .with_ymd_and_hms(2024, 2, 1, 8, 0, 0)
            .single()
            .expect("valid now");
        let mut done = Task::new_pending(1, "done".to_string(), now);
        done.completed = true;
        let open = Task::new_pending(2, "open".to_string(), now);

        let doc = ExportDocument::new(&[done, open], now);
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["exportedAt"], "2024-02-01T08:00:00.000Z");
        assert_eq!(value["totalTasks"], 2);
        assert_eq!(value["completedTasks"], 1);
        assert_eq!(value["tasks"][1]["createdAt"], "2024-02-01T08:00:00.000Z");
    }
}
