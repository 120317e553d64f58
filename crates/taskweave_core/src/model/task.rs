//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record shared by both storage backends.
//! - Own field-level validation for drafts and persisted tasks.
//!
//! # Invariants
//! - `text` is non-empty after trim.
//! - `urgency`, `importance`, `enjoyment` stay within `[1, 10]`.
//! - `estimated_minutes >= 1`.
//! - `completed_at.is_some() == is_completed`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier for one task row or snapshot entry.
///
/// Local snapshots derive it from epoch milliseconds; the row store lets
/// SQLite assign it.
pub type TaskId = i64;

/// Lowest accepted value for a weighted attribute.
pub const WEIGHT_MIN: u8 = 1;
/// Highest accepted value for a weighted attribute.
pub const WEIGHT_MAX: u8 = 10;

const DEFAULT_WEIGHT: u8 = 5;
const DEFAULT_ESTIMATED_MINUTES: u32 = 30;

/// Identity of the session that owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// The single implicit owner of the client-local store.
    pub fn local() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_local(self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weighted attribute names, used in validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightField {
    Urgency,
    Importance,
    Enjoyment,
}

impl WeightField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgency => "urgency",
            Self::Importance => "importance",
            Self::Enjoyment => "enjoyment",
        }
    }
}

/// Field-level validation failures for drafts and tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Text is blank after trim.
    EmptyText,
    /// A weighted attribute is outside `[1, 10]`.
    WeightOutOfRange { field: WeightField, value: u8 },
    /// Estimated time is zero.
    NonPositiveMinutes,
    /// `completed_at` disagrees with `is_completed`.
    CompletionMismatch,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "task text must not be blank"),
            Self::WeightOutOfRange { field, value } => write!(
                f,
                "{} must be between {WEIGHT_MIN} and {WEIGHT_MAX}, got {value}",
                field.as_str()
            ),
            Self::NonPositiveMinutes => write!(f, "estimated minutes must be at least 1"),
            Self::CompletionMismatch => {
                write!(f, "completed_at must be set exactly when the task is completed")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// User-editable task fields, as submitted from an add or edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub urgency: u8,
    pub importance: u8,
    pub enjoyment: u8,
    pub estimated_minutes: u32,
    pub is_recurring: bool,
}

impl TaskDraft {
    /// Creates a draft with form defaults: weights 5, 30 minutes, one-off.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            urgency: DEFAULT_WEIGHT,
            importance: DEFAULT_WEIGHT,
            enjoyment: DEFAULT_WEIGHT,
            estimated_minutes: DEFAULT_ESTIMATED_MINUTES,
            is_recurring: false,
        }
    }

    /// Checks text, weight ranges and estimated time.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_fields(
            &self.text,
            [
                (WeightField::Urgency, self.urgency),
                (WeightField::Importance, self.importance),
                (WeightField::Enjoyment, self.enjoyment),
            ],
            self.estimated_minutes,
        )
    }

    /// Returns the text as it will be stored.
    pub fn normalized_text(&self) -> &str {
        self.text.trim()
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            urgency: task.urgency,
            importance: task.importance,
            enjoyment: task.enjoyment,
            estimated_minutes: task.estimated_minutes,
            is_recurring: task.is_recurring,
        }
    }
}

/// Partial update over the mutable task fields.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub urgency: Option<u8>,
    pub importance: Option<u8>,
    pub enjoyment: Option<u8>,
    pub estimated_minutes: Option<u32>,
    pub is_recurring: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&TaskDraft> for TaskPatch {
    fn from(draft: &TaskDraft) -> Self {
        Self {
            text: Some(draft.normalized_text().to_string()),
            urgency: Some(draft.urgency),
            importance: Some(draft.importance),
            enjoyment: Some(draft.enjoyment),
            estimated_minutes: Some(draft.estimated_minutes),
            is_recurring: Some(draft.is_recurring),
        }
    }
}

/// Canonical task record.
///
/// Serialized in camelCase with `time` for the estimate, matching the
/// browser-storage layout the local snapshot file keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub urgency: u8,
    pub importance: u8,
    pub enjoyment: u8,
    #[serde(rename = "time")]
    pub estimated_minutes: u32,
    pub is_recurring: bool,
    #[serde(default)]
    pub is_completed: bool,
    /// Unix epoch milliseconds; set exactly when `is_completed`.
    ///
    /// Reads either epoch milliseconds or an RFC 3339 timestamp string.
    #[serde(
        default,
        deserialize_with = "deserialize_completed_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<i64>,
    /// Present for row-store tasks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

impl Task {
    /// Builds an active task from a draft and storage-assigned identity.
    ///
    /// Does not validate; callers validate the draft first.
    pub fn from_draft(
        id: TaskId,
        draft: &TaskDraft,
        owner_id: Option<OwnerId>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            text: draft.normalized_text().to_string(),
            urgency: draft.urgency,
            importance: draft.importance,
            enjoyment: draft.enjoyment,
            estimated_minutes: draft.estimated_minutes,
            is_recurring: draft.is_recurring,
            is_completed: false,
            completed_at: None,
            owner_id,
            created_at,
        }
    }

    /// Checks every field invariant, including completion consistency.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_fields(
            &self.text,
            [
                (WeightField::Urgency, self.urgency),
                (WeightField::Importance, self.importance),
                (WeightField::Enjoyment, self.enjoyment),
            ],
            self.estimated_minutes,
        )?;
        if self.is_completed != self.completed_at.is_some() {
            return Err(TaskValidationError::CompletionMismatch);
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.is_completed
    }

    /// Overwrites mutable fields from a patch. Identity and completion state
    /// are untouched.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(text) = &patch.text {
            self.text = text.trim().to_string();
        }
        if let Some(urgency) = patch.urgency {
            self.urgency = urgency;
        }
        if let Some(importance) = patch.importance {
            self.importance = importance;
        }
        if let Some(enjoyment) = patch.enjoyment {
            self.enjoyment = enjoyment;
        }
        if let Some(minutes) = patch.estimated_minutes {
            self.estimated_minutes = minutes;
        }
        if let Some(is_recurring) = patch.is_recurring {
            self.is_recurring = is_recurring;
        }
    }

    /// Transitions this task to completed at the given instant.
    pub fn mark_completed(&mut self, completed_at: i64) {
        self.is_completed = true;
        self.completed_at = Some(completed_at);
    }

    /// Draft for the next instance of a recurring task.
    ///
    /// Returns `None` for one-off tasks.
    pub fn recurrence_draft(&self) -> Option<TaskDraft> {
        if !self.is_recurring {
            return None;
        }
        let mut draft = TaskDraft::from(self);
        draft.is_recurring = true;
        Some(draft)
    }
}

fn validate_fields(
    text: &str,
    weights: [(WeightField, u8); 3],
    estimated_minutes: u32,
) -> Result<(), TaskValidationError> {
    if text.trim().is_empty() {
        return Err(TaskValidationError::EmptyText);
    }
    for (field, value) in weights {
        if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&value) {
            return Err(TaskValidationError::WeightOutOfRange { field, value });
        }
    }
    if estimated_minutes == 0 {
        return Err(TaskValidationError::NonPositiveMinutes);
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Rfc3339(String),
}

fn deserialize_completed_at<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Millis(ms)) => Ok(Some(ms)),
        Some(RawTimestamp::Rfc3339(text)) => chrono::DateTime::parse_from_rfc3339(&text)
            .map(|at| Some(at.timestamp_millis()))
            .map_err(|err| D::Error::custom(format!("invalid completedAt `{text}`: {err}"))),
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
