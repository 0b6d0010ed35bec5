use std::fmt;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use uuid::Uuid;

use crate::datetime::TimeContext;
use crate::tag::{
  Tag,
  TagSet
};

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  pub fn generate() -> Self {
    Self(Uuid::new_v4().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for TaskId {
  fn from(raw: &str) -> Self {
    Self(raw.to_string())
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct Subtask {
  pub id:        TaskId,
  pub text:      String,
  #[serde(default)]
  pub completed: bool
}

impl Subtask {
  pub fn new(text: &str) -> Self {
    Self {
      id:        TaskId::generate(),
      text:      text.to_string(),
      completed: false
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id:           TaskId,
  pub text:         String,
  pub completed:    bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub created_at:   DateTime<Utc>,
  pub due_date:     Option<NaiveDate>,
  pub tags:         TagSet,
  pub subtasks:     Vec<Subtask>,
  pub custom_order: i64
}

/// Deadline badge shown next to an open task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
  Overdue(i64),
  Today,
  Tomorrow,
  InDays(i64)
}

impl fmt::Display for DueStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | DueStatus::Overdue(days) => {
        write!(f, "Overdue {days} day(s)")
      }
      | DueStatus::Today => {
        f.write_str("Due today")
      }
      | DueStatus::Tomorrow => {
        f.write_str("Due tomorrow")
      }
      | DueStatus::InDays(days) => {
        write!(f, "Due in {days} days")
      }
    }
  }
}

impl Task {
  pub fn new(
    text: &str,
    now: DateTime<Utc>,
    custom_order: i64
  ) -> Self {
    Self {
      id: TaskId::generate(),
      text: text.to_string(),
      completed: false,
      completed_at: None,
      created_at: now,
      due_date: None,
      tags: TagSet::new(),
      subtasks: vec![],
      custom_order
    }
  }

  pub fn has_tag(&self, tag: &Tag) -> bool {
    self.tags.contains(tag)
  }

  /// Completion time, or creation time for records that lack one.
  pub fn finished_or_created(
    &self
  ) -> DateTime<Utc> {
    self.completed_at.unwrap_or(self.created_at)
  }

  pub fn set_completed(
    &mut self,
    completed: bool,
    now: DateTime<Utc>
  ) {
    self.completed = completed;
    self.completed_at = completed.then_some(now);
  }

  pub fn due_status(
    &self,
    ctx: &TimeContext
  ) -> Option<DueStatus> {
    if self.completed {
      return None;
    }
    let due = self.due_date?;
    let days = due
      .signed_duration_since(ctx.today())
      .num_days();
    Some(match days {
      | d if d < 0 => DueStatus::Overdue(-d),
      | 0 => DueStatus::Today,
      | 1 => DueStatus::Tomorrow,
      | d => DueStatus::InDays(d)
    })
  }

  /// `(done, total)` when the task has subtasks.
  pub fn subtask_progress(
    &self
  ) -> Option<(usize, usize)> {
    if self.subtasks.is_empty() {
      return None;
    }
    let done = self
      .subtasks
      .iter()
      .filter(|st| st.completed)
      .count();
    Some((done, self.subtasks.len()))
  }
}
