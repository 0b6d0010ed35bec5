use std::collections::HashMap;
use std::fs;
use std::io::{
  ErrorKind,
  Write
};
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::TimeContext;
use crate::tag::TagSet;
use crate::tags::{
  TagCatalog,
  derive_auto_tags
};
use crate::task::{
  Subtask,
  Task,
  TaskId
};
use crate::theme::Theme;

pub const TASKS_KEY: &str = "todoList";
pub const CATALOG_KEY: &str = "customTags";
pub const THEME_KEY: &str = "themeColor";

/// Durable string entries keyed by name. Writes replace the whole entry.
pub trait KeyValueStore {
  fn get(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>>;

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
  entries: HashMap<String, String>
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>> {
    Ok(self.entries.get(key).cloned())
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    self
      .entries
      .insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// One `<key>.json` file per entry inside the data directory.
#[derive(Debug)]
pub struct DirStore {
  pub data_dir: PathBuf
}

impl DirStore {
  #[tracing::instrument(skip(data_dir))]
  pub fn open(
    data_dir: &Path
  ) -> anyhow::Result<Self> {
    let data_dir = data_dir.to_path_buf();
    fs::create_dir_all(&data_dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          data_dir.display()
        )
      })?;
    info!(data_dir = %data_dir.display(), "opened datastore");
    Ok(Self {
      data_dir
    })
  }

  fn entry_path(
    &self,
    key: &str
  ) -> PathBuf {
    self.data_dir.join(format!("{key}.json"))
  }
}

impl KeyValueStore for DirStore {
  /// Bytes that are not UTF-8 count as an absent entry so the caller falls
  /// back to defaults; other read failures are errors.
  #[tracing::instrument(skip(self))]
  fn get(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>> {
    let path = self.entry_path(key);
    let bytes = match fs::read(&path) {
      | Ok(bytes) => bytes,
      | Err(err)
        if err.kind() == ErrorKind::NotFound =>
      {
        debug!(file = %path.display(), "entry absent");
        return Ok(None);
      }
      | Err(err) => {
        return Err(err).with_context(|| {
          format!(
            "failed reading {}",
            path.display()
          )
        });
      }
    };
    match String::from_utf8(bytes) {
      | Ok(raw) => Ok(Some(raw)),
      | Err(err) => {
        warn!(file = %path.display(), error = %err, "entry is not valid UTF-8; treating as absent");
        Ok(None)
      }
    }
  }

  #[tracing::instrument(
    skip(self, value),
    fields(bytes = value.len())
  )]
  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let path = self.entry_path(key);
    debug!(file = %path.display(), "saving entry atomically");

    let mut temp =
      NamedTempFile::new_in(&self.data_dir)?;
    temp.write_all(value.as_bytes())?;
    temp.flush()?;
    temp.persist(&path).map_err(|err| {
      anyhow!(
        "failed to persist {}: {}",
        path.display(),
        err
      )
    })?;
    Ok(())
  }
}

/// Task record as found in storage. Everything beyond identity, text and
/// creation time may be missing in older data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
  id:           TaskId,
  text:         String,
  #[serde(default)]
  completed:    bool,
  #[serde(default)]
  completed_at: Option<DateTime<Utc>>,
  created_at:   DateTime<Utc>,
  #[serde(default)]
  due_date:     Option<String>,
  #[serde(default)]
  tags:         Option<TagSet>,
  #[serde(default)]
  subtasks:     Option<Vec<Subtask>>,
  #[serde(default)]
  custom_order: Option<i64>
}

impl StoredTask {
  fn into_task(
    self,
    fallback_order: i64
  ) -> Task {
    let due_date = self
      .due_date
      .filter(|raw| !raw.trim().is_empty())
      .and_then(|raw| {
        match NaiveDate::parse_from_str(
          raw.trim(),
          "%Y-%m-%d"
        ) {
          | Ok(date) => Some(date),
          | Err(err) => {
            warn!(id = %self.id, raw = %raw, error = %err, "ignoring unreadable due date");
            None
          }
        }
      });
    Task {
      id: self.id,
      text: self.text,
      completed: self.completed,
      completed_at: self.completed_at,
      created_at: self.created_at,
      due_date,
      tags: self.tags.unwrap_or_default(),
      subtasks: self
        .subtasks
        .unwrap_or_default(),
      custom_order: self
        .custom_order
        .unwrap_or(fallback_order)
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct LoadedState {
  pub tasks:   Vec<Task>,
  pub catalog: TagCatalog,
  pub theme:   Theme
}

/// Reads all three entries. Absent or unreadable entries fall back to their
/// defaults; only backend I/O failures are errors.
#[tracing::instrument(skip(backend, ctx))]
pub fn load_state(
  backend: &dyn KeyValueStore,
  ctx: &TimeContext
) -> anyhow::Result<LoadedState> {
  let tasks = match backend.get(TASKS_KEY)? {
    | Some(raw) => parse_tasks(&raw, ctx),
    | None => vec![]
  };

  let catalog =
    match backend.get(CATALOG_KEY)? {
      | Some(raw) => {
        match serde_json::from_str::<
          Vec<String>
        >(&raw)
        {
          | Ok(labels) => {
            TagCatalog::from_labels(labels)
          }
          | Err(err) => {
            warn!(key = CATALOG_KEY, error = %err, "malformed tag catalog; using defaults");
            TagCatalog::default()
          }
        }
      }
      | None => TagCatalog::default()
    };

  let theme = match backend.get(THEME_KEY)? {
    | Some(raw) => {
      let color =
        serde_json::from_str::<String>(&raw)
          .unwrap_or_else(|_| {
            raw.trim().to_string()
          });
      Theme::from_color(&color)
    }
    | None => Theme::default()
  };

  info!(
    tasks = tasks.len(),
    catalog = catalog.labels().len(),
    theme = theme.color(),
    "loaded state"
  );
  Ok(LoadedState {
    tasks,
    catalog,
    theme
  })
}

fn parse_tasks(
  raw: &str,
  ctx: &TimeContext
) -> Vec<Task> {
  let records: Vec<serde_json::Value> =
    match serde_json::from_str(raw) {
      | Ok(records) => records,
      | Err(err) => {
        warn!(key = TASKS_KEY, error = %err, "malformed task list; starting empty");
        return vec![];
      }
    };

  let now_millis = ctx.now().timestamp_millis();
  let step =
    Duration::seconds(1).num_milliseconds();
  let mut tasks =
    Vec::with_capacity(records.len());
  for (idx, record) in
    records.into_iter().enumerate()
  {
    let stored: StoredTask =
      match serde_json::from_value(record) {
        | Ok(stored) => stored,
        | Err(err) => {
          warn!(index = idx, error = %err, "skipping malformed task record");
          continue;
        }
      };
    let mut task = stored
      .into_task(now_millis - idx as i64 * step);
    task.tags = derive_auto_tags(
      &task.tags,
      task.due_date,
      ctx
    );
    tasks.push(task);
  }
  debug!(
    count = tasks.len(),
    "parsed task records"
  );
  tasks
}

#[tracing::instrument(
  skip(backend, tasks),
  fields(count = tasks.len())
)]
pub fn save_tasks(
  backend: &mut dyn KeyValueStore,
  tasks: &[Task]
) -> anyhow::Result<()> {
  let serialized = serde_json::to_string(tasks)?;
  backend
    .set(TASKS_KEY, &serialized)
    .context("failed to save task list")
}

#[tracing::instrument(skip(backend, catalog))]
pub fn save_catalog(
  backend: &mut dyn KeyValueStore,
  catalog: &TagCatalog
) -> anyhow::Result<()> {
  let serialized =
    serde_json::to_string(catalog)?;
  backend
    .set(CATALOG_KEY, &serialized)
    .context("failed to save tag catalog")
}

#[tracing::instrument(skip(backend))]
pub fn save_theme(
  backend: &mut dyn KeyValueStore,
  theme: Theme
) -> anyhow::Result<()> {
  let serialized =
    serde_json::to_string(theme.color())?;
  backend
    .set(THEME_KEY, &serialized)
    .context("failed to save theme")
}
