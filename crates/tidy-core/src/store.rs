use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use tracing::{
  debug,
  info
};

use crate::datastore::{
  KeyValueStore,
  MemoryStore,
  load_state,
  save_catalog,
  save_tasks,
  save_theme
};
use crate::datetime::TimeContext;
use crate::priority::same_band;
use crate::tag::{
  Tag,
  TagSet
};
use crate::tags::{
  TagCatalog,
  apply_mutual_exclusion,
  derive_auto_tags
};
use crate::task::{
  Subtask,
  Task,
  TaskId
};
use crate::theme::Theme;

/// How long a deleted task can be brought back.
pub const UNDO_WINDOW_SECS: i64 = 5;

/// Gap between the highest existing order and a new task's order.
const ORDER_STEP: i64 = 1000;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum CreateMode {
  #[default]
  Single,
  /// One task per non-blank line of the text.
  Batch
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
  pub text:     String,
  pub mode:     CreateMode,
  pub tags:     TagSet,
  pub due_date: Option<NaiveDate>,
  /// Checklist items, used in single mode only.
  pub subtasks: Vec<String>
}

#[derive(Debug, Clone)]
struct PendingUndo {
  task:       Task,
  expires_at: DateTime<Utc>
}

/// The task collection with its catalog and theme. Every successful
/// mutation is flushed to the backend before returning.
pub struct TaskStore {
  tasks:            Vec<Task>,
  catalog:          TagCatalog,
  theme:            Theme,
  recently_deleted: Option<PendingUndo>,
  backend:          Box<dyn KeyValueStore>
}

impl std::fmt::Debug for TaskStore {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    f.debug_struct("TaskStore")
      .field("tasks", &self.tasks.len())
      .field("catalog", &self.catalog)
      .field("theme", &self.theme)
      .field(
        "undo_pending",
        &self.recently_deleted.is_some()
      )
      .finish_non_exhaustive()
  }
}

impl TaskStore {
  #[tracing::instrument(skip(
    backend, ctx
  ))]
  pub fn open(
    backend: Box<dyn KeyValueStore>,
    ctx: &TimeContext
  ) -> anyhow::Result<Self> {
    let state =
      load_state(backend.as_ref(), ctx)?;
    Ok(Self {
      tasks:            state.tasks,
      catalog:          state.catalog,
      theme:            state.theme,
      recently_deleted: None,
      backend
    })
  }

  pub fn in_memory(
    ctx: &TimeContext
  ) -> anyhow::Result<Self> {
    Self::open(
      Box::new(MemoryStore::new()),
      ctx
    )
  }

  /// Hands the backend back, e.g. to reopen the same data.
  pub fn into_backend(
    self
  ) -> Box<dyn KeyValueStore> {
    self.backend
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn get(
    &self,
    id: &TaskId
  ) -> Option<&Task> {
    self
      .tasks
      .iter()
      .find(|task| task.id == *id)
  }

  pub fn catalog(&self) -> &TagCatalog {
    &self.catalog
  }

  pub fn theme(&self) -> Theme {
    self.theme
  }

  pub fn recently_deleted(
    &self
  ) -> Option<&Task> {
    self
      .recently_deleted
      .as_ref()
      .map(|pending| &pending.task)
  }

  fn flush_tasks(
    &mut self
  ) -> anyhow::Result<()> {
    save_tasks(
      self.backend.as_mut(),
      &self.tasks
    )
  }

  /// Applies `op` to the task with `id` and persists. `op` returns whether
  /// it changed anything.
  fn update<F>(
    &mut self,
    id: &TaskId,
    op: F
  ) -> anyhow::Result<bool>
  where
    F: FnOnce(&mut Task) -> bool
  {
    let Some(task) = self
      .tasks
      .iter_mut()
      .find(|task| task.id == *id)
    else {
      debug!(%id, "no such task");
      return Ok(false);
    };
    if !op(task) {
      return Ok(false);
    }
    self.flush_tasks()?;
    Ok(true)
  }

  /// Creates one task, or one per line in batch mode, ahead of everything
  /// else. Blank input creates nothing.
  #[tracing::instrument(
    skip(self, draft, ctx),
    fields(mode = ?draft.mode)
  )]
  pub fn create(
    &mut self,
    draft: NewTask,
    ctx: &TimeContext
  ) -> anyhow::Result<Vec<TaskId>> {
    let texts: Vec<&str> = match draft.mode
    {
      | CreateMode::Single => {
        Some(draft.text.trim())
          .filter(|t| !t.is_empty())
          .into_iter()
          .collect()
      }
      | CreateMode::Batch => {
        draft
          .text
          .lines()
          .map(str::trim)
          .filter(|l| !l.is_empty())
          .collect()
      }
    };
    if texts.is_empty() {
      debug!(
        "blank input; nothing created"
      );
      return Ok(vec![]);
    }

    let tags = derive_auto_tags(
      &draft.tags,
      draft.due_date,
      ctx
    );
    let base = self
      .tasks
      .iter()
      .map(|t| t.custom_order)
      .max()
      .unwrap_or(0)
      + ORDER_STEP;
    let created: Vec<Task> = texts
      .iter()
      .enumerate()
      .map(|(idx, text)| {
        let mut task = Task::new(
          text,
          ctx.now(),
          base + idx as i64
        );
        task.tags = tags.clone();
        task.due_date = draft.due_date;
        if draft.mode == CreateMode::Single
        {
          task.subtasks = draft
            .subtasks
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Subtask::new)
            .collect();
        }
        task
      })
      .collect();

    let ids: Vec<TaskId> = created
      .iter()
      .map(|t| t.id.clone())
      .collect();
    self.tasks.splice(0..0, created);
    self.flush_tasks()?;
    info!(
      count = ids.len(),
      "created tasks"
    );
    Ok(ids)
  }

  #[tracing::instrument(skip(self, ctx))]
  pub fn toggle_complete(
    &mut self,
    id: &TaskId,
    ctx: &TimeContext
  ) -> anyhow::Result<bool> {
    self.update(id, |task| {
      task.set_completed(
        !task.completed,
        ctx.now()
      );
      true
    })
  }

  /// Adds (through the exclusion rules) or removes `tag`, then re-derives
  /// the automatic tags.
  #[tracing::instrument(skip(self, ctx))]
  pub fn set_tag(
    &mut self,
    id: &TaskId,
    tag: Tag,
    active: bool,
    ctx: &TimeContext
  ) -> anyhow::Result<bool> {
    self.update(id, |task| {
      let tags = if active {
        apply_mutual_exclusion(
          &task.tags, tag
        )
      } else {
        let mut tags = task.tags.clone();
        tags.remove(&tag);
        tags
      };
      task.tags = derive_auto_tags(
        &tags,
        task.due_date,
        ctx
      );
      true
    })
  }

  #[tracing::instrument(skip(self, ctx))]
  pub fn set_due_date(
    &mut self,
    id: &TaskId,
    due: Option<NaiveDate>,
    ctx: &TimeContext
  ) -> anyhow::Result<bool> {
    self.update(id, |task| {
      task.due_date = due;
      task.tags = derive_auto_tags(
        &task.tags, due, ctx
      );
      true
    })
  }

  #[tracing::instrument(skip(self, text))]
  pub fn edit_text(
    &mut self,
    id: &TaskId,
    text: &str
  ) -> anyhow::Result<bool> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(false);
    }
    self.update(id, |task| {
      task.text = text.to_string();
      true
    })
  }

  #[tracing::instrument(skip(self, text))]
  pub fn add_subtask(
    &mut self,
    id: &TaskId,
    text: &str
  ) -> anyhow::Result<Option<TaskId>> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(None);
    }
    let subtask = Subtask::new(text);
    let sub_id = subtask.id.clone();
    let added = self.update(id, |task| {
      task.subtasks.push(subtask);
      true
    })?;
    Ok(added.then_some(sub_id))
  }

  #[tracing::instrument(skip(self))]
  pub fn toggle_subtask(
    &mut self,
    id: &TaskId,
    subtask: &TaskId
  ) -> anyhow::Result<bool> {
    self.update(id, |task| {
      match task
        .subtasks
        .iter_mut()
        .find(|st| st.id == *subtask)
      {
        | Some(st) => {
          st.completed = !st.completed;
          true
        }
        | None => false
      }
    })
  }

  #[tracing::instrument(skip(self))]
  pub fn delete_subtask(
    &mut self,
    id: &TaskId,
    subtask: &TaskId
  ) -> anyhow::Result<bool> {
    self.update(id, |task| {
      let before = task.subtasks.len();
      task
        .subtasks
        .retain(|st| st.id != *subtask);
      task.subtasks.len() != before
    })
  }

  /// Swaps the manual order of two tasks in the same priority band. Pairs
  /// across bands are left alone.
  #[tracing::instrument(skip(self))]
  pub fn reorder(
    &mut self,
    source: &TaskId,
    target: &TaskId
  ) -> anyhow::Result<bool> {
    let src = self
      .tasks
      .iter()
      .position(|t| t.id == *source);
    let dst = self
      .tasks
      .iter()
      .position(|t| t.id == *target);
    let (Some(src), Some(dst)) = (src, dst)
    else {
      return Ok(false);
    };
    if src == dst
      || !same_band(
        &self.tasks[src],
        &self.tasks[dst]
      )
    {
      debug!("reorder declined");
      return Ok(false);
    }

    let order = self.tasks[src].custom_order;
    self.tasks[src].custom_order =
      self.tasks[dst].custom_order;
    self.tasks[dst].custom_order = order;
    self.flush_tasks()?;
    Ok(true)
  }

  /// Removes the task and parks it for [`UNDO_WINDOW_SECS`]. A previously
  /// parked task is dropped for good.
  #[tracing::instrument(skip(self, ctx))]
  pub fn delete(
    &mut self,
    id: &TaskId,
    ctx: &TimeContext
  ) -> anyhow::Result<bool> {
    let Some(idx) = self
      .tasks
      .iter()
      .position(|t| t.id == *id)
    else {
      return Ok(false);
    };
    let task = self.tasks.remove(idx);
    if let Some(previous) =
      self.recently_deleted.take()
    {
      debug!(id = %previous.task.id, "discarding earlier pending undo");
    }
    self.recently_deleted = Some(PendingUndo {
      task,
      expires_at: ctx.now()
        + Duration::seconds(
          UNDO_WINDOW_SECS
        )
    });
    self.flush_tasks()?;
    info!(%id, "deleted task");
    Ok(true)
  }

  /// Restores the parked task at the front if the window is still open.
  /// The slot is cleared either way.
  #[tracing::instrument(skip(self, ctx))]
  pub fn undo_delete(
    &mut self,
    ctx: &TimeContext
  ) -> anyhow::Result<Option<TaskId>> {
    let Some(pending) =
      self.recently_deleted.take()
    else {
      return Ok(None);
    };
    if ctx.now() >= pending.expires_at {
      debug!(id = %pending.task.id, "undo window elapsed");
      return Ok(None);
    }
    let mut task = pending.task;
    task.tags = derive_auto_tags(
      &task.tags,
      task.due_date,
      ctx
    );
    let id = task.id.clone();
    self.tasks.insert(0, task);
    self.flush_tasks()?;
    info!(%id, "restored deleted task");
    Ok(Some(id))
  }

  /// Drops the parked task once its window has passed.
  pub fn expire_undo(
    &mut self,
    ctx: &TimeContext
  ) -> bool {
    match &self.recently_deleted {
      | Some(pending)
        if ctx.now() >= pending.expires_at =>
      {
        self.recently_deleted = None;
        true
      }
      | _ => false
    }
  }

  #[tracing::instrument(skip(self))]
  pub fn add_custom_tag(
    &mut self,
    label: &str
  ) -> anyhow::Result<bool> {
    if !self.catalog.add(label) {
      return Ok(false);
    }
    save_catalog(
      self.backend.as_mut(),
      &self.catalog
    )?;
    Ok(true)
  }

  /// Removes a catalog label and strips it from every task, the one parked
  /// for undo included.
  #[tracing::instrument(skip(self))]
  pub fn remove_custom_tag(
    &mut self,
    label: &str
  ) -> anyhow::Result<bool> {
    if !self.catalog.remove(label) {
      return Ok(false);
    }
    let tag = Tag::Custom(label.to_string());
    let stripped = self
      .tasks
      .iter_mut()
      .map(|task| task.tags.remove(&tag))
      .filter(|removed| *removed)
      .count();
    if let Some(pending) =
      self.recently_deleted.as_mut()
    {
      pending.task.tags.remove(&tag);
    }
    save_catalog(
      self.backend.as_mut(),
      &self.catalog
    )?;
    self.flush_tasks()?;
    info!(
      label,
      stripped, "removed custom tag"
    );
    Ok(true)
  }

  #[tracing::instrument(skip(self))]
  pub fn set_theme(
    &mut self,
    theme: Theme
  ) -> anyhow::Result<()> {
    self.theme = theme;
    save_theme(self.backend.as_mut(), theme)
  }

  /// Re-derives automatic tags against the current time, so tasks drift
  /// into the due-soon window without being touched. Returns how many
  /// changed.
  #[tracing::instrument(skip(self, ctx))]
  pub fn refresh_auto_tags(
    &mut self,
    ctx: &TimeContext
  ) -> anyhow::Result<usize> {
    let mut changed = 0;
    for task in &mut self.tasks {
      let tags = derive_auto_tags(
        &task.tags,
        task.due_date,
        ctx
      );
      if tags != task.tags {
        task.tags = tags;
        changed += 1;
      }
    }
    if changed > 0 {
      self.flush_tasks()?;
    }
    Ok(changed)
  }
}
