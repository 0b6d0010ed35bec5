use std::collections::BTreeMap;

use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use tracing::{
  debug,
  warn
};

use crate::datetime::TimeContext;
use crate::filter::{
  FilterKey,
  ListQuery,
  StatusTab,
  TagFilter,
  active_list
};
use crate::paging::{
  Pager,
  SlideDirection,
  page_slice,
  total_pages
};
use crate::platform::{
  Clipboard,
  Confirm,
  Haptics
};
use crate::reorder::{
  DragEffect,
  DragGate,
  DragState,
  PressTarget
};
use crate::store::{
  CreateMode,
  NewTask,
  TaskStore
};
use crate::tag::{
  Tag,
  TagSet
};
use crate::tags::toggle_draft_tag;
use crate::task::{
  Task,
  TaskId
};
use crate::views::{
  CalendarMode,
  ChartWindow,
  CompletedBucket,
  CompletedGroups,
  ExpandedGroups,
  MonthCursor,
  ProgressRange,
  ProgressStats,
  TrendPoint,
  ViewMode,
  group_by_day,
  group_completed,
  progress_stats,
  text_log,
  trend_series
};

/// How long the "copied" confirmation stays up.
pub const COPY_FEEDBACK_MS: i64 = 2000;

/// The new-task form.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct TaskDraft {
  pub text:     String,
  pub mode:     CreateMode,
  pub tags:     TagSet,
  pub due_date: Option<NaiveDate>,
  pub subtasks: Vec<String>
}

impl TaskDraft {
  pub fn toggle_tag(&mut self, tag: Tag) {
    self.tags =
      toggle_draft_tag(&self.tags, tag);
  }

  pub fn add_subtask(
    &mut self,
    text: &str
  ) -> bool {
    let text = text.trim();
    if text.is_empty() {
      return false;
    }
    self.subtasks.push(text.to_string());
    true
  }

  fn to_new_task(&self) -> NewTask {
    NewTask {
      text:     self.text.clone(),
      mode:     self.mode,
      tags:     self.tags.clone(),
      due_date: self.due_date,
      subtasks: self.subtasks.clone()
    }
  }
}

/// Everything the interface remembers between events that is not part of
/// the stored data.
#[derive(Debug, Clone)]
pub struct Session {
  pub view:            ViewMode,
  tab:                 StatusTab,
  search:              String,
  tag_filter:          TagFilter,
  pager:               Pager,
  drag:                DragState,
  pub expanded:        ExpandedGroups,
  pub progress_range:  ProgressRange,
  pub chart_window:    ChartWindow,
  pub calendar_mode:   CalendarMode,
  pub month:           MonthCursor,
  pub draft:           TaskDraft,
  copy_feedback_until: Option<DateTime<Utc>>
}

impl Session {
  pub fn new(ctx: &TimeContext) -> Self {
    Self {
      view:                ViewMode::default(),
      tab:                 StatusTab::default(),
      search:              String::new(),
      tag_filter:          TagFilter::default(),
      pager:               Pager::default(),
      drag:                DragState::default(),
      expanded:            ExpandedGroups::default(),
      progress_range:      ProgressRange::default(),
      chart_window:        ChartWindow::default(),
      calendar_mode:       CalendarMode::default(),
      month:               MonthCursor::today(ctx),
      draft:               TaskDraft::default(),
      copy_feedback_until: None
    }
  }

  pub fn tab(&self) -> StatusTab {
    self.tab
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn tag_filter(&self) -> &TagFilter {
    &self.tag_filter
  }

  pub fn pager(&self) -> Pager {
    self.pager
  }

  pub fn drag(&self) -> &DragState {
    &self.drag
  }

  pub fn set_tab(&mut self, tab: StatusTab) {
    self.tab = tab;
    self.drag = self.drag.release();
    self.pager.reset();
  }

  pub fn set_search(&mut self, query: &str) {
    self.search = query.to_string();
    self.pager.reset();
  }

  pub fn toggle_tag_filter(
    &mut self,
    key: FilterKey
  ) {
    self.tag_filter.toggle(key);
    self.pager.reset();
  }

  pub fn clear_tag_filter(&mut self) {
    self.tag_filter = TagFilter::All;
    self.pager.reset();
  }

  pub fn query(&self) -> ListQuery {
    ListQuery {
      tab:    self.tab,
      search: self.search.clone(),
      tags:   self.tag_filter.clone()
    }
  }

  pub fn visible<'a>(
    &self,
    store: &'a TaskStore
  ) -> Vec<&'a Task> {
    active_list(store.tasks(), &self.query())
  }

  pub fn total_pages(
    &self,
    store: &TaskStore
  ) -> usize {
    total_pages(self.visible(store).len())
  }

  /// The tasks on the current page, pulling the page back in range first.
  pub fn page<'a>(
    &mut self,
    store: &'a TaskStore
  ) -> Vec<&'a Task> {
    let visible = self.visible(store);
    self
      .pager
      .clamp(total_pages(visible.len()));
    page_slice(
      &visible,
      self.pager.current()
    )
    .to_vec()
  }

  pub fn next_page(
    &mut self,
    store: &TaskStore
  ) -> bool {
    let total = self.total_pages(store);
    self.pager.next(total)
  }

  pub fn prev_page(&mut self) -> bool {
    self.pager.prev()
  }

  /// Horizontal swipe on the list. Ignored while a card is being dragged.
  pub fn swipe(
    &mut self,
    start_x: f32,
    end_x: f32,
    store: &TaskStore
  ) -> Option<SlideDirection> {
    if self.drag.scroll_locked() {
      return None;
    }
    let total = self.total_pages(store);
    self.pager.swipe(start_x, end_x, total)
  }

  pub fn completed_groups<'a>(
    &self,
    store: &'a TaskStore,
    ctx: &TimeContext
  ) -> CompletedGroups<'a> {
    group_completed(
      store.tasks(),
      &self.search,
      &self.tag_filter,
      ctx
    )
  }

  pub fn toggle_group(
    &mut self,
    bucket: CompletedBucket
  ) {
    self.expanded.toggle(bucket);
  }

  pub fn cycle_progress_range(&mut self) {
    self.progress_range =
      self.progress_range.cycle();
  }

  pub fn progress(
    &self,
    store: &TaskStore,
    ctx: &TimeContext
  ) -> ProgressStats {
    progress_stats(
      store.tasks(),
      self.progress_range,
      ctx
    )
  }

  pub fn trend(
    &self,
    store: &TaskStore,
    ctx: &TimeContext
  ) -> Vec<TrendPoint> {
    trend_series(
      store.tasks(),
      self.chart_window,
      ctx
    )
  }

  pub fn toggle_calendar_mode(&mut self) {
    self.calendar_mode =
      match self.calendar_mode {
        | CalendarMode::Created => {
          CalendarMode::Due
        }
        | CalendarMode::Due => {
          CalendarMode::Created
        }
      };
  }

  pub fn shift_month(&mut self, months: i32) {
    self.month = self.month.shift(months);
  }

  pub fn return_to_today(
    &mut self,
    ctx: &TimeContext
  ) {
    self.month = MonthCursor::today(ctx);
  }

  /// Tasks of the displayed month keyed by day.
  pub fn calendar<'a>(
    &self,
    store: &'a TaskStore,
    ctx: &TimeContext
  ) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut days = group_by_day(
      store.tasks(),
      self.calendar_mode,
      ctx
    );
    days.retain(|day, _| {
      self.month.contains(*day)
    });
    days
  }

  /// Creates from the draft; a successful create clears it.
  pub fn submit_draft(
    &mut self,
    store: &mut TaskStore,
    ctx: &TimeContext
  ) -> anyhow::Result<Vec<TaskId>> {
    let ids = store
      .create(self.draft.to_new_task(), ctx)?;
    if !ids.is_empty() {
      self.draft = TaskDraft::default();
    }
    Ok(ids)
  }

  pub fn delete_task(
    &mut self,
    store: &mut TaskStore,
    id: &TaskId,
    confirm: &mut dyn Confirm,
    ctx: &TimeContext
  ) -> anyhow::Result<bool> {
    let Some(task) = store.get(id) else {
      return Ok(false);
    };
    if !confirm.confirm(&format!(
      "Delete \"{}\"?",
      task.text
    )) {
      debug!(%id, "delete not confirmed");
      return Ok(false);
    }
    let deleted = store.delete(id, ctx)?;
    let total = self.total_pages(store);
    self.pager.clamp(total);
    Ok(deleted)
  }

  pub fn undo(
    &mut self,
    store: &mut TaskStore,
    ctx: &TimeContext
  ) -> anyhow::Result<Option<TaskId>> {
    store.undo_delete(ctx)
  }

  /// Removes a catalog label everywhere: tasks, the active filter and the
  /// draft.
  pub fn delete_custom_tag(
    &mut self,
    store: &mut TaskStore,
    label: &str,
    confirm: &mut dyn Confirm
  ) -> anyhow::Result<bool> {
    if !store.catalog().contains(label)
      || !confirm.confirm(&format!(
        "Delete tag \"{label}\"?"
      ))
    {
      return Ok(false);
    }
    store.remove_custom_tag(label)?;
    let tag = Tag::Custom(label.to_string());
    self.tag_filter.remove_tag(&tag);
    self.draft.tags.remove(&tag);
    Ok(true)
  }

  pub fn press(
    &mut self,
    id: &TaskId,
    target: PressTarget,
    ctx: &TimeContext
  ) {
    let gate = DragGate {
      view: self.view,
      tab: self.tab,
      target
    };
    self.drag =
      self.drag.press(id, ctx.now(), gate);
  }

  /// Pointer moved, possibly over another card.
  pub fn pointer_move(
    &mut self,
    store: &mut TaskStore,
    over: Option<&TaskId>
  ) -> anyhow::Result<bool> {
    let (next, effect) = self.drag.hover(over);
    self.drag = next;
    match effect {
      | Some(DragEffect::Swap {
        source,
        target
      }) => store.reorder(&source, &target),
      | _ => Ok(false)
    }
  }

  pub fn release(&mut self) {
    self.drag = self.drag.release();
  }

  /// Timer housekeeping: auto tags, undo expiry, copy feedback and
  /// long-press promotion.
  pub fn tick(
    &mut self,
    store: &mut TaskStore,
    haptics: &mut dyn Haptics,
    ctx: &TimeContext
  ) -> anyhow::Result<()> {
    let refreshed =
      store.refresh_auto_tags(ctx)?;
    if refreshed > 0 {
      debug!(
        refreshed,
        "auto tags moved with the clock"
      );
    }
    store.expire_undo(ctx);
    if self
      .copy_feedback_until
      .is_some_and(|until| ctx.now() >= until)
    {
      self.copy_feedback_until = None;
    }
    let (next, effect) =
      self.drag.tick(ctx.now());
    self.drag = next;
    if let Some(DragEffect::Started(id)) =
      effect
    {
      debug!(%id, "drag started");
      haptics.pulse();
    }
    Ok(())
  }

  pub fn copy_log(
    &mut self,
    store: &TaskStore,
    clipboard: &mut dyn Clipboard,
    ctx: &TimeContext
  ) -> bool {
    let log = text_log(store.tasks(), ctx);
    match clipboard.write_text(&log) {
      | Ok(()) => {
        self.copy_feedback_until = Some(
          ctx.now()
            + Duration::milliseconds(
              COPY_FEEDBACK_MS
            )
        );
        true
      }
      | Err(err) => {
        warn!(error = %err, "failed to copy log to clipboard");
        false
      }
    }
  }

  pub fn copy_feedback_visible(
    &self,
    ctx: &TimeContext
  ) -> bool {
    self
      .copy_feedback_until
      .is_some_and(|until| ctx.now() < until)
  }
}

#[cfg(test)]
mod tests {
  use anyhow::anyhow;
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::Session;
  use crate::datetime::TimeContext;
  use crate::filter::{
    FilterKey,
    StatusTab,
    TagFilter
  };
  use crate::paging::SlideDirection;
  use crate::platform::{
    AlwaysConfirm,
    Clipboard,
    Confirm,
    Haptics,
    NoHaptics
  };
  use crate::reorder::PressTarget;
  use crate::store::{
    NewTask,
    TaskStore
  };
  use crate::tag::Tag;
  use crate::task::TaskId;
  use crate::views::{
    CompletedBucket,
    ProgressRange
  };

  fn ctx() -> TimeContext {
    let now = Utc
      .with_ymd_and_hms(
        2026, 9, 1, 10, 0, 0
      )
      .single()
      .expect("valid now");
    TimeContext::new(now, chrono_tz::UTC)
  }

  fn seeded(
    count: usize,
    ctx: &TimeContext
  ) -> TaskStore {
    let mut store =
      TaskStore::in_memory(ctx)
        .expect("store");
    for i in 0..count {
      store
        .create(
          NewTask {
            text: format!("task {i}"),
            ..NewTask::default()
          },
          ctx
        )
        .expect("create");
    }
    store
  }

  struct Decline;

  impl Confirm for Decline {
    fn confirm(
      &mut self,
      _prompt: &str
    ) -> bool {
      false
    }
  }

  #[derive(Default)]
  struct CountingHaptics(usize);

  impl Haptics for CountingHaptics {
    fn pulse(&mut self) {
      self.0 += 1;
    }
  }

  #[derive(Default)]
  struct RecordingClipboard {
    text: Option<String>,
    fail: bool
  }

  impl Clipboard for RecordingClipboard {
    fn write_text(
      &mut self,
      text: &str
    ) -> anyhow::Result<()> {
      if self.fail {
        return Err(anyhow!(
          "clipboard unavailable"
        ));
      }
      self.text = Some(text.to_string());
      Ok(())
    }
  }

  #[test]
  fn filter_changes_reset_the_page() {
    let ctx = ctx();
    let store = seeded(15, &ctx);
    let mut session = Session::new(&ctx);
    assert_eq!(session.total_pages(&store), 3);
    assert!(session.next_page(&store));
    assert!(session.next_page(&store));
    assert_eq!(session.page(&store).len(), 1);

    session.set_search("task");
    assert_eq!(session.pager().current(), 1);

    session.next_page(&store);
    session
      .toggle_tag_filter(FilterKey::Untagged);
    assert_eq!(session.pager().current(), 1);

    session.next_page(&store);
    session.set_tab(StatusTab::Completed);
    assert_eq!(session.pager().current(), 1);
    assert!(session.page(&store).is_empty());
  }

  #[test]
  fn prev_page_stops_at_the_first_page() {
    let ctx = ctx();
    let store = seeded(8, &ctx);
    let mut session = Session::new(&ctx);
    assert!(!session.prev_page());
    assert_eq!(session.pager().current(), 1);

    assert!(session.next_page(&store));
    assert!(!session.next_page(&store));
    assert!(session.prev_page());
    assert_eq!(session.pager().current(), 1);
    assert_eq!(session.page(&store).len(), 7);
  }

  #[test]
  fn group_and_range_toggles() {
    let ctx = ctx();
    let mut session = Session::new(&ctx);
    assert!(
      !session
        .expanded
        .is_expanded(CompletedBucket::Today)
    );
    session
      .toggle_group(CompletedBucket::Today);
    assert!(
      session
        .expanded
        .is_expanded(CompletedBucket::Today)
    );
    assert!(
      !session
        .expanded
        .is_expanded(CompletedBucket::Earlier)
    );
    session
      .toggle_group(CompletedBucket::Today);
    assert!(
      !session
        .expanded
        .is_expanded(CompletedBucket::Today)
    );

    assert_eq!(
      session.progress_range,
      ProgressRange::All
    );
    session.cycle_progress_range();
    assert_eq!(
      session.progress_range,
      ProgressRange::LastMonth
    );
    for _ in 0..3 {
      session.cycle_progress_range();
    }
    assert_eq!(
      session.progress_range,
      ProgressRange::All
    );
  }

  #[test]
  fn page_clamps_after_the_list_shrinks() {
    let ctx = ctx();
    let mut store = seeded(8, &ctx);
    let mut session = Session::new(&ctx);
    session.next_page(&store);
    let last =
      session.page(&store)[0].id.clone();
    assert!(
      session
        .delete_task(
          &mut store,
          &last,
          &mut AlwaysConfirm,
          &ctx
        )
        .expect("delete")
    );
    assert_eq!(session.pager().current(), 1);
    assert_eq!(session.page(&store).len(), 7);
  }

  #[test]
  fn declined_confirmation_keeps_the_task() {
    let ctx = ctx();
    let mut store = seeded(1, &ctx);
    let mut session = Session::new(&ctx);
    let id = store.tasks()[0].id.clone();
    assert!(
      !session
        .delete_task(
          &mut store,
          &id,
          &mut Decline,
          &ctx
        )
        .expect("delete")
    );
    assert_eq!(store.tasks().len(), 1);

    assert!(
      session
        .delete_task(
          &mut store,
          &id,
          &mut AlwaysConfirm,
          &ctx
        )
        .expect("delete")
    );
    assert_eq!(
      session
        .undo(&mut store, &ctx)
        .expect("undo"),
      Some(id)
    );
  }

  #[test]
  fn long_press_drag_pulses_and_reorders() {
    let ctx = ctx();
    let mut store = seeded(2, &ctx);
    let mut session = Session::new(&ctx);
    let mut haptics =
      CountingHaptics::default();
    let first = store.tasks()[0].id.clone();
    let second = store.tasks()[1].id.clone();
    let first_order =
      store.tasks()[0].custom_order;

    session.press(
      &first,
      PressTarget::Card,
      &ctx
    );
    session
      .tick(
        &mut store,
        &mut haptics,
        &ctx.advanced(Duration::milliseconds(
          250
        ))
      )
      .expect("tick");
    assert_eq!(haptics.0, 1);
    assert!(session.drag().scroll_locked());

    assert_eq!(
      session.swipe(300.0, 0.0, &store),
      None
    );
    assert!(
      session
        .pointer_move(
          &mut store,
          Some(&second)
        )
        .expect("move")
    );
    assert_eq!(
      store
        .get(&second)
        .expect("task")
        .custom_order,
      first_order
    );

    session.release();
    assert!(!session.drag().scroll_locked());
  }

  #[test]
  fn presses_on_controls_never_drag() {
    let ctx = ctx();
    let mut store = seeded(2, &ctx);
    let mut session = Session::new(&ctx);
    let first = store.tasks()[0].id.clone();
    session.press(
      &first,
      PressTarget::Control,
      &ctx
    );
    session
      .tick(
        &mut store,
        &mut NoHaptics,
        &ctx.advanced(Duration::seconds(1))
      )
      .expect("tick");
    assert!(!session.drag().scroll_locked());
  }

  #[test]
  fn tick_marks_tasks_drifting_into_the_due_window()
  {
    let ctx = ctx();
    let mut store = seeded(1, &ctx);
    let mut session = Session::new(&ctx);
    let id = store.tasks()[0].id.clone();
    store
      .set_due_date(
        &id,
        Some(ctx.today() + Duration::days(5)),
        &ctx
      )
      .expect("due");
    assert!(
      !store
        .get(&id)
        .expect("task")
        .has_tag(&Tag::Urgent)
    );

    session
      .tick(
        &mut store,
        &mut NoHaptics,
        &ctx.advanced(Duration::days(4))
      )
      .expect("tick");
    assert!(
      store
        .get(&id)
        .expect("task")
        .has_tag(&Tag::Urgent)
    );
  }

  #[test]
  fn deleting_a_catalog_tag_clears_filter_and_draft()
  {
    let ctx = ctx();
    let mut store = seeded(0, &ctx);
    let mut session = Session::new(&ctx);
    let work = Tag::Custom("work".to_string());
    session.toggle_tag_filter(FilterKey::Tag(
      work.clone()
    ));
    session.draft.toggle_tag(work.clone());

    assert!(
      !session
        .delete_custom_tag(
          &mut store,
          "work",
          &mut Decline
        )
        .expect("decline")
    );
    assert!(session.draft.tags.contains(&work));

    assert!(
      session
        .delete_custom_tag(
          &mut store,
          "work",
          &mut AlwaysConfirm
        )
        .expect("delete")
    );
    assert_eq!(
      session.tag_filter(),
      &TagFilter::All
    );
    assert!(
      !session.draft.tags.contains(&work)
    );
    assert!(!store.catalog().contains("work"));
  }

  #[test]
  fn submitting_the_draft_clears_it() {
    let ctx = ctx();
    let mut store = seeded(0, &ctx);
    let mut session = Session::new(&ctx);
    session.draft.text = "   ".to_string();
    assert!(
      session
        .submit_draft(&mut store, &ctx)
        .expect("submit")
        .is_empty()
    );
    assert_eq!(session.draft.text, "   ");

    session.draft.text =
      "Call mom".to_string();
    session.draft.toggle_tag(Tag::Important);
    assert!(
      session.draft.add_subtask("find number")
    );
    let ids: Vec<TaskId> = session
      .submit_draft(&mut store, &ctx)
      .expect("submit");
    assert_eq!(ids.len(), 1);
    assert!(session.draft.text.is_empty());
    assert_eq!(
      store
        .get(&ids[0])
        .expect("task")
        .subtask_progress(),
      Some((0, 1))
    );
  }

  #[test]
  fn copy_feedback_lasts_two_seconds() {
    let ctx = ctx();
    let mut store = seeded(1, &ctx);
    let mut session = Session::new(&ctx);
    let mut clipboard =
      RecordingClipboard::default();
    assert!(session.copy_log(
      &store,
      &mut clipboard,
      &ctx
    ));
    assert!(
      clipboard.text.as_deref().is_some_and(
        |t| t.starts_with("[Todo] task 0")
      )
    );
    assert!(session.copy_feedback_visible(
      &ctx.advanced(Duration::milliseconds(
        1999
      ))
    ));

    let later =
      ctx.advanced(Duration::seconds(2));
    session
      .tick(&mut store, &mut NoHaptics, &later)
      .expect("tick");
    assert!(
      !session.copy_feedback_visible(&later)
    );

    let mut broken = RecordingClipboard {
      fail: true,
      ..RecordingClipboard::default()
    };
    assert!(!session.copy_log(
      &store,
      &mut broken,
      &ctx
    ));
    assert!(
      !session.copy_feedback_visible(&ctx)
    );
  }

  #[test]
  fn calendar_shows_only_the_displayed_month()
  {
    let ctx = ctx();
    let store = seeded(3, &ctx);
    let mut session = Session::new(&ctx);
    assert_eq!(
      session
        .calendar(&store, &ctx)
        .values()
        .map(Vec::len)
        .sum::<usize>(),
      3
    );
    session.shift_month(-1);
    assert!(
      session.calendar(&store, &ctx).is_empty()
    );
    session.return_to_today(&ctx);
    session.toggle_calendar_mode();
    assert!(
      session.calendar(&store, &ctx).is_empty()
    );
  }

  #[test]
  fn swipe_flips_pages_when_not_dragging() {
    let ctx = ctx();
    let store = seeded(10, &ctx);
    let mut session = Session::new(&ctx);
    assert_eq!(
      session.swipe(300.0, 100.0, &store),
      Some(SlideDirection::Next)
    );
    assert_eq!(session.pager().current(), 2);
  }
}
