use std::collections::BTreeMap;

use chrono::{
  Datelike,
  NaiveDate
};

use crate::datetime::TimeContext;
use crate::task::Task;

/// Which date places a task on the calendar.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum CalendarMode {
  #[default]
  Created,
  Due
}

impl CalendarMode {
  fn key(
    self,
    task: &Task,
    ctx: &TimeContext
  ) -> Option<NaiveDate> {
    match self {
      | CalendarMode::Created => {
        Some(ctx.local_date(task.created_at))
      }
      | CalendarMode::Due => task.due_date
    }
  }
}

/// Tasks keyed by local calendar day. In due mode, tasks without a due date
/// are left out.
pub fn group_by_day<'a>(
  tasks: &'a [Task],
  mode: CalendarMode,
  ctx: &TimeContext
) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
  let mut days: BTreeMap<NaiveDate, Vec<&Task>> =
    BTreeMap::new();
  for task in tasks {
    if let Some(day) = mode.key(task, ctx) {
      days.entry(day).or_default().push(task);
    }
  }
  days
}

/// The month shown by the timeline, held as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
  first: NaiveDate
}

impl MonthCursor {
  pub fn containing(date: NaiveDate) -> Self {
    Self {
      first: first_day_of_month(
        date.year(),
        date.month()
      )
    }
  }

  pub fn today(ctx: &TimeContext) -> Self {
    Self::containing(ctx.today())
  }

  pub fn year(&self) -> i32 {
    self.first.year()
  }

  pub fn month(&self) -> u32 {
    self.first.month()
  }

  #[must_use]
  pub fn shift(&self, months: i32) -> Self {
    let mut year = self.first.year();
    let mut month =
      self.first.month() as i32 + months;
    while month < 1 {
      month += 12;
      year = year.saturating_sub(1);
    }
    while month > 12 {
      month -= 12;
      year = year.saturating_add(1);
    }
    Self {
      first: first_day_of_month(
        year,
        month as u32
      )
    }
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    date.year() == self.first.year()
      && date.month() == self.first.month()
  }

  pub fn is_current(
    &self,
    ctx: &TimeContext
  ) -> bool {
    self.contains(ctx.today())
  }

  /// Every day of the month in order.
  pub fn days(&self) -> Vec<NaiveDate> {
    self
      .first
      .iter_days()
      .take_while(|day| self.contains(*day))
      .collect()
  }
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, 1)
    .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    CalendarMode,
    MonthCursor,
    group_by_day
  };
  use crate::datetime::TimeContext;
  use crate::task::Task;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn groups_by_created_or_due_day() {
    let now = Utc
      .with_ymd_and_hms(2026, 4, 2, 3, 30, 0)
      .single()
      .expect("valid now");
    let ctx = TimeContext::new(
      now,
      chrono_tz::America::New_York
    );

    let mut due = Task::new("due soon", now, 0);
    due.due_date = Some(date(2026, 4, 5));
    let undated = Task::new(
      "undated",
      now - Duration::days(2),
      0
    );
    let tasks = vec![due, undated];

    // 03:30 UTC is still the previous evening in New York.
    let created = group_by_day(
      &tasks,
      CalendarMode::Created,
      &ctx
    );
    assert_eq!(
      created.keys().copied().collect::<Vec<_>>(),
      [date(2026, 3, 30), date(2026, 4, 1)]
    );

    let by_due =
      group_by_day(&tasks, CalendarMode::Due, &ctx);
    assert_eq!(by_due.len(), 1);
    assert_eq!(
      by_due[&date(2026, 4, 5)][0].text,
      "due soon"
    );
  }

  #[test]
  fn month_cursor_wraps_years() {
    let cursor =
      MonthCursor::containing(date(2026, 1, 31));
    let back = cursor.shift(-1);
    assert_eq!(
      (back.year(), back.month()),
      (2025, 12)
    );
    let forward = cursor.shift(13);
    assert_eq!(
      (forward.year(), forward.month()),
      (2027, 2)
    );
    assert_eq!(forward.days().len(), 28);
    assert_eq!(
      MonthCursor::containing(date(2028, 2, 10))
        .days()
        .len(),
      29
    );
  }

  #[test]
  fn return_to_today_resets_cursor() {
    let now = Utc
      .with_ymd_and_hms(2026, 8, 15, 12, 0, 0)
      .single()
      .expect("valid now");
    let ctx = TimeContext::new(now, chrono_tz::UTC);
    let wandered =
      MonthCursor::today(&ctx).shift(-5);
    assert!(!wandered.is_current(&ctx));
    assert!(wandered.contains(date(2026, 3, 1)));
    assert!(
      MonthCursor::today(&ctx).is_current(&ctx)
    );
  }
}
