use chrono::{
  Datelike,
  Duration,
  NaiveDate
};

use crate::datetime::TimeContext;
use crate::task::Task;

/// Time window of the completion progress bar. Cycles in declaration order.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum ProgressRange {
  #[default]
  All,
  LastMonth,
  LastWeek,
  LastThreeDays
}

impl ProgressRange {
  #[must_use]
  pub fn cycle(self) -> Self {
    match self {
      | ProgressRange::All => {
        ProgressRange::LastMonth
      }
      | ProgressRange::LastMonth => {
        ProgressRange::LastWeek
      }
      | ProgressRange::LastWeek => {
        ProgressRange::LastThreeDays
      }
      | ProgressRange::LastThreeDays => {
        ProgressRange::All
      }
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | ProgressRange::All => "All time",
      | ProgressRange::LastMonth => {
        "Last month"
      }
      | ProgressRange::LastWeek => "Last week",
      | ProgressRange::LastThreeDays => {
        "Last 3 days"
      }
    }
  }

  fn max_age_days(self) -> Option<i64> {
    match self {
      | ProgressRange::All => None,
      | ProgressRange::LastMonth => Some(30),
      | ProgressRange::LastWeek => Some(7),
      | ProgressRange::LastThreeDays => Some(3)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStats {
  pub total:     usize,
  pub completed: usize,
  /// Whole percent, rounded half away from zero.
  pub rate:      u8
}

/// Age in started days: anything under a day old counts as one.
fn age_days(
  task: &Task,
  ctx: &TimeContext
) -> i64 {
  let millis = (ctx.now() - task.created_at)
    .num_milliseconds()
    .abs();
  let day = Duration::days(1).num_milliseconds();
  (millis + day - 1) / day
}

pub fn progress_stats(
  tasks: &[Task],
  range: ProgressRange,
  ctx: &TimeContext
) -> ProgressStats {
  let in_range: Vec<&Task> =
    match range.max_age_days() {
      | None => tasks.iter().collect(),
      | Some(limit) => {
        tasks
          .iter()
          .filter(|task| {
            age_days(task, ctx) <= limit
          })
          .collect()
      }
    };
  let total = in_range.len();
  let completed = in_range
    .iter()
    .filter(|task| task.completed)
    .count();
  let rate = if total == 0 {
    0
  } else {
    ((completed as f64 / total as f64) * 100.0)
      .round() as u8
  };
  ProgressStats {
    total,
    completed,
    rate
  }
}

/// Day span of the trend chart.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum ChartWindow {
  #[default]
  Week,
  Month,
  Hundred
}

impl ChartWindow {
  pub const ALL: [ChartWindow; 3] = [
    ChartWindow::Week,
    ChartWindow::Month,
    ChartWindow::Hundred,
  ];

  pub fn days(self) -> i64 {
    match self {
      | ChartWindow::Week => 7,
      | ChartWindow::Month => 30,
      | ChartWindow::Hundred => 100
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPoint {
  pub date:      NaiveDate,
  pub created:   usize,
  pub completed: usize
}

impl TrendPoint {
  /// Axis label, `month/day` without padding.
  pub fn label(&self) -> String {
    format!(
      "{}/{}",
      self.date.month(),
      self.date.day()
    )
  }

  fn is_empty(&self) -> bool {
    self.created == 0 && self.completed == 0
  }
}

/// Per-day created/completed counts over the window ending today. Leading
/// empty days are dropped; an entirely empty window yields only today.
#[tracing::instrument(skip(tasks, ctx))]
pub fn trend_series(
  tasks: &[Task],
  window: ChartWindow,
  ctx: &TimeContext
) -> Vec<TrendPoint> {
  let today = ctx.today();
  let mut points: Vec<TrendPoint> =
    (0..window.days())
      .rev()
      .map(|back| {
        let date = today - Duration::days(back);
        TrendPoint {
          date,
          created: tasks
            .iter()
            .filter(|t| {
              ctx.local_date(t.created_at) == date
            })
            .count(),
          completed: tasks
            .iter()
            .filter(|t| {
              t.completed_at.is_some_and(|at| {
                ctx.local_date(at) == date
              })
            })
            .count()
        }
      })
      .collect();

  match points
    .iter()
    .position(|point| !point.is_empty())
  {
    | Some(first) => points.split_off(first),
    | None => {
      points.split_off(
        points.len().saturating_sub(1)
      )
    }
  }
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
    ChartWindow,
    ProgressRange,
    progress_stats,
    trend_series
  };
  use crate::datetime::TimeContext;
  use crate::task::Task;

  fn ctx() -> TimeContext {
    let now = Utc
      .with_ymd_and_hms(2026, 5, 10, 12, 0, 0)
      .single()
      .expect("valid now");
    TimeContext::new(now, chrono_tz::UTC)
  }

  #[test]
  fn range_cycles_through_all_four() {
    let mut range = ProgressRange::default();
    let mut seen = vec![range];
    for _ in 0..4 {
      range = range.cycle();
      seen.push(range);
    }
    assert_eq!(
      seen,
      [
        ProgressRange::All,
        ProgressRange::LastMonth,
        ProgressRange::LastWeek,
        ProgressRange::LastThreeDays,
        ProgressRange::All
      ]
    );
  }

  #[test]
  fn rate_rounds_and_range_uses_started_days() {
    let ctx = ctx();
    let mut tasks = vec![
      Task::new(
        "fresh",
        ctx.now() - Duration::hours(1),
        0
      ),
      Task::new(
        "two and a bit",
        ctx.now() - Duration::hours(50),
        0
      ),
      Task::new(
        "three and a bit",
        ctx.now() - Duration::hours(73),
        0
      ),
    ];
    tasks[0].set_completed(true, ctx.now());

    let all =
      progress_stats(&tasks, ProgressRange::All, &ctx);
    assert_eq!(
      (all.total, all.completed, all.rate),
      (3, 1, 33)
    );

    // 73 hours is a fourth started day, so it falls outside three days.
    let recent = progress_stats(
      &tasks,
      ProgressRange::LastThreeDays,
      &ctx
    );
    assert_eq!(
      (recent.total, recent.completed, recent.rate),
      (2, 1, 50)
    );

    let empty =
      progress_stats(&[], ProgressRange::LastWeek, &ctx);
    assert_eq!(empty.rate, 0);
  }

  #[test]
  fn two_of_three_rounds_up() {
    let ctx = ctx();
    let mut tasks: Vec<Task> = (0..3)
      .map(|i| {
        Task::new(&format!("t{i}"), ctx.now(), 0)
      })
      .collect();
    tasks[0].set_completed(true, ctx.now());
    tasks[1].set_completed(true, ctx.now());
    assert_eq!(
      progress_stats(&tasks, ProgressRange::All, &ctx)
        .rate,
      67
    );
  }

  #[test]
  fn trend_trims_leading_empty_days() {
    let ctx = ctx();
    let mut old = Task::new(
      "old",
      ctx.now() - Duration::days(3),
      0
    );
    old.set_completed(
      true,
      ctx.now() - Duration::days(1)
    );
    let tasks =
      vec![old, Task::new("today", ctx.now(), 0)];

    let series =
      trend_series(&tasks, ChartWindow::Week, &ctx);
    let dates: Vec<NaiveDate> =
      series.iter().map(|p| p.date).collect();
    assert_eq!(dates.len(), 4);
    assert_eq!(series[0].label(), "5/7");
    assert_eq!(
      (series[0].created, series[0].completed),
      (1, 0)
    );
    assert_eq!(
      (series[2].created, series[2].completed),
      (0, 1)
    );
    assert_eq!(series[3].label(), "5/10");
    assert_eq!(series[3].created, 1);
  }

  #[test]
  fn empty_window_keeps_only_today() {
    let ctx = ctx();
    let stale = vec![Task::new(
      "ancient",
      ctx.now() - Duration::days(200),
      0
    )];
    let series = trend_series(
      &stale,
      ChartWindow::Hundred,
      &ctx
    );
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].date, ctx.today());
    assert_eq!(
      (series[0].created, series[0].completed),
      (0, 0)
    );
  }
}
