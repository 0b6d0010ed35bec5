//! Read-only views recomputed from the task collection on every call.

pub mod calendar;
pub mod completed;
pub mod log;
pub mod stats;

pub use calendar::{
  CalendarMode,
  MonthCursor,
  group_by_day
};
pub use completed::{
  CompletedBucket,
  CompletedGroups,
  ExpandedGroups,
  group_completed
};
pub use log::text_log;
pub use stats::{
  ChartWindow,
  ProgressRange,
  ProgressStats,
  TrendPoint,
  progress_stats,
  trend_series
};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum ViewMode {
  #[default]
  List,
  Timeline,
  Log,
  Stats
}
