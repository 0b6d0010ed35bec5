use chrono::{
  DateTime,
  Duration,
  Utc
};

use crate::datetime::TimeContext;
use crate::filter::{
  TagFilter,
  matches_search
};
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub enum CompletedBucket {
  Today,
  LastThreeDays,
  LastWeek,
  LastMonth,
  Earlier
}

impl CompletedBucket {
  pub const ALL: [CompletedBucket; 5] = [
    CompletedBucket::Today,
    CompletedBucket::LastThreeDays,
    CompletedBucket::LastWeek,
    CompletedBucket::LastMonth,
    CompletedBucket::Earlier,
  ];

  pub fn label(self) -> &'static str {
    match self {
      | CompletedBucket::Today => "Today",
      | CompletedBucket::LastThreeDays => {
        "Last 3 days"
      }
      | CompletedBucket::LastWeek => {
        "Last week"
      }
      | CompletedBucket::LastMonth => {
        "Last month"
      }
      | CompletedBucket::Earlier => "Earlier"
    }
  }

  pub fn classify(
    at: DateTime<Utc>,
    ctx: &TimeContext
  ) -> Self {
    if at >= ctx.start_of_day(ctx.today()) {
      return CompletedBucket::Today;
    }
    let age = ctx.now() - at;
    if age <= Duration::days(3) {
      CompletedBucket::LastThreeDays
    } else if age <= Duration::days(7) {
      CompletedBucket::LastWeek
    } else if age <= Duration::days(30) {
      CompletedBucket::LastMonth
    } else {
      CompletedBucket::Earlier
    }
  }

  fn index(self) -> usize {
    self as usize
  }
}

/// Completed tasks split into the five buckets, newest first in each.
#[derive(Debug, Default)]
pub struct CompletedGroups<'a> {
  buckets: [Vec<&'a Task>; 5]
}

impl<'a> CompletedGroups<'a> {
  pub fn get(
    &self,
    bucket: CompletedBucket
  ) -> &[&'a Task] {
    &self.buckets[bucket.index()]
  }

  /// Non-empty buckets in display order.
  pub fn iter(
    &self
  ) -> impl Iterator<
    Item = (CompletedBucket, &[&'a Task])
  > + '_ {
    CompletedBucket::ALL
      .into_iter()
      .map(|bucket| (bucket, self.get(bucket)))
      .filter(|(_, tasks)| !tasks.is_empty())
  }

  pub fn total(&self) -> usize {
    self.buckets.iter().map(Vec::len).sum()
  }
}

#[tracing::instrument(skip(
  tasks, tags, ctx
))]
pub fn group_completed<'a>(
  tasks: &'a [Task],
  search: &str,
  tags: &TagFilter,
  ctx: &TimeContext
) -> CompletedGroups<'a> {
  let mut completed: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      task.completed
        && matches_search(task, search)
        && tags.matches(task)
    })
    .collect();
  completed.sort_by_key(|task| {
    std::cmp::Reverse(task.finished_or_created())
  });

  let mut groups = CompletedGroups::default();
  for task in completed {
    let bucket = CompletedBucket::classify(
      task.finished_or_created(),
      ctx
    );
    groups.buckets[bucket.index()].push(task);
  }
  groups
}

/// Which buckets are unfolded; all start collapsed.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct ExpandedGroups([bool; 5]);

impl ExpandedGroups {
  pub fn toggle(
    &mut self,
    bucket: CompletedBucket
  ) {
    self.0[bucket.index()] =
      !self.0[bucket.index()];
  }

  pub fn is_expanded(
    &self,
    bucket: CompletedBucket
  ) -> bool {
    self.0[bucket.index()]
  }
}
