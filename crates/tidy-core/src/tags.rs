use chrono::{
  Duration,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::datetime::TimeContext;
use crate::tag::{
  Tag,
  TagSet
};

/// Remaining hours under which a dated task is forced urgent.
pub const DUE_SOON_HOURS: i64 = 48;

/// Adds `tag`, first removing whatever it excludes. `forgettable` excludes
/// both `urgent` and `important`; either of those excludes `forgettable`.
pub fn apply_mutual_exclusion(
  tags: &TagSet,
  tag: Tag
) -> TagSet {
  let excluded = |t: &Tag| match tag {
    | Tag::Forgettable => {
      matches!(t, Tag::Urgent | Tag::Important)
    }
    | Tag::Urgent | Tag::Important => {
      *t == Tag::Forgettable
    }
    | Tag::LimitedTime | Tag::Custom(_) => {
      false
    }
  };

  let mut out: TagSet = tags
    .iter()
    .filter(|t| !excluded(t))
    .cloned()
    .collect();
  out.insert(tag);
  out
}

/// New-task picker behaviour: a selected tag is deselected, anything else is
/// added through the exclusion rules.
pub fn toggle_draft_tag(
  tags: &TagSet,
  tag: Tag
) -> TagSet {
  if tags.contains(&tag) {
    let mut out = tags.clone();
    out.remove(&tag);
    out
  } else {
    apply_mutual_exclusion(tags, tag)
  }
}

/// Keeps `limited_time` in step with `due`, and marks tasks due within
/// [`DUE_SOON_HOURS`] as urgent unless they already carry `important` or
/// `forgettable`.
pub fn derive_auto_tags(
  tags: &TagSet,
  due: Option<NaiveDate>,
  ctx: &TimeContext
) -> TagSet {
  let mut out = tags.clone();
  let Some(due) = due else {
    out.remove(&Tag::LimitedTime);
    return out;
  };

  out.insert(Tag::LimitedTime);
  let remaining = ctx.end_of_day(due) - ctx.now();
  if remaining < Duration::hours(DUE_SOON_HOURS)
    && !out.contains(&Tag::Important)
    && !out.contains(&Tag::Forgettable)
    && out.insert(Tag::Urgent)
  {
    debug!(%due, hours = remaining.num_hours(), "due soon; forcing urgent");
  }
  out
}

pub const DEFAULT_CATALOG: [&str; 2] =
  ["work", "life"];

/// User-defined labels offered alongside the fixed tags.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TagCatalog(Vec<String>);

impl Default for TagCatalog {
  fn default() -> Self {
    Self(
      DEFAULT_CATALOG
        .iter()
        .map(ToString::to_string)
        .collect()
    )
  }
}

impl TagCatalog {
  pub fn from_labels<
    I: IntoIterator<Item = String>
  >(
    labels: I
  ) -> Self {
    let mut catalog = Self(vec![]);
    for label in labels {
      catalog.add(&label);
    }
    catalog
  }

  /// Adds a trimmed label. Blank, reserved and duplicate labels are declined.
  pub fn add(&mut self, label: &str) -> bool {
    let label = label.trim();
    if label.is_empty()
      || Tag::is_reserved(label)
      || self.contains(label)
    {
      return false;
    }
    self.0.push(label.to_string());
    true
  }

  pub fn remove(&mut self, label: &str) -> bool {
    let before = self.0.len();
    self.0.retain(|l| l != label);
    self.0.len() != before
  }

  pub fn contains(&self, label: &str) -> bool {
    self.0.iter().any(|l| l == label)
  }

  pub fn labels(&self) -> &[String] {
    &self.0
  }

  pub fn tags(
    &self
  ) -> impl Iterator<Item = Tag> + '_ {
    self
      .0
      .iter()
      .map(|label| Tag::Custom(label.clone()))
  }
}
