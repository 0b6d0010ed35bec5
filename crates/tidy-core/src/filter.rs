use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::priority::sort_for_display;
use crate::tag::Tag;
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StatusTab {
  #[default]
  Active,
  Completed
}

/// One entry of the tag filter menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
  Untagged,
  Tag(Tag)
}

/// Active tag filters. `Untagged` is exclusive with every tag selection.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum TagFilter {
  #[default]
  All,
  Untagged,
  AnyOf(Vec<Tag>)
}

impl TagFilter {
  pub fn toggle(&mut self, key: FilterKey) {
    let next =
      match (std::mem::take(self), key) {
        | (
          TagFilter::Untagged,
          FilterKey::Untagged
        ) => TagFilter::All,
        | (_, FilterKey::Untagged) => {
          TagFilter::Untagged
        }
        | (
          TagFilter::AnyOf(mut tags),
          FilterKey::Tag(tag)
        ) => {
          if tags.contains(&tag) {
            tags.retain(|t| *t != tag);
          } else {
            tags.push(tag);
          }
          TagFilter::from_tags(tags)
        }
        | (
          TagFilter::All | TagFilter::Untagged,
          FilterKey::Tag(tag)
        ) => TagFilter::AnyOf(vec![tag])
      };
    *self = next;
  }

  /// Drops a tag from the selection, e.g. after it left the catalog.
  pub fn remove_tag(&mut self, tag: &Tag) {
    if let TagFilter::AnyOf(tags) = self {
      tags.retain(|t| t != tag);
      if tags.is_empty() {
        *self = TagFilter::All;
      }
    }
  }

  pub fn is_selected(
    &self,
    key: &FilterKey
  ) -> bool {
    match (self, key) {
      | (
        TagFilter::Untagged,
        FilterKey::Untagged
      ) => true,
      | (
        TagFilter::AnyOf(tags),
        FilterKey::Tag(tag)
      ) => tags.contains(tag),
      | _ => false
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, TagFilter::All)
  }

  pub fn matches(&self, task: &Task) -> bool {
    match self {
      | TagFilter::All => true,
      | TagFilter::Untagged => {
        task.tags.is_empty()
      }
      | TagFilter::AnyOf(tags) => {
        tags.iter().any(|tag| task.has_tag(tag))
      }
    }
  }

  fn from_tags(tags: Vec<Tag>) -> Self {
    if tags.is_empty() {
      TagFilter::All
    } else {
      TagFilter::AnyOf(tags)
    }
  }
}

/// Case-insensitive substring match; only the empty query matches
/// everything. Whitespace is searched for like any other text.
pub fn matches_search(
  task: &Task,
  query: &str
) -> bool {
  query.is_empty()
    || task
      .text
      .to_lowercase()
      .contains(&query.to_lowercase())
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ListQuery {
  pub tab:    StatusTab,
  pub search: String,
  pub tags:   TagFilter
}

impl ListQuery {
  pub fn matches(&self, task: &Task) -> bool {
    let ok = match self.tab {
      | StatusTab::Active => !task.completed,
      | StatusTab::Completed => task.completed
    } && matches_search(task, &self.search)
      && self.tags.matches(task);
    trace!(id = %task.id, ok, "list filter evaluation");
    ok
  }
}

/// The primary list: open tasks passing search and tag filters, in display
/// order. The completed tab is served by the completed buckets instead.
#[tracing::instrument(
  skip(tasks, query),
  fields(tab = ?query.tab)
)]
pub fn active_list<'a>(
  tasks: &'a [Task],
  query: &ListQuery
) -> Vec<&'a Task> {
  if query.tab == StatusTab::Completed {
    return vec![];
  }
  let mut out: Vec<&Task> = tasks
    .iter()
    .filter(|task| query.matches(task))
    .collect();
  sort_for_display(&mut out);
  out
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    FilterKey,
    ListQuery,
    StatusTab,
    TagFilter,
    active_list,
    matches_search
  };
  use crate::tag::Tag;
  use crate::task::Task;

  fn task(text: &str, tags: &[Tag]) -> Task {
    let now = Utc
      .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
      .single()
      .expect("valid now");
    let mut task = Task::new(text, now, 0);
    task.tags = tags.iter().cloned().collect();
    task
  }

  fn work() -> Tag {
    Tag::Custom("work".to_string())
  }

  #[test]
  fn untagged_sentinel_is_exclusive() {
    let mut filter = TagFilter::All;
    filter.toggle(FilterKey::Tag(work()));
    filter.toggle(FilterKey::Tag(Tag::Urgent));
    assert_eq!(
      filter,
      TagFilter::AnyOf(vec![work(), Tag::Urgent])
    );

    filter.toggle(FilterKey::Untagged);
    assert_eq!(filter, TagFilter::Untagged);

    filter.toggle(FilterKey::Tag(Tag::Urgent));
    assert_eq!(
      filter,
      TagFilter::AnyOf(vec![Tag::Urgent])
    );

    filter.toggle(FilterKey::Tag(Tag::Urgent));
    assert_eq!(filter, TagFilter::All);

    filter.toggle(FilterKey::Untagged);
    filter.toggle(FilterKey::Untagged);
    assert_eq!(filter, TagFilter::All);
  }

  #[test]
  fn tag_filters_combine_with_or() {
    let filter =
      TagFilter::AnyOf(vec![work(), Tag::Important]);
    assert!(filter.matches(&task("a", &[work()])));
    assert!(filter.matches(&task(
      "b",
      &[Tag::Important, Tag::Urgent]
    )));
    assert!(
      !filter.matches(&task("c", &[Tag::Urgent]))
    );
    assert!(!filter.matches(&task("d", &[])));
    assert!(
      TagFilter::Untagged.matches(&task("d", &[]))
    );
    assert!(
      !TagFilter::Untagged
        .matches(&task("a", &[work()]))
    );
  }

  #[test]
  fn removing_last_selected_tag_clears_filter() {
    let mut filter = TagFilter::AnyOf(vec![work()]);
    filter.remove_tag(&work());
    assert_eq!(filter, TagFilter::All);

    let mut untagged = TagFilter::Untagged;
    untagged.remove_tag(&work());
    assert_eq!(untagged, TagFilter::Untagged);
  }

  #[test]
  fn search_is_case_insensitive() {
    let t = task("Buy Milk at the Market", &[]);
    assert!(matches_search(&t, "milk"));
    assert!(matches_search(&t, ""));
    assert!(!matches_search(&t, "bread"));
  }

  #[test]
  fn whitespace_query_is_searched_literally() {
    let single = task("buy milk", &[]);
    let double = task("a  b", &[]);
    assert!(!matches_search(&single, "  "));
    assert!(matches_search(&double, "  "));
    assert!(matches_search(&single, " "));
  }

  #[test]
  fn pipeline_excludes_completed_and_sorts() {
    let now = Utc
      .with_ymd_and_hms(2026, 1, 2, 0, 0, 0)
      .single()
      .expect("valid now");
    let mut done =
      task("done milk", &[Tag::Urgent]);
    done.set_completed(true, now);
    let mut low = task("milk low", &[]);
    low.custom_order = 10;
    let mut high =
      task("milk high", &[Tag::Important]);
    high.custom_order = 1;
    let tasks =
      vec![done, low, high, task("bread", &[])];

    let query = ListQuery {
      search: "MILK".to_string(),
      ..ListQuery::default()
    };
    let texts: Vec<&str> =
      active_list(&tasks, &query)
        .iter()
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(texts, ["milk high", "milk low"]);

    let completed = ListQuery {
      tab: StatusTab::Completed,
      ..ListQuery::default()
    };
    assert!(
      active_list(&tasks, &completed).is_empty()
    );
  }
}
