use std::cmp::Ordering;

use crate::tag::Tag;
use crate::task::Task;

/// 3 for urgent+important, 2 for important, 1 for urgent, 0 otherwise.
/// `forgettable` never contributes.
pub fn priority_score(task: &Task) -> u8 {
  match (
    task.has_tag(&Tag::Urgent),
    task.has_tag(&Tag::Important)
  ) {
    | (true, true) => 3,
    | (false, true) => 2,
    | (true, false) => 1,
    | (false, false) => 0
  }
}

pub fn same_band(a: &Task, b: &Task) -> bool {
  priority_score(a) == priority_score(b)
}

/// Score descending, then manual order descending.
pub fn display_order(
  a: &Task,
  b: &Task
) -> Ordering {
  priority_score(b)
    .cmp(&priority_score(a))
    .then_with(|| {
      b.custom_order.cmp(&a.custom_order)
    })
}

/// Stable: tasks equal on both keys keep their collection order.
pub fn sort_for_display(tasks: &mut [&Task]) {
  tasks.sort_by(|a, b| display_order(a, b));
}
