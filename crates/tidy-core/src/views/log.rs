use crate::datetime::TimeContext;
use crate::task::Task;

const EMPTY_LOG: &str = "No data";

fn log_line(
  task: &Task,
  ctx: &TimeContext
) -> String {
  let status =
    if task.completed { "[Done]" } else { "[Todo]" };

  let mut times = format!(
    "Created: {}",
    ctx.format_local(task.created_at, "%Y-%m-%d")
  );
  if task.completed
    && let Some(at) = task.completed_at
  {
    times.push_str(&format!(
      " | Completed: {}",
      ctx.format_local(at, "%Y-%m-%d %H:%M:%S")
    ));
  }
  if let Some(due) = task.due_date {
    times.push_str(&format!(
      " | Due: {}",
      due.format("%Y-%m-%d")
    ));
  }

  let tags = if task.tags.is_empty() {
    String::new()
  } else {
    let names: Vec<String> = task
      .tags
      .iter()
      .map(|tag| tag.plain_label())
      .collect();
    format!(" [{}]", names.join(","))
  };

  let mut line = format!(
    "{status} {}{tags} ({times})",
    task.text
  );
  if !task.subtasks.is_empty() {
    let items: Vec<String> = task
      .subtasks
      .iter()
      .map(|st| {
        format!(
          "{} {}",
          if st.completed { "[x]" } else { "[ ]" },
          st.text
        )
      })
      .collect();
    line.push_str("\n   └ Subtasks: ");
    line.push_str(&items.join("; "));
  }
  line
}

/// Plain-text dump of every task in storage order, suitable for pasting.
pub fn text_log(
  tasks: &[Task],
  ctx: &TimeContext
) -> String {
  if tasks.is_empty() {
    return EMPTY_LOG.to_string();
  }
  tasks
    .iter()
    .map(|task| log_line(task, ctx))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::text_log;
  use crate::datetime::TimeContext;
  use crate::tag::Tag;
  use crate::task::{
    Subtask,
    Task
  };

  #[test]
  fn empty_collection_has_placeholder() {
    let now = Utc
      .with_ymd_and_hms(2026, 2, 1, 0, 0, 0)
      .single()
      .expect("valid now");
    assert_eq!(
      text_log(
        &[],
        &TimeContext::new(now, chrono_tz::UTC)
      ),
      "No data"
    );
  }

  #[test]
  fn lines_carry_status_tags_times_and_subtasks()
  {
    let created = Utc
      .with_ymd_and_hms(2026, 2, 1, 9, 0, 0)
      .single()
      .expect("valid time");
    let ctx = TimeContext::new(
      created + Duration::days(1),
      chrono_tz::UTC
    );

    let mut done =
      Task::new("Ship release", created, 0);
    done.tags.insert(Tag::Urgent);
    done
      .tags
      .insert(Tag::Custom("work".to_string()));
    done.set_completed(
      true,
      created + Duration::hours(5)
    );
    let mut todo =
      Task::new("Plan trip", created, 0);
    todo.due_date =
      NaiveDate::from_ymd_opt(2026, 2, 3);
    todo.tags.insert(Tag::LimitedTime);
    let mut packed = Subtask::new("pack");
    packed.completed = true;
    todo.subtasks =
      vec![packed, Subtask::new("book hotel")];

    let log = text_log(&[done, todo], &ctx);
    let expected = "[Done] Ship release \
                    [Urgent,work] (Created: \
                    2026-02-01 | Completed: \
                    2026-02-01 14:00:00)\n[Todo] \
                    Plan trip [limited_time] \
                    (Created: 2026-02-01 | Due: \
                    2026-02-03)\n   └ Subtasks: \
                    [x] pack; [ ] book hotel";
    assert_eq!(log, expected);
  }
}
