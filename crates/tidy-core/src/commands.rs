use std::io::{
  self,
  BufRead,
  Write
};

use anyhow::anyhow;
use tracing::{
  debug,
  info,
  instrument
};

use crate::cli::{
  Command,
  FilterArgs,
  TagsAction
};
use crate::datetime::{
  TimeContext,
  parse_due_expr
};
use crate::filter::{
  FilterKey,
  StatusTab
};
use crate::platform::{
  AlwaysConfirm,
  Confirm
};
use crate::render::Renderer;
use crate::session::Session;
use crate::store::{
  CreateMode,
  NewTask,
  TaskStore
};
use crate::tag::{
  FIXED_TAGS,
  Tag,
  TagSet
};
use crate::tags::TagCatalog;
use crate::task::TaskId;
use crate::theme::Theme;
use crate::views::{
  CalendarMode,
  text_log
};

/// Asks on stderr and reads the answer from stdin; anything but `y`/`yes`
/// declines.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
  fn confirm(&mut self, prompt: &str) -> bool {
    let mut err = io::stderr().lock();
    if write!(err, "{prompt} [y/N] ")
      .and_then(|()| err.flush())
      .is_err()
    {
      return false;
    }
    let mut answer = String::new();
    if io::stdin()
      .lock()
      .read_line(&mut answer)
      .is_err()
    {
      return false;
    }
    matches!(
      answer.trim().to_ascii_lowercase().as_str(),
      "y" | "yes"
    )
  }
}

/// `--yes` skips the prompt.
fn confirmer(yes: bool) -> Box<dyn Confirm> {
  if yes {
    Box::new(AlwaysConfirm)
  } else {
    Box::new(StdinConfirm)
  }
}

#[instrument(skip(
  store, renderer, command, ctx
))]
pub fn dispatch(
  store: &mut TaskStore,
  renderer: &mut Renderer,
  command: Command,
  ctx: &TimeContext
) -> anyhow::Result<()> {
  debug!(?command, "dispatching command");
  let mut session = Session::new(ctx);

  match command {
    | Command::List {
      filter,
      page
    } => {
      cmd_list(
        store,
        renderer,
        &mut session,
        &filter,
        page,
        ctx
      )
    }
    | Command::Completed {
      filter
    } => {
      apply_filter(
        store.catalog(),
        &mut session,
        &filter
      )?;
      session.set_tab(StatusTab::Completed);
      renderer.print_completed(
        &session.completed_groups(store, ctx),
        ctx
      )
    }
    | Command::Add {
      text,
      batch,
      tags,
      due,
      subtasks
    } => {
      let draft = NewTask {
        text: if batch {
          text.join("\n")
        } else {
          text.join(" ")
        },
        mode: if batch {
          CreateMode::Batch
        } else {
          CreateMode::Single
        },
        tags: parse_tags(store.catalog(), &tags)?,
        due_date: due
          .map(|raw| parse_due_expr(&raw, ctx))
          .transpose()?,
        subtasks
      };
      let ids = store.create(draft, ctx)?;
      if ids.is_empty() {
        println!("Nothing to add");
      }
      for id in ids {
        println!("Created task {}", short(&id));
      }
      Ok(())
    }
    | Command::Done {
      id
    } => {
      let id = resolve_id(store, &id)?;
      store.toggle_complete(&id, ctx)?;
      let done = store
        .get(&id)
        .is_some_and(|task| task.completed);
      println!(
        "{} task {}",
        if done { "Completed" } else { "Reopened" },
        short(&id)
      );
      Ok(())
    }
    | Command::Tag {
      id,
      tag,
      remove
    } => {
      let id = resolve_id(store, &id)?;
      let tag = parse_tag(store.catalog(), &tag)?;
      store.set_tag(&id, tag, !remove, ctx)?;
      if let Some(task) = store.get(&id) {
        let tags: Vec<String> = task
          .tags
          .iter()
          .map(ToString::to_string)
          .collect();
        println!(
          "Task {} tags: {}",
          short(&id),
          tags.join(" ")
        );
      }
      Ok(())
    }
    | Command::Due {
      id,
      when
    } => {
      let id = resolve_id(store, &id)?;
      let due = when
        .map(|raw| parse_due_expr(&raw, ctx))
        .transpose()?;
      store.set_due_date(&id, due, ctx)?;
      match due {
        | Some(date) => {
          println!("Task {} due {date}", short(&id))
        }
        | None => {
          println!(
            "Task {} has no due date",
            short(&id)
          )
        }
      }
      Ok(())
    }
    | Command::Edit {
      id,
      text
    } => {
      let id = resolve_id(store, &id)?;
      if !store.edit_text(&id, &text.join(" "))? {
        return Err(anyhow!(
          "task text cannot be blank"
        ));
      }
      println!("Updated task {}", short(&id));
      Ok(())
    }
    | Command::Move {
      source,
      target
    } => {
      let source = resolve_id(store, &source)?;
      let target = resolve_id(store, &target)?;
      if store.reorder(&source, &target)? {
        println!(
          "Swapped {} and {}",
          short(&source),
          short(&target)
        );
      } else {
        println!(
          "Tasks of different priority keep \
           their order"
        );
      }
      Ok(())
    }
    | Command::Rm {
      id,
      yes
    } => {
      let id = resolve_id(store, &id)?;
      let mut confirm = confirmer(yes);
      if session.delete_task(
        store,
        &id,
        confirm.as_mut(),
        ctx
      )? {
        println!("Deleted task {}", short(&id));
      }
      Ok(())
    }
    | Command::Log => {
      println!("{}", text_log(store.tasks(), ctx));
      Ok(())
    }
    | Command::Stats {
      range
    } => {
      session.progress_range = range.into();
      renderer.print_stats(
        session.progress_range,
        session.progress(store, ctx)
      )
    }
    | Command::Trend {
      window
    } => {
      session.chart_window = window.into();
      renderer.print_trend(&session.trend(store, ctx))
    }
    | Command::Calendar {
      due,
      offset
    } => {
      if due {
        session.calendar_mode = CalendarMode::Due;
      }
      session.shift_month(offset);
      let title = format!(
        "{}-{:02}",
        session.month.year(),
        session.month.month()
      );
      renderer.print_calendar(
        &title,
        &session.calendar(store, ctx)
      )
    }
    | Command::Tags {
      action
    } => cmd_tags(store, &mut session, action),
    | Command::Theme {
      choice
    } => {
      cmd_theme(store, renderer, choice.as_deref())
    }
  }
}

#[instrument(skip(
  store, renderer, session, filter, ctx
))]
fn cmd_list(
  store: &TaskStore,
  renderer: &mut Renderer,
  session: &mut Session,
  filter: &FilterArgs,
  page: usize,
  ctx: &TimeContext
) -> anyhow::Result<()> {
  apply_filter(store.catalog(), session, filter)?;
  for _ in 1..page {
    if !session.next_page(store) {
      break;
    }
  }
  let pages = session.total_pages(store);
  let items = session.page(store);
  info!(
    shown = items.len(),
    page = session.pager().current(),
    pages,
    "listing tasks"
  );
  renderer.print_task_table(
    &items,
    session.pager().current(),
    pages,
    ctx
  )
}

fn cmd_tags(
  store: &mut TaskStore,
  session: &mut Session,
  action: Option<TagsAction>
) -> anyhow::Result<()> {
  match action {
    | None => {
      for tag in &FIXED_TAGS {
        println!(
          "{} ({})",
          tag.label().unwrap_or_default(),
          tag.id()
        );
      }
      for label in store.catalog().labels() {
        let used = store
          .tasks()
          .iter()
          .filter(|task| {
            task.has_tag(&Tag::Custom(
              label.clone()
            ))
          })
          .count();
        println!("{label} ({used} tasks)");
      }
      Ok(())
    }
    | Some(TagsAction::Add {
      label
    }) => {
      if store.add_custom_tag(&label)? {
        println!("Added tag {}", label.trim());
        Ok(())
      } else {
        Err(anyhow!(
          "tag {label:?} is blank, reserved or \
           already present"
        ))
      }
    }
    | Some(TagsAction::Rm {
      label,
      yes
    }) => {
      if !store.catalog().contains(&label) {
        return Err(anyhow!(
          "unknown tag: {label}"
        ));
      }
      let mut confirm = confirmer(yes);
      if session.delete_custom_tag(
        store,
        &label,
        confirm.as_mut()
      )? {
        println!("Removed tag {label}");
      }
      Ok(())
    }
  }
}

/// Lists the palette, or persists the chosen entry.
#[instrument(skip(store, renderer))]
fn cmd_theme(
  store: &mut TaskStore,
  renderer: &mut Renderer,
  choice: Option<&str>
) -> anyhow::Result<()> {
  let Some(raw) = choice else {
    return renderer.print_palette();
  };
  let theme = resolve_theme(raw)?;
  store.set_theme(theme)?;
  renderer.set_theme(theme);
  info!(theme = theme.name(), "theme changed");
  println!("Theme set to {theme}");
  Ok(())
}

/// Palette position (as listed), name or colour.
pub fn resolve_theme(
  raw: &str
) -> anyhow::Result<Theme> {
  Theme::parse(raw).ok_or_else(|| {
    anyhow!(
      "unknown theme: {} (run `tidy theme` \
       to list the palette)",
      raw.trim()
    )
  })
}

fn apply_filter(
  catalog: &TagCatalog,
  session: &mut Session,
  filter: &FilterArgs
) -> anyhow::Result<()> {
  if let Some(search) = &filter.search {
    session.set_search(search);
  }
  if filter.untagged {
    session
      .toggle_tag_filter(FilterKey::Untagged);
  }
  for raw in &filter.tags {
    let tag = Tag::parse(raw.trim());
    if let Tag::Custom(label) = &tag
      && !catalog.contains(label)
    {
      return Err(anyhow!(
        "unknown tag: {label}"
      ));
    }
    if !session
      .tag_filter()
      .is_selected(&FilterKey::Tag(tag.clone()))
    {
      session
        .toggle_tag_filter(FilterKey::Tag(tag));
    }
  }
  Ok(())
}

/// A tag a user may set by hand: a fixed tag or a catalog label.
fn parse_tag(
  catalog: &TagCatalog,
  raw: &str
) -> anyhow::Result<Tag> {
  let tag = Tag::parse(raw.trim());
  match &tag {
    | Tag::LimitedTime => {
      Err(anyhow!(
        "limited_time follows the due date; \
         use `tidy due`"
      ))
    }
    | Tag::Custom(label)
      if !catalog.contains(label) =>
    {
      Err(anyhow!(
        "unknown tag: {label} (add it with \
         `tidy tags add {label}`)"
      ))
    }
    | _ => Ok(tag)
  }
}

/// Applies draft-picker semantics so `-t urgent -t forgettable` keeps only
/// the later one.
fn parse_tags(
  catalog: &TagCatalog,
  raw: &[String]
) -> anyhow::Result<TagSet> {
  let mut tags = TagSet::new();
  for value in raw {
    let tag = parse_tag(catalog, value)?;
    if !tags.contains(&tag) {
      tags = crate::tags::apply_mutual_exclusion(
        &tags, tag
      );
    }
  }
  Ok(tags)
}

/// Full id or an unambiguous prefix of one.
pub fn resolve_id(
  store: &TaskStore,
  raw: &str
) -> anyhow::Result<TaskId> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(anyhow!(
      "task id cannot be empty"
    ));
  }
  if let Some(task) = store
    .tasks()
    .iter()
    .find(|task| task.id.as_str() == raw)
  {
    return Ok(task.id.clone());
  }
  let mut matches =
    store.tasks().iter().filter(|task| {
      task.id.as_str().starts_with(raw)
    });
  match (matches.next(), matches.next()) {
    | (Some(task), None) => Ok(task.id.clone()),
    | (Some(_), Some(_)) => {
      Err(anyhow!(
        "id prefix {raw} matches more than one \
         task"
      ))
    }
    | (None, _) => {
      Err(anyhow!("no task matches id {raw}"))
    }
  }
}

fn short(id: &TaskId) -> String {
  id.as_str()
    .chars()
    .take(crate::render::SHORT_ID_LEN)
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    dispatch,
    parse_tag,
    parse_tags,
    resolve_id,
    resolve_theme
  };
  use crate::cli::Command;
  use crate::config::Config;
  use crate::datastore::load_state;
  use crate::datetime::TimeContext;
  use crate::render::Renderer;
  use crate::store::{
    NewTask,
    TaskStore
  };
  use crate::tag::Tag;
  use crate::tags::TagCatalog;

  fn ctx() -> TimeContext {
    let now = Utc
      .with_ymd_and_hms(2026, 4, 4, 4, 0, 0)
      .single()
      .expect("valid now");
    TimeContext::new(now, chrono_tz::UTC)
  }

  #[test]
  fn ids_resolve_by_unique_prefix() {
    let ctx = ctx();
    let mut store =
      TaskStore::in_memory(&ctx).expect("store");
    let id = store
      .create(
        NewTask {
          text: "only".to_string(),
          ..NewTask::default()
        },
        &ctx
      )
      .expect("create")
      .remove(0);

    assert_eq!(
      resolve_id(&store, &id.as_str()[..6])
        .expect("prefix"),
      id
    );
    assert_eq!(
      resolve_id(&store, id.as_str())
        .expect("full"),
      id
    );
    assert!(resolve_id(&store, "zzzz").is_err());
    assert!(resolve_id(&store, " ").is_err());
  }

  #[test]
  fn tags_must_be_fixed_or_cataloged() {
    let catalog = TagCatalog::default();
    assert_eq!(
      parse_tag(&catalog, "urgent")
        .expect("fixed"),
      Tag::Urgent
    );
    assert_eq!(
      parse_tag(&catalog, " work ")
        .expect("custom"),
      Tag::Custom("work".to_string())
    );
    assert!(
      parse_tag(&catalog, "errands").is_err()
    );
    assert!(
      parse_tag(&catalog, "limited_time")
        .is_err()
    );

    let raw = [
      "urgent".to_string(),
      "forgettable".to_string(),
      "life".to_string(),
    ];
    let tags =
      parse_tags(&catalog, &raw).expect("tags");
    assert!(tags.contains(&Tag::Forgettable));
    assert!(!tags.contains(&Tag::Urgent));
    assert_eq!(tags.len(), 2);
  }

  #[test]
  fn theme_command_persists_the_choice() {
    let ctx = ctx();
    let mut store =
      TaskStore::in_memory(&ctx).expect("store");
    let mut renderer = Renderer::new(
      &Config::default(),
      store.theme()
    );

    dispatch(
      &mut store,
      &mut renderer,
      Command::Theme {
        choice: Some("serenity".to_string())
      },
      &ctx
    )
    .expect("set theme");
    assert_eq!(store.theme().name(), "Serenity");

    let err = dispatch(
      &mut store,
      &mut renderer,
      Command::Theme {
        choice: Some("plaid".to_string())
      },
      &ctx
    );
    assert!(err.is_err());
    assert_eq!(store.theme().name(), "Serenity");

    dispatch(
      &mut store,
      &mut renderer,
      Command::Theme {
        choice: None
      },
      &ctx
    )
    .expect("list palette");

    let backend = store.into_backend();
    let reloaded =
      load_state(backend.as_ref(), &ctx)
        .expect("reload");
    assert_eq!(reloaded.theme.color(), "#92A8D1");
  }

  #[test]
  fn theme_names_resolve_by_position_too() {
    assert_eq!(
      resolve_theme("2").expect("second").name(),
      "Dusty Purple"
    );
    assert!(resolve_theme("").is_err());
  }
}
