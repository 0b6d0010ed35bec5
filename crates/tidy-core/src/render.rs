use std::collections::BTreeMap;
use std::io::{
  self,
  IsTerminal,
  Write
};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::TimeContext;
use crate::priority::priority_score;
use crate::task::{
  DueStatus,
  Task
};
use crate::theme::{
  PALETTE,
  Theme
};
use crate::views::{
  CompletedGroups,
  ProgressRange,
  ProgressStats,
  TrendPoint
};

/// Characters of the id shown in tables; enough to be a unique prefix in a
/// personal list.
pub const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool,
  theme: Theme
}

impl Renderer {
  /// Colour follows the `color` rc key, on unless it reads as false.
  pub fn new(
    cfg: &Config,
    theme: Theme
  ) -> Self {
    let color =
      cfg.get_bool("color").unwrap_or(true);
    Self {
      color,
      theme
    }
  }

  pub fn color_enabled(&self) -> bool {
    self.color
  }

  pub fn set_theme(&mut self, theme: Theme) {
    self.theme = theme;
  }

  #[tracing::instrument(skip(
    self, tasks, ctx
  ))]
  pub fn print_task_table(
    &mut self,
    tasks: &[&Task],
    page: usize,
    pages: usize,
    ctx: &TimeContext
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    let headers = [
      "ID", "Pri", "Due", "Task", "Tags", "Sub",
    ]
    .map(|h| self.accent(h))
    .to_vec();
    let rows = tasks
      .iter()
      .map(|task| self.task_row(task, ctx))
      .collect();
    write_table(&mut out, headers, rows)?;
    writeln!(out, "page {page} of {pages}")?;
    Ok(())
  }

  fn task_row(
    &self,
    task: &Task,
    ctx: &TimeContext
  ) -> Vec<String> {
    let id = self.paint(short_id(task), "33");
    let due = match task.due_status(ctx) {
      | Some(
        status @ DueStatus::Overdue(_)
      ) => {
        self.paint(&status.to_string(), "31")
      }
      | Some(status) => status.to_string(),
      | None => String::new()
    };
    let tags = task
      .tags
      .iter()
      .map(|tag| format!("+{tag}"))
      .collect::<Vec<_>>()
      .join(" ");
    let subtasks = task
      .subtask_progress()
      .map(|(done, total)| {
        format!("{done}/{total}")
      })
      .unwrap_or_default();
    vec![
      id,
      priority_score(task).to_string(),
      due,
      task.text.clone(),
      tags,
      subtasks,
    ]
  }

  #[tracing::instrument(skip(
    self, groups, ctx
  ))]
  pub fn print_completed(
    &mut self,
    groups: &CompletedGroups<'_>,
    ctx: &TimeContext
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if groups.total() == 0 {
      writeln!(out, "No completed tasks")?;
      return Ok(());
    }
    for (bucket, tasks) in groups.iter() {
      writeln!(
        out,
        "{} ({})",
        self.accent(bucket.label()),
        tasks.len()
      )?;
      for task in tasks {
        writeln!(
          out,
          "  {} {}  {}",
          self.paint(short_id(task), "33"),
          task.text,
          ctx.format_local(
            task.finished_or_created(),
            "%Y-%m-%d %H:%M"
          )
        )?;
      }
    }
    Ok(())
  }

  pub fn print_stats(
    &mut self,
    range: ProgressRange,
    stats: ProgressStats
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
      out,
      "{}: {} of {} done ({}%)",
      self.accent(range.label()),
      stats.completed,
      stats.total,
      stats.rate
    )?;
    Ok(())
  }

  pub fn print_trend(
    &mut self,
    points: &[TrendPoint]
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    let headers = ["Day", "Created", "Completed"]
      .map(|h| self.accent(h))
      .to_vec();
    let rows = points
      .iter()
      .map(|point| {
        vec![
          point.label(),
          point.created.to_string(),
          point.completed.to_string(),
        ]
      })
      .collect();
    write_table(&mut out, headers, rows)
  }

  pub fn print_calendar(
    &mut self,
    title: &str,
    days: &BTreeMap<NaiveDate, Vec<&Task>>
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", self.accent(title))?;
    if days.is_empty() {
      writeln!(out, "  nothing scheduled")?;
    }
    for (day, tasks) in days {
      writeln!(out, "{}", day.format("%a %d"))?;
      for task in tasks {
        let mark =
          if task.completed { "x" } else { " " };
        writeln!(
          out,
          "  [{mark}] {} {}",
          self.paint(short_id(task), "33"),
          task.text
        )?;
      }
    }
    Ok(())
  }

  /// Numbered palette with the selected entry marked.
  pub fn print_palette(
    &mut self
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for line in self.palette_lines() {
      writeln!(out, "{line}")?;
    }
    Ok(())
  }

  fn palette_lines(&self) -> Vec<String> {
    PALETTE
      .iter()
      .enumerate()
      .map(|(index, swatch)| {
        let mark = if index
          == self.theme.index()
        {
          "*"
        } else {
          " "
        };
        let chip = Theme::from_index(index)
          .map(|theme| {
            self.paint(
              "  ",
              &background_code(theme)
            )
          })
          .unwrap_or_default();
        format!(
          "{mark} {:>2} {chip} {} {}",
          index + 1,
          swatch.color,
          swatch.name
        )
      })
      .collect()
  }

  /// Bold text in the theme colour.
  fn accent(&self, text: &str) -> String {
    let (r, g, b) = self.theme.rgb();
    self.paint(
      text,
      &format!("1;38;2;{r};{g};{b}")
    )
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color
      || !io::stdout().is_terminal()
    {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

fn background_code(theme: Theme) -> String {
  let (r, g, b) = theme.rgb();
  format!("48;2;{r};{g};{b}")
}

fn short_id(task: &Task) -> &str {
  let id = task.id.as_str();
  id.char_indices()
    .nth(SHORT_ID_LEN)
    .map_or(id, |(end, _)| &id[..end])
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let column_count = headers.len();
  let mut widths = vec![0usize; column_count];

  for (idx, header) in
    headers.iter().enumerate()
  {
    widths[idx] = widths[idx].max(
      UnicodeWidthStr::width(
        strip_ansi(header).as_str()
      )
    );
  }

  for row in &rows {
    for (idx, cell) in row.iter().enumerate() {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  for (idx, header) in
    headers.iter().enumerate()
  {
    write_padded(
      &mut writer,
      header,
      widths[idx]
    )?;
  }
  writeln!(writer)?;

  for width in &widths {
    write!(
      writer,
      "{:-<width$} ",
      "",
      width = *width
    )?;
  }
  writeln!(writer)?;

  for row in rows {
    for (idx, cell) in row.iter().enumerate() {
      write_padded(
        &mut writer,
        cell,
        widths[idx]
      )?;
    }
    writeln!(writer)?;
  }

  Ok(())
}

fn write_padded<W: Write>(
  writer: &mut W,
  cell: &str,
  width: usize
) -> anyhow::Result<()> {
  let visible_width = UnicodeWidthStr::width(
    strip_ansi(cell).as_str()
  );
  let padding =
    width.saturating_sub(visible_width);
  write!(
    writer,
    "{}{} ",
    cell,
    " ".repeat(padding)
  )?;
  Ok(())
}

fn strip_ansi(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut escaped = false;

  for ch in s.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }

    if ch == '\x1b' {
      escaped = true;
      continue;
    }

    out.push(ch);
  }

  out
}
