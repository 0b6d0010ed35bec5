use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Parser,
  Subcommand,
  ValueEnum
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::views::{
  ChartWindow,
  ProgressRange
};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
  pub cleaned_args: Vec<OsString>,
  pub rc_overrides: Vec<(String, String)>
}

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "tidy",
  version,
  about = "tidy: a small personal task \
           tracker"
)]
pub struct GlobalCli {
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true
  )]
  pub verbose: u8,

  #[arg(
    short = 'q',
    long = "quiet",
    action = ArgAction::Count,
    global = true
  )]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(
      |s: &str| s.parse::<KeyVal>()
    ),
    action = ArgAction::Append
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(long = "tidyrc")]
  pub tidyrc: Option<PathBuf>,

  #[arg(long = "data")]
  pub data: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Option<Command>
}

/// Search and tag options shared by the list views.
#[derive(
  clap::Args, Debug, Clone, Default,
)]
pub struct FilterArgs {
  /// Case-insensitive text search.
  #[arg(short = 's', long)]
  pub search: Option<String>,

  /// Show tasks carrying any of these tags.
  #[arg(short = 't', long = "tag")]
  pub tags: Vec<String>,

  /// Show only tasks without tags.
  #[arg(long, conflicts_with = "tags")]
  pub untagged: bool
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Open tasks in priority order, one page at a time.
  List {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(
      short = 'p',
      long,
      default_value_t = 1
    )]
    page:   usize
  },
  /// Completed tasks grouped by age.
  Completed {
    #[command(flatten)]
    filter: FilterArgs
  },
  Add {
    #[arg(required = true, num_args = 1..)]
    text:     Vec<String>,
    /// Treat each line of the text as its own task.
    #[arg(long)]
    batch:    bool,
    #[arg(short = 't', long = "tag")]
    tags:     Vec<String>,
    #[arg(short = 'd', long)]
    due:      Option<String>,
    /// Checklist item; repeatable.
    #[arg(long = "sub")]
    subtasks: Vec<String>
  },
  /// Toggle completion.
  Done {
    id: String
  },
  Tag {
    id:     String,
    tag:    String,
    #[arg(long)]
    remove: bool
  },
  /// Set the due date, or clear it when no date is given.
  Due {
    id:   String,
    when: Option<String>
  },
  Edit {
    id:   String,
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>
  },
  /// Swap the manual order of two tasks of equal priority.
  Move {
    source: String,
    target: String
  },
  Rm {
    id:  String,
    #[arg(short = 'y', long)]
    yes: bool
  },
  /// Plain-text dump of every task.
  Log,
  Stats {
    #[arg(
      long,
      value_enum,
      default_value_t = RangeArg::All
    )]
    range: RangeArg
  },
  Trend {
    #[arg(
      long,
      value_enum,
      default_value_t = WindowArg::Week
    )]
    window: WindowArg
  },
  Calendar {
    /// Place tasks by due date instead of creation date.
    #[arg(long)]
    due:    bool,
    /// Months away from the current one.
    #[arg(
      long,
      default_value_t = 0,
      allow_negative_numbers = true
    )]
    offset: i32
  },
  Tags {
    #[command(subcommand)]
    action: Option<TagsAction>
  },
  /// List the palette, or pick an entry by number, name or colour.
  Theme {
    choice: Option<String>
  }
}

impl Default for Command {
  fn default() -> Self {
    Command::List {
      filter: FilterArgs::default(),
      page:   1
    }
  }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagsAction {
  Add {
    label: String
  },
  Rm {
    label: String,
    #[arg(short = 'y', long)]
    yes:   bool
  }
}

#[derive(
  ValueEnum, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum RangeArg {
  All,
  Month,
  Week,
  #[value(name = "3days")]
  ThreeDays
}

impl From<RangeArg> for ProgressRange {
  fn from(arg: RangeArg) -> Self {
    match arg {
      | RangeArg::All => ProgressRange::All,
      | RangeArg::Month => {
        ProgressRange::LastMonth
      }
      | RangeArg::Week => {
        ProgressRange::LastWeek
      }
      | RangeArg::ThreeDays => {
        ProgressRange::LastThreeDays
      }
    }
  }
}

#[derive(
  ValueEnum, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum WindowArg {
  #[value(name = "7")]
  Week,
  #[value(name = "30")]
  Month,
  #[value(name = "100")]
  Hundred
}

impl From<WindowArg> for ChartWindow {
  fn from(arg: WindowArg) -> Self {
    match arg {
      | WindowArg::Week => ChartWindow::Week,
      | WindowArg::Month => {
        ChartWindow::Month
      }
      | WindowArg::Hundred => {
        ChartWindow::Hundred
      }
    }
  }
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log filter: \
           {e}"
        )
      })?;

  let init_result = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_level(true)
    .with_writer(std::io::stderr)
    .with_ansi(std::io::stderr().is_terminal())
    .try_init();

  if let Err(err) = init_result {
    debug!(error = %err, "tracing subscriber already set, continuing");
  }

  Ok(())
}

/// Pulls positional `rc.key=value` (or `rc.key:value`) overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(
  raw: &[OsString]
) -> anyhow::Result<PreprocessedArgs> {
  let mut cleaned =
    Vec::with_capacity(raw.len());
  let mut overrides: Vec<(String, String)> =
    Vec::new();

  let mut iter = raw.iter().cloned();
  if let Some(bin) = iter.next() {
    cleaned.push(bin);
  }

  for arg in iter {
    let s = arg.to_string_lossy();
    if let Some(rest) = s.strip_prefix("rc.") {
      let parsed = rest
        .split_once('=')
        .or_else(|| rest.split_once(':'));
      if let Some((k, v)) = parsed {
        debug!(key = %k, value = %v, "captured positional rc override");
        overrides.push((
          format!("rc.{k}"),
          v.to_string()
        ));
        continue;
      }
    }
    cleaned.push(arg);
  }

  Ok(PreprocessedArgs {
    cleaned_args: cleaned,
    rc_overrides: overrides
  })
}
