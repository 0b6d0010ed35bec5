use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::Config;

const TIMEZONE_ENV_VAR: &str =
  "TIDY_TIMEZONE";

/// The instant a read or mutation is evaluated at, plus the timezone that
/// defines calendar days.
#[derive(Debug, Clone, Copy)]
pub struct TimeContext {
  now: DateTime<Utc>,
  tz:  Tz
}

impl TimeContext {
  pub fn new(
    now: DateTime<Utc>,
    tz: Tz
  ) -> Self {
    Self {
      now,
      tz
    }
  }

  pub fn system(tz: Tz) -> Self {
    Self::new(Utc::now(), tz)
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.now
  }

  pub fn tz(&self) -> Tz {
    self.tz
  }

  #[must_use]
  pub fn advanced(
    &self,
    by: Duration
  ) -> Self {
    Self::new(self.now + by, self.tz)
  }

  pub fn today(&self) -> NaiveDate {
    self.local_date(self.now)
  }

  pub fn local_date(
    &self,
    dt: DateTime<Utc>
  ) -> NaiveDate {
    dt.with_timezone(&self.tz)
      .date_naive()
  }

  pub fn start_of_day(
    &self,
    date: NaiveDate
  ) -> DateTime<Utc> {
    self.resolve_local(
      date.and_time(NaiveTime::MIN)
    )
  }

  /// Last millisecond of `date` in local time.
  pub fn end_of_day(
    &self,
    date: NaiveDate
  ) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(
      23, 59, 59, 999
    )
    .unwrap_or(NaiveTime::MIN);
    self.resolve_local(date.and_time(last))
  }

  pub fn format_local(
    &self,
    dt: DateTime<Utc>,
    fmt: &str
  ) -> String {
    dt.with_timezone(&self.tz)
      .format(fmt)
      .to_string()
  }

  fn resolve_local(
    &self,
    naive: NaiveDateTime
  ) -> DateTime<Utc> {
    match self.tz.from_local_datetime(&naive)
    {
      | LocalResult::Single(local) => {
        local.with_timezone(&Utc)
      }
      | LocalResult::Ambiguous(
        first,
        second
      ) => {
        tracing::trace!(%first, %second, "ambiguous local datetime; using earliest");
        first.min(second).with_timezone(&Utc)
      }
      | LocalResult::None => {
        // Skipped by a DST jump: the wall clock resumes an hour later.
        let shifted =
          naive + Duration::hours(1);
        match self
          .tz
          .from_local_datetime(&shifted)
          .earliest()
        {
          | Some(local) => {
            local.with_timezone(&Utc)
          }
          | None => {
            tracing::warn!(%naive, "local datetime does not exist; treating as UTC");
            Utc.from_utc_datetime(&naive)
          }
        }
      }
    }
  }
}

/// Resolves the timezone once per process: `TIDY_TIMEZONE`, then the
/// `timezone` config key, then UTC.
pub fn project_timezone(cfg: &Config) -> Tz {
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  *PROJECT_TZ
    .get_or_init(|| resolve_timezone(cfg))
}

fn resolve_timezone(cfg: &Config) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = cfg.get("timezone")
    && let Some(tz) =
      parse_timezone(&raw, "config")
  {
    return tz;
  }

  tracing::debug!(
    "no timezone configured; using UTC"
  );
  chrono_tz::UTC
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(source, timezone = %trimmed, "configured timezone");
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(source, timezone = %trimmed, error = %err, "failed to parse timezone id");
      None
    }
  }
}

fn relative_days_re() -> Option<&'static Regex>
{
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<sign>[+-])(?P<num>\d{1,4})d$"
    )
    .ok()
  })
  .as_ref()
}

/// Parses a due-date expression: `today`, `tomorrow`, `yesterday`,
/// `YYYY-MM-DD`, or a day offset such as `+3d`.
#[tracing::instrument(skip(ctx))]
pub fn parse_due_expr(
  input: &str,
  ctx: &TimeContext
) -> anyhow::Result<NaiveDate> {
  let token = input.trim().to_ascii_lowercase();
  let today = ctx.today();

  match token.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(caps) = relative_days_re()
    .and_then(|re| re.captures(&token))
  {
    let num: i64 = caps["num"]
      .parse()
      .context("invalid day offset")?;
    let offset = if &caps["sign"] == "-" {
      -num
    } else {
      num
    };
    return shift_days(today, offset);
  }

  NaiveDate::parse_from_str(&token, "%Y-%m-%d")
    .with_context(|| {
      format!("unrecognized due date: {input}")
    })
}

fn shift_days(
  date: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  date
    .checked_add_signed(Duration::days(days))
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {date} {days:+}d"
      )
    })
}
