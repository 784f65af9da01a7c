use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  LocalResult,
  NaiveDate,
  TimeZone,
  Utc
};
use chrono_tz::Tz;

use crate::i18n::Locale;

pub const DEFAULT_BOARD_TIMEZONE: &str =
  "UTC";

/// Machine-readable order accepted
/// for every date input, regardless
/// of the display locale.
pub const DATE_INPUT_FORMAT: &str =
  "%Y-%m-%d";

pub fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(anyhow!(
      "timezone cannot be empty"
    ));
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        timezone = %trimmed,
        "configured board timezone"
      );
      Ok(tz)
    }
    | Err(err) => {
      Err(anyhow!(
        "failed to parse timezone id \
         {trimmed}: {err}"
      ))
    }
  }
}

/// First instant of `date` in `tz`.
#[must_use]
pub fn start_of_day_utc(
  date: NaiveDate,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let midnight =
    date.and_hms_opt(0, 0, 0)?;
  match tz.from_local_datetime(&midnight)
  {
    | LocalResult::Single(local) => {
      Some(local.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Some(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      // Midnight skipped by a DST jump;
      // the day starts an hour later.
      let shifted =
        date.and_hms_opt(1, 0, 0)?;
      tz.from_local_datetime(&shifted)
        .earliest()
        .map(|local| {
          local.with_timezone(&Utc)
        })
    }
  }
}

#[tracing::instrument]
pub fn parse_date_input(
  input: &str
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  NaiveDate::parse_from_str(
    token,
    DATE_INPUT_FORMAT
  )
  .with_context(|| {
    format!(
      "expected YYYY-MM-DD, got \
       {token:?}"
    )
  })
}

#[must_use]
pub fn format_date_input(
  date: NaiveDate
) -> String {
  date
    .format(DATE_INPUT_FORMAT)
    .to_string()
}

/// Display form of a calendar date:
/// `ru-RU` pads day and month, `en-US`
/// does not.
#[must_use]
pub fn format_date(
  date: NaiveDate,
  locale: Locale
) -> String {
  match locale {
    | Locale::Ru => {
      date
        .format("%d.%m.%Y")
        .to_string()
    }
    | Locale::En => {
      date
        .format("%-m/%-d/%Y")
        .to_string()
    }
  }
}

#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>,
  tz: &Tz,
  locale: Locale
) -> String {
  format_date(
    dt.with_timezone(tz).date_naive(),
    locale
  )
}
