use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  SecondsFormat,
  SubsecRound,
  Utc
};
use thiserror::Error;

const EXPORT_FILE_PREFIX: &str =
  "todo-tasks-";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid timestamp: {raw:?}")]
pub struct TimestampError {
  pub raw: String
}

/// Drops precision finer than a
/// millisecond so every stored
/// timestamp survives a trip through
/// [`format_timestamp`].
#[must_use]
pub fn normalize(
  dt: DateTime<Utc>
) -> DateTime<Utc> {
  dt.trunc_subsecs(3)
}

#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

/// Accepts RFC 3339 with any offset,
/// an offset-less date-time (read as
/// UTC) and a bare `YYYY-MM-DD` date
/// (UTC midnight).
pub fn parse_timestamp(
  raw: &str
) -> Result<DateTime<Utc>, TimestampError>
{
  let trimmed = raw.trim();

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(
      trimmed
    )
  {
    return Ok(normalize(
      dt.with_timezone(&Utc)
    ));
  }

  for pattern in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        trimmed, pattern
      )
    {
      return Ok(normalize(
        ndt.and_utc()
      ));
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      trimmed, "%Y-%m-%d"
    )
    && let Some(ndt) =
      date.and_hms_opt(0, 0, 0)
  {
    return Ok(ndt.and_utc());
  }

  Err(TimestampError {
    raw: raw.to_string()
  })
}

#[must_use]
pub fn export_filename(
  now: DateTime<Utc>
) -> String {
  format!(
    "{EXPORT_FILE_PREFIX}{}.json",
    now.format("%Y-%m-%d")
  )
}

pub mod iso8601_serde {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_timestamp(*dt)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_timestamp(&raw)
      .map_err(serde::de::Error::custom)
  }
}
