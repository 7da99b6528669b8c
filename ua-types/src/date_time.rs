// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `DateTime`.

use std::{
    fmt,
    io::{Read, Write},
    ops::{Add, Sub},
    str::FromStr,
    sync::LazyLock,
};

use chrono::{Duration, SecondsFormat, TimeDelta, TimeZone, Timelike, Utc};

use crate::{
    encoding::{read_i64, write_i64, EncodingResult},
    xml::{XmlDecodable, XmlEncodable, XmlStreamReader, XmlStreamWriter, XmlType},
    Context, DecodingOptions, Error, SimpleBinaryDecodable, SimpleBinaryEncodable,
};

const NANOS_PER_TICK: i64 = 100;
const TICKS_PER_SECOND: i64 = 1_000_000_000 / NANOS_PER_TICK;

static EPOCH: LazyLock<chrono::DateTime<Utc>> =
    LazyLock::new(|| Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).single().unwrap_or_default());
static MAX: LazyLock<chrono::DateTime<Utc>> = LazyLock::new(|| {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or_default()
});

/// A UTC instant with 100 nanosecond resolution, encoded as the number of
/// ticks since 1601-01-01. Zero is the "null" date time.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct DateTime {
    date_time: chrono::DateTime<Utc>,
}

impl Default for DateTime {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.date_time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

impl SimpleBinaryEncodable for DateTime {
    fn byte_len(&self) -> usize {
        8
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        write_i64(stream, self.checked_ticks())
    }
}

impl SimpleBinaryDecodable for DateTime {
    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        Ok(DateTime::from_ticks(read_i64(stream)?))
    }
}

impl XmlType for DateTime {
    const TAG: &'static str = "DateTime";
}

impl XmlEncodable for DateTime {
    fn encode(
        &self,
        writer: &mut XmlStreamWriter<&mut dyn Write>,
        _ctx: &Context<'_>,
    ) -> EncodingResult<()> {
        writer.write_text(&self.to_string())?;
        Ok(())
    }
}

impl XmlDecodable for DateTime {
    fn decode(read: &mut XmlStreamReader<&mut dyn Read>, _ctx: &Context<'_>) -> EncodingResult<Self> {
        let text = read.consume_as_text()?;
        if text.is_empty() {
            return Ok(DateTime::null());
        }
        DateTime::from_str(&text)
    }
}

impl FromStr for DateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|d| DateTime::from(d.with_timezone(&Utc)))
            .map_err(|e| Error::decoding(format!("Invalid date time {s}: {e}")))
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(value: chrono::DateTime<Utc>) -> Self {
        // Truncate to tick resolution and clamp to the representable range.
        let nanos = value.nanosecond() / NANOS_PER_TICK as u32 * NANOS_PER_TICK as u32;
        let date_time = value.with_nanosecond(nanos).unwrap_or(value);
        Self {
            date_time: date_time.clamp(*EPOCH, *MAX),
        }
    }
}

impl From<DateTime> for chrono::DateTime<Utc> {
    fn from(value: DateTime) -> Self {
        value.date_time
    }
}

impl Add<Duration> for DateTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        DateTime::from(self.date_time + rhs)
    }
}

impl Sub<DateTime> for DateTime {
    type Output = TimeDelta;

    fn sub(self, rhs: DateTime) -> Self::Output {
        self.date_time - rhs.date_time
    }
}

impl DateTime {
    /// The current time.
    pub fn now() -> DateTime {
        DateTime::from(Utc::now())
    }

    /// The null date time, 1601-01-01.
    pub fn null() -> DateTime {
        DateTime { date_time: *EPOCH }
    }

    /// `true` if this is the null date time.
    pub fn is_null(&self) -> bool {
        self.checked_ticks() == 0
    }

    /// Construct from ticks since 1601-01-01. Out of range values are clamped.
    pub fn from_ticks(ticks: i64) -> DateTime {
        if ticks <= 0 {
            return DateTime::null();
        }
        let secs = ticks / TICKS_PER_SECOND;
        let nanos = (ticks % TICKS_PER_SECOND) * NANOS_PER_TICK;
        let delta = Duration::seconds(secs) + Duration::nanoseconds(nanos);
        match EPOCH.checked_add_signed(delta) {
            Some(d) => DateTime::from(d),
            None => DateTime { date_time: *MAX },
        }
    }

    /// Ticks since 1601-01-01, clamped to the representable range.
    pub fn checked_ticks(&self) -> i64 {
        let delta = self.date_time - *EPOCH;
        let secs = delta.num_seconds();
        let sub_nanos = (delta - Duration::seconds(secs))
            .num_nanoseconds()
            .unwrap_or_default();
        secs.saturating_mul(TICKS_PER_SECOND)
            .saturating_add(sub_nanos / NANOS_PER_TICK)
            .max(0)
    }

    /// Underlying chrono value.
    pub fn as_chrono(&self) -> &chrono::DateTime<Utc> {
        &self.date_time
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::DateTime;

    #[test]
    fn ticks_are_exact() {
        let d = DateTime::from(
            Utc.with_ymd_and_hms(2020, 3, 4, 5, 6, 7)
                .single()
                .unwrap()
                .with_timezone(&Utc)
                + chrono::Duration::nanoseconds(1_234_567),
        );
        let ticks = d.checked_ticks();
        assert_eq!(DateTime::from_ticks(ticks), d);
        // 1.234567 ms truncates to 12345 ticks of sub-second precision.
        assert_eq!(ticks % 10_000_000, 12345);
    }

    #[test]
    fn null_and_clamping() {
        assert!(DateTime::null().is_null());
        assert!(DateTime::from_ticks(-5).is_null());
        let max = DateTime::from_ticks(i64::MAX);
        assert!(max.checked_ticks() > 0);
    }

    #[test]
    fn text_form() {
        let d: DateTime = "2021-01-02T03:04:05.5Z".parse().unwrap();
        assert_eq!(d.to_string(), "2021-01-02T03:04:05.500Z");
    }
}
