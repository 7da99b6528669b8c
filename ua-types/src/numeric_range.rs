// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains `NumericRange`, the parsed form of an index range string such as
//! `1:3` or `0:1,2`.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::{StatusCode, UAString};

static RANGE_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(?P<min>[0-9]{1,10})(:(?P<max>[0-9]{1,10}))?$"));

/// A range of indexes into an array, string or byte string. Each dimension of
/// a multi dimensional value is separated by a comma.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NumericRange {
    /// The whole value.
    #[default]
    None,
    /// A single index.
    Index(u32),
    /// An inclusive range of indexes.
    Range(u32, u32),
    /// One range per dimension.
    MultipleRanges(Vec<NumericRange>),
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericRange::None => Ok(()),
            NumericRange::Index(idx) => write!(f, "{idx}"),
            NumericRange::Range(min, max) => write!(f, "{min}:{max}"),
            NumericRange::MultipleRanges(ranges) => {
                for (i, r) in ranges.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{r}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for NumericRange {
    type Err = StatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(NumericRange::None);
        }
        let mut ranges = s
            .split(',')
            .map(Self::parse_dimension)
            .collect::<Result<Vec<_>, _>>()?;
        if ranges.len() == 1 {
            Ok(ranges.remove(0))
        } else {
            Ok(NumericRange::MultipleRanges(ranges))
        }
    }
}

impl TryFrom<&UAString> for NumericRange {
    type Error = StatusCode;

    fn try_from(value: &UAString) -> Result<Self, Self::Error> {
        value.as_ref().parse()
    }
}

impl NumericRange {
    fn parse_dimension(s: &str) -> Result<NumericRange, StatusCode> {
        let re = RANGE_RE
            .as_ref()
            .map_err(|_| StatusCode::BadInternalError)?;
        let captures = re.captures(s).ok_or(StatusCode::BadIndexRangeInvalid)?;
        let parse = |name: &str| -> Result<Option<u32>, StatusCode> {
            captures
                .name(name)
                .map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map_err(|_| StatusCode::BadIndexRangeInvalid)
        };
        let min = parse("min")?.ok_or(StatusCode::BadIndexRangeInvalid)?;
        match parse("max")? {
            None => Ok(NumericRange::Index(min)),
            Some(max) if min <= max => Ok(NumericRange::Range(min, max)),
            Some(_) => Err(StatusCode::BadIndexRangeInvalid),
        }
    }

    /// `true` for the whole value.
    pub fn is_none(&self) -> bool {
        matches!(self, NumericRange::None)
    }

    /// Inclusive bounds of a single dimension.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        match self {
            NumericRange::Index(idx) => Some((*idx as usize, *idx as usize)),
            NumericRange::Range(min, max) => Some((*min as usize, *max as usize)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NumericRange;
    use crate::StatusCode;

    #[test]
    fn parse_valid() {
        assert_eq!("".parse::<NumericRange>().unwrap(), NumericRange::None);
        assert_eq!("5".parse::<NumericRange>().unwrap(), NumericRange::Index(5));
        assert_eq!(
            "1:3".parse::<NumericRange>().unwrap(),
            NumericRange::Range(1, 3)
        );
        assert_eq!(
            "0:1,2".parse::<NumericRange>().unwrap(),
            NumericRange::MultipleRanges(vec![NumericRange::Range(0, 1), NumericRange::Index(2)])
        );
    }

    #[test]
    fn parse_invalid() {
        for s in ["-1", "3:1", "1:", ":1", "a", "1,", ",", "1:2:3", " 1", "99999999999"] {
            assert_eq!(
                s.parse::<NumericRange>(),
                Err(StatusCode::BadIndexRangeInvalid),
                "{s}"
            );
        }
    }

    #[test]
    fn display_round_trip() {
        for s in ["", "7", "2:9", "0:1,4,5:6"] {
            assert_eq!(s.parse::<NumericRange>().unwrap().to_string(), s);
        }
    }
}
