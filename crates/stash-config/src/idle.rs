//! Idle-timeout values and their textual grammar.
//!
//! The timeout is written as one or more `<value><unit>` groups which are
//! summed, e.g. `90s`, `1m30s`, `2h`. Units are `d`, `h`, `m`, and `s`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_IDLE_SECONDS: u64 = 60;

/// Inactivity window after which the daemon shuts itself down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeout(Duration);

impl IdleTimeout {
    /// Wraps an explicit duration.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// The timeout as a standard duration.
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for IdleTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(DEFAULT_IDLE_SECONDS))
    }
}

impl fmt::Display for IdleTimeout {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}s", self.0.as_secs())
    }
}

impl FromStr for IdleTimeout {
    type Err = IdleTimeoutParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_duration(input).map(Self)
    }
}

/// Errors raised while parsing an [`IdleTimeout`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdleTimeoutParseError {
    /// The input was empty or whitespace only.
    #[error("empty duration")]
    Empty,
    /// A group was missing its numeric value.
    #[error("expected a number at '{rest}'")]
    MissingValue { rest: String },
    /// A group was missing its unit suffix.
    #[error("expected a unit (d, h, m, s) at '{rest}'")]
    MissingUnit { rest: String },
    /// The numeric value overflowed.
    #[error("duration value out of range")]
    Overflow,
}

fn parse_duration(input: &str) -> Result<Duration, IdleTimeoutParseError> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(IdleTimeoutParseError::Empty);
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let digits = rest
            .find(|character: char| !character.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(IdleTimeoutParseError::MissingValue {
                rest: rest.to_owned(),
            });
        }
        let (value, remainder) = rest.split_at(digits);
        let value: u64 = value
            .parse()
            .map_err(|_| IdleTimeoutParseError::Overflow)?;

        let mut characters = remainder.chars();
        let unit = match characters.next() {
            Some('d') => 60 * 60 * 24,
            Some('h') => 60 * 60,
            Some('m') => 60,
            Some('s') => 1,
            _ => {
                return Err(IdleTimeoutParseError::MissingUnit {
                    rest: remainder.to_owned(),
                });
            }
        };

        let group = value
            .checked_mul(unit)
            .ok_or(IdleTimeoutParseError::Overflow)?;
        total = total
            .checked_add(group)
            .ok_or(IdleTimeoutParseError::Overflow)?;
        rest = characters.as_str();
    }

    Ok(Duration::from_secs(total))
}
