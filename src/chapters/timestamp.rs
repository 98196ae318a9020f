/// Time tokens found in free-text descriptions ("1:02:03", "2:03")
use crate::error::{ClipperError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use std::time::Duration;

/// One or two colon groups, e.g. `2:03`, `12:34`, `1:02:03`, `12:34:56`.
const TIME_TOKEN_PATTERN: &str = r"(?:\d+:)?\d+:\d+";

/// A point on (or a span of) a media timeline, in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Parse a token, trying `H:MM:SS` first and falling back to `M:SS`.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        Self::parse_hms(token)
            .or_else(|| Self::parse_ms(token))
            .ok_or_else(|| ClipperError::format(token))
    }

    fn parse_hms(token: &str) -> Option<Self> {
        let mut fields = token.split(':');
        let hours = number(fields.next()?)?;
        let minutes = sexagesimal(fields.next()?)?;
        let seconds = sexagesimal(fields.next()?)?;
        if fields.next().is_some() {
            return None;
        }
        let secs = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
        Some(Self::from_secs(secs))
    }

    fn parse_ms(token: &str) -> Option<Self> {
        let (minutes, seconds) = token.split_once(':')?;
        let minutes = sexagesimal(minutes)?;
        let seconds = sexagesimal(seconds)?;
        Some(Self::from_secs(minutes * 60 + seconds))
    }

    /// Span from `earlier` to `self`; zero when `earlier` is not before `self`.
    pub fn saturating_sub(self, earlier: Timestamp) -> Timestamp {
        Self(self.0.saturating_sub(earlier.0))
    }
}

fn number(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn sexagesimal(field: &str) -> Option<u64> {
    if field.len() > 2 {
        return None;
    }
    number(field).filter(|value| *value < 60)
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.0))
    }
}

impl From<Duration> for Timestamp {
    fn from(duration: Duration) -> Self {
        Self::from_secs(duration.as_secs())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs();
        write!(f, "{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

impl FromStr for Timestamp {
    type Err = ClipperError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ClipperError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> String {
        ts.to_string()
    }
}

/// A time token located inside a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeMatch<'a> {
    pub token: &'a str,
    /// Byte offset of the token within the line
    pub start: usize,
    pub end: usize,
}

impl TimeMatch<'_> {
    pub fn parse(&self) -> Result<Timestamp> {
        Timestamp::parse(self.token)
    }
}

/// Locates time tokens in lines of text. Holds no state besides its compiled pattern.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    pattern: Regex,
}

impl TimestampParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(TIME_TOKEN_PATTERN).expect("time token pattern is valid"),
        }
    }

    /// First time token in `line`, if any.
    pub fn find<'a>(&self, line: &'a str) -> Option<TimeMatch<'a>> {
        self.pattern.find(line).map(|m| TimeMatch {
            token: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
    }
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new()
    }
}
