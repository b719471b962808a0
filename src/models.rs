//! Core data models for revsleuth
//!
//! These models are used throughout the crate for representing
//! revisions, edit sets and the keys that identify them.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// User id recorded for edits without an attributable account.
///
/// MediaWiki reports IP edits with `userid = 0`; edits whose username was
/// hidden or is empty are normalised to the same value by the fetcher.
pub const ANONYMOUS_USER_ID: i64 = 0;

/// One revision of a page, with its reconstructed diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    /// Revision id (unique per wiki)
    pub rev_id: u64,
    /// Author username (IP address for anonymous edits, empty if hidden)
    #[serde(default)]
    pub user: String,
    /// Author user id, [`ANONYMOUS_USER_ID`] when anonymous
    #[serde(default)]
    pub user_id: i64,
    /// Edit summary
    #[serde(default)]
    pub comment: String,
    pub timestamp: DateTime<Utc>,
    /// Change tags in API order
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub minor: bool,
    /// Text fragments added by this revision
    #[serde(default)]
    pub added: Vec<String>,
    /// Text fragments removed by this revision
    #[serde(default)]
    pub removed: Vec<String>,
    /// Page size in bytes after this revision
    #[serde(default)]
    pub new_size: i64,
    /// new size - previous size
    #[serde(default)]
    pub size_delta: i64,
}

impl Edit {
    /// Whether this edit has no attributable account.
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edit by {} ({}) at {}, size {} ({:+}): \"{}\"",
            self.user,
            self.user_id,
            self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            self.new_size,
            self.size_delta,
            self.comment
        )
    }
}

/// A calendar month, rendered as `yyyy-mm`.
///
/// Years are limited to [`YearMonth::MIN_YEAR`]..=[`YearMonth::MAX_YEAR`] so
/// that every month renders as four year digits and has a following month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    first: NaiveDate,
    following: NaiveDate,
}

impl YearMonth {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    /// `None` when the month is outside 1-12 or the year outside the
    /// supported range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let following = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self { first, following })
    }

    pub fn year(self) -> i32 {
        self.first.year()
    }

    pub fn month(self) -> u32 {
        self.first.month()
    }

    /// The following month, `None` after December of [`YearMonth::MAX_YEAR`].
    pub fn next(self) -> Option<Self> {
        Self::new(self.following.year(), self.following.month())
    }

    /// Midnight UTC on the first day of the month.
    pub fn first_instant(self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.first.and_time(NaiveTime::MIN))
    }

    /// Midnight UTC on the first day of the following month.
    pub fn end_instant(self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.following.and_time(NaiveTime::MIN))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts exactly `yyyy-mm`: four year digits, a dash, two month digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_a_month = || format!("'{}' is not a yyyy-mm month", s);
        let (year, month) = s.trim().split_once('-').ok_or_else(not_a_month)?;
        let all_digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !all_digits(year, 4) || !all_digits(month, 2) {
            return Err(not_a_month());
        }
        let year: i32 = year
            .parse()
            .map_err(|_| format!("'{}' has an invalid year", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("'{}' has an invalid month", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("'{}' has a month outside 1-12", s));
        }
        YearMonth::new(year, month).ok_or_else(|| {
            format!(
                "'{}' has a year outside {}-{}",
                s,
                YearMonth::MIN_YEAR,
                YearMonth::MAX_YEAR
            )
        })
    }
}

/// Identity of an edit set: a page, or a page restricted to one month.
///
/// The display form is the title, followed by ` yyyy-mm` for month sets.
/// Parsing treats a trailing ` yyyy-mm` (exactly four and two digits) as the
/// month, so a whole-page key whose title itself ends that way, such as
/// `Election 2020-11`, reads back as a month key. Titles ending in anything
/// looser, like `Title 2021-1`, always stay whole-page keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetKey {
    pub title: String,
    pub month: Option<YearMonth>,
}

impl SetKey {
    pub fn page(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            month: None,
        }
    }

    pub fn page_month(title: impl Into<String>, month: YearMonth) -> Self {
        Self {
            title: title.into(),
            month: Some(month),
        }
    }
}

impl fmt::Display for SetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{} {}", self.title, month),
            None => write!(f, "{}", self.title),
        }
    }
}

impl FromStr for SetKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty edit set key".to_string());
        }
        if let Some((title, suffix)) = s.rsplit_once(' ') {
            if let Ok(month) = suffix.parse::<YearMonth>() {
                return Ok(SetKey::page_month(title, month));
            }
        }
        Ok(SetKey::page(s))
    }
}

// Keys serialize as their display form so they can be JSON object keys.
impl Serialize for SetKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SetKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Edit sets analysed together as one batch, keyed by identity.
pub type EditSets = BTreeMap<SetKey, Vec<Edit>>;
