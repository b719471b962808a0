//! Account profiles
//!
//! Summarises the recent contributions of an account: when it edits
//! (hour-of-day histograms split by mobile and non-mobile edits) and what
//! it adds and removes (most frequent words). Profiles for a
//! flagged-accounts file are ordered by registration date.

mod words;

pub use words::{is_stopword, top_words, words, WordCount};

use crate::cache::FlaggedAccounts;
use crate::history::EditFetcher;
use crate::models::Edit;
use crate::wiki::WikiResult;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Change tag MediaWiki puts on edits from the mobile site
pub const MOBILE_TAG: &str = "mobile web edit";

pub const DEFAULT_CONTRIBUTIONS: usize = 20;
pub const DEFAULT_TOP_WORDS: usize = 15;

/// Edits per UTC hour of day.
pub type HourHistogram = [usize; 24];

pub fn hour_histogram<'a, I>(edits: I) -> HourHistogram
where
    I: IntoIterator<Item = &'a Edit>,
{
    let mut hours = [0usize; 24];
    for edit in edits {
        hours[edit.timestamp.hour() as usize] += 1;
    }
    hours
}

/// Hour-of-day histograms split by editing surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditHours {
    pub mobile: HourHistogram,
    pub non_mobile: HourHistogram,
}

impl EditHours {
    pub fn from_edits(edits: &[Edit]) -> Self {
        Self {
            mobile: hour_histogram(edits.iter().filter(|e| e.has_tag(MOBILE_TAG))),
            non_mobile: hour_histogram(edits.iter().filter(|e| !e.has_tag(MOBILE_TAG))),
        }
    }

    pub fn total(&self) -> usize {
        self.mobile.iter().chain(self.non_mobile.iter()).sum()
    }
}

/// What an account's recent contributions look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub username: String,
    /// Whether the account exists (IP editors and deleted accounts do not)
    pub registered: bool,
    pub registration: Option<DateTime<Utc>>,
    pub edit_count: Option<u64>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Edit sets where the account was flagged
    #[serde(default)]
    pub flagged_sets: Vec<String>,
    /// Contributions examined
    pub contributions: usize,
    pub hours: EditHours,
    pub top_added: Vec<WordCount>,
    pub top_removed: Vec<WordCount>,
}

/// Builds [`AccountProfile`]s from an account's recent contributions.
pub struct ProfileBuilder<'a> {
    fetcher: &'a EditFetcher,
    contributions: usize,
    top_words: usize,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(fetcher: &'a EditFetcher) -> Self {
        Self {
            fetcher,
            contributions: DEFAULT_CONTRIBUTIONS,
            top_words: DEFAULT_TOP_WORDS,
        }
    }

    /// Number of most recent contributions to examine.
    pub fn with_contributions(mut self, contributions: usize) -> Self {
        self.contributions = contributions;
        self
    }

    pub fn with_top_words(mut self, top_words: usize) -> Self {
        self.top_words = top_words;
        self
    }

    /// Profile one account.
    pub fn build(&self, username: &str, flagged_sets: Vec<String>) -> WikiResult<AccountProfile> {
        let api = self.fetcher.api();
        let info = api.user(username)?;

        let records = api
            .user_contributions(username, self.contributions)?
            .into_iter()
            .map(|c| {
                let mut record = c.revision;
                if record.user.is_none() {
                    record.user = Some(username.to_string());
                }
                record
            })
            .collect();
        let edits = self.fetcher.edits_for_records(records)?;

        let added: Vec<&String> = edits.iter().flat_map(|e| e.added.iter()).collect();
        let removed: Vec<&String> = edits.iter().flat_map(|e| e.removed.iter()).collect();

        Ok(AccountProfile {
            username: username.to_string(),
            registered: info.is_some(),
            registration: info.as_ref().and_then(|i| i.registration),
            edit_count: info.as_ref().map(|i| i.edit_count),
            groups: info.map(|i| i.groups).unwrap_or_default(),
            flagged_sets,
            contributions: edits.len(),
            hours: EditHours::from_edits(&edits),
            top_added: top_words(added, self.top_words),
            top_removed: top_words(removed, self.top_words),
        })
    }

    /// Profile every flagged account, oldest registration first.
    ///
    /// Accounts that fail to load are logged and skipped.
    pub fn build_flagged(&self, flagged: &FlaggedAccounts) -> Vec<AccountProfile> {
        let mut profiles = Vec::with_capacity(flagged.len());
        for (username, sets) in flagged.iter() {
            match self.build(username, sets.iter().cloned().collect()) {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!("Skipping profile for '{}': {}", username, e),
            }
        }
        sort_by_registration(&mut profiles);
        info!("Built {} account profile(s)", profiles.len());
        profiles
    }
}

/// Oldest registration first; unknown registrations last, by username.
pub fn sort_by_registration(profiles: &mut [AccountProfile]) {
    profiles.sort_by(|a, b| match (a.registration, b.registration) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.username.cmp(&b.username)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.username.cmp(&b.username),
    });
}
