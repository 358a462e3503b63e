//! Core data types shared by the pipelines.

use std::fmt;

use serde::Serialize;

use crate::config::{is_not_applicable, validate_election_id};
use crate::error::{KiesraadError, Result};

/// Identifies one election, e.g. `TK2017` held on 2017-03-15.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionDataset {
    /// Election identifier (`ElectionIdentifier/@Id`).
    pub id: String,

    /// Human readable election name (optional).
    pub name: Option<String>,

    /// Election date in YYYY-MM-DD format (optional).
    pub date: Option<String>,
}

impl ElectionDataset {
    /// Create a dataset from a validated identifier.
    ///
    /// # Examples
    /// ```
    /// use kiesraad::types::ElectionDataset;
    ///
    /// let dataset = ElectionDataset::new("TK2017").unwrap().with_date("2017-03-15");
    /// assert_eq!(dataset.label(), "TK2017 (2017-03-15)");
    /// assert!(ElectionDataset::new("2017").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_election_id(&id)?;
        Ok(Self {
            id,
            name: None,
            date: None,
        })
    }

    /// Set the election name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the election date.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Short label for display, e.g. `TK2017 (2017-03-15)`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.date {
            Some(date) => format!("{} ({date})", self.id),
            None => self.id.clone(),
        }
    }
}

/// A vote (or seat) count that may be missing.
///
/// Zero is a valid count. A count that the source marks as not applicable,
/// or leaves out entirely, is `NotReported` and never treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Count {
    /// A reported non-negative count.
    Reported(u64),

    /// Absent, redacted or not applicable.
    #[default]
    NotReported,
}

impl Count {
    /// Parse count text from an EML element.
    ///
    /// # Arguments
    /// * `text` - Raw element text
    /// * `context` - Description of where the count was found, used in errors
    ///
    /// # Examples
    /// ```
    /// use kiesraad::types::Count;
    ///
    /// assert_eq!(Count::parse("0", "test").unwrap(), Count::Reported(0));
    /// assert_eq!(Count::parse(" 1200 ", "test").unwrap(), Count::Reported(1200));
    /// assert_eq!(Count::parse("n.v.t.", "test").unwrap(), Count::NotReported);
    /// assert!(Count::parse("-3", "test").is_err());
    /// ```
    pub fn parse(text: &str, context: &str) -> Result<Self> {
        if is_not_applicable(text) {
            return Ok(Self::NotReported);
        }
        text.trim()
            .parse::<u64>()
            .map(Self::Reported)
            .map_err(|_| KiesraadError::InvalidCount {
                value: text.trim().to_string(),
                context: context.to_string(),
            })
    }

    /// The count, if reported.
    #[must_use]
    pub fn value(self) -> Option<u64> {
        match self {
            Self::Reported(n) => Some(n),
            Self::NotReported => None,
        }
    }

    /// Whether a count was reported.
    #[must_use]
    pub fn is_reported(self) -> bool {
        matches!(self, Self::Reported(_))
    }

    /// Sum counts, or `None` if any of them is not reported or the sum
    /// does not fit in a `u64`.
    ///
    /// An empty iterator sums to `Some(0)`.
    pub fn sum_reported(counts: impl IntoIterator<Item = Count>) -> Option<u64> {
        counts
            .into_iter()
            .try_fold(0u64, |acc, count| acc.checked_add(count.value()?))
    }
}

impl From<Option<u64>> for Count {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::NotReported, Self::Reported)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported(n) => write!(f, "{n}"),
            Self::NotReported => f.write_str("n.v.t."),
        }
    }
}

/// A candidate from an EML 230 candidate list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateListEntry {
    pub election_id: String,
    pub election_name: Option<String>,
    pub election_date: Option<String>,
    pub contest_name: Option<String>,
    pub party_id: Option<String>,
    pub party_name: Option<String>,
    pub candidate_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub initials: Option<String>,
    pub prefix: Option<String>,
    pub gender: Option<String>,
    pub locality: Option<String>,
}
