//! Processing of a whole election directory.
//!
//! Ties the locator, parser and normalizer together: every municipal count
//! file is parsed on its own, so one broken file only loses that
//! municipality.

use std::collections::BTreeMap;
use std::path::Path;

use crate::candidates::collect_candidate_lists;
use crate::config::validate_date;
use crate::definition::find_election_dataset;
use crate::eml::{parse_count_file, EmlDocument};
use crate::error::{DiscoveryError, FileFailure, Result};
use crate::locator::locate_count_files;
use crate::normalize::{normalize, station_table, Granularity, ResultTable, StationTable};
use crate::types::{CandidateListEntry, ElectionDataset};

/// Tables produced for one municipality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MunicipalityResults {
    pub results: ResultTable,
    pub stations: StationTable,
}

/// Everything produced by [`process_directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Election the directory belongs to, when it could be determined.
    pub dataset: Option<ElectionDataset>,

    /// Tables per municipality key, ordered by key.
    pub results: BTreeMap<String, MunicipalityResults>,

    /// Count files that could not be read or parsed.
    pub failures: Vec<FileFailure>,

    /// XML files that were not taken as count files.
    pub skipped: Vec<DiscoveryError>,

    /// Candidate lists, only collected at candidate granularity.
    pub candidates: Option<Vec<CandidateListEntry>>,
}

impl ParseOutcome {
    /// Total number of result rows over all municipalities.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.results.values().map(|m| m.results.len()).sum()
    }

    /// Total number of reconciliation warnings over all municipalities.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.results.values().map(|m| m.results.warnings.len()).sum()
    }
}

/// Parse and normalize every municipal count file below `source`.
///
/// # Arguments
/// * `source` - Directory holding the EML files of one election
/// * `granularity` - Party totals only, or per-candidate rows
///
/// # Returns
/// A [`ParseOutcome`]. Only a missing or unreadable `source` is an error;
/// files that fail to parse end up in [`ParseOutcome::failures`].
pub fn process_directory(source: &Path, granularity: Granularity) -> Result<ParseOutcome> {
    let discovery = locate_count_files(source)?;

    let mut outcome = ParseOutcome {
        dataset: find_election_dataset(source)?,
        skipped: discovery.skipped,
        ..ParseOutcome::default()
    };

    for (municipality, path) in &discovery.documents {
        let document = match parse_count_file(path) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(municipality = %municipality, path = %path.display(), error = %e, "Cannot parse count file");
                outcome.failures.push(FileFailure {
                    municipality: municipality.clone(),
                    path: path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if outcome.dataset.is_none() {
            outcome.dataset = dataset_from_document(&document);
        }

        let results = normalize(&document, municipality, granularity);
        tracing::debug!(municipality = %municipality, rows = results.len(), "Normalized count file");

        outcome.results.insert(
            municipality.clone(),
            MunicipalityResults {
                results,
                stations: station_table(&document, municipality),
            },
        );
    }

    if granularity == Granularity::Candidate {
        outcome.candidates = Some(collect_candidate_lists(source)?);
    }

    Ok(outcome)
}

/// Fall back to the election named in a count file.
fn dataset_from_document(document: &EmlDocument) -> Option<ElectionDataset> {
    let election = &document.election;
    match ElectionDataset::new(&election.id) {
        Ok(mut dataset) => {
            if let Some(name) = &election.name {
                dataset = dataset.with_name(name);
            }
            if let Some(date) = election.date.as_deref().filter(|d| validate_date(d).is_ok()) {
                dataset = dataset.with_date(date);
            }
            Some(dataset)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring election identifier of count file");
            None
        }
    }
}
