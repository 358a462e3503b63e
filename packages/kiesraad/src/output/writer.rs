//! CSV writers.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::sanitize_file_stem;
use crate::error::Result;
use crate::normalize::{ResultRow, ResultTable, StationTable};
use crate::pages::PageResult;
use crate::pipeline::ParseOutcome;
use crate::types::{CandidateListEntry, Count};

/// File name of the candidate list table.
pub const CANDIDATE_LIST_FILE: &str = "candidate_list.csv";

/// Suffix of the turnout table of a municipality.
pub const STATIONS_SUFFIX: &str = "_stations";

const RESULT_HEADER: [&str; 19] = [
    "municipality",
    "election_id",
    "election_name",
    "election_category",
    "election_domain_name",
    "election_domain_id",
    "election_date",
    "contest_name",
    "managing_authority",
    "managing_authority_id",
    "reporting_unit_id",
    "reporting_unit_name",
    "postcode",
    "party_id",
    "party_name",
    "candidate_id",
    "candidate_shortcode",
    "votes",
    "reconciliation",
];

const STATION_HEADER: [&str; 15] = [
    "municipality",
    "election_id",
    "election_name",
    "election_category",
    "election_domain_name",
    "election_domain_id",
    "election_date",
    "contest_name",
    "managing_authority",
    "managing_authority_id",
    "reporting_unit_id",
    "reporting_unit_name",
    "postcode",
    "cast",
    "total_counted",
];

const CANDIDATE_HEADER: [&str; 13] = [
    "election_id",
    "election_name",
    "election_date",
    "contest_name",
    "party_id",
    "party_name",
    "candidate_id",
    "first_name",
    "last_name",
    "initials",
    "prefix",
    "gender",
    "locality",
];

const PAGE_HEADER: [&str; 7] = [
    "election",
    "province",
    "municipality",
    "electorate",
    "turnout",
    "blank",
    "invalid",
];

/// Result row representation for CSV serialization.
#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    municipality: &'a str,
    election_id: &'a str,
    election_name: Option<&'a str>,
    election_category: Option<&'a str>,
    election_domain_name: Option<&'a str>,
    election_domain_id: Option<&'a str>,
    election_date: Option<&'a str>,
    contest_name: Option<&'a str>,
    managing_authority: Option<&'a str>,
    managing_authority_id: Option<&'a str>,
    reporting_unit_id: Option<&'a str>,
    reporting_unit_name: Option<&'a str>,
    postcode: Option<&'a str>,
    party_id: &'a str,
    party_name: &'a str,
    candidate_id: Option<&'a str>,
    candidate_shortcode: Option<&'a str>,
    votes: Option<u64>,
    reconciliation: Option<String>,
}

impl<'a> From<&'a ResultRow> for ResultRecord<'a> {
    fn from(row: &'a ResultRow) -> Self {
        let election = &row.election;
        Self {
            municipality: &row.municipality,
            election_id: &election.election_id,
            election_name: election.election_name.as_deref(),
            election_category: election.election_category.as_deref(),
            election_domain_name: election.domain_name.as_deref(),
            election_domain_id: election.domain_id.as_deref(),
            election_date: election.election_date.as_deref(),
            contest_name: row.contest.as_deref(),
            managing_authority: election.managing_authority.as_deref(),
            managing_authority_id: election.managing_authority_id.as_deref(),
            reporting_unit_id: row.unit_id.as_deref(),
            reporting_unit_name: row.unit_name.as_deref(),
            postcode: row.postcode.as_deref(),
            party_id: &row.party_id,
            party_name: &row.party_name,
            candidate_id: row.candidate_id.as_deref(),
            candidate_shortcode: row.candidate_shortcode.as_deref(),
            votes: row.votes.value(),
            reconciliation: row.reconciliation.map(|w| w.to_string()),
        }
    }
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer)
}

/// Missing counts are written as empty cells.
fn count_cell(count: Count) -> String {
    count.value().map(|n| n.to_string()).unwrap_or_default()
}

/// Write a result table as CSV.
///
/// The header is always written, so an empty table gives a header-only file.
pub fn write_result_table<W: Write>(table: &ResultTable, writer: W) -> Result<()> {
    let mut csv = csv_writer(writer);
    csv.write_record(RESULT_HEADER)?;
    for row in &table.rows {
        csv.serialize(ResultRecord::from(row))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write a turnout table as CSV, one column per rejected/uncounted reason.
pub fn write_station_table<W: Write>(table: &StationTable, writer: W) -> Result<()> {
    let mut csv = csv_writer(writer);

    let header = STATION_HEADER
        .iter()
        .map(|s| (*s).to_string())
        .chain(table.reason_columns.iter().cloned());
    csv.write_record(header)?;

    for row in &table.rows {
        let election = &row.election;
        let fixed = [
            row.municipality.clone(),
            election.election_id.clone(),
            election.election_name.clone().unwrap_or_default(),
            election.election_category.clone().unwrap_or_default(),
            election.domain_name.clone().unwrap_or_default(),
            election.domain_id.clone().unwrap_or_default(),
            election.election_date.clone().unwrap_or_default(),
            row.contest.clone().unwrap_or_default(),
            election.managing_authority.clone().unwrap_or_default(),
            election.managing_authority_id.clone().unwrap_or_default(),
            row.unit_id.clone().unwrap_or_default(),
            row.unit_name.clone().unwrap_or_default(),
            row.postcode.clone().unwrap_or_default(),
            count_cell(row.cast),
            count_cell(row.total_counted),
        ];
        csv.write_record(fixed.into_iter().chain(row.reasons.iter().map(|c| count_cell(*c))))?;
    }

    csv.flush()?;
    Ok(())
}

/// Write candidate list entries as CSV.
pub fn write_candidate_list<W: Write>(entries: &[CandidateListEntry], writer: W) -> Result<()> {
    let mut csv = csv_writer(writer);
    csv.write_record(CANDIDATE_HEADER)?;
    for entry in entries {
        csv.serialize(entry)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write results pages as CSV, one row per municipality.
///
/// Parties become columns in the order they are first seen; a party missing
/// from a page leaves its cell empty.
pub fn write_page_results<W: Write>(results: &[PageResult], writer: W) -> Result<()> {
    let mut parties: Vec<&str> = Vec::new();
    for result in results {
        for (party, _) in &result.parties {
            if !parties.contains(&party.as_str()) {
                parties.push(party);
            }
        }
    }

    let mut csv = csv_writer(writer);
    csv.write_record(PAGE_HEADER.iter().copied().chain(parties.iter().copied()))?;

    for result in results {
        let fixed = [
            result.election.clone(),
            result.province.clone(),
            result.municipality.clone(),
            result.electorate.to_string(),
            result.turnout.to_string(),
            result.blank.to_string(),
            result.invalid.to_string(),
        ];
        let values = parties.iter().map(|party| {
            result
                .parties
                .iter()
                .find(|(name, _)| name.as_str() == *party)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        });
        csv.write_record(fixed.into_iter().chain(values))?;
    }

    csv.flush()?;
    Ok(())
}

/// Write `content` to `path` through a temp file in the same directory.
///
/// Writes to the temp file, syncs it to disk, then renames it over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_file = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = File::create(&temp_file)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&temp_file, path)?;
    Ok(())
}

/// Save every table of a [`ParseOutcome`] below `target`.
///
/// Writes `<municipality>.csv` and `<municipality>_stations.csv` per
/// municipality, plus [`CANDIDATE_LIST_FILE`] when candidate lists were
/// collected. Municipality names are sanitized for use as file names.
///
/// # Returns
/// Paths of the written files, in write order.
pub fn save_outcome(outcome: &ParseOutcome, target: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(target)?;

    let mut written = Vec::new();
    let mut stems: HashSet<String> = HashSet::new();

    for (municipality, tables) in &outcome.results {
        let stem = unique_stem(sanitize_file_stem(municipality), &mut stems);

        let mut buffer = Vec::new();
        write_result_table(&tables.results, &mut buffer)?;
        let path = target.join(format!("{stem}.csv"));
        write_atomic(&path, &buffer)?;
        written.push(path);

        let mut buffer = Vec::new();
        write_station_table(&tables.stations, &mut buffer)?;
        let path = target.join(format!("{stem}{STATIONS_SUFFIX}.csv"));
        write_atomic(&path, &buffer)?;
        written.push(path);

        tracing::debug!(municipality = %municipality, stem = %stem, "Wrote municipality tables");
    }

    if let Some(candidates) = &outcome.candidates {
        let mut buffer = Vec::new();
        write_candidate_list(candidates, &mut buffer)?;
        let path = target.join(CANDIDATE_LIST_FILE);
        write_atomic(&path, &buffer)?;
        written.push(path);
    }

    Ok(written)
}

/// Save results pages as one CSV file, creating its directory when needed.
pub fn save_page_results(results: &[PageResult], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut buffer = Vec::new();
    write_page_results(results, &mut buffer)?;
    write_atomic(path, &buffer)
}

/// Municipality keys that sanitize to the same stem get a numeric suffix.
fn unique_stem(stem: String, seen: &mut HashSet<String>) -> String {
    let mut candidate = stem.clone();
    let mut n = 2;
    while seen.contains(&candidate) {
        candidate = format!("{stem}_{n}");
        n += 1;
    }
    if candidate != stem {
        tracing::warn!(stem = %stem, file = %candidate, "File name already taken");
    }
    seen.insert(candidate.clone());
    candidate
}
