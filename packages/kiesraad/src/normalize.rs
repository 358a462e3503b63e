//! Flattening of parsed count files into result tables.

use std::fmt;

use crate::eml::{EmlDocument, PartyResultNode, ReportingUnitNode, ResultNode};
use crate::types::Count;

/// Level of detail of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One row per (reporting unit, party).
    #[default]
    Party,
    /// One row per (reporting unit, party, candidate).
    Candidate,
}

impl Granularity {
    /// Pick the granularity from a per-candidate flag.
    #[must_use]
    pub fn from_per_candidate(per_candidate: bool) -> Self {
        if per_candidate {
            Self::Candidate
        } else {
            Self::Party
        }
    }
}

/// A party subtotal that disagrees with the sum of its candidate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationWarning {
    /// Party subtotal as reported.
    pub reported: u64,
    /// Sum of the reported candidate counts.
    pub candidate_sum: u64,
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reported={} candidates={}",
            self.reported, self.candidate_sum
        )
    }
}

/// Compare a party subtotal with its candidate breakdown.
///
/// Only flags a mismatch when the subtotal and every candidate count are
/// reported. Nothing is corrected.
#[must_use]
pub fn reconcile(party: &PartyResultNode) -> Option<ReconciliationWarning> {
    let reported = party.votes.value()?;
    let candidate_sum = party.candidate_sum()?;
    (reported != candidate_sum).then_some(ReconciliationWarning {
        reported,
        candidate_sum,
    })
}

/// Election header of a count file, repeated on every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionColumns {
    pub election_id: String,
    pub election_name: Option<String>,
    pub election_category: Option<String>,
    pub domain_name: Option<String>,
    pub domain_id: Option<String>,
    pub election_date: Option<String>,
    /// Name of the managing authority, usually the municipality.
    pub managing_authority: Option<String>,
    pub managing_authority_id: Option<String>,
}

impl ElectionColumns {
    /// Take the election header and managing authority of a parsed count file.
    #[must_use]
    pub fn from_document(document: &EmlDocument) -> Self {
        let election = &document.election;
        Self {
            election_id: election.id.clone(),
            election_name: election.name.clone(),
            election_category: election.category.clone(),
            domain_name: election.domain_name.clone(),
            domain_id: election.domain_id.clone(),
            election_date: election.date.clone(),
            managing_authority: document.authority.name.clone(),
            managing_authority_id: document.authority.id.clone(),
        }
    }
}

/// One row of a result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub municipality: String,
    pub election: ElectionColumns,
    pub contest: Option<String>,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    pub postcode: Option<String>,
    pub party_id: String,
    pub party_name: String,
    /// Absent on party-level rows and on parties without candidate detail.
    pub candidate_id: Option<String>,
    pub candidate_shortcode: Option<String>,
    pub votes: Count,
    pub reconciliation: Option<ReconciliationWarning>,
}

/// A party whose subtotal did not reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedParty {
    pub unit_id: Option<String>,
    pub party_name: String,
    pub warning: ReconciliationWarning,
}

/// Party votes in one reporting unit, summed from table rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyTotal {
    pub contest: Option<String>,
    pub unit_id: Option<String>,
    pub party_id: String,
    pub votes: Count,
}

/// Normalized results of one municipality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    pub municipality: String,
    pub granularity: Granularity,
    /// Rows in document order.
    pub rows: Vec<ResultRow>,
    /// Parties flagged during normalization, in document order.
    pub warnings: Vec<FlaggedParty>,
}

impl ResultTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum rows per (contest, reporting unit, party).
    ///
    /// Rows of one party are adjacent, so grouping follows document order.
    /// A group containing a missing count sums to `NotReported`.
    #[must_use]
    pub fn party_totals(&self) -> Vec<PartyTotal> {
        let mut totals: Vec<PartyTotal> = Vec::new();

        for row in &self.rows {
            let same_group = totals.last().is_some_and(|total| {
                total.contest == row.contest
                    && total.unit_id == row.unit_id
                    && total.party_id == row.party_id
            });

            if same_group {
                if let Some(total) = totals.last_mut() {
                    total.votes = Count::from(Count::sum_reported([total.votes, row.votes]));
                }
            } else {
                totals.push(PartyTotal {
                    contest: row.contest.clone(),
                    unit_id: row.unit_id.clone(),
                    party_id: row.party_id.clone(),
                    votes: row.votes,
                });
            }
        }

        totals
    }
}

/// Flatten a parsed count file into a result table.
///
/// # Arguments
/// * `document` - Parsed count file
/// * `municipality` - Municipality key written to every row
/// * `granularity` - Party totals only, or per-candidate rows
///
/// At candidate level a party without candidate detail still produces one
/// row, with the candidate left empty and the party subtotal as votes.
pub fn normalize(document: &EmlDocument, municipality: &str, granularity: Granularity) -> ResultTable {
    let election = ElectionColumns::from_document(document);
    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    let mut unit: Option<&ReportingUnitNode> = None;
    let mut party: Option<(&PartyResultNode, Option<ReconciliationWarning>)> = None;

    for (contest, node) in document.walk() {
        match node {
            ResultNode::ReportingUnit(current) => {
                unit = Some(current);
                continue;
            }
            ResultNode::Party(current) => {
                let unit_id = unit.and_then(|u| u.id.clone());
                let reconciliation = reconcile(current);
                if let Some(warning) = reconciliation {
                    tracing::warn!(
                        municipality,
                        unit = unit_id.as_deref().unwrap_or_default(),
                        party = %current.name,
                        %warning,
                        "Party subtotal does not match candidate votes"
                    );
                    warnings.push(FlaggedParty {
                        unit_id,
                        party_name: current.name.clone(),
                        warning,
                    });
                }
                party = Some((current, reconciliation));

                // Candidate rows replace the party row
                if granularity == Granularity::Candidate && !current.candidates.is_empty() {
                    continue;
                }
            }
            ResultNode::Candidate(_) if granularity == Granularity::Party => continue,
            ResultNode::Candidate(_) => {}
        }

        let (Some(unit), Some((party, reconciliation))) = (unit, party) else {
            continue;
        };
        let candidate = match node {
            ResultNode::Candidate(candidate) => Some(candidate),
            _ => None,
        };

        rows.push(ResultRow {
            municipality: municipality.to_string(),
            election: election.clone(),
            contest: contest.name.clone(),
            unit_id: unit.id.clone(),
            unit_name: unit.name.clone(),
            postcode: unit.postcode.clone(),
            party_id: party.id.clone(),
            party_name: party.name.clone(),
            candidate_id: candidate.map(|c| c.id.clone()),
            candidate_shortcode: candidate.and_then(|c| c.shortcode.clone()),
            votes: node.votes(),
            reconciliation,
        });
    }

    ResultTable {
        municipality: municipality.to_string(),
        granularity,
        rows,
        warnings,
    }
}

/// One row per reporting unit with turnout and rejected/uncounted votes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRow {
    pub municipality: String,
    pub election: ElectionColumns,
    pub contest: Option<String>,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    pub postcode: Option<String>,
    pub cast: Count,
    pub total_counted: Count,
    /// Values aligned with [`StationTable::reason_columns`].
    pub reasons: Vec<Count>,
}

/// Turnout figures of one municipality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationTable {
    /// `rejected_<reason>` and `uncounted_<reason>` columns, in first-seen order.
    pub reason_columns: Vec<String>,
    pub rows: Vec<StationRow>,
}

/// Build the turnout table of a parsed count file.
pub fn station_table(document: &EmlDocument, municipality: &str) -> StationTable {
    let election = ElectionColumns::from_document(document);
    let mut reason_columns: Vec<String> = Vec::new();
    let mut unit_reasons: Vec<Vec<(String, Count)>> = Vec::new();

    for (_, unit) in document.reporting_units() {
        let reasons: Vec<(String, Count)> = unit
            .rejected
            .iter()
            .map(|r| (format!("rejected_{}", r.reason), r.count))
            .chain(
                unit.uncounted
                    .iter()
                    .map(|r| (format!("uncounted_{}", r.reason), r.count)),
            )
            .collect();

        for (column, _) in &reasons {
            if !reason_columns.contains(column) {
                reason_columns.push(column.clone());
            }
        }
        unit_reasons.push(reasons);
    }

    let rows = document
        .reporting_units()
        .zip(unit_reasons)
        .map(|((contest, unit), reasons)| StationRow {
            municipality: municipality.to_string(),
            election: election.clone(),
            contest: contest.name.clone(),
            unit_id: unit.id.clone(),
            unit_name: unit.name.clone(),
            postcode: unit.postcode.clone(),
            cast: unit.cast,
            total_counted: unit.total_counted,
            reasons: reason_columns
                .iter()
                .map(|column| {
                    reasons
                        .iter()
                        .find(|(name, _)| name == column)
                        .map_or(Count::NotReported, |(_, count)| *count)
                })
                .collect(),
        })
        .collect();

    StationTable {
        reason_columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eml::{
        CandidateResultNode, Contest, ElectionMetadata, ManagingAuthority, ReasonCount,
    };
    use pretty_assertions::assert_eq;

    fn party(id: &str, votes: Count, candidates: &[u64]) -> PartyResultNode {
        PartyResultNode {
            id: id.to_string(),
            name: format!("Partij {id}"),
            votes,
            candidates: candidates
                .iter()
                .enumerate()
                .map(|(i, v)| CandidateResultNode {
                    id: (i + 1).to_string(),
                    shortcode: Some(format!("K{id}_{}", i + 1)),
                    votes: Count::Reported(*v),
                })
                .collect(),
        }
    }

    fn unit(id: &str, parties: Vec<PartyResultNode>) -> ReportingUnitNode {
        ReportingUnitNode {
            id: Some(id.to_string()),
            name: Some(format!("Stembureau {id}")),
            postcode: None,
            cast: Count::Reported(200),
            total_counted: Count::Reported(198),
            rejected: Vec::new(),
            uncounted: Vec::new(),
            parties,
        }
    }

    fn document(units: Vec<ReportingUnitNode>) -> EmlDocument {
        EmlDocument {
            contests: vec![Contest {
                id: Some("alle".to_string()),
                name: Some("Test".to_string()),
                units,
            }],
            ..EmlDocument::default()
        }
    }

    fn votes(table: &ResultTable) -> Vec<Count> {
        table.rows.iter().map(|r| r.votes).collect()
    }

    #[test]
    fn test_party_level_rows() {
        let doc = document(vec![unit(
            "SB1",
            vec![
                party("1", Count::Reported(120), &[]),
                party("2", Count::Reported(80), &[]),
            ],
        )]);

        let table = normalize(&doc, "A", Granularity::Party);
        assert_eq!(votes(&table), [Count::Reported(120), Count::Reported(80)]);
        assert!(table.rows.iter().all(|r| r.candidate_id.is_none()));
        assert!(table.warnings.is_empty());
        assert_eq!(table.rows[0].municipality, "A");
        assert_eq!(table.rows[0].contest.as_deref(), Some("Test"));
    }

    #[test]
    fn test_candidate_level_rows_reconcile() {
        let doc = document(vec![unit("SB1", vec![party("1", Count::Reported(75), &[30, 45])])]);

        let table = normalize(&doc, "B", Granularity::Candidate);
        assert_eq!(votes(&table), [Count::Reported(30), Count::Reported(45)]);
        assert_eq!(table.rows[1].candidate_id.as_deref(), Some("2"));
        assert!(table.rows.iter().all(|r| r.reconciliation.is_none()));
        assert!(table.warnings.is_empty());
    }

    #[test]
    fn test_rows_carry_election_columns() {
        let mut doc = document(vec![unit("SB1", vec![party("1", Count::Reported(75), &[30, 45])])]);
        doc.election = ElectionMetadata {
            id: "GR2022".to_string(),
            name: Some("Gemeenteraad Utrecht 2022".to_string()),
            category: Some("GR".to_string()),
            domain_id: Some("0344".to_string()),
            domain_name: Some("Utrecht".to_string()),
            date: Some("2022-03-16".to_string()),
        };
        doc.authority = ManagingAuthority {
            id: Some("0344".to_string()),
            name: Some("Utrecht".to_string()),
        };

        let expected = ElectionColumns {
            election_id: "GR2022".to_string(),
            election_name: Some("Gemeenteraad Utrecht 2022".to_string()),
            election_category: Some("GR".to_string()),
            domain_name: Some("Utrecht".to_string()),
            domain_id: Some("0344".to_string()),
            election_date: Some("2022-03-16".to_string()),
            managing_authority: Some("Utrecht".to_string()),
            managing_authority_id: Some("0344".to_string()),
        };

        let table = normalize(&doc, "Utrecht", Granularity::Candidate);
        assert!(table.rows.iter().all(|r| r.election == expected));
        assert_eq!(table.rows[1].candidate_shortcode.as_deref(), Some("K1_2"));

        let party_rows = normalize(&doc, "Utrecht", Granularity::Party);
        assert_eq!(party_rows.rows[0].candidate_shortcode, None);

        let stations = station_table(&doc, "Utrecht");
        assert_eq!(stations.rows[0].election, expected);
    }

    #[test]
    fn test_multiple_contests_keep_their_names() {
        let mut doc = document(vec![unit("SB1", vec![party("1", Count::Reported(3), &[])])]);
        doc.contests.push(Contest {
            id: Some("2".to_string()),
            name: Some("Tweede".to_string()),
            units: vec![unit("SB1", vec![party("1", Count::Reported(4), &[])])],
        });

        let table = normalize(&doc, "H", Granularity::Party);
        let contests: Vec<Option<&str>> = table.rows.iter().map(|r| r.contest.as_deref()).collect();
        assert_eq!(contests, [Some("Test"), Some("Tweede")]);
        assert_eq!(votes(&table), [Count::Reported(3), Count::Reported(4)]);
    }

    #[test]
    fn test_candidate_level_mismatch_is_flagged() {
        let doc = document(vec![unit("SB1", vec![party("1", Count::Reported(80), &[30, 45])])]);

        let table = normalize(&doc, "B", Granularity::Candidate);
        let expected = ReconciliationWarning {
            reported: 80,
            candidate_sum: 75,
        };

        // Counts are returned unchanged
        assert_eq!(votes(&table), [Count::Reported(30), Count::Reported(45)]);
        assert!(table.rows.iter().all(|r| r.reconciliation == Some(expected)));
        assert_eq!(table.warnings.len(), 1);
        assert_eq!(table.warnings[0].warning.to_string(), "reported=80 candidates=75");
    }

    #[test]
    fn test_party_level_mismatch_is_flagged() {
        let doc = document(vec![unit("SB1", vec![party("1", Count::Reported(80), &[30, 45])])]);

        let table = normalize(&doc, "B", Granularity::Party);
        assert_eq!(votes(&table), [Count::Reported(80)]);
        assert!(table.rows[0].reconciliation.is_some());
    }

    #[test]
    fn test_candidate_level_keeps_parties_without_detail() {
        let doc = document(vec![unit(
            "SB1",
            vec![
                party("1", Count::Reported(75), &[30, 45]),
                party("2", Count::Reported(12), &[]),
            ],
        )]);

        let table = normalize(&doc, "B", Granularity::Candidate);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2].party_id, "2");
        assert_eq!(table.rows[2].candidate_id, None);
        assert_eq!(table.rows[2].votes, Count::Reported(12));
    }

    #[test]
    fn test_zero_missing_and_absent_are_distinct() {
        let doc = document(vec![unit(
            "SB1",
            vec![
                party("1", Count::Reported(0), &[]),
                party("2", Count::NotReported, &[]),
            ],
        )]);

        let table = normalize(&doc, "C", Granularity::Party);
        assert_eq!(votes(&table), [Count::Reported(0), Count::NotReported]);
        assert!(!table.rows.iter().any(|r| r.party_id == "3"));
    }

    #[test]
    fn test_no_reporting_units_gives_empty_table() {
        let doc = document(Vec::new());
        let table = normalize(&doc, "D", Granularity::Candidate);
        assert!(table.is_empty());
        assert_eq!(table.municipality, "D");
    }

    #[test]
    fn test_party_totals_round_trip() {
        let doc = document(vec![
            unit("SB1", vec![party("1", Count::Reported(75), &[30, 45]), party("2", Count::Reported(5), &[])]),
            unit("SB2", vec![party("1", Count::Reported(10), &[4, 6])]),
        ]);

        let by_party = normalize(&doc, "E", Granularity::Party).party_totals();
        let by_candidate = normalize(&doc, "E", Granularity::Candidate).party_totals();
        assert_eq!(by_party, by_candidate);
        assert_eq!(by_party.len(), 3);
    }

    #[test]
    fn test_party_totals_with_missing_candidate_count() {
        let mut p = party("1", Count::Reported(75), &[30]);
        p.candidates.push(CandidateResultNode {
            id: "2".to_string(),
            shortcode: None,
            votes: Count::NotReported,
        });
        let doc = document(vec![unit("SB1", vec![p])]);

        let table = normalize(&doc, "F", Granularity::Candidate);
        assert!(table.warnings.is_empty());
        assert_eq!(table.party_totals()[0].votes, Count::NotReported);
    }

    #[test]
    fn test_station_table_columns() {
        let mut first = unit("SB1", Vec::new());
        first.rejected = vec![ReasonCount {
            reason: "blanco".to_string(),
            count: Count::Reported(2),
        }];
        let mut second = unit("SB2", Vec::new());
        second.uncounted = vec![ReasonCount {
            reason: "geldige stempassen".to_string(),
            count: Count::Reported(190),
        }];

        let table = station_table(&document(vec![first, second]), "G");
        assert_eq!(
            table.reason_columns,
            ["rejected_blanco", "uncounted_geldige stempassen"]
        );
        assert_eq!(table.rows[0].reasons, [Count::Reported(2), Count::NotReported]);
        assert_eq!(table.rows[1].reasons, [Count::NotReported, Count::Reported(190)]);
        assert_eq!(table.rows[1].cast, Count::Reported(200));
    }

    #[test]
    fn test_granularity_from_flag() {
        assert_eq!(Granularity::from_per_candidate(true), Granularity::Candidate);
        assert_eq!(Granularity::from_per_candidate(false), Granularity::Party);
    }
}
