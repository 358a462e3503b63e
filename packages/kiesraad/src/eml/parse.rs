//! Parser for EML 510 count files (`Telling_*.xml`).

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use roxmltree::{Document, Node};

use super::tree::{
    CandidateResultNode, Contest, ElectionMetadata, EmlDocument, ManagingAuthority,
    PartyResultNode, ReasonCount, ReportingUnitNode,
};
use crate::error::{KiesraadError, Result};
use crate::types::Count;
use crate::xml::{
    child_text, element_children, find_by_path, find_child, find_children, get_attribute,
    get_tag_name, get_text, read_xml_file,
};

/// Station names may end in `(postcode: 1011 PN)`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static POSTCODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\(postcode: (.*?)\)").expect("valid regex"));

/// Split a polling station name into name and postcode.
///
/// # Examples
/// ```
/// use kiesraad::eml::extract_postcode;
///
/// assert_eq!(
///     extract_postcode("Stembureau Stadhuis (postcode: 1011 PN)"),
///     ("Stembureau Stadhuis".to_string(), Some("1011 PN".to_string()))
/// );
/// assert_eq!(extract_postcode("Briefstembureau"), ("Briefstembureau".to_string(), None));
/// ```
pub fn extract_postcode(station_name: &str) -> (String, Option<String>) {
    match POSTCODE_PATTERN.captures(station_name) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let postcode = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            (name, postcode)
        }
        None => (station_name.trim().to_string(), None),
    }
}

/// Read and parse a count file from disk.
pub fn parse_count_file(path: &Path) -> Result<EmlDocument> {
    let xml = read_xml_file(path)?;
    parse_count(&xml)
}

/// Parse the XML text of a count file.
///
/// The root element must be `EML`. `Count/Election/ElectionIdentifier` (with an `Id`) and
/// `Count/Election/Contests` must be present. Everything below the contests
/// is optional: a contest without reporting units yields an empty contest,
/// and a reporting unit without candidate selections has parties with an
/// empty candidate breakdown.
pub fn parse_count(xml: &str) -> Result<EmlDocument> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    if get_tag_name(root) != "EML" {
        return Err(KiesraadError::missing("EML", "document"));
    }

    let count = find_child(root, "Count").ok_or_else(|| KiesraadError::missing("Count", "EML"))?;
    let election =
        find_child(count, "Election").ok_or_else(|| KiesraadError::missing("Election", "Count"))?;

    let election_meta = parse_election_identifier(election)?;
    let authority = parse_managing_authority(root);

    let contests_node = find_child(election, "Contests")
        .ok_or_else(|| KiesraadError::missing("Contests", "Count/Election"))?;

    let contests = find_children(contests_node, "Contest")
        .map(parse_contest)
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        election = %election_meta.id,
        contests = contests.len(),
        "Parsed count file"
    );

    Ok(EmlDocument {
        election: election_meta,
        authority,
        contests,
    })
}

/// Parse `ElectionIdentifier`, shared with the definition and candidate list readers.
pub(crate) fn parse_election_identifier(election: Node<'_, '_>) -> Result<ElectionMetadata> {
    let identifier = find_child(election, "ElectionIdentifier")
        .ok_or_else(|| KiesraadError::missing("ElectionIdentifier", "Election"))?;

    let id = get_attribute(identifier, "Id")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| KiesraadError::missing("ElectionIdentifier/@Id", "Election"))?
        .to_string();

    // ElectionDomain is either plain text or text with an Id attribute
    let (domain_id, domain_name) = match find_child(identifier, "ElectionDomain") {
        Some(domain) => (
            get_attribute(domain, "Id").map(String::from),
            Some(get_text(domain)).filter(|s| !s.is_empty()),
        ),
        None => (None, None),
    };

    Ok(ElectionMetadata {
        id,
        name: child_text(identifier, "ElectionName"),
        category: child_text(identifier, "ElectionCategory"),
        domain_id,
        domain_name,
        date: child_text(identifier, "ElectionDate"),
    })
}

fn parse_managing_authority(root: Node<'_, '_>) -> ManagingAuthority {
    match find_by_path(root, "ManagingAuthority/AuthorityIdentifier") {
        Some(node) => ManagingAuthority {
            id: get_attribute(node, "Id").map(String::from),
            name: Some(get_text(node)).filter(|s| !s.is_empty()),
        },
        None => ManagingAuthority::default(),
    }
}

fn parse_contest(contest: Node<'_, '_>) -> Result<Contest> {
    let identifier = find_child(contest, "ContestIdentifier");
    let id = identifier.and_then(|n| get_attribute(n, "Id")).map(String::from);
    let name = identifier.and_then(|n| child_text(n, "ContestName"));

    let units = find_children(contest, "ReportingUnitVotes")
        .map(parse_reporting_unit)
        .collect::<Result<Vec<_>>>()?;

    Ok(Contest { id, name, units })
}

fn parse_reporting_unit(unit: Node<'_, '_>) -> Result<ReportingUnitNode> {
    let identifier = find_child(unit, "ReportingUnitIdentifier");
    let id = identifier.and_then(|n| get_attribute(n, "Id")).map(String::from);
    let (name, postcode) = match identifier.map(get_text).filter(|s| !s.is_empty()) {
        Some(raw) => {
            let (name, postcode) = extract_postcode(&raw);
            (Some(name).filter(|s| !s.is_empty()), postcode)
        }
        None => (None, None),
    };

    let context = id.clone().unwrap_or_else(|| "ReportingUnitVotes".to_string());

    let mut parties: Vec<PartyResultNode> = Vec::new();
    let mut rejected = Vec::new();
    let mut uncounted = Vec::new();
    let mut cast = Count::NotReported;
    let mut total_counted = Count::NotReported;

    for child in element_children(unit) {
        match get_tag_name(child) {
            "Selection" => parse_selection(child, &mut parties, &context)?,
            "Cast" => cast = Count::parse(&get_text(child), &format!("Cast of {context}"))?,
            "TotalCounted" => {
                total_counted =
                    Count::parse(&get_text(child), &format!("TotalCounted of {context}"))?;
            }
            "RejectedVotes" => rejected.push(parse_reason_count(child, &context)?),
            "UncountedVotes" => uncounted.push(parse_reason_count(child, &context)?),
            _ => {}
        }
    }

    Ok(ReportingUnitNode {
        id,
        name,
        postcode,
        cast,
        total_counted,
        rejected,
        uncounted,
        parties,
    })
}

/// Handle one `Selection`.
///
/// Party selections open a new party; candidate selections attach to the
/// party opened most recently.
fn parse_selection(
    selection: Node<'_, '_>,
    parties: &mut Vec<PartyResultNode>,
    context: &str,
) -> Result<()> {
    let votes_text = find_child(selection, "ValidVotes").map(get_text);

    if let Some(affiliation) = find_child(selection, "AffiliationIdentifier") {
        let id = get_attribute(affiliation, "Id").unwrap_or_default().to_string();
        let name = child_text(affiliation, "RegisteredName").unwrap_or_else(|| id.clone());
        let votes = parse_votes(votes_text.as_deref(), &format!("ValidVotes of {name} in {context}"))?;
        parties.push(PartyResultNode {
            id,
            name,
            votes,
            candidates: Vec::new(),
        });
        return Ok(());
    }

    if let Some(candidate) = find_child(selection, "Candidate") {
        let identifier = find_child(candidate, "CandidateIdentifier");
        let id = identifier
            .and_then(|n| get_attribute(n, "Id"))
            .unwrap_or_default()
            .to_string();
        let shortcode = identifier.and_then(|n| get_attribute(n, "ShortCode")).map(String::from);
        let votes = parse_votes(
            votes_text.as_deref(),
            &format!("ValidVotes of candidate {id} in {context}"),
        )?;

        match parties.last_mut() {
            Some(party) => party.candidates.push(CandidateResultNode {
                id,
                shortcode,
                votes,
            }),
            None => {
                tracing::warn!(
                    unit = context,
                    candidate = %id,
                    "Candidate selection without a preceding party, skipping"
                );
            }
        }
    }

    Ok(())
}

fn parse_votes(text: Option<&str>, context: &str) -> Result<Count> {
    match text {
        Some(text) => Count::parse(text, context),
        None => Ok(Count::NotReported),
    }
}

fn parse_reason_count(node: Node<'_, '_>, context: &str) -> Result<ReasonCount> {
    let reason = get_attribute(node, "ReasonCode")
        .unwrap_or("onbekend")
        .trim()
        .to_lowercase();
    let count = Count::parse(&get_text(node), &format!("{reason} of {context}"))?;
    Ok(ReasonCount { reason, count })
}
