//! Candidate list files (`Kandidatenlijsten_*.xml`, EML 230).
//!
//! Name and address parts use xNL/xAL elements whose namespace prefix
//! differs between publications; lookups go by local name only.

use std::path::Path;

use roxmltree::{Document, Node};

use crate::config::CANDIDATE_LIST_FILE_PREFIX;
use crate::eml::parse_election_identifier;
use crate::error::{KiesraadError, Result};
use crate::locator::find_xml_files;
use crate::types::CandidateListEntry;
use crate::xml::{
    child_text, find_by_path, find_child, find_children, get_attribute, get_text, read_xml_file,
};

/// Parse all candidates of a candidate list file.
pub fn parse_candidate_list(xml: &str) -> Result<Vec<CandidateListEntry>> {
    let doc = Document::parse(xml)?;
    let election = find_by_path(doc.root_element(), "CandidateList/Election")
        .ok_or_else(|| KiesraadError::missing("CandidateList/Election", "EML"))?;

    let meta = parse_election_identifier(election)?;
    let mut entries = Vec::new();

    for contest in find_children(election, "Contest") {
        let contest_name = find_child(contest, "ContestIdentifier")
            .and_then(|n| child_text(n, "ContestName"));

        for affiliation in find_children(contest, "Affiliation") {
            let identifier = find_child(affiliation, "AffiliationIdentifier");
            let party_id = identifier.and_then(|n| get_attribute(n, "Id")).map(String::from);
            let party_name = identifier
                .and_then(|n| child_text(n, "RegisteredName"))
                .or_else(|| party_id.clone());

            for candidate in find_children(affiliation, "Candidate") {
                let name = find_by_path(candidate, "CandidateFullName/PersonName");
                entries.push(CandidateListEntry {
                    election_id: meta.id.clone(),
                    election_name: meta.name.clone(),
                    election_date: meta.date.clone(),
                    contest_name: contest_name.clone(),
                    party_id: party_id.clone(),
                    party_name: party_name.clone(),
                    candidate_id: find_child(candidate, "CandidateIdentifier")
                        .and_then(|n| get_attribute(n, "Id"))
                        .map(String::from),
                    first_name: name.and_then(|n| child_text(n, "FirstName")),
                    last_name: name.and_then(|n| child_text(n, "LastName")),
                    initials: name.and_then(initials),
                    prefix: name.and_then(|n| child_text(n, "NamePrefix")),
                    gender: child_text(candidate, "Gender"),
                    locality: child_text(candidate, "QualifyingAddress/Locality/LocalityName"),
                });
            }
        }
    }

    Ok(entries)
}

/// Initials are a `NameLine`, preferably the one typed as initials.
fn initials(person_name: Node<'_, '_>) -> Option<String> {
    let lines: Vec<Node<'_, '_>> = find_children(person_name, "NameLine").collect();
    lines
        .iter()
        .find(|n| get_attribute(**n, "NameType") == Some("Initials"))
        .or_else(|| lines.first())
        .map(|n| get_text(*n))
        .filter(|s| !s.is_empty())
}

/// Parse every candidate list file below `source`.
///
/// Files that cannot be parsed are logged and left out.
pub fn collect_candidate_lists(source: &Path) -> Result<Vec<CandidateListEntry>> {
    let mut entries = Vec::new();

    for path in find_xml_files(source, CANDIDATE_LIST_FILE_PREFIX)? {
        match read_xml_file(&path).and_then(|xml| parse_candidate_list(&xml)) {
            Ok(mut parsed) => {
                tracing::debug!(path = %path.display(), candidates = parsed.len(), "Parsed candidate list");
                entries.append(&mut parsed);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot parse candidate list");
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDIDATE_LIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<EML xmlns="urn:oasis:names:tc:evs:schema:eml"
     xmlns:kr="http://www.kiesraad.nl/extensions"
     xmlns:xnl="urn:oasis:names:tc:ciq:xsdschema:xNL:2.0"
     xmlns:xal="urn:oasis:names:tc:ciq:xsdschema:xAL:2.0" Id="230b">
  <CandidateList>
    <Election>
      <ElectionIdentifier Id="TK2017">
        <ElectionName>Tweede Kamer 2017</ElectionName>
        <kr:ElectionDate>2017-03-15</kr:ElectionDate>
        <kr:NominationDate>2017-01-30</kr:NominationDate>
      </ElectionIdentifier>
      <Contest>
        <ContestIdentifier Id="9"><ContestName>Utrecht</ContestName></ContestIdentifier>
        <Affiliation>
          <AffiliationIdentifier Id="1"><RegisteredName>VVD</RegisteredName></AffiliationIdentifier>
          <Candidate>
            <CandidateIdentifier Id="1"/>
            <CandidateFullName>
              <xnl:PersonName>
                <xnl:NameLine NameType="Initials">M.</xnl:NameLine>
                <xnl:FirstName>Mark</xnl:FirstName>
                <xnl:LastName>Rutte</xnl:LastName>
              </xnl:PersonName>
            </CandidateFullName>
            <Gender>male</Gender>
            <QualifyingAddress><xal:Locality><xal:LocalityName>'s-Gravenhage</xal:LocalityName></xal:Locality></QualifyingAddress>
          </Candidate>
          <Candidate>
            <CandidateIdentifier Id="2"/>
            <CandidateFullName>
              <xnl:PersonName>
                <xnl:NameLine NameType="Initials">K.H.</xnl:NameLine>
                <xnl:NamePrefix>van der</xnl:NamePrefix>
                <xnl:LastName>Steur</xnl:LastName>
              </xnl:PersonName>
            </CandidateFullName>
          </Candidate>
        </Affiliation>
      </Contest>
    </Election>
  </CandidateList>
</EML>"#;

    #[test]
    fn test_parse_candidate_list() {
        let entries = parse_candidate_list(CANDIDATE_LIST).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.election_id, "TK2017");
        assert_eq!(first.election_date.as_deref(), Some("2017-03-15"));
        assert_eq!(first.contest_name.as_deref(), Some("Utrecht"));
        assert_eq!(first.party_name.as_deref(), Some("VVD"));
        assert_eq!(first.candidate_id.as_deref(), Some("1"));
        assert_eq!(first.initials.as_deref(), Some("M."));
        assert_eq!(first.first_name.as_deref(), Some("Mark"));
        assert_eq!(first.last_name.as_deref(), Some("Rutte"));
        assert_eq!(first.gender.as_deref(), Some("male"));
        assert_eq!(first.locality.as_deref(), Some("'s-Gravenhage"));

        let second = &entries[1];
        assert_eq!(second.prefix.as_deref(), Some("van der"));
        assert_eq!(second.first_name, None);
        assert_eq!(second.gender, None);
        assert_eq!(second.locality, None);
    }

    #[test]
    fn test_count_file_is_not_a_candidate_list() {
        let err = parse_candidate_list("<EML><Count/></EML>").unwrap_err();
        assert!(matches!(err, KiesraadError::MissingElement { .. }));
    }

    #[test]
    fn test_collect_candidate_lists_ignores_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Kandidatenlijsten_TK2017_a.xml"), CANDIDATE_LIST).unwrap();
        std::fs::write(dir.path().join("Kandidatenlijsten_TK2017_b.xml"), "not xml").unwrap();

        let entries = collect_candidate_lists(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
