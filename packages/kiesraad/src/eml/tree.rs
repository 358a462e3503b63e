//! Typed result tree of an EML 510 count file.
//!
//! The parser turns the nested `ReportingUnitVotes`/`Selection` structure
//! into these owned nodes once; everything downstream reads the tree and
//! never touches XML again.

use crate::types::Count;

/// Election header of a count file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionMetadata {
    /// `ElectionIdentifier/@Id`, e.g. "TK2017".
    pub id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub domain_id: Option<String>,
    pub domain_name: Option<String>,
    pub date: Option<String>,
}

/// The authority that published the count, usually the municipality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagingAuthority {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Votes for one candidate within a party in one reporting unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResultNode {
    /// `CandidateIdentifier/@Id`, the position on the list.
    pub id: String,
    pub shortcode: Option<String>,
    pub votes: Count,
}

/// Votes for one party (affiliation) in one reporting unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyResultNode {
    pub id: String,
    /// Registered name, or the id when the name is empty.
    pub name: String,
    /// Party subtotal as reported by the source.
    pub votes: Count,
    /// Candidate breakdown in document order. Empty when not reported.
    pub candidates: Vec<CandidateResultNode>,
}

impl PartyResultNode {
    /// Sum of the candidate counts, if every candidate count is reported.
    ///
    /// Returns `None` when there is no candidate breakdown at all.
    #[must_use]
    pub fn candidate_sum(&self) -> Option<u64> {
        if self.candidates.is_empty() {
            return None;
        }
        Count::sum_reported(self.candidates.iter().map(|c| c.votes))
    }
}

/// A counted votes tally for a reason code (`RejectedVotes`, `UncountedVotes`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonCount {
    pub reason: String,
    pub count: Count,
}

/// A polling station (or other aggregation level) with its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingUnitNode {
    /// `ReportingUnitIdentifier/@Id`, e.g. "0363::SB1".
    pub id: Option<String>,
    /// Name with any postcode suffix removed.
    pub name: Option<String>,
    pub postcode: Option<String>,
    pub cast: Count,
    pub total_counted: Count,
    pub rejected: Vec<ReasonCount>,
    pub uncounted: Vec<ReasonCount>,
    pub parties: Vec<PartyResultNode>,
}

/// One contest (race) within the election.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub units: Vec<ReportingUnitNode>,
}

/// A parsed count file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmlDocument {
    pub election: ElectionMetadata,
    pub authority: ManagingAuthority,
    pub contests: Vec<Contest>,
}

impl EmlDocument {
    /// All reporting units across contests, in document order.
    pub fn reporting_units(&self) -> impl Iterator<Item = (&Contest, &ReportingUnitNode)> {
        self.contests
            .iter()
            .flat_map(|contest| contest.units.iter().map(move |unit| (contest, unit)))
    }

    /// Walk all result nodes depth-first in document order, each paired with
    /// the contest it belongs to.
    ///
    /// # Examples
    /// ```
    /// use kiesraad::eml::{parse_count, ResultNode};
    ///
    /// let xml = r#"<EML><Count><Election><ElectionIdentifier Id="TK2017"/>
    ///   <Contests><Contest><ReportingUnitVotes>
    ///     <ReportingUnitIdentifier Id="SB1">Stadhuis</ReportingUnitIdentifier>
    ///     <Selection><AffiliationIdentifier Id="1"><RegisteredName>VVD</RegisteredName></AffiliationIdentifier><ValidVotes>5</ValidVotes></Selection>
    ///     <Selection><Candidate><CandidateIdentifier Id="1"/></Candidate><ValidVotes>5</ValidVotes></Selection>
    ///   </ReportingUnitVotes></Contest></Contests></Election></Count></EML>"#;
    /// let document = parse_count(xml).unwrap();
    ///
    /// let kinds: Vec<&str> = document.walk().map(|(_, node)| node.kind()).collect();
    /// assert_eq!(kinds, ["reporting_unit", "party", "candidate"]);
    /// ```
    pub fn walk(&self) -> impl Iterator<Item = (&Contest, ResultNode<'_>)> {
        self.reporting_units().flat_map(|(contest, unit)| {
            ResultNode::ReportingUnit(unit)
                .descendants()
                .into_iter()
                .map(move |node| (contest, node))
        })
    }
}

/// Borrowed view over one node of the result tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultNode<'a> {
    ReportingUnit(&'a ReportingUnitNode),
    Party(&'a PartyResultNode),
    Candidate(&'a CandidateResultNode),
}

impl<'a> ResultNode<'a> {
    /// Short name of the node type.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::ReportingUnit(_) => "reporting_unit",
            Self::Party(_) => "party",
            Self::Candidate(_) => "candidate",
        }
    }

    /// Identifier of the node, if it has one.
    #[must_use]
    pub fn id(self) -> Option<&'a str> {
        match self {
            Self::ReportingUnit(unit) => unit.id.as_deref(),
            Self::Party(party) => Some(&party.id),
            Self::Candidate(candidate) => Some(&candidate.id),
        }
    }

    /// Votes attached to the node.
    ///
    /// For a reporting unit this is the total number of counted votes.
    #[must_use]
    pub fn votes(self) -> Count {
        match self {
            Self::ReportingUnit(unit) => unit.total_counted,
            Self::Party(party) => party.votes,
            Self::Candidate(candidate) => candidate.votes,
        }
    }

    /// Direct children: parties of a unit, candidates of a party.
    #[must_use]
    pub fn children(self) -> Vec<ResultNode<'a>> {
        match self {
            Self::ReportingUnit(unit) => unit.parties.iter().map(ResultNode::Party).collect(),
            Self::Party(party) => party.candidates.iter().map(ResultNode::Candidate).collect(),
            Self::Candidate(_) => Vec::new(),
        }
    }

    /// This node followed by all its descendants, depth-first.
    #[must_use]
    pub fn descendants(self) -> Vec<ResultNode<'a>> {
        let mut nodes = vec![self];
        for child in self.children() {
            nodes.extend(child.descendants());
        }
        nodes
    }
}
