//! EML (Election Markup Language) count files.
//!
//! The Kiesraad publishes results per municipality as EML 510 files. Each
//! file nests its results as
//!
//! ```text
//! Count/Election/Contests/Contest/ReportingUnitVotes/Selection
//! ```
//!
//! where a `Selection` is either a party (`AffiliationIdentifier`) or a
//! candidate of the party selection preceding it.

mod parse;
mod tree;

pub use parse::{extract_postcode, parse_count, parse_count_file};
pub(crate) use parse::parse_election_identifier;
pub use tree::{
    CandidateResultNode, Contest, ElectionMetadata, EmlDocument, ManagingAuthority,
    PartyResultNode, ReasonCount, ReportingUnitNode, ResultNode,
};
