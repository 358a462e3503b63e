//! Kiesraad - Convert Dutch election results to CSV tables.
//!
//! The Kiesraad (Dutch Electoral Council) publishes results as EML
//! (Election Markup Language) files, one count file per municipality. This
//! crate locates those files in a downloaded election directory, parses them
//! into a typed tree and flattens them into tables per municipality, at party
//! or candidate level. Saved HTML results pages can be converted as well.
//!
//! # Example
//!
//! ```
//! use kiesraad::eml::parse_count;
//! use kiesraad::normalize::{normalize, Granularity};
//! use kiesraad::types::Count;
//!
//! let xml = r#"<EML><Count><Election>
//!   <ElectionIdentifier Id="TK2017"/>
//!   <Contests><Contest><ReportingUnitVotes>
//!     <ReportingUnitIdentifier Id="SB1">Stadhuis (postcode: 3511 BD)</ReportingUnitIdentifier>
//!     <Selection><AffiliationIdentifier Id="1"><RegisteredName>VVD</RegisteredName></AffiliationIdentifier><ValidVotes>120</ValidVotes></Selection>
//!   </ReportingUnitVotes></Contest></Contests>
//! </Election></Count></EML>"#;
//!
//! let document = parse_count(xml).unwrap();
//! let table = normalize(&document, "Utrecht", Granularity::Party);
//! assert_eq!(table.rows[0].votes, Count::Reported(120));
//! assert_eq!(table.rows[0].postcode.as_deref(), Some("3511 BD"));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: File name patterns, constants and validation
//! - [`types`]: Core data types (ElectionDataset, Count, CandidateListEntry)
//! - [`error`]: Error types and Result alias
//! - [`xml`]: XML utilities
//! - [`locator`]: Discovery of count files in a directory
//! - [`eml`]: Count file parser and result tree
//! - [`normalize`]: Result and turnout tables
//! - [`definition`]: Election definition files
//! - [`candidates`]: Candidate list files
//! - [`pipeline`]: Processing of a whole election directory
//! - [`pages`]: Saved HTML results pages
//! - [`output`]: CSV output
//! - [`cli`]: Command-line interface

pub mod candidates;
pub mod cli;
pub mod config;
pub mod definition;
pub mod eml;
pub mod error;
pub mod locator;
pub mod normalize;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod types;
pub mod xml;

// Re-export main functions
pub use pipeline::{process_directory, MunicipalityResults, ParseOutcome};

// Re-export commonly used items
pub use error::{DiscoveryError, FileFailure, KiesraadError, Result};
pub use normalize::{ElectionColumns, Granularity, ReconciliationWarning, ResultTable};
pub use types::{Count, ElectionDataset};
