//! Election definition files (`Verkiezingsdefinitie*.xml`, EML 110a).

use std::path::Path;

use roxmltree::Document;

use crate::config::{validate_date, DEFINITION_FILE_PREFIX};
use crate::eml::parse_election_identifier;
use crate::error::{KiesraadError, Result};
use crate::locator::find_xml_files;
use crate::types::ElectionDataset;
use crate::xml::{find_by_path, read_xml_file};

/// Parse an election definition into the dataset it describes.
///
/// # Examples
/// ```
/// use kiesraad::definition::parse_definition;
///
/// let xml = r#"<EML xmlns:kr="http://www.kiesraad.nl/extensions"><ElectionEvent><Election>
///   <ElectionIdentifier Id="TK2017"><kr:ElectionDate>2017-03-15</kr:ElectionDate></ElectionIdentifier>
/// </Election></ElectionEvent></EML>"#;
/// let dataset = parse_definition(xml).unwrap();
/// assert_eq!(dataset.id, "TK2017");
/// assert_eq!(dataset.date.as_deref(), Some("2017-03-15"));
/// ```
pub fn parse_definition(xml: &str) -> Result<ElectionDataset> {
    let doc = Document::parse(xml)?;
    let election = find_by_path(doc.root_element(), "ElectionEvent/Election")
        .ok_or_else(|| KiesraadError::missing("ElectionEvent/Election", "EML"))?;

    let meta = parse_election_identifier(election)?;

    let mut dataset = ElectionDataset::new(meta.id)?;
    if let Some(name) = meta.name {
        dataset = dataset.with_name(name);
    }
    if let Some(date) = meta.date {
        validate_date(&date)?;
        dataset = dataset.with_date(date);
    }
    Ok(dataset)
}

/// Find the election described by the first readable definition file below `source`.
///
/// Returns `Ok(None)` when no definition file is present or none can be parsed.
pub fn find_election_dataset(source: &Path) -> Result<Option<ElectionDataset>> {
    for path in find_xml_files(source, DEFINITION_FILE_PREFIX)? {
        match read_xml_file(&path).and_then(|xml| parse_definition(&xml)) {
            Ok(dataset) => {
                tracing::debug!(path = %path.display(), election = %dataset.id, "Read election definition");
                return Ok(Some(dataset));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read election definition");
            }
        }
    }
    Ok(None)
}
