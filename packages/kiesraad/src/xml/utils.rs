//! XML utility functions for navigating and extracting data from EML trees.
//!
//! EML files mix the default EML namespace with Kiesraad extensions
//! (`kr:`) and xAL/xNL name parts under varying prefixes. All lookups here
//! compare local names only, so `kr:ElectionDate` is found as
//! `ElectionDate`.

use std::fs;
use std::path::Path;

use roxmltree::Node;

use crate::error::Result;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use kiesraad::xml::get_tag_name;
///
/// let xml = r#"<EML xmlns:kr="http://www.kiesraad.nl/extensions"><kr:ElectionDate/></EML>"#;
/// let doc = Document::parse(xml).unwrap();
/// let date = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(date), "ElectionDate");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use kiesraad::xml::find_child;
///
/// let xml = r#"<Count><Election/></Count>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "Election").is_some());
/// assert!(find_child(root, "Contests").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all child elements with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use kiesraad::xml::find_children;
///
/// let xml = r#"<Contests><Contest/><Contest/><Other/></Contests>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let contests: Vec<_> = find_children(doc.root_element(), "Contest").collect();
/// assert_eq!(contests.len(), 2);
/// ```
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find a descendant element matching a path of tag names.
///
/// # Arguments
/// * `node` - Starting node
/// * `path` - Slash-separated path of tag names (e.g., "Count/Election")
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use kiesraad::xml::find_by_path;
///
/// let xml = r#"<Contest><ContestIdentifier><ContestName>Utrecht</ContestName></ContestIdentifier></Contest>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let name = find_by_path(doc.root_element(), "ContestIdentifier/ContestName");
/// assert_eq!(name.unwrap().text(), Some("Utrecht"));
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;

    for part in path.split('/') {
        current = find_child(current, part)?;
    }

    Some(current)
}

/// Get the text content of a node, trimmed.
///
/// Returns an empty string if the node has no text.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Get the trimmed, non-empty text of the element at `path` below `node`.
pub fn child_text(node: Node<'_, '_>, path: &str) -> Option<String> {
    find_by_path(node, path)
        .map(get_text)
        .filter(|s| !s.is_empty())
}

/// Get an attribute value from a node.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Get all element children of a node.
///
/// Excludes text nodes, comments and processing instructions.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Read an XML file into a string.
///
/// Government bundles occasionally contain files that are not valid UTF-8.
/// Those are decoded lossily instead of being rejected, with a warning.
pub fn read_xml_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                valid_up_to = e.utf8_error().valid_up_to(),
                "File is not valid UTF-8, decoding lossily"
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_tag_name() {
        let xml = r#"<EML><Count/></EML>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "EML");
    }

    #[test]
    fn test_get_tag_name_with_namespace() {
        let xml = r#"<EML xmlns="urn:oasis:names:tc:evs:schema:eml" xmlns:kr="http://www.kiesraad.nl/extensions"><kr:ElectionDate/></EML>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(get_tag_name(root), "EML");
        assert!(find_child(root, "ElectionDate").is_some());
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<Unit><Selection>1</Selection><Cast/><Selection>2</Selection></Unit>"#;
        let doc = Document::parse(xml).unwrap();

        let items: Vec<_> = find_children(doc.root_element(), "Selection").collect();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_find_by_path() {
        let xml = r#"<EML><Count><Election><Contests/></Election></Count></EML>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert!(find_by_path(root, "Count/Election/Contests").is_some());
        assert!(find_by_path(root, "Count/Missing").is_none());
    }

    #[test]
    fn test_get_text() {
        let xml = r#"<Cast>  1200  </Cast>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_text(doc.root_element()), "1200");
    }

    #[test]
    fn test_child_text() {
        let xml = r#"<Id><Name>VVD</Name><Empty>  </Empty></Id>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(child_text(root, "Name"), Some("VVD".to_string()));
        assert_eq!(child_text(root, "Empty"), None);
        assert_eq!(child_text(root, "Missing"), None);
    }

    #[test]
    fn test_get_attribute() {
        let xml = r#"<RejectedVotes ReasonCode="blanco">3</RejectedVotes>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(get_attribute(root, "ReasonCode"), Some("blanco"));
        assert_eq!(get_attribute(root, "Missing"), None);
    }

    #[test]
    fn test_element_children() {
        let xml = r#"<root>text<child1/>more<!-- c --><child2/></root>"#;
        let doc = Document::parse(xml).unwrap();

        let children: Vec<_> = element_children(doc.root_element()).collect();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_read_xml_file_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Telling_TK2017_Test.xml");
        std::fs::write(&path, b"<EML>Caf\xe9</EML>").unwrap();

        let text = read_xml_file(&path).unwrap();
        assert!(text.starts_with("<EML>Caf"));
        assert!(text.contains('\u{FFFD}'));
    }
}
