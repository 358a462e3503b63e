//! Saved results pages from the election results website.
//!
//! Pages are saved per municipality as
//! `<data folder>/<election>/<province>/<municipality>.html`. Each page has a
//! general results list (`ul#algemeneUitslagen`) and one block per party
//! headed by an `h4.partij-naam`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::ValueEnum;
use scraper::{ElementRef, Html, Selector};
use walkdir::WalkDir;

use crate::error::{KiesraadError, Result};

#[allow(clippy::expect_used)] // Static selectors that are guaranteed to be valid
static H3: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").expect("valid selector"));

#[allow(clippy::expect_used)]
static GENERAL_VALUES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul#algemeneUitslagen span.value").expect("valid selector")
});

#[allow(clippy::expect_used)]
static PARTY_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h4.partij-naam").expect("valid selector"));

#[allow(clippy::expect_used)]
static VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.value").expect("valid selector"));

/// What to read from the party blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PageUnit {
    /// Votes per party.
    #[default]
    Votes,
    /// Seats per party.
    Seats,
}

impl PageUnit {
    /// Lowercase name, as used on the command line and in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Votes => "votes",
            Self::Seats => "seats",
        }
    }
}

/// Results of one municipality read from a saved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub election: String,
    pub province: String,
    pub municipality: String,
    /// Kiesgerechtigden.
    pub electorate: u64,
    /// Opkomst.
    pub turnout: u64,
    pub blank: u64,
    pub invalid: u64,
    /// Party name and votes or seats, in page order.
    pub parties: Vec<(String, u64)>,
}

/// Parse a number as printed on the results pages.
///
/// Dots are thousands separators; anything from the first `(` on is dropped.
///
/// # Examples
/// ```
/// use kiesraad::pages::parse_page_number;
///
/// assert_eq!(parse_page_number("12.345 (67,8%)"), Some(12345));
/// assert_eq!(parse_page_number(" 0 "), Some(0));
/// assert_eq!(parse_page_number("onbekend"), None);
/// ```
pub fn parse_page_number(text: &str) -> Option<u64> {
    let text = text.replace('.', "");
    let text = text.split('(').next().unwrap_or_default().trim();
    text.parse().ok()
}

/// Parse one saved results page.
///
/// `election` and `province` are left empty; [`parse_saved_pages`] fills
/// them in from the directory layout.
pub fn parse_page(html: &str, path: &Path, unit: PageUnit) -> Result<PageResult> {
    let invalid = |reason: String| KiesraadError::InvalidPage {
        path: path.to_path_buf(),
        reason,
    };
    let number = |text: String| {
        parse_page_number(&text).ok_or_else(|| invalid(format!("not a number: '{}'", text.trim())))
    };

    let document = Html::parse_document(html);

    let municipality = document
        .select(&H3)
        .last()
        .map(element_text)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("no h3 element".to_string()))?;

    let general = document
        .select(&GENERAL_VALUES)
        .map(|e| number(element_text(e)))
        .collect::<Result<Vec<u64>>>()?;
    let [electorate, turnout, blank, invalid_votes] = general[..] else {
        return Err(invalid(format!(
            "expected 4 general results, found {}",
            general.len()
        )));
    };

    let mut parties = Vec::new();
    for heading in document.select(&PARTY_NAME) {
        let name = element_text(heading);
        let Some(block) = enclosing_div(heading) else {
            continue;
        };
        let values: Vec<String> = block.select(&VALUE).map(element_text).collect();

        let value = match unit {
            PageUnit::Votes => values
                .first()
                .cloned()
                .ok_or_else(|| invalid(format!("no votes for {name}")))?,
            PageUnit::Seats if values.len() > 1 => values[values.len() - 1].clone(),
            PageUnit::Seats => "0".to_string(),
        };

        parties.push((name, number(value)?));
    }

    Ok(PageResult {
        election: String::new(),
        province: String::new(),
        municipality,
        electorate,
        turnout,
        blank,
        invalid: invalid_votes,
        parties,
    })
}

/// Parse all saved pages of an election, sorted by municipality.
///
/// Pages that cannot be read or parsed are logged and left out.
pub fn parse_saved_pages(data_folder: &Path, election: &str, unit: PageUnit) -> Result<Vec<PageResult>> {
    let folder = election_folder(data_folder, election);
    let mut results = Vec::new();

    for entry in WalkDir::new(&folder).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        {
            continue;
        }

        let parsed = fs::read_to_string(path)
            .map_err(KiesraadError::from)
            .and_then(|html| parse_page(&html, path, unit));

        match parsed {
            Ok(mut result) => {
                result.election = election.to_string();
                result.province = path
                    .parent()
                    .filter(|parent| *parent != folder)
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                results.push(result);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping results page");
            }
        }
    }

    results.sort_by(|a, b| a.municipality.cmp(&b.municipality));
    Ok(results)
}

/// Remove the saved pages of an election after they have been parsed.
pub fn remove_saved_pages(data_folder: &Path, election: &str) -> Result<()> {
    let folder = election_folder(data_folder, election);
    if folder.exists() {
        fs::remove_dir_all(&folder)?;
    }
    Ok(())
}

fn election_folder(data_folder: &Path, election: &str) -> PathBuf {
    data_folder.join(election)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Nearest `div` ancestor of a party heading.
fn enclosing_div(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "div")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: &str = r#"<html><body>
<h3>Provincie Utrecht</h3>
<h3>Zeist</h3>
<ul id="algemeneUitslagen">
  <li>Kiesgerechtigden <span class="value">48.123</span></li>
  <li>Opkomst <span class="value">39.001 (81,0%)</span></li>
  <li>Blanco <span class="value">120</span></li>
  <li>Ongeldig <span class="value">95</span></li>
</ul>
<div class="partijen">
  <div class="partij"><h4 class="partij-naam">VVD</h4><span class="value">9.876</span><span class="value">8</span></div>
  <div class="partij"><h4 class="partij-naam">Kleine Partij</h4><span class="value">12</span></div>
</div>
</body></html>"#;

    #[test]
    fn test_parse_page_votes() {
        let result = parse_page(PAGE, Path::new("Zeist.html"), PageUnit::Votes).unwrap();

        assert_eq!(result.municipality, "Zeist");
        assert_eq!(result.electorate, 48123);
        assert_eq!(result.turnout, 39001);
        assert_eq!(result.blank, 120);
        assert_eq!(result.invalid, 95);
        assert_eq!(
            result.parties,
            [("VVD".to_string(), 9876), ("Kleine Partij".to_string(), 12)]
        );
    }

    #[test]
    fn test_parse_page_seats() {
        let result = parse_page(PAGE, Path::new("Zeist.html"), PageUnit::Seats).unwrap();
        assert_eq!(
            result.parties,
            [("VVD".to_string(), 8), ("Kleine Partij".to_string(), 0)]
        );
    }

    #[test]
    fn test_parse_page_without_general_results() {
        let html = "<html><body><h3>Zeist</h3></body></html>";
        let err = parse_page(html, Path::new("Zeist.html"), PageUnit::Votes).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid results page Zeist.html: expected 4 general results, found 0"
        );
    }

    #[test]
    fn test_parse_saved_pages() {
        let dir = tempdir().unwrap();
        let province = dir.path().join("TK20170315").join("Utrecht");
        fs::create_dir_all(&province).unwrap();
        fs::write(province.join("Zeist.html"), PAGE).unwrap();
        fs::write(
            province.join("Amersfoort.html"),
            PAGE.replace("<h3>Zeist</h3>", "<h3>Amersfoort</h3>"),
        )
        .unwrap();
        fs::write(province.join("Broken.html"), "<html></html>").unwrap();

        let results = parse_saved_pages(dir.path(), "TK20170315", PageUnit::Votes).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.municipality.as_str()).collect();
        assert_eq!(names, ["Amersfoort", "Zeist"]);
        assert_eq!(results[0].province, "Utrecht");
        assert_eq!(results[0].election, "TK20170315");

        remove_saved_pages(dir.path(), "TK20170315").unwrap();
        assert!(!dir.path().join("TK20170315").exists());
    }
}
