//! Discovery of EML files in a downloaded election bundle.
//!
//! A bundle from the national data portal mixes municipal count files with
//! candidate lists, election definitions and electoral district aggregates.
//! Only municipal count files are returned as documents; everything else
//! that looks like XML is reported as skipped.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{
    CANDIDATE_LIST_FILE_PREFIX, COUNT_FILE_PREFIX, DEFINITION_FILE_PREFIX,
    ELECTORAL_DISTRICT_MARKER,
};
use crate::error::{DiscoveryError, KiesraadError, Result};

/// Municipal count files found in a source directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Municipality key to count file path, ordered by key.
    pub documents: BTreeMap<String, PathBuf>,

    /// XML files that were not taken as municipal count files.
    pub skipped: Vec<DiscoveryError>,
}

/// Derive the municipality key from a count file stem.
///
/// Strips the `Telling` prefix and the election segment, then anything up
/// to and including the last `gemeente_`.
///
/// # Examples
/// ```
/// use kiesraad::locator::municipality_key;
///
/// assert_eq!(municipality_key("Telling_GR2018_Amsterdam"), Some("Amsterdam".to_string()));
/// assert_eq!(municipality_key("Telling_TK2017_gemeente_Den_Haag"), Some("Den_Haag".to_string()));
/// assert_eq!(municipality_key("Telling"), None);
/// ```
pub fn municipality_key(stem: &str) -> Option<String> {
    let rest = stem.strip_prefix(COUNT_FILE_PREFIX)?;
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    let (_election, name) = rest.split_once('_')?;
    let name = match name.rfind("gemeente_") {
        Some(pos) => &name[pos + "gemeente_".len()..],
        None => name,
    };
    Some(name.to_string()).filter(|s| !s.is_empty())
}

/// Locate municipal count files below `source`.
///
/// The directory is walked recursively in file name order so repeated runs
/// see files in the same order. A missing `source` is an error; an empty one
/// yields an empty [`Discovery`].
pub fn locate_count_files(source: &Path) -> Result<Discovery> {
    ensure_directory(source)?;

    let mut discovery = Discovery::default();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                tracing::warn!(path = %path.display(), error = %e, "Cannot read directory entry");
                discovery.skipped.push(DiscoveryError {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_xml(entry.path()) {
            continue;
        }

        let path = entry.path();
        let stem = count_file_stem(path);

        if let Some(reason) = skip_reason(path, &stem) {
            tracing::debug!(path = %path.display(), reason, "Skipping file");
            discovery.skipped.push(DiscoveryError {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            });
            continue;
        }

        let Some(key) = municipality_key(&stem) else {
            discovery.skipped.push(DiscoveryError {
                path: path.to_path_buf(),
                reason: "no municipality in file name".to_string(),
            });
            continue;
        };

        // Two files mapping to the same municipality keep their full stems
        let key = if discovery.documents.contains_key(&key) {
            tracing::warn!(key = %key, path = %path.display(), "Duplicate municipality key, using file stem");
            stem.clone()
        } else {
            key
        };

        if discovery.documents.contains_key(&key) {
            discovery.skipped.push(DiscoveryError {
                path: path.to_path_buf(),
                reason: format!("duplicate count file for '{key}'"),
            });
            continue;
        }

        discovery.documents.insert(key, path.to_path_buf());
    }

    tracing::debug!(
        documents = discovery.documents.len(),
        skipped = discovery.skipped.len(),
        "Located count files"
    );

    Ok(discovery)
}

/// Find XML files below `source` whose name starts with `prefix`, sorted by path.
pub fn find_xml_files(source: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    ensure_directory(source)?;

    let mut paths: Vec<PathBuf> = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_xml(entry.path()))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    Ok(paths)
}

fn ensure_directory(source: &Path) -> Result<()> {
    if !source.exists() {
        return Err(KiesraadError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Source directory does not exist: {}", source.display()),
        )));
    }
    if !source.is_dir() {
        return Err(KiesraadError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Source path is not a directory: {}", source.display()),
        )));
    }
    Ok(())
}

/// File name without `.xml` and an optional inner `.eml` extension.
fn count_file_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.len().checked_sub(".eml".len()) {
        Some(end) if stem.is_char_boundary(end) && stem[end..].eq_ignore_ascii_case(".eml") => {
            stem[..end].to_string()
        }
        _ => stem,
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Why a file is not a municipal count file, or `None` if it is one.
fn skip_reason(path: &Path, stem: &str) -> Option<&'static str> {
    if stem.starts_with(CANDIDATE_LIST_FILE_PREFIX) {
        return Some("candidate list");
    }
    if stem.starts_with(DEFINITION_FILE_PREFIX) {
        return Some("election definition");
    }
    if !stem.starts_with(COUNT_FILE_PREFIX) || !stem.contains('_') {
        return Some("not a count file");
    }
    if path
        .to_string_lossy()
        .to_lowercase()
        .contains(ELECTORAL_DISTRICT_MARKER)
    {
        return Some("electoral district aggregate");
    }
    None
}
