//! Export record: the text entries written into an exported PNG.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::Seed;

/// Version of the embedded metadata contract.
pub const API_VERSION: &str = "0.1.1";

/// Value of the `Software` entry.
pub const SOFTWARE_NAME: &str = "reelbox";

/// Keywords of the text entries, in export order.
pub mod keys {
    pub const SOFTWARE: &str = "Software";
    pub const API_VERSION: &str = "API Version";
    pub const CREATION_TIME: &str = "Creation Time";
    pub const PROGRAM_SOURCE: &str = "Program Source";
    pub const PROGRAM_LANGUAGE: &str = "Program Language";
    pub const PROGRAM_INPUTS: &str = "Program Inputs";
    pub const AUTHOR: &str = "Author";
}

/// Everything needed to recreate an exported frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInputs {
    /// Timeline position of the frame.
    #[serde(default)]
    pub t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Seed>,
}

impl ProgramInputs {
    pub fn new(t: f64, seed: Seed) -> Self {
        Self {
            t,
            seed: Some(seed),
        }
    }
}

/// Metadata attached to one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub software: String,
    pub api_version: String,
    pub creation_time: String,
    /// Source with line endings normalised to LF.
    pub source: String,
    pub language: String,
    pub inputs: ProgramInputs,
    pub author: Option<String>,
}

impl ExportRecord {
    pub fn new(source: &str, language: &str, inputs: ProgramInputs, created: DateTime<Utc>) -> Self {
        let source = source.replace("\r\n", "\n");
        let author = extract_author(&source);
        Self {
            software: SOFTWARE_NAME.to_string(),
            api_version: API_VERSION.to_string(),
            creation_time: http_date(created),
            source,
            language: language.to_string(),
            inputs,
            author,
        }
    }

    /// Keyword/text pairs in export order.
    pub fn entries(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut entries = vec![
            (keys::SOFTWARE, self.software.clone()),
            (keys::API_VERSION, self.api_version.clone()),
            (keys::CREATION_TIME, self.creation_time.clone()),
            (keys::PROGRAM_SOURCE, self.source.clone()),
            (keys::PROGRAM_LANGUAGE, self.language.clone()),
            (keys::PROGRAM_INPUTS, serde_json::to_string(&self.inputs)?),
        ];
        if let Some(author) = &self.author {
            entries.push((keys::AUTHOR, author.clone()));
        }
        Ok(entries)
    }
}

/// RFC 1123 date as used in HTTP headers.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Find an `@author` tag and return the rest of its line.
///
/// The tag must be followed by `": "`, `":"` or a space; occurrences that
/// are not (e.g. `@authored`) are skipped. An empty name counts as absent.
pub fn extract_author(source: &str) -> Option<String> {
    const TAG: &str = "@author";
    let mut rest = source;
    while let Some(idx) = rest.find(TAG) {
        rest = &rest[idx + TAG.len()..];
        let tail = [": ", ":", " "]
            .iter()
            .find_map(|sep| rest.strip_prefix(sep));
        if let Some(tail) = tail {
            let name = tail.split(['\r', '\n']).next().unwrap_or_default();
            return (!name.is_empty()).then(|| name.to_string());
        }
    }
    None
}
