//! Metadata module - embeds the program into exported PNGs and reads it back.
//!
//! An export carries the program source, its language, the seed and time of
//! the frame, and the metadata contract version. On import the version is
//! checked against [`API_VERSION`]: same major.minor loads silently, older or
//! newer versions need an explicit confirmation.

mod chunks;
mod record;

pub use chunks::{
    Chunk, ChunkError, END_CHUNK, PNG_SIGNATURE, TEXT_CHUNK, insert_before_end, read_chunks,
    text_entries, write_chunks,
};
pub use record::{
    API_VERSION, ExportRecord, ProgramInputs, SOFTWARE_NAME, extract_author, http_date, keys,
};

use std::collections::HashMap;

use semver::{Version, VersionReq};

/// Asks the user whether to go ahead with a risky import.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Answers yes to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAccept;

impl Confirm for AlwaysAccept {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Answers no to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl Confirm for AlwaysDecline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

/// How an embedded version relates to [`API_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionVerdict {
    /// Same major.minor.
    Compatible,
    Older,
    Newer,
}

/// Import rejected.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error(transparent)]
    Container(#[from] ChunkError),
    #[error("Missing `{key}` metadata")]
    MetadataMissing { key: &'static str },
    #[error("Invalid API version `{found}`: {source}")]
    VersionInvalid {
        found: String,
        #[source]
        source: semver::Error,
    },
    #[error("API version {found} ({verdict:?} than {API_VERSION}) was not accepted")]
    VersionIncompatible {
        found: Version,
        verdict: VersionVerdict,
    },
    #[error("API version {found} is neither compatible with, older nor newer than {API_VERSION}")]
    VersionInconsistent { found: Version },
    #[error("Invalid program inputs: {0}")]
    InvalidInputs(#[from] serde_json::Error),
}

/// Program recovered from an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProgram {
    pub source: String,
    pub version: Version,
    pub verdict: VersionVerdict,
    pub language: Option<String>,
    /// `None` when the export carried no inputs.
    pub inputs: Option<ProgramInputs>,
    pub author: Option<String>,
    pub software: Option<String>,
    pub creation_time: Option<String>,
}

impl ImportedProgram {
    /// Timeline position of the exported frame (0 without inputs).
    pub fn time(&self) -> f64 {
        self.inputs.as_ref().map_or(0.0, |inputs| inputs.t)
    }
}

/// Classify an embedded version string.
pub fn check_version(found: &str) -> Result<(Version, VersionVerdict), MetadataError> {
    let version = Version::parse(found).map_err(|source| MetadataError::VersionInvalid {
        found: found.to_string(),
        source,
    })?;
    let current = current_version();
    let compatible = VersionReq::parse(&format!("~{}.{}", current.major, current.minor))
        .map_or(false, |req| req.matches(&version));

    let verdict = if compatible {
        VersionVerdict::Compatible
    } else if version < current {
        VersionVerdict::Older
    } else if version > current {
        VersionVerdict::Newer
    } else {
        return Err(MetadataError::VersionInconsistent { found: version });
    };
    Ok((version, verdict))
}

fn current_version() -> Version {
    Version::parse(API_VERSION).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Write `record` as text entries into an encoded PNG.
pub fn embed(png: &[u8], record: &ExportRecord) -> Result<Vec<u8>, MetadataError> {
    let chunks = record
        .entries()?
        .iter()
        .map(|(key, text)| Chunk::text(key, text))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(insert_before_end(png, chunks)?)
}

/// Text entries by keyword; later duplicates win.
pub fn read_entries(png: &[u8]) -> Result<HashMap<String, String>, MetadataError> {
    Ok(text_entries(png)?.into_iter().collect())
}

/// Read and validate the program embedded in `png`.
///
/// Checks run in order: source present, version present, version parses,
/// version gate (asking `confirm` for older or newer), inputs parse.
pub fn decode(png: &[u8], confirm: &mut dyn Confirm) -> Result<ImportedProgram, MetadataError> {
    let mut entries = read_entries(png)?;

    let source = entries
        .remove(keys::PROGRAM_SOURCE)
        .ok_or(MetadataError::MetadataMissing {
            key: keys::PROGRAM_SOURCE,
        })?;
    let found = entries
        .remove(keys::API_VERSION)
        .ok_or(MetadataError::MetadataMissing {
            key: keys::API_VERSION,
        })?;

    let (version, verdict) = check_version(&found)?;
    let prompt = match verdict {
        VersionVerdict::Compatible => None,
        VersionVerdict::Older => Some(format!(
            "This file was made with an older version ({version}) than this one ({API_VERSION}) and may not work as expected. Load it anyway?"
        )),
        VersionVerdict::Newer => Some(format!(
            "This file was made with a newer version ({version}) than this one ({API_VERSION}) and may not work as expected. Load it anyway?"
        )),
    };
    if let Some(prompt) = prompt {
        if !confirm.confirm(&prompt) {
            log::info!("Import of version {} declined", version);
            return Err(MetadataError::VersionIncompatible {
                found: version,
                verdict,
            });
        }
        log::warn!("Importing version {} ({:?}) after confirmation", version, verdict);
    }

    let inputs = entries
        .remove(keys::PROGRAM_INPUTS)
        .map(|json| serde_json::from_str::<ProgramInputs>(&json))
        .transpose()?;

    Ok(ImportedProgram {
        source,
        version,
        verdict,
        language: entries.remove(keys::PROGRAM_LANGUAGE),
        inputs,
        author: entries.remove(keys::AUTHOR),
        software: entries.remove(keys::SOFTWARE),
        creation_time: entries.remove(keys::CREATION_TIME),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Seed;
    use crate::surface::Frame;
    use chrono::TimeZone;
    use chrono::Utc;

    /// Records every prompt and answers with `answer`.
    struct Recorder {
        answer: bool,
        prompts: Vec<String>,
    }

    impl Confirm for Recorder {
        fn confirm(&mut self, prompt: &str) -> bool {
            self.prompts.push(prompt.to_string());
            self.answer
        }
    }

    fn recorder(answer: bool) -> Recorder {
        Recorder {
            answer,
            prompts: Vec::new(),
        }
    }

    fn png_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let png = Frame::blank(1, 1).to_png().unwrap();
        let chunks = entries
            .iter()
            .map(|(k, v)| Chunk::text(k, v).unwrap())
            .collect();
        insert_before_end(&png, chunks).unwrap()
    }

    fn versioned(version: &str) -> Vec<u8> {
        png_with(&[
            (keys::PROGRAM_SOURCE, "fn draw() {}"),
            (keys::API_VERSION, version),
        ])
    }

    #[test]
    fn test_embed_then_decode() {
        let record = ExportRecord::new(
            "// @author Ada\nfn draw(s) { s.rect(0, 0, 1, 1); }",
            "text/x-rhai",
            ProgramInputs::new(42.0, Seed::from(0.75)),
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        );
        let png = embed(&Frame::blank(3, 2).to_png().unwrap(), &record).unwrap();

        let mut confirm = recorder(false);
        let imported = decode(&png, &mut confirm).unwrap();
        assert!(confirm.prompts.is_empty());
        assert_eq!(imported.source, record.source);
        assert_eq!(imported.verdict, VersionVerdict::Compatible);
        assert_eq!(imported.inputs, Some(ProgramInputs::new(42.0, Seed::from(0.75))));
        assert_eq!(imported.time(), 42.0);
        assert_eq!(imported.author.as_deref(), Some("Ada"));
        assert_eq!(imported.language.as_deref(), Some("text/x-rhai"));
        assert_eq!(imported.software.as_deref(), Some(SOFTWARE_NAME));
        assert_eq!(imported.creation_time.as_deref(), Some("Fri, 02 Jan 2026 03:04:05 GMT"));
    }

    #[test]
    fn test_current_version_is_silent() {
        let mut confirm = recorder(false);
        let imported = decode(&versioned("0.1.1"), &mut confirm).unwrap();
        assert_eq!(imported.verdict, VersionVerdict::Compatible);
        assert!(confirm.prompts.is_empty());

        // Any patch of the same minor is fine
        assert!(decode(&versioned("0.1.9"), &mut confirm).is_ok());
        assert!(confirm.prompts.is_empty());
    }

    #[test]
    fn test_newer_version_asks() {
        let mut confirm = recorder(true);
        let imported = decode(&versioned("0.2.0"), &mut confirm).unwrap();
        assert_eq!(imported.verdict, VersionVerdict::Newer);
        assert_eq!(confirm.prompts.len(), 1);
        assert!(confirm.prompts[0].contains("newer"));
    }

    #[test]
    fn test_older_version_asks() {
        let mut confirm = recorder(true);
        let imported = decode(&versioned("0.0.9"), &mut confirm).unwrap();
        assert_eq!(imported.verdict, VersionVerdict::Older);
        assert!(confirm.prompts[0].contains("older"));
    }

    #[test]
    fn test_declined_is_incompatible() {
        let err = decode(&versioned("0.2.0"), &mut AlwaysDecline).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::VersionIncompatible {
                verdict: VersionVerdict::Newer,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_version_rejected_without_asking() {
        let mut confirm = recorder(true);
        let err = decode(&versioned("not-a-version"), &mut confirm).unwrap_err();
        assert!(matches!(err, MetadataError::VersionInvalid { .. }));
        assert!(confirm.prompts.is_empty());
    }

    #[test]
    fn test_missing_source_checked_first() {
        let png = png_with(&[(keys::API_VERSION, "garbage")]);
        let err = decode(&png, &mut AlwaysAccept).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::MetadataMissing {
                key: keys::PROGRAM_SOURCE
            }
        ));
    }

    #[test]
    fn test_missing_version() {
        let png = png_with(&[(keys::PROGRAM_SOURCE, "x")]);
        let err = decode(&png, &mut AlwaysAccept).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::MetadataMissing {
                key: keys::API_VERSION
            }
        ));
    }

    #[test]
    fn test_plain_png_has_no_metadata() {
        let png = Frame::blank(1, 1).to_png().unwrap();
        assert!(matches!(
            decode(&png, &mut AlwaysAccept),
            Err(MetadataError::MetadataMissing { .. })
        ));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let png = png_with(&[
            (keys::PROGRAM_SOURCE, "first"),
            (keys::API_VERSION, API_VERSION),
            (keys::PROGRAM_SOURCE, "second"),
        ]);
        assert_eq!(decode(&png, &mut AlwaysAccept).unwrap().source, "second");
    }

    #[test]
    fn test_malformed_inputs() {
        let png = png_with(&[
            (keys::PROGRAM_SOURCE, "x"),
            (keys::API_VERSION, API_VERSION),
            (keys::PROGRAM_INPUTS, "{t: oops"),
        ]);
        assert!(matches!(
            decode(&png, &mut AlwaysAccept),
            Err(MetadataError::InvalidInputs(_))
        ));
    }

    #[test]
    fn test_absent_inputs() {
        let imported = decode(&versioned(API_VERSION), &mut AlwaysAccept).unwrap();
        assert_eq!(imported.inputs, None);
        assert_eq!(imported.time(), 0.0);
    }

    #[test]
    fn test_closure_confirm() {
        let mut asked = 0;
        let mut confirm = |_: &str| {
            asked += 1;
            false
        };
        assert!(decode(&versioned("1.0.0"), &mut confirm).is_err());
        assert_eq!(asked, 1);
    }

    #[test]
    fn test_prerelease_of_current_minor() {
        // Pre-releases fall outside the tilde range and are older
        let (_, verdict) = check_version("0.1.1-rc.1").unwrap();
        assert_eq!(verdict, VersionVerdict::Older);
    }
}
