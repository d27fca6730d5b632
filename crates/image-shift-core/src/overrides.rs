//! Container image override parsing
//!
//! Overrides come from the command line as `container=image` strings. The
//! image part is either a full `repository:tag` or a tag-only `:tag`.

use std::collections::BTreeMap;
use std::fmt;

/// Expected shape of an override entry, shown next to every rejection
pub const OVERRIDE_FORMAT: &str =
    "container-name=image-name:tag or container-name=:tag";

/// Container name → image specification
///
/// Ordered so that iteration and output are deterministic. A repeated
/// container name keeps the last value.
pub type ImageOverrides = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No `=` at all, or more than one
    WrongSeparatorCount,
    /// Container name or image is empty
    EmptySide,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::WrongSeparatorCount => f.write_str("expected exactly one '='"),
            RejectReason::EmptySide => f.write_str("missing container name or image name"),
        }
    }
}

/// An entry that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedOverride {
    pub entry: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOverrides {
    pub images: ImageOverrides,
    pub rejected: Vec<MalformedOverride>,
}

impl ParsedOverrides {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Parse `container=image` entries
///
/// Malformed entries never fail the call; they are returned in
/// [`ParsedOverrides::rejected`] for the caller to report.
pub fn parse_overrides<S: AsRef<str>>(entries: &[S]) -> ParsedOverrides {
    let mut parsed = ParsedOverrides::default();

    for entry in entries {
        let entry = entry.as_ref();
        let parts: Vec<&str> = entry.split('=').collect();

        let reason = match parts.as_slice() {
            [name, image] if !name.is_empty() && !image.is_empty() => {
                parsed.images.insert(name.to_string(), image.to_string());
                continue;
            }
            [_, _] => RejectReason::EmptySide,
            _ => RejectReason::WrongSeparatorCount,
        };

        parsed.rejected.push(MalformedOverride {
            entry: entry.to_string(),
            reason,
        });
    }

    parsed
}
