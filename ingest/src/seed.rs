use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("archive name {0:?} has too few '.' separated fields to carry a seed")]
    MissingField(String),
    #[error("archive name {name:?} carries a malformed seed field {field:?}")]
    NotNumeric { name: String, field: String },
}

/// Identifier of one execution of a run, always a non-empty string of ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seed(String);

impl Seed {
    /// Parse the seed out of an archive name such as `outputjune-JUNE-1234.tar.gz`.
    ///
    /// The seed field is the last `-` separated part of the third-to-last `.`
    /// separated field. A single leading `s` is accepted, so `...-s1234.tar.gz`
    /// yields the same seed as `...-1234.tar.gz`.
    pub fn from_archive_name(name: &str) -> Result<Self, SeedError> {
        let fields: Vec<&str> = name.split('.').collect();

        if fields.len() < 3 {
            return Err(SeedError::MissingField(name.to_string()));
        }

        let field = fields[fields.len() - 3].rsplit('-').next().unwrap_or("");

        Self::new(field).ok_or_else(|| SeedError::NotNumeric {
            name: name.to_string(),
            field: field.to_string(),
        })
    }

    /// Build a seed from its textual form, accepting an optional leading `s`
    pub fn new(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('s').unwrap_or(value);

        if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
            Some(Self(digits.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The substring a log file name carries when it belongs to this seed
    pub fn marker(&self) -> String {
        format!(".s{}.log", self.0)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// true iff any entry of `listing` contains the marker of `seed`
pub fn has_seed<I, S>(listing: I, seed: &Seed) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let marker = seed.marker();

    listing
        .into_iter()
        .any(|entry| entry.as_ref().contains(marker.as_str()))
}
