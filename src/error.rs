//! Error type shared by every stage of a ladder build.
//!
//! Two kinds of failure travel through [`LadderError`]:
//! - **fatal** ones (malformed labels, empty loci, I/O, codec errors) abort the build;
//! - **soft** ones (duplicates, unknown or unresolved loci) are logged by the caller, kept for the
//!   operator and the batch carries on.
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LadderError>;

#[derive(Debug, Error)]
pub enum LadderError {
    /// An allele or extended-allele label whose numeric parts are not integers.
    #[error("malformed allele label '{label}': {source}")]
    MalformedLabel { label: String, source: ParseIntError },

    #[error("allele '{allele}' is already present in locus {locus}")]
    DuplicateAllele { locus: String, allele: String },

    #[error("locus '{0}' is already present in the ladder")]
    DuplicateLocus(String),

    /// An allele record names a locus the loci table never declared.
    #[error("allele '{allele}' refers to unknown locus '{locus}'")]
    UnknownLocus { locus: String, allele: String },

    #[error("could not find locus matching name '{0}'")]
    UnresolvedMergeTarget(String),

    /// BP computation needs the first allele as anchor.
    #[error("locus '{0}' has no alleles to anchor base pair positions")]
    EmptyLocus(String),

    #[error("loci were never merged: {}", .0.join(", "))]
    IncompleteMerge(Vec<String>),

    #[error("no channel map entry for kit channel {0}")]
    MissingChannel(u32),

    #[error("invalid kit configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("could not read {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: std::io::Error },

    #[error("could not create {}: {source}", path.display())]
    Unwritable { path: PathBuf, source: std::io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed kit document: {0}")]
    XmlDocument(#[from] quick_xml::de::DeError),

    #[error("tabular input error: {0}")]
    Csv(#[from] csv::Error),
}

impl LadderError {
    /// `true` for failures the batch is allowed to continue past.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            LadderError::DuplicateAllele { .. }
                | LadderError::DuplicateLocus(_)
                | LadderError::UnknownLocus { .. }
                | LadderError::UnresolvedMergeTarget(_)
        )
    }
}
