#![forbid(unsafe_code)]
//! # ladderkit
//!
//! Builds **allelic ladder** definitions for forensic STR typing kits: every locus with its ladder
//! alleles placed in base pairs, and the ILS search window in which the locus is expected, written
//! out as a MarkerSet kit XML document.
//!
//! ## Pipeline
//! 1. Load the kit configuration ([`config::KitConfig`]) and the loci/allele/anchor tables
//!    ([`records`]).
//! 2. Merge the anchor ladder into the allele ladder ([`kit::Ladder::merge_into`]): alleles are
//!    placed relative to the first allele of each locus, search windows are widened by one core
//!    repeat and overlaps between neighboring loci on a channel are split.
//! 3. Check that every locus was anchored and emit the document ([`document`]).
//!
//! ## Examples
//! ```rust
//! use ladderkit::kit::{Allele, Ladder, Locus};
//!
//! let mut alleles = Ladder::new("Mini");
//! let mut csf = Locus::new("CSF1PO", 1, 4);
//! for a in ["10", "9", "11"] { csf.add_allele(Allele::new(a, 0, 0)).unwrap(); }
//! alleles.add_locus(csf).unwrap();
//!
//! let mut anchors = Ladder::new("Mini");
//! let mut anchor = Locus::new("CSF1PO", 1, 4);
//! anchor.set_first_core_locus_bp(100);
//! anchor.set_extended_alleles("6", "15");
//! anchor.set_min_max_search_ils_bp(118.0, 122.0);
//! anchors.add_locus(anchor).unwrap();
//!
//! anchors.merge_into(&mut alleles).unwrap();
//! let csf = alleles.find_locus("CSF1PO").unwrap();
//! assert_eq!(csf.allele("9").unwrap().bp, 96);
//! assert_eq!((csf.min_search_ils_bp(), csf.max_search_ils_bp()), (115.0, 125.0));
//! assert!(alleles.test_all_loci_merged());
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod kit;
pub mod label;
pub mod merge;
pub mod records;
pub mod volume;

use std::fs;
use std::io::Write;
use std::path::Path;

use log::warn;

pub use error::{LadderError, Result};
use kit::Ladder;
use merge::MergeReport;

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Merge `source` into `target`, check completeness and write the kit document into `sink`.
///
/// Loci left without anchor data fail the build with [`LadderError::IncompleteMerge`] unless
/// `allow_unmerged` is set, in which case they are written with their unplaced alleles and a
/// warning is logged.
pub fn build_kit_document<W, M>(
    channels: &M,
    target: &mut Ladder,
    source: &Ladder,
    sink: W,
    allow_unmerged: bool,
) -> Result<MergeReport>
where
    W: Write,
    M: document::ChannelMap + ?Sized,
{
    let report = source.merge_into(target)?;
    if !target.test_all_loci_merged() {
        let missing = target.unmerged_loci();
        if !allow_unmerged {
            return Err(LadderError::IncompleteMerge(missing));
        }
        warn!("writing {} loci without anchor data: {}", missing.len(), missing.join(", "));
    }
    document::write_kit_document(target, channels, sink)?;
    Ok(report)
}

/// [`build_kit_document`] into the file at `output`.
///
/// The document is rendered in memory first; the file is only created once merging, the
/// completeness check and emission have all succeeded, so a failed build leaves nothing behind.
pub fn write_kit_file<M, P>(
    channels: &M,
    target: &mut Ladder,
    source: &Ladder,
    output: P,
    allow_unmerged: bool,
) -> Result<MergeReport>
where
    M: document::ChannelMap + ?Sized,
    P: AsRef<Path>,
{
    let output = output.as_ref();
    let mut buf = Vec::new();
    let report = build_kit_document(channels, target, source, &mut buf, allow_unmerged)?;
    fs::write(output, &buf).map_err(|e| LadderError::Unwritable { path: output.to_path_buf(), source: e })?;
    Ok(report)
}

/// One display row per locus: name, channel, core repeat, allele count, BP span, search window,
/// merged flag.
pub type LocusRow = (String, u32, i32, usize, i32, i32, f64, f64, bool);

/// Convenience: rows describing each locus of a ladder (for CLI/UX), in list order.
pub fn locus_rows(ladder: &Ladder) -> Vec<LocusRow> {
    ladder
        .loci()
        .iter()
        .map(|l| {
            (
                l.name().to_string(),
                l.channel(),
                l.core_repeat(),
                l.alleles().len(),
                l.min_locus_bp(),
                l.max_locus_bp(),
                document::round_hundredths(l.min_search_ils_bp()),
                document::round_hundredths(l.max_search_ils_bp()),
                l.is_merged(),
            )
        })
        .collect()
}
