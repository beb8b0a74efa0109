//! Merging anchor data into a ladder and repairing overlapping search windows.
//!
//! The *source* ladder carries, per locus, the externally measured anchor (`first_core_locus_bp`),
//! the extended allele range and the ILS search window. The *target* ladder carries the allele
//! lists. Merging copies the anchor data across, places every allele, widens the search window by
//! one core repeat and finally pulls apart windows of neighboring loci on the same channel.
use log::{debug, info, warn};

use crate::error::{LadderError, Result};
use crate::kit::{Ladder, Locus};

/// Padding added around an original window boundary when neighbors overlap.
pub const BOUNDARY_PADDING_BP: f64 = 0.55;

/// What [`Ladder::merge_into`] did, for the operator to review.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeReport {
    /// Loci that received anchor data, in merge order.
    pub merged: Vec<String>,
    /// Source loci with no namesake in the target.
    pub unresolved: Vec<String>,
    /// `(previous, next)` pairs whose shared boundary was moved.
    pub repaired: Vec<(String, String)>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

impl Ladder {
    /// Copy anchor data from `source` into the locus of the same name and compute its positions.
    ///
    /// Fails with [`LadderError::UnresolvedMergeTarget`] if no locus matches.
    pub fn merge_locus_into(&mut self, source: &Locus) -> Result<()> {
        let target = self
            .find_locus_mut(source.name())
            .ok_or_else(|| LadderError::UnresolvedMergeTarget(source.name().to_string()))?;

        target.set_first_core_locus_bp(source.first_core_locus_bp());
        target.set_extended_alleles(source.first_extended_allele(), source.last_extended_allele());
        target.compute_all_bps()?;
        let window = source.search_window();
        target.set_min_max_search_ils_bp(window.min, window.max);
        target.adjust_search_region();
        target.mark_merged();

        debug!(
            "merged {}: bp {}..{}, search {:.2}..{:.2}",
            target.name(),
            target.min_locus_bp(),
            target.max_locus_bp(),
            target.min_search_ils_bp(),
            target.max_search_ils_bp()
        );
        Ok(())
    }

    /// Merge every locus of this ladder into `target`, then repair overlapping search windows
    /// between consecutive same-channel loci, walking this ladder's list order.
    ///
    /// Only immediate neighbors are compared: when loci are not listed by channel then position,
    /// an overlap between non-adjacent loci goes undetected.
    pub fn merge_into(&self, target: &mut Ladder) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        for locus in self.loci() {
            match target.merge_locus_into(locus) {
                Ok(()) => report.merged.push(locus.name().to_string()),
                Err(e @ LadderError::UnresolvedMergeTarget(_)) => {
                    warn!("{e}; skipping");
                    report.unresolved.push(locus.name().to_string());
                }
                Err(e) => return Err(e),
            }
        }

        // Unresolved source loci drop out of the chain; their neighbors are compared directly.
        let mut prev: Option<usize> = None;
        for locus in self.loci() {
            let Some(next) = target.locus_position(locus.name()) else { continue };
            if let Some(p) = prev {
                if repair_boundary(target, p, next) {
                    report.repaired.push((target.loci()[p].name().to_string(), locus.name().to_string()));
                }
            }
            prev = Some(next);
        }

        info!(
            "merged {} loci into {} ({} unresolved, {} boundaries repaired)",
            report.merged.len(),
            target.marker_set_name(),
            report.unresolved.len(),
            report.repaired.len()
        );
        Ok(report)
    }

    /// `true` when every locus has received anchor data.
    pub fn test_all_loci_merged(&self) -> bool {
        self.loci().iter().all(Locus::is_merged)
    }

    pub fn unmerged_loci(&self) -> Vec<String> {
        self.loci().iter().filter(|l| !l.is_merged()).map(|l| l.name().to_string()).collect()
    }
}

/// Resolve an overlap between the windows of loci `p` and `n` of `ladder`. Returns `true` if a
/// boundary moved.
fn repair_boundary(ladder: &mut Ladder, p: usize, n: usize) -> bool {
    let (prev, next) = (&ladder.loci()[p], &ladder.loci()[n]);
    if prev.channel() != next.channel() {
        return false;
    }
    let prev_max = prev.max_search_ils_bp();
    let next_min = next.min_search_ils_bp();
    if prev_max <= next_min {
        return false;
    }

    let prev_original = prev.original_search_window().unwrap_or_else(|| prev.search_window());
    let next_original = next.original_search_window().unwrap_or_else(|| next.search_window());
    let mut prev_boundary = prev_original.max + BOUNDARY_PADDING_BP;
    let mut next_boundary = next_original.min - BOUNDARY_PADDING_BP;
    if prev_boundary > next_boundary {
        let mid = 0.5 * (prev_boundary + next_boundary);
        prev_boundary = mid;
        next_boundary = mid;
    }
    debug!(
        "search windows of {} and {} overlap ({prev_max:.2} > {next_min:.2}); splitting at {prev_boundary:.2}/{next_boundary:.2}",
        prev.name(),
        next.name()
    );

    if prev_max >= next_boundary {
        ladder.locus_at_mut(p).set_max_search_ils_bp(next_boundary);
    }
    if next_min <= prev_boundary {
        ladder.locus_at_mut(n).set_min_search_ils_bp(prev_boundary);
    }
    for i in [p, n] {
        let l = &ladder.loci()[i];
        if !l.search_window().is_ordered() {
            warn!(
                "search window of {} is inverted after overlap repair ({:.2} > {:.2})",
                l.name(),
                l.min_search_ils_bp(),
                l.max_search_ils_bp()
            );
        }
    }
    true
}
