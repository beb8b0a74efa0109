//! Core types for **alleles**, **loci** and **ladders**.
//!
//! A [`Ladder`] owns its [`Locus`] values, each locus owns its [`Allele`] values. Both collections
//! keep insertion order (it is significant: the first allele of a locus anchors its base pair
//! positions, loci are emitted in list order) next to a name index used to reject duplicates.
//!
//! # Examples
//! ```
//! use ladderkit::kit::{Allele, Locus};
//! let mut th01 = Locus::new("TH01", 1, 4);
//! for name in ["7", "6", "9.3"] {
//!     th01.add_allele(Allele::new(name, 0, 0)).unwrap();
//! }
//! th01.set_first_core_locus_bp(160);
//! th01.set_extended_alleles("4", "13.3");
//! th01.compute_all_bps().unwrap();
//! let bps: Vec<i32> = th01.alleles().iter().map(|a| a.bp).collect();
//! assert_eq!(bps, vec![160, 156, 171]);
//! ```
use std::collections::HashMap;

use crate::error::{LadderError, Result};
use crate::label::AlleleLabel;

/// Core repeat assumed by the kit document when a locus does not say otherwise.
pub const DEFAULT_CORE_REPEAT: i32 = 4;
pub const DEFAULT_MIN_EXPECTED_ALLELES: u32 = 1;
pub const DEFAULT_MAX_EXPECTED_ALLELES: u32 = 2;

/// One named ladder marker at a base pair position.
///
/// Equality is by name only.
#[derive(Clone, Debug, Default)]
pub struct Allele {
    pub name: String,
    pub curve_number: i32,
    /// Recomputed by [`Locus::compute_all_bps`].
    pub bp: i32,
    pub is_virtual: bool,
    pub relative_height: Option<String>,
}

impl Allele {
    pub fn new(name: impl Into<String>, curve_number: i32, bp: i32) -> Self {
        Self { name: name.into(), curve_number, bp, is_virtual: false, relative_height: None }
    }

    pub fn label(&self) -> Result<AlleleLabel> {
        self.name.parse()
    }
}

impl PartialEq for Allele {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// ILS search window in base pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SearchWindow {
    pub min: f64,
    pub max: f64,
}

impl SearchWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// A genetic marker: ordered alleles, channel, core repeat and ILS search window.
#[derive(Clone, Debug)]
pub struct Locus {
    name: String,
    channel: u32,
    core_repeat: i32,
    alleles: Vec<Allele>,
    allele_index: HashMap<String, usize>,
    min_locus_bp: i32,
    max_locus_bp: i32,
    search: SearchWindow,
    /// Window as first assigned, before any overlap correction. Set once.
    original_search: Option<SearchWindow>,
    y_linked: bool,
    min_expected_alleles: u32,
    max_expected_alleles: u32,
    merged: bool,
    first_core_locus_bp: i32,
    first_extended_allele: String,
    last_extended_allele: String,
}

impl Locus {
    pub fn new(name: impl Into<String>, channel: u32, core_repeat: i32) -> Self {
        Self {
            name: name.into(),
            channel,
            core_repeat,
            alleles: Vec::new(),
            allele_index: HashMap::new(),
            min_locus_bp: 0,
            max_locus_bp: 0,
            search: SearchWindow::default(),
            original_search: None,
            y_linked: false,
            min_expected_alleles: DEFAULT_MIN_EXPECTED_ALLELES,
            max_expected_alleles: DEFAULT_MAX_EXPECTED_ALLELES,
            merged: false,
            first_core_locus_bp: 0,
            first_extended_allele: String::new(),
            last_extended_allele: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn core_repeat(&self) -> i32 {
        self.core_repeat
    }

    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    pub fn allele(&self, name: &str) -> Option<&Allele> {
        self.allele_index.get(name).map(|&i| &self.alleles[i])
    }

    /// Append an allele unless one with the same name is already present.
    ///
    /// A rejected duplicate leaves the locus unchanged and returns [`LadderError::DuplicateAllele`].
    pub fn add_allele(&mut self, allele: Allele) -> Result<()> {
        if self.allele_index.contains_key(&allele.name) {
            return Err(LadderError::DuplicateAllele { locus: self.name.clone(), allele: allele.name });
        }
        self.allele_index.insert(allele.name.clone(), self.alleles.len());
        self.alleles.push(allele);
        Ok(())
    }

    pub fn min_locus_bp(&self) -> i32 {
        self.min_locus_bp
    }

    pub fn max_locus_bp(&self) -> i32 {
        self.max_locus_bp
    }

    pub fn search_window(&self) -> SearchWindow {
        self.search
    }

    pub fn min_search_ils_bp(&self) -> f64 {
        self.search.min
    }

    pub fn max_search_ils_bp(&self) -> f64 {
        self.search.max
    }

    /// The window captured by the first assignment made before the locus was merged.
    pub fn original_search_window(&self) -> Option<SearchWindow> {
        self.original_search
    }

    /// Assign the search window. The first assignment on an unmerged locus is also kept as the
    /// original window.
    pub fn set_min_max_search_ils_bp(&mut self, min: f64, max: f64) {
        self.search = SearchWindow::new(min, max);
        if !self.merged && self.original_search.is_none() {
            self.original_search = Some(self.search);
        }
    }

    pub fn set_min_search_ils_bp(&mut self, min: f64) {
        self.search.min = min;
    }

    pub fn set_max_search_ils_bp(&mut self, max: f64) {
        self.search.max = max;
    }

    /// Widen the search window by `core_repeat - 1` on both sides.
    pub fn adjust_search_region(&mut self) {
        let correction = f64::from(self.core_repeat - 1);
        self.search.min -= correction;
        self.search.max += correction;
    }

    pub fn is_y_linked(&self) -> bool {
        self.y_linked
    }

    pub fn set_y_linked(&mut self, y_linked: bool) {
        self.y_linked = y_linked;
    }

    pub fn min_expected_alleles(&self) -> u32 {
        self.min_expected_alleles
    }

    pub fn max_expected_alleles(&self) -> u32 {
        self.max_expected_alleles
    }

    pub fn set_expected_alleles(&mut self, min: u32, max: u32) {
        self.min_expected_alleles = min;
        self.max_expected_alleles = max;
    }

    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub(crate) fn mark_merged(&mut self) {
        self.merged = true;
    }

    pub fn first_core_locus_bp(&self) -> i32 {
        self.first_core_locus_bp
    }

    pub fn set_first_core_locus_bp(&mut self, bp: i32) {
        self.first_core_locus_bp = bp;
    }

    pub fn first_extended_allele(&self) -> &str {
        &self.first_extended_allele
    }

    pub fn last_extended_allele(&self) -> &str {
        &self.last_extended_allele
    }

    pub fn set_extended_alleles(&mut self, first: impl Into<String>, last: impl Into<String>) {
        self.first_extended_allele = first.into();
        self.last_extended_allele = last.into();
    }

    /// Place every allele relative to the first one, which sits at `first_core_locus_bp`, and
    /// derive the locus span from the extended allele labels.
    ///
    /// Every label is parsed before anything is written, so on error the locus is unchanged.
    pub fn compute_all_bps(&mut self) -> Result<()> {
        let anchor = self
            .alleles
            .first()
            .ok_or_else(|| LadderError::EmptyLocus(self.name.clone()))?
            .label()?;
        let offsets = self
            .alleles
            .iter()
            .map(|a| a.label().map(|l| l.bp_difference_from(&anchor, self.core_repeat)))
            .collect::<Result<Vec<i32>>>()?;
        let last: AlleleLabel = self.last_extended_allele.parse()?;
        let first: AlleleLabel = self.first_extended_allele.parse()?;

        for (allele, offset) in self.alleles.iter_mut().zip(offsets) {
            allele.bp = offset + self.first_core_locus_bp;
        }
        self.max_locus_bp = last.bp_difference_from(&anchor, self.core_repeat) + self.first_core_locus_bp;
        self.min_locus_bp = self.first_core_locus_bp - anchor.bp_difference_from(&first, self.core_repeat);
        Ok(())
    }
}

impl PartialEq for Locus {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A marker set: loci in emission order plus the ILS and channel metadata of the kit.
#[derive(Clone, Debug, Default)]
pub struct Ladder {
    marker_set_name: String,
    number_of_channels: u32,
    loci: Vec<Locus>,
    locus_index: HashMap<String, usize>,
    ils_names: Vec<String>,
    channel_for_ils: u32,
    suffix: String,
}

impl Ladder {
    pub fn new(marker_set_name: impl Into<String>) -> Self {
        Self { marker_set_name: marker_set_name.into(), ..Self::default() }
    }

    pub fn marker_set_name(&self) -> &str {
        &self.marker_set_name
    }

    pub fn number_of_channels(&self) -> u32 {
        self.number_of_channels
    }

    pub fn set_number_of_channels(&mut self, n: u32) {
        self.number_of_channels = n;
    }

    pub fn channel_for_ils(&self) -> u32 {
        self.channel_for_ils
    }

    pub fn set_channel_for_ils(&mut self, channel: u32) {
        self.channel_for_ils = channel;
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn set_suffix(&mut self, suffix: impl Into<String>) {
        self.suffix = suffix.into();
    }

    pub fn ils_names(&self) -> &[String] {
        &self.ils_names
    }

    /// Record an ILS name; returns `false` if it was already listed.
    pub fn add_ils(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.ils_names.contains(&name) {
            return false;
        }
        self.ils_names.push(name);
        true
    }

    pub fn loci(&self) -> &[Locus] {
        &self.loci
    }

    pub fn number_of_loci(&self) -> usize {
        self.loci.len()
    }

    /// Append a locus unless one with the same name is already present.
    pub fn add_locus(&mut self, locus: Locus) -> Result<()> {
        if self.locus_index.contains_key(locus.name()) {
            return Err(LadderError::DuplicateLocus(locus.name));
        }
        self.locus_index.insert(locus.name.clone(), self.loci.len());
        self.loci.push(locus);
        Ok(())
    }

    pub fn find_locus(&self, name: &str) -> Option<&Locus> {
        self.locus_index.get(name).map(|&i| &self.loci[i])
    }

    pub fn find_locus_mut(&mut self, name: &str) -> Option<&mut Locus> {
        self.locus_index.get(name).map(|&i| &mut self.loci[i])
    }

    pub(crate) fn locus_position(&self, name: &str) -> Option<usize> {
        self.locus_index.get(name).copied()
    }

    pub(crate) fn locus_at_mut(&mut self, i: usize) -> &mut Locus {
        &mut self.loci[i]
    }
}

#[cfg(test)]
mod locus_tests {
    use super::*;

    fn locus_with(name: &str, core_repeat: i32, alleles: &[&str]) -> Locus {
        let mut l = Locus::new(name, 1, core_repeat);
        for a in alleles {
            l.add_allele(Allele::new(*a, 0, 0)).unwrap();
        }
        l
    }

    #[test]
    fn anchor_is_the_first_inserted_allele() {
        let mut l = locus_with("D5S818", 4, &["10", "9", "11"]);
        l.set_first_core_locus_bp(100);
        l.set_extended_alleles("9", "11");
        l.compute_all_bps().unwrap();
        assert_eq!(l.allele("9").unwrap().bp, 96);
        assert_eq!(l.allele("10").unwrap().bp, 100);
        assert_eq!(l.allele("11").unwrap().bp, 104);
        assert_eq!((l.min_locus_bp(), l.max_locus_bp()), (96, 104));
    }

    #[test]
    fn ascending_alleles_grow_from_the_anchor() {
        let mut l = locus_with("D5S818", 4, &["9", "10", "11"]);
        l.set_first_core_locus_bp(100);
        l.set_extended_alleles("7", "16");
        l.compute_all_bps().unwrap();
        let bps: Vec<i32> = l.alleles().iter().map(|a| a.bp).collect();
        assert_eq!(bps, vec![100, 104, 108]);
        assert_eq!(l.min_locus_bp(), 92);
        assert_eq!(l.max_locus_bp(), 128);
    }

    #[test]
    fn micro_variants_shift_by_bases() {
        let mut l = locus_with("TH01", 4, &["6", "9.3", "10"]);
        l.set_first_core_locus_bp(150);
        l.set_extended_alleles("3", "13.3");
        l.compute_all_bps().unwrap();
        assert_eq!(l.allele("9.3").unwrap().bp, 165);
        assert_eq!(l.allele("10").unwrap().bp, 166);
        assert_eq!(l.max_locus_bp(), 181);
        assert_eq!(l.min_locus_bp(), 138);
    }

    #[test]
    fn duplicate_allele_is_rejected() {
        let mut l = locus_with("FGA", 4, &["18", "19"]);
        let err = l.add_allele(Allele::new("19", 7, 0)).unwrap_err();
        assert!(matches!(err, LadderError::DuplicateAllele { .. }));
        assert_eq!(l.alleles().len(), 2);
        assert_eq!(l.allele("19").unwrap().curve_number, 0);
    }

    #[test]
    fn empty_locus_cannot_be_placed() {
        let mut l = Locus::new("AMEL", 1, 6);
        assert!(matches!(l.compute_all_bps(), Err(LadderError::EmptyLocus(n)) if n == "AMEL"));
    }

    #[test]
    fn malformed_label_leaves_locus_untouched() {
        let mut l = Locus::new("D21S11", 1, 4);
        l.add_allele(Allele::new("28", 0, 11)).unwrap();
        l.add_allele(Allele::new("29.x", 0, 22)).unwrap();
        l.set_first_core_locus_bp(200);
        l.set_extended_alleles("24", "38");
        assert!(matches!(l.compute_all_bps(), Err(LadderError::MalformedLabel { .. })));
        assert_eq!(l.alleles()[0].bp, 11);
        assert_eq!(l.max_locus_bp(), 0);
    }

    #[test]
    fn malformed_extended_allele_is_fatal() {
        let mut l = locus_with("vWA", 4, &["14", "15"]);
        l.set_extended_alleles("10", "");
        assert!(matches!(l.compute_all_bps(), Err(LadderError::MalformedLabel { .. })));
    }

    #[test]
    fn search_region_widens_by_core_repeat_less_one() {
        let mut l = Locus::new("CSF1PO", 1, 4);
        l.set_min_max_search_ils_bp(118.0, 122.0);
        l.adjust_search_region();
        assert_eq!(l.search_window(), SearchWindow::new(115.0, 125.0));

        let mut penta = Locus::new("Penta E", 1, 5);
        penta.set_min_max_search_ils_bp(370.0, 470.0);
        penta.adjust_search_region();
        assert_eq!(penta.search_window(), SearchWindow::new(366.0, 474.0));
    }

    #[test]
    fn original_window_is_captured_once() {
        let mut l = Locus::new("D13S317", 2, 4);
        l.set_min_max_search_ils_bp(100.0, 110.0);
        l.set_min_max_search_ils_bp(101.0, 111.0);
        assert_eq!(l.original_search_window(), Some(SearchWindow::new(100.0, 110.0)));
        l.mark_merged();
        l.set_min_max_search_ils_bp(90.0, 95.0);
        assert_eq!(l.original_search_window(), Some(SearchWindow::new(100.0, 110.0)));
        assert_eq!(l.search_window(), SearchWindow::new(90.0, 95.0));
    }

    #[test]
    fn merged_locus_without_window_never_captures_one() {
        let mut l = Locus::new("D16S539", 2, 4);
        l.mark_merged();
        l.set_min_max_search_ils_bp(90.0, 95.0);
        assert_eq!(l.original_search_window(), None);
    }
}
