//! Allele label parsing.
//!
//! STR alleles are named after their repeat count, with an optional microvariant after a single
//! `.` separator: `"9.3"` is nine full repeats plus three bases, `"12"` is twelve full repeats.
//! Two labels of the same locus differ in length by
//! `core_repeat * Δrepeats + Δmicro_variant` bases.
//!
//! # Examples
//! ```
//! use ladderkit::label::AlleleLabel;
//! let a: AlleleLabel = "9.3".parse().unwrap();
//! let b: AlleleLabel = "9".parse().unwrap();
//! assert_eq!((a.repeats, a.micro_variant), (9, 3));
//! assert_eq!(a.bp_difference_from(&b, 4), 3);
//! ```
use core::fmt;
use core::str::FromStr;

use crate::error::{LadderError, Result};

/// Repeat count and microvariant of an allele label.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct AlleleLabel {
    pub repeats: i32,
    pub micro_variant: i32,
}

impl AlleleLabel {
    pub fn new(repeats: i32, micro_variant: i32) -> Self {
        Self { repeats, micro_variant }
    }

    /// Signed length offset of `self` relative to `other` for a locus with the given core repeat.
    ///
    /// No ordering is assumed: a shorter `self` gives a negative offset.
    #[inline]
    pub fn bp_difference_from(&self, other: &AlleleLabel, core_repeat: i32) -> i32 {
        core_repeat * (self.repeats - other.repeats) + (self.micro_variant - other.micro_variant)
    }
}

fn parse_part(part: &str, label: &str) -> Result<i32> {
    part.parse::<i32>().map_err(|source| LadderError::MalformedLabel { label: label.to_string(), source })
}

impl FromStr for AlleleLabel {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim();
        match label.split_once('.') {
            None => Ok(Self::new(parse_part(label, s)?, 0)),
            Some((repeats, variant)) => {
                let repeats = parse_part(repeats, s)?;
                let micro_variant = if variant.is_empty() { 0 } else { parse_part(variant, s)? };
                Ok(Self::new(repeats, micro_variant))
            }
        }
    }
}

impl fmt::Display for AlleleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.micro_variant == 0 {
            write!(f, "{}", self.repeats)
        } else {
            write!(f, "{}.{}", self.repeats, self.micro_variant)
        }
    }
}
