//! Tabular input: loci, ladder alleles and anchor records.
//!
//! ### Formats
//! Headers are required; fields are trimmed. Files ending in `.tsv` or `.txt` are tab
//! separated, everything else is comma separated.
//!
//! - **loci**: `locus, channel, core_repeat[, y_linked, min_expected_alleles, max_expected_alleles]`
//! - **alleles**: `locus, allele[, curve, virtual, relative_height]`
//! - **anchors**: `locus, channel, core_repeat, first_core_bp, first_extended, last_extended,
//!   min_search_bp, max_search_bp`
//!
//! ### Errors
//! Unreadable or malformed tables are fatal. Duplicate loci/alleles and alleles naming an
//! unknown locus are logged, collected in [`Assembly::rejected`] and skipped.
use std::io::Read;
use std::path::Path;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::KitConfig;
use crate::error::{LadderError, Result};
use crate::kit::{Allele, Ladder, Locus};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LocusRecord {
    pub locus: String,
    pub channel: u32,
    pub core_repeat: i32,
    #[serde(default)]
    pub y_linked: Option<bool>,
    #[serde(default)]
    pub min_expected_alleles: Option<u32>,
    #[serde(default)]
    pub max_expected_alleles: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AlleleRecord {
    pub locus: String,
    pub allele: String,
    #[serde(default)]
    pub curve: Option<i32>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: Option<bool>,
    #[serde(default)]
    pub relative_height: Option<String>,
}

/// Externally measured placement of a locus on the size standard.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AnchorRecord {
    pub locus: String,
    pub channel: u32,
    pub core_repeat: i32,
    pub first_core_bp: i32,
    pub first_extended: String,
    pub last_extended: String,
    pub min_search_bp: f64,
    pub max_search_bp: f64,
}

/// A ladder built from records, with the soft failures met on the way.
#[derive(Debug)]
pub struct Assembly {
    pub ladder: Ladder,
    pub rejected: Vec<LadderError>,
}

impl Assembly {
    fn reject(&mut self, e: LadderError) {
        warn!("{e}; skipping");
        self.rejected.push(e);
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "tsv" || ext == "txt" => b'\t',
        _ => b',',
    }
}

/// Deserialize every row of a delimited table.
pub fn read_table<T: DeserializeOwned, R: Read>(input: R, delimiter: u8) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut rows = Vec::new();
    for rec in rdr.deserialize() {
        rows.push(rec?);
    }
    Ok(rows)
}

/// Read a table from disk, picking the delimiter from the file extension.
pub fn read_table_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let p = path.as_ref();
    let file = std::fs::File::open(p).map_err(|source| LadderError::Unreadable { path: p.to_path_buf(), source })?;
    read_table(std::io::BufReader::new(file), delimiter_for(p))
}

/// Build the allele-carrying ladder from loci and allele tables.
pub fn assemble_ladder(config: &KitConfig, loci: &[LocusRecord], alleles: &[AlleleRecord]) -> Assembly {
    let mut out = Assembly { ladder: config.new_ladder(), rejected: Vec::new() };
    let d = config.defaults;

    for r in loci {
        let mut locus = Locus::new(r.locus.as_str(), r.channel, r.core_repeat);
        locus.set_y_linked(r.y_linked.unwrap_or(d.y_linked));
        locus.set_expected_alleles(
            r.min_expected_alleles.unwrap_or(d.min_expected_alleles),
            r.max_expected_alleles.unwrap_or(d.max_expected_alleles),
        );
        if let Err(e) = out.ladder.add_locus(locus) {
            out.reject(e);
        }
    }

    for r in alleles {
        let mut allele = Allele::new(r.allele.as_str(), r.curve.unwrap_or(0), 0);
        allele.is_virtual = r.is_virtual.unwrap_or(false);
        allele.relative_height = r.relative_height.clone().filter(|h| !h.is_empty());
        let added = match out.ladder.find_locus_mut(&r.locus) {
            Some(locus) => locus.add_allele(allele),
            None => Err(LadderError::UnknownLocus { locus: r.locus.clone(), allele: r.allele.clone() }),
        };
        if let Err(e) = added {
            out.reject(e);
        }
    }
    out
}

/// Build the anchor ladder that [`Ladder::merge_into`] reads from.
pub fn assemble_anchor_ladder(config: &KitConfig, anchors: &[AnchorRecord]) -> Assembly {
    let mut out = Assembly { ladder: config.new_ladder(), rejected: Vec::new() };
    for r in anchors {
        let mut locus = Locus::new(r.locus.as_str(), r.channel, r.core_repeat);
        locus.set_first_core_locus_bp(r.first_core_bp);
        locus.set_extended_alleles(r.first_extended.as_str(), r.last_extended.as_str());
        locus.set_min_max_search_ils_bp(r.min_search_bp, r.max_search_bp);
        if let Err(e) = out.ladder.add_locus(locus) {
            out.reject(e);
        }
    }
    out
}

#[cfg(test)]
mod records_tests {
    use super::*;
    use crate::kit::SearchWindow;

    fn config() -> KitConfig {
        KitConfig::from_toml_str(
            r#"
marker_set_name = "Mini"
[ils]
names = ["ILS600"]
channel = 1
[[channels]]
kit_channel = 1
fsa_channel = 1
color = "blue"
dye = "FL"
[defaults]
max_expected_alleles = 3
"#,
        )
        .unwrap()
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let rows: Vec<LocusRecord> = read_table("locus,channel,core_repeat\nTH01,1,4\n".as_bytes(), b',').unwrap();
        assert_eq!(rows[0].locus, "TH01");
        assert_eq!(rows[0].y_linked, None);
    }

    #[test]
    fn tab_separated_alleles_with_blanks() {
        let text = "locus\tallele\tcurve\tvirtual\trelative_height\nTH01\t9.3\t2\ttrue\tL\nTH01\t10\t\t\t\n";
        let rows: Vec<AlleleRecord> = read_table(text.as_bytes(), b'\t').unwrap();
        assert_eq!(rows[0].is_virtual, Some(true));
        assert_eq!(rows[0].relative_height.as_deref(), Some("L"));
        assert_eq!(rows[1].curve, None);
        assert_eq!(rows[1].relative_height, None);
    }

    #[test]
    fn malformed_row_is_fatal() {
        let r: Result<Vec<AnchorRecord>> = read_table(
            "locus,channel,core_repeat,first_core_bp,first_extended,last_extended,min_search_bp,max_search_bp\nTH01,one,4,150,3,13.3,140,190\n"
                .as_bytes(),
            b',',
        );
        assert!(matches!(r, Err(LadderError::Csv(_))));
    }

    #[test]
    fn assembly_applies_defaults_and_skips_soft_failures() {
        let loci = vec![
            LocusRecord { locus: "TH01".into(), channel: 1, core_repeat: 4, y_linked: None, min_expected_alleles: None, max_expected_alleles: None },
            LocusRecord { locus: "DYS391".into(), channel: 1, core_repeat: 4, y_linked: Some(true), min_expected_alleles: Some(0), max_expected_alleles: Some(1) },
            LocusRecord { locus: "TH01".into(), channel: 2, core_repeat: 4, y_linked: None, min_expected_alleles: None, max_expected_alleles: None },
        ];
        let allele = |locus: &str, name: &str| AlleleRecord {
            locus: locus.into(),
            allele: name.into(),
            curve: None,
            is_virtual: None,
            relative_height: None,
        };
        let alleles = vec![allele("TH01", "6"), allele("TH01", "7"), allele("TH01", "6"), allele("FGA", "20")];

        let a = assemble_ladder(&config(), &loci, &alleles);
        assert_eq!(a.ladder.number_of_loci(), 2);
        assert_eq!(a.rejected.len(), 3);
        assert!(a.rejected.iter().all(LadderError::is_soft));

        let th01 = a.ladder.find_locus("TH01").unwrap();
        assert_eq!(th01.channel(), 1);
        assert_eq!(th01.alleles().len(), 2);
        assert_eq!((th01.min_expected_alleles(), th01.max_expected_alleles()), (1, 3));
        let dys = a.ladder.find_locus("DYS391").unwrap();
        assert!(dys.is_y_linked());
        assert_eq!((dys.min_expected_alleles(), dys.max_expected_alleles()), (0, 1));
    }

    #[test]
    fn anchors_capture_the_original_window() {
        let anchors = vec![AnchorRecord {
            locus: "TH01".into(),
            channel: 1,
            core_repeat: 4,
            first_core_bp: 150,
            first_extended: "3".into(),
            last_extended: "13.3".into(),
            min_search_bp: 140.0,
            max_search_bp: 190.0,
        }];
        let a = assemble_anchor_ladder(&config(), &anchors);
        let th01 = a.ladder.find_locus("TH01").unwrap();
        assert_eq!(th01.first_core_locus_bp(), 150);
        assert_eq!(th01.original_search_window(), Some(SearchWindow::new(140.0, 190.0)));
        assert!(a.rejected.is_empty());
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(delimiter_for(Path::new("bins.tsv")), b'\t');
        assert_eq!(delimiter_for(Path::new("BINS.TXT")), b'\t');
        assert_eq!(delimiter_for(Path::new("panels.csv")), b',');
    }
}
