//! MarkerSet kit document: writing a [`Ladder`] as XML and reading it back.
//!
//! The element order is fixed at every level: kit → set → loci → alleles. Optional locus
//! elements are only written when they differ from the document defaults (core repeat 4,
//! not Y-linked, 1..2 expected alleles). Search window bounds are rounded to hundredths.
//!
//! # Examples
//! ```
//! use ladderkit::document::round_hundredths;
//! assert_eq!(round_hundredths(117.005), 117.01);
//! ```
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;

use crate::error::{LadderError, Result};
use crate::kit::{Allele, Ladder, Locus, DEFAULT_CORE_REPEAT, DEFAULT_MAX_EXPECTED_ALLELES, DEFAULT_MIN_EXPECTED_ALLELES};

pub const DOCUMENT_VERSION: &str = "2.0";
pub const SCHEMA_LOCATION: &str = "MarkerSet.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Kit channel → capillary data channel, color and dye.
///
/// Kit channels are numbered `1..=N`.
pub trait ChannelMap {
    fn fsa_channel_for_kit_channel(&self, kit_channel: u32) -> Option<u32>;
    fn color_name(&self, kit_channel: u32) -> Option<&str>;
    fn dye_name(&self, kit_channel: u32) -> Option<&str>;
}

/// Round half away from zero to two decimals.
#[inline]
pub fn round_hundredths(value: f64) -> f64 {
    (100.0 * value).round() / 100.0
}

struct KitWriter<W: Write> {
    xml: Writer<W>,
}

impl<W: Write> KitWriter<W> {
    fn open(&mut self, tag: &str) -> Result<()> {
        self.xml.write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.xml.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn leaf(&mut self, tag: &str, value: impl ToString) -> Result<()> {
        self.open(tag)?;
        self.xml.write_event(Event::Text(BytesText::new(&value.to_string())))?;
        self.close(tag)
    }

    fn set<M: ChannelMap + ?Sized>(&mut self, ladder: &Ladder, channels: &M) -> Result<()> {
        self.open("Set")?;
        self.leaf("Name", ladder.marker_set_name())?;
        self.leaf("NChannels", ladder.number_of_channels())?;

        self.open("LS")?;
        for name in ladder.ils_names() {
            self.leaf("LSName", name)?;
        }
        self.leaf("ChannelNo", ladder.channel_for_ils())?;
        self.close("LS")?;

        self.leaf("FileNameSuffix", ladder.suffix())?;
        self.leaf("GenotypeSuffix", ladder.suffix())?;
        self.leaf("DirectorySearchString", ladder.suffix())?;

        self.channel_map(ladder.number_of_channels(), channels)?;
        for locus in ladder.loci() {
            self.locus(locus)?;
        }
        self.close("Set")
    }

    fn channel_map<M: ChannelMap + ?Sized>(&mut self, n: u32, channels: &M) -> Result<()> {
        self.open("FsaChannelMap")?;
        for i in 1..=n {
            let fsa = channels.fsa_channel_for_kit_channel(i).ok_or(LadderError::MissingChannel(i))?;
            let color = channels.color_name(i).ok_or(LadderError::MissingChannel(i))?;
            let dye = channels.dye_name(i).ok_or(LadderError::MissingChannel(i))?;
            self.open("Channel")?;
            self.leaf("KitChannelNumber", i)?;
            self.leaf("fsaChannelNumber", fsa)?;
            self.leaf("Color", color)?;
            self.leaf("DyeName", dye)?;
            self.close("Channel")?;
        }
        self.close("FsaChannelMap")
    }

    fn locus(&mut self, locus: &Locus) -> Result<()> {
        self.open("Locus")?;
        self.leaf("Name", locus.name())?;
        self.leaf("Channel", locus.channel())?;
        self.leaf("MinBP", locus.min_locus_bp())?;
        self.leaf("MaxBP", locus.max_locus_bp())?;
        self.leaf("MinGridLSBasePair", round_hundredths(locus.min_search_ils_bp()))?;
        self.leaf("MaxGridLSBasePair", round_hundredths(locus.max_search_ils_bp()))?;
        if locus.core_repeat() != DEFAULT_CORE_REPEAT {
            self.leaf("CoreRepeatNumber", locus.core_repeat())?;
        }
        if locus.is_y_linked() {
            self.leaf("YLinked", "true")?;
        }
        if locus.max_expected_alleles() != DEFAULT_MAX_EXPECTED_ALLELES {
            self.leaf("MaxExpectedAlleles", locus.max_expected_alleles())?;
        }
        if locus.min_expected_alleles() != DEFAULT_MIN_EXPECTED_ALLELES {
            self.leaf("MinExpectedAlleles", locus.min_expected_alleles())?;
        }

        self.open("LadderAlleles")?;
        for allele in locus.alleles() {
            self.allele(allele)?;
        }
        self.close("LadderAlleles")?;
        self.close("Locus")
    }

    fn allele(&mut self, allele: &Allele) -> Result<()> {
        self.open("Allele")?;
        self.leaf("Name", &allele.name)?;
        self.leaf("CurveNo", allele.curve_number)?;
        self.leaf("BP", allele.bp)?;
        if let Some(h) = allele.relative_height.as_deref().filter(|h| !h.is_empty()) {
            self.leaf("RelativeHeight", h)?;
        }
        self.close("Allele")
    }
}

/// Serialize `ladder` into `sink`, taking dye and color names from `channels`.
pub fn write_kit_document<W, M>(ladder: &Ladder, channels: &M, sink: W) -> Result<()>
where
    W: Write,
    M: ChannelMap + ?Sized,
{
    let mut w = KitWriter { xml: Writer::new_with_indent(sink, b'\t', 1) };
    w.xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let root = BytesStart::new("KitData")
        .with_attributes([("xmlns:xsi", XSI_NAMESPACE), ("xsi:noNamespaceSchemaLocation", SCHEMA_LOCATION)]);
    w.xml.write_event(Event::Start(root))?;
    w.leaf("Version", DOCUMENT_VERSION)?;
    w.open("Kits")?;
    w.set(ladder, channels)?;
    w.close("Kits")?;
    w.close("KitData")?;
    w.xml.into_inner().flush()?;
    Ok(())
}

/// Convenience wrapper around [`write_kit_document`] returning the document as a string.
pub fn kit_document_string<M: ChannelMap + ?Sized>(ladder: &Ladder, channels: &M) -> Result<String> {
    let mut buf = Vec::new();
    write_kit_document(ladder, channels, &mut buf)?;
    String::from_utf8(buf).map_err(|e| LadderError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Plain view of an emitted kit document.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KitDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Kits")]
    pub kits: KitsElement,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KitsElement {
    #[serde(rename = "Set")]
    pub set: SetElement,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SetElement {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "NChannels")]
    pub n_channels: u32,
    #[serde(rename = "LS")]
    pub ls: LsElement,
    #[serde(rename = "FileNameSuffix", default)]
    pub file_name_suffix: String,
    #[serde(rename = "FsaChannelMap")]
    pub channel_map: ChannelMapElement,
    #[serde(rename = "Locus", default)]
    pub loci: Vec<LocusElement>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LsElement {
    #[serde(rename = "LSName", default)]
    pub names: Vec<String>,
    #[serde(rename = "ChannelNo")]
    pub channel: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChannelMapElement {
    #[serde(rename = "Channel", default)]
    pub channels: Vec<ChannelElement>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChannelElement {
    #[serde(rename = "KitChannelNumber")]
    pub kit_channel: u32,
    #[serde(rename = "fsaChannelNumber")]
    pub fsa_channel: u32,
    #[serde(rename = "Color")]
    pub color: String,
    #[serde(rename = "DyeName")]
    pub dye: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LocusElement {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Channel")]
    pub channel: u32,
    #[serde(rename = "MinBP")]
    pub min_bp: i32,
    #[serde(rename = "MaxBP")]
    pub max_bp: i32,
    #[serde(rename = "MinGridLSBasePair")]
    pub min_grid_ls_bp: f64,
    #[serde(rename = "MaxGridLSBasePair")]
    pub max_grid_ls_bp: f64,
    #[serde(rename = "CoreRepeatNumber")]
    pub core_repeat: Option<i32>,
    #[serde(rename = "YLinked")]
    pub y_linked: Option<bool>,
    #[serde(rename = "MaxExpectedAlleles")]
    pub max_expected_alleles: Option<u32>,
    #[serde(rename = "MinExpectedAlleles")]
    pub min_expected_alleles: Option<u32>,
    #[serde(rename = "LadderAlleles")]
    pub alleles: LadderAllelesElement,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LadderAllelesElement {
    #[serde(rename = "Allele", default)]
    pub alleles: Vec<AlleleElement>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AlleleElement {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CurveNo")]
    pub curve_number: i32,
    #[serde(rename = "BP")]
    pub bp: i32,
    #[serde(rename = "RelativeHeight")]
    pub relative_height: Option<String>,
}

impl KitDocument {
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub fn set(&self) -> &SetElement {
        &self.kits.set
    }

    pub fn locus(&self, name: &str) -> Option<&LocusElement> {
        self.kits.set.loci.iter().find(|l| l.name == name)
    }
}

impl ChannelMap for ChannelMapElement {
    fn fsa_channel_for_kit_channel(&self, kit_channel: u32) -> Option<u32> {
        self.channels.iter().find(|c| c.kit_channel == kit_channel).map(|c| c.fsa_channel)
    }

    fn color_name(&self, kit_channel: u32) -> Option<&str> {
        self.channels.iter().find(|c| c.kit_channel == kit_channel).map(|c| c.color.as_str())
    }

    fn dye_name(&self, kit_channel: u32) -> Option<&str> {
        self.channels.iter().find(|c| c.kit_channel == kit_channel).map(|c| c.dye.as_str())
    }
}
