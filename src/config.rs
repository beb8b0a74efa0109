//! Kit configuration: marker set identity, internal lane standard and the channel map.
//!
//! Loaded from TOML:
//!
//! ```toml
//! marker_set_name = "Example16"
//! suffix = "E16"
//!
//! [ils]
//! names = ["ILS600"]
//! channel = 4
//!
//! [[channels]]
//! kit_channel = 1
//! fsa_channel = 1
//! color = "blue"
//! dye = "FL"
//! ```
//!
//! An optional `[defaults]` table sets `y_linked`, `min_expected_alleles` and
//! `max_expected_alleles` for loci whose records leave them out.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::document::ChannelMap;
use crate::error::{LadderError, Result};
use crate::kit::{Ladder, DEFAULT_MAX_EXPECTED_ALLELES, DEFAULT_MIN_EXPECTED_ALLELES};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KitConfig {
    pub marker_set_name: String,
    #[serde(default)]
    pub suffix: String,
    pub ils: IlsConfig,
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub defaults: LocusDefaults,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IlsConfig {
    pub names: Vec<String>,
    pub channel: u32,
}

/// One detection channel of the kit.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub kit_channel: u32,
    pub fsa_channel: u32,
    pub color: String,
    pub dye: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LocusDefaults {
    pub y_linked: bool,
    pub min_expected_alleles: u32,
    pub max_expected_alleles: u32,
}

impl Default for LocusDefaults {
    fn default() -> Self {
        Self {
            y_linked: false,
            min_expected_alleles: DEFAULT_MIN_EXPECTED_ALLELES,
            max_expected_alleles: DEFAULT_MAX_EXPECTED_ALLELES,
        }
    }
}

impl KitConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let text = std::fs::read_to_string(p)
            .map_err(|source| LadderError::Unreadable { path: p.to_path_buf(), source })?;
        Self::parse(&text, p)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let config: KitConfig = toml::from_str(text).map_err(|e| config_error(path, e.to_string()))?;
        config.validate().map_err(|message| config_error(path, message))?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.channels.is_empty() {
            return Err("at least one channel is required".into());
        }
        let n = self.number_of_channels();
        let mut seen = HashSet::new();
        for c in &self.channels {
            if c.kit_channel == 0 || c.kit_channel > n {
                return Err(format!("kit channel {} is outside 1..={n}", c.kit_channel));
            }
            if !seen.insert(c.kit_channel) {
                return Err(format!("kit channel {} is listed twice", c.kit_channel));
            }
        }
        if self.ils.channel == 0 || self.ils.channel > n {
            return Err(format!("ILS channel {} is outside 1..={n}", self.ils.channel));
        }
        if self.defaults.min_expected_alleles > self.defaults.max_expected_alleles {
            return Err("min_expected_alleles exceeds max_expected_alleles".into());
        }
        Ok(())
    }

    pub fn number_of_channels(&self) -> u32 {
        self.channels.len() as u32
    }

    fn channel(&self, kit_channel: u32) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.kit_channel == kit_channel)
    }

    /// An empty ladder carrying this kit's marker set, ILS and suffix settings.
    pub fn new_ladder(&self) -> Ladder {
        let mut ladder = Ladder::new(self.marker_set_name.as_str());
        ladder.set_number_of_channels(self.number_of_channels());
        ladder.set_channel_for_ils(self.ils.channel);
        ladder.set_suffix(self.suffix.as_str());
        for name in &self.ils.names {
            ladder.add_ils(name.as_str());
        }
        ladder
    }
}

fn config_error(path: &Path, message: String) -> LadderError {
    LadderError::Config { path: PathBuf::from(path), message }
}

impl ChannelMap for KitConfig {
    fn fsa_channel_for_kit_channel(&self, kit_channel: u32) -> Option<u32> {
        self.channel(kit_channel).map(|c| c.fsa_channel)
    }

    fn color_name(&self, kit_channel: u32) -> Option<&str> {
        self.channel(kit_channel).map(|c| c.color.as_str())
    }

    fn dye_name(&self, kit_channel: u32) -> Option<&str> {
        self.channel(kit_channel).map(|c| c.dye.as_str())
    }
}
