// Workbook color palette
// Colors are `RRGGBB` hex strings in config files and `0xRRGGBB` integers at use sites.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub primary: String,
    pub header_fill: String,
    pub header_font: String,
    pub section_fill: String,
    pub input_fill: String,
    pub input_font: String,
    pub output_fill: String,
    pub total_border: String,
    pub note_font: String,
    pub link_font: String,

    // 3-color scale on sensitivity grids
    pub scale_low: String,
    pub scale_mid: String,
    pub scale_high: String,

    // Chart series
    pub chart_primary: String,
    pub chart_secondary: String,
    pub chart_increase: String,
    pub chart_decrease: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: "1F4E79".into(),
            header_fill: "1F4E79".into(),
            header_font: "FFFFFF".into(),
            section_fill: "D9D9D9".into(),
            input_fill: "FFF2CC".into(),
            input_font: "0000FF".into(),
            output_fill: "E2EFDA".into(),
            total_border: "404040".into(),
            note_font: "666666".into(),
            link_font: "0563C1".into(),
            scale_low: "F8696B".into(),
            scale_mid: "FFEB84".into(),
            scale_high: "63BE7B".into(),
            chart_primary: "1F4E79".into(),
            chart_secondary: "70AD47".into(),
            chart_increase: "63BE7B".into(),
            chart_decrease: "F8696B".into(),
        }
    }
}

/// Parse `RRGGBB` (optionally `#`-prefixed) into `0xRRGGBB`.
pub fn hex_to_rgb(hex: &str) -> Option<u32> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

impl Palette {
    fn entries(&self) -> [(&'static str, &str); 17] {
        [
            ("primary", self.primary.as_str()),
            ("header_fill", self.header_fill.as_str()),
            ("header_font", self.header_font.as_str()),
            ("section_fill", self.section_fill.as_str()),
            ("input_fill", self.input_fill.as_str()),
            ("input_font", self.input_font.as_str()),
            ("output_fill", self.output_fill.as_str()),
            ("total_border", self.total_border.as_str()),
            ("note_font", self.note_font.as_str()),
            ("link_font", self.link_font.as_str()),
            ("scale_low", self.scale_low.as_str()),
            ("scale_mid", self.scale_mid.as_str()),
            ("scale_high", self.scale_high.as_str()),
            ("chart_primary", self.chart_primary.as_str()),
            ("chart_secondary", self.chart_secondary.as_str()),
            ("chart_increase", self.chart_increase.as_str()),
            ("chart_decrease", self.chart_decrease.as_str()),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.entries() {
            if hex_to_rgb(value).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "palette.{name}: expected RRGGBB hex, got '{value}'"
                )));
            }
        }
        Ok(())
    }

    /// Resolved color. Call after `validate`; malformed entries fall back to black.
    pub fn rgb(hex: &str) -> u32 {
        hex_to_rgb(hex).unwrap_or(0x000000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex() {
        assert_eq!(hex_to_rgb("1F4E79"), Some(0x1F4E79));
        assert_eq!(hex_to_rgb("#ffffff"), Some(0xFFFFFF));
        assert_eq!(hex_to_rgb("FFF"), None);
        assert_eq!(hex_to_rgb("GGGGGG"), None);
    }

    #[test]
    fn default_palette_is_valid() {
        assert!(Palette::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_entry() {
        let palette = Palette {
            scale_mid: "yellow".into(),
            ..Palette::default()
        };
        let err = palette.validate().unwrap_err().to_string();
        assert!(err.contains("palette.scale_mid"), "{err}");
    }
}
