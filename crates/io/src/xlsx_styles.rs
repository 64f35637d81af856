// Cell formats for export
//
// Every (role, number format) pair maps to one rust_xlsxwriter Format built from
// the palette and the format-code settings. Formats are built once per export.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};
use rustc_hash::FxHashMap;

use finmodel_config::{FormatSettings, Palette, Settings};
use finmodel_core::{CellStyle, NumberFormat, StyleRole};

pub struct StyleBook<'a> {
    palette: &'a Palette,
    formats: &'a FormatSettings,
    cache: FxHashMap<CellStyle, Format>,
}

impl<'a> StyleBook<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            palette: &settings.palette,
            formats: &settings.formats,
            cache: FxHashMap::default(),
        }
    }

    pub fn format(&mut self, style: CellStyle) -> &Format {
        let (palette, formats) = (self.palette, self.formats);
        self.cache
            .entry(style)
            .or_insert_with(|| build_format(palette, formats, style))
    }

    /// Excel format code for a display class; `None` for General.
    pub fn num_format(&self, format: NumberFormat) -> Option<&str> {
        num_format_code(self.formats, format)
    }

    /// Low, mid and high stops of the sensitivity color scale.
    pub fn scale_colors(&self) -> [Color; 3] {
        [&self.palette.scale_low, &self.palette.scale_mid, &self.palette.scale_high]
            .map(|hex| Color::RGB(Palette::rgb(hex)))
    }
}

fn num_format_code(formats: &FormatSettings, format: NumberFormat) -> Option<&str> {
    match format {
        NumberFormat::General => None,
        NumberFormat::Integer => Some(&formats.integer),
        NumberFormat::Decimal => Some(&formats.decimal),
        NumberFormat::Currency => Some(&formats.currency),
        NumberFormat::Percent => Some(&formats.percent),
        NumberFormat::Ratio => Some(&formats.ratio),
        NumberFormat::Factor => Some(&formats.factor),
    }
}

fn build_format(palette: &Palette, formats: &FormatSettings, style: CellStyle) -> Format {
    let rgb = |hex: &str| Color::RGB(Palette::rgb(hex));
    let mut format = Format::new().set_font_name("Calibri").set_font_size(10);

    format = match style.role {
        StyleRole::Title => format.set_bold().set_font_size(16).set_font_color(rgb(&palette.primary)),
        StyleRole::Subtitle => format.set_italic().set_font_size(11).set_font_color(rgb(&palette.note_font)),
        StyleRole::Header => format
            .set_bold()
            .set_font_color(rgb(&palette.header_font))
            .set_background_color(rgb(&palette.header_fill))
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin),
        StyleRole::Section => format
            .set_bold()
            .set_background_color(rgb(&palette.section_fill)),
        StyleRole::Label => format,
        StyleRole::Input => format
            .set_font_color(rgb(&palette.input_font))
            .set_background_color(rgb(&palette.input_fill))
            .set_border(FormatBorder::Thin),
        StyleRole::Calc => format,
        StyleRole::Total => format
            .set_bold()
            .set_border_top(FormatBorder::Thin)
            .set_border_top_color(rgb(&palette.total_border)),
        StyleRole::Output => format
            .set_bold()
            .set_background_color(rgb(&palette.output_fill))
            .set_border(FormatBorder::Thin),
        StyleRole::Note => format.set_italic().set_font_color(rgb(&palette.note_font)),
        StyleRole::Link => format
            .set_font_color(rgb(&palette.link_font))
            .set_underline(rust_xlsxwriter::FormatUnderline::Single),
    };

    if let Some(code) = num_format_code(formats, style.format) {
        format = format.set_num_format(code);
    }
    format
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_are_cached_per_style() {
        let settings = Settings::default();
        let mut book = StyleBook::new(&settings);
        let style = CellStyle::new(StyleRole::Input, NumberFormat::Percent);
        let first = book.format(style).clone();
        let second = book.format(style).clone();
        assert_eq!(first, second);
        assert_eq!(book.cache.len(), 1);
    }

    #[test]
    fn number_format_codes_come_from_settings() {
        let mut settings = Settings::default();
        settings.formats.percent = "0.00%".into();
        let book = StyleBook::new(&settings);
        assert_eq!(book.num_format(NumberFormat::Percent), Some("0.00%"));
        assert_eq!(book.num_format(NumberFormat::Ratio), Some("0.00\"x\""));
        assert_eq!(book.num_format(NumberFormat::Factor), Some("0.000"));
        assert_eq!(book.num_format(NumberFormat::General), None);
    }
}
