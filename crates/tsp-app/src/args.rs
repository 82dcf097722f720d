// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line argument types shared by the `edit` and `print` commands.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, ValueEnum};
use image::RgbaImage;
use tsp_core::{EditMode, EditParams, FilterKind, PaperSize, PixelSize, PrintType};
use tsp_pipeline::{EditEvent, FlipAxis};
use tsp_print::ViewportSize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeChoice {
    Basic,
    Advanced,
    PostProcess,
    Dotwork,
}

impl From<ModeChoice> for EditMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Basic => EditMode::Basic,
            ModeChoice::Advanced => EditMode::Advanced,
            ModeChoice::PostProcess => EditMode::PostProcess,
            ModeChoice::Dotwork => EditMode::Dotwork,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutChoice {
    /// One sheet.
    Single,
    /// Three sheets stacked vertically.
    Sleeve,
    /// Three by three sheets.
    Back,
}

impl From<LayoutChoice> for PrintType {
    fn from(choice: LayoutChoice) -> Self {
        match choice {
            LayoutChoice::Single => PrintType::Single,
            LayoutChoice::Sleeve => PrintType::Sleeve,
            LayoutChoice::Back => PrintType::Back,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PaperChoice {
    A3,
    A4,
    A5,
    Letter,
}

impl From<PaperChoice> for PaperSize {
    fn from(choice: PaperChoice) -> Self {
        match choice {
            PaperChoice::A3 => PaperSize::A3,
            PaperChoice::A4 => PaperSize::A4,
            PaperChoice::A5 => PaperSize::A5,
            PaperChoice::Letter => PaperSize::Letter,
        }
    }
}

/// Edit settings applied to the loaded image.
#[derive(Args, Debug, Default, Clone)]
pub struct EditArgs {
    /// Editing mode. Inferred from the other flags when omitted.
    #[arg(long, value_enum)]
    pub mode: Option<ModeChoice>,

    /// JSON file of edit parameters. Flags given alongside it win.
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Brightness, -100 to 100.
    #[arg(long, allow_hyphen_values = true)]
    pub brightness: Option<f32>,

    /// Contrast factor, 0 to 3.
    #[arg(long)]
    pub contrast: Option<f32>,

    /// Exposure gain, 0.5 to 3.
    #[arg(long)]
    pub exposure: Option<f32>,

    /// Gamma, 0.1 to 3.
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Sharpness, 0 to 10.
    #[arg(long)]
    pub sharpness: Option<f32>,

    /// Gaussian blur kernel size, 1 to 25.
    #[arg(long)]
    pub blur: Option<f32>,

    /// Sketch detail, 1 to 50.
    #[arg(long)]
    pub sketch_details: Option<f32>,

    /// Sketch gamma, 0.1 to 3.
    #[arg(long)]
    pub sketch_gamma: Option<f32>,

    /// Dot density for the dotwork composite, 0 to 1.
    #[arg(long)]
    pub dot_density: Option<f32>,

    /// Dot size for the dotwork composite.
    #[arg(long)]
    pub dot_size: Option<u32>,

    /// Enable the dotwork composite.
    #[arg(long)]
    pub dotwork: bool,

    /// Convert the result to black and white.
    #[arg(long)]
    pub bw: bool,

    /// Remove the background using the platform segmenter.
    #[arg(long)]
    pub remove_background: bool,

    /// Mirror the image left to right before editing.
    #[arg(long)]
    pub flip_horizontal: bool,

    /// Mirror the image top to bottom before editing.
    #[arg(long)]
    pub flip_vertical: bool,
}

impl EditArgs {
    fn load_preset(&self) -> anyhow::Result<Option<EditParams>> {
        let Some(path) = &self.preset else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(path).with_context(|| format!("read preset '{}'", path.display()))?;
        let params = EditParams::from_json(&json).with_context(|| format!("parse preset '{}'", path.display()))?;
        Ok(Some(params))
    }

    /// Lowest mode that runs every stage the flags ask for.
    fn inferred_mode(&self, preset: Option<&EditParams>) -> EditMode {
        if let Some(mode) = self.mode {
            return mode.into();
        }
        let dots = self.dotwork || preset.is_some_and(EditParams::dotwork_enabled);
        let post = self.blur.is_some() || preset.is_some_and(|p| !p.is_neutral(FilterKind::GaussianBlur));
        let sketch = self.sketch_details.is_some() || self.sketch_gamma.is_some();
        if dots {
            EditMode::Dotwork
        } else if post {
            EditMode::PostProcess
        } else if sketch || preset.is_some() {
            EditMode::Advanced
        } else {
            EditMode::Basic
        }
    }

    /// Events that take a freshly loaded `image` to the requested edit.
    pub fn events(&self, image: RgbaImage) -> anyhow::Result<Vec<EditEvent>> {
        let preset = self.load_preset()?;
        let mut events = vec![EditEvent::ImageLoaded(image)];

        // Flips replace the base and reset parameters, so they go first.
        if self.flip_horizontal {
            events.push(EditEvent::Flip(FlipAxis::Horizontal));
        }
        if self.flip_vertical {
            events.push(EditEvent::Flip(FlipAxis::Vertical));
        }
        events.push(EditEvent::ChangeMode(self.inferred_mode(preset.as_ref())));

        let flags = [
            (FilterKind::Brightness, self.brightness),
            (FilterKind::Contrast, self.contrast),
            (FilterKind::Exposure, self.exposure),
            (FilterKind::Gamma, self.gamma),
            (FilterKind::Sharpness, self.sharpness),
            (FilterKind::GaussianBlur, self.blur),
        ];
        for (kind, flag) in flags {
            let value = flag.or_else(|| preset.as_ref().filter(|p| !p.is_neutral(kind)).map(|p| p.get(kind)));
            if let Some(value) = value {
                events.push(EditEvent::SetFilter { kind, value });
            }
        }

        let p = preset.as_ref();
        let defaults = EditParams::default();
        if let Some(v) = self.sketch_details.or(preset_change(p, &defaults, EditParams::sketch_details)) {
            events.push(EditEvent::SetSketchDetails(v));
        }
        if let Some(v) = self.sketch_gamma.or(preset_change(p, &defaults, EditParams::sketch_gamma)) {
            events.push(EditEvent::SetSketchGamma(v));
        }
        if self.dotwork || p.is_some_and(EditParams::dotwork_enabled) {
            events.push(EditEvent::ToggleDotwork);
        }
        if let Some(v) = self.dot_density.or(preset_change(p, &defaults, EditParams::dot_density)) {
            events.push(EditEvent::SetDotDensity(v));
        }
        if let Some(v) = self.dot_size.or(preset_change(p, &defaults, EditParams::dot_size)) {
            events.push(EditEvent::SetDotSize(v));
        }
        if self.remove_background || p.is_some_and(EditParams::remove_background) {
            events.push(EditEvent::ToggleRemoveBackground);
        }
        if self.bw || p.is_some_and(EditParams::black_and_white) {
            events.push(EditEvent::ToggleBlackAndWhite);
        }
        Ok(events)
    }
}

/// A preset's value for one setting, if it differs from the default.
fn preset_change<T: PartialEq>(
    preset: Option<&EditParams>,
    defaults: &EditParams,
    get: fn(&EditParams) -> T,
) -> Option<T> {
    preset.map(get).filter(|v| *v != get(defaults))
}

fn parse_dimensions(s: &str) -> Result<(f32, f32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid dimension '{v}': {e}"))
    };
    let (w, h) = (parse(w)?, parse(h)?);
    if !(w > 0.0 && h > 0.0) {
        return Err(format!("dimensions must be positive, got '{s}'"));
    }
    Ok((w, h))
}

/// `WIDTHxHEIGHT` in display units.
pub fn parse_viewport(s: &str) -> Result<ViewportSize, String> {
    let (w, h) = parse_dimensions(s)?;
    Ok(ViewportSize::new(w, h))
}

/// `WIDTHxHEIGHT` in whole pixels.
pub fn parse_canvas(s: &str) -> Result<PixelSize, String> {
    let (w, h) = parse_dimensions(s)?;
    if w.fract() != 0.0 || h.fract() != 0.0 {
        return Err(format!("canvas size must be whole pixels, got '{s}'"));
    }
    Ok(PixelSize::new(w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn kinds(events: &[EditEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| format!("{e:?}").split(['(', ' ', '{']).next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn plain_load_stays_in_basic_mode() {
        let events = EditArgs::default().events(RgbaImage::new(2, 2)).unwrap();
        assert_eq!(kinds(&events), vec!["ImageLoaded", "ChangeMode"]);
        assert!(matches!(events[1], EditEvent::ChangeMode(EditMode::Basic)));
    }

    #[test]
    fn flips_come_before_parameters() {
        let args = EditArgs {
            brightness: Some(-20.0),
            flip_vertical: true,
            bw: true,
            ..EditArgs::default()
        };
        let events = args.events(RgbaImage::new(2, 2)).unwrap();
        assert_eq!(
            kinds(&events),
            vec!["ImageLoaded", "Flip", "ChangeMode", "SetFilter", "ToggleBlackAndWhite"]
        );
    }

    #[test]
    fn inferred_mode_covers_requested_stages() {
        let args = EditArgs {
            dotwork: true,
            dot_size: Some(4),
            ..EditArgs::default()
        };
        let events = args.events(RgbaImage::new(2, 2)).unwrap();
        assert!(matches!(events[1], EditEvent::ChangeMode(EditMode::Dotwork)));
        assert!(events.iter().any(|e| matches!(e, EditEvent::SetDotSize(4))));

        let blur = EditArgs {
            blur: Some(5.0),
            ..EditArgs::default()
        };
        let events = blur.events(RgbaImage::new(2, 2)).unwrap();
        assert!(matches!(events[1], EditEvent::ChangeMode(EditMode::PostProcess)));

        let explicit = EditArgs {
            mode: Some(ModeChoice::Basic),
            ..args
        };
        let events = explicit.events(RgbaImage::new(2, 2)).unwrap();
        assert!(matches!(events[1], EditEvent::ChangeMode(EditMode::Basic)));
    }

    #[test]
    fn preset_values_yield_to_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"contrast": 2.0, "brightness": 30.0, "black_and_white": true}}"#).unwrap();
        let args = EditArgs {
            preset: Some(file.path().to_path_buf()),
            brightness: Some(-10.0),
            ..EditArgs::default()
        };
        let events = args.events(RgbaImage::new(2, 2)).unwrap();
        let filters: Vec<(FilterKind, f32)> = events
            .iter()
            .filter_map(|e| match e {
                EditEvent::SetFilter { kind, value } => Some((*kind, *value)),
                _ => None,
            })
            .collect();
        assert_eq!(filters, vec![(FilterKind::Brightness, -10.0), (FilterKind::Contrast, 2.0)]);
        assert!(events.iter().any(|e| matches!(e, EditEvent::ToggleBlackAndWhite)));
        assert!(!events.iter().any(|e| matches!(e, EditEvent::ToggleDotwork)));
    }

    #[test]
    fn preset_only_emits_settings_it_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"contrast": 2.0}}"#).unwrap();
        let args = EditArgs {
            preset: Some(file.path().to_path_buf()),
            ..EditArgs::default()
        };
        let events = args.events(RgbaImage::new(2, 2)).unwrap();
        assert_eq!(kinds(&events), vec!["ImageLoaded", "ChangeMode", "SetFilter"]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sketch_gamma": 2.0}}"#).unwrap();
        let args = EditArgs {
            preset: Some(file.path().to_path_buf()),
            sketch_details: Some(20.0),
            ..EditArgs::default()
        };
        let events = args.events(RgbaImage::new(2, 2)).unwrap();
        assert_eq!(
            kinds(&events),
            vec!["ImageLoaded", "ChangeMode", "SetSketchDetails", "SetSketchGamma"]
        );
        assert!(events.iter().any(|e| matches!(e, EditEvent::SetSketchGamma(g) if *g == 2.0)));
    }

    #[test]
    fn missing_preset_is_an_error() {
        let args = EditArgs {
            preset: Some(PathBuf::from("/nonexistent/preset.json")),
            ..EditArgs::default()
        };
        assert!(args.events(RgbaImage::new(1, 1)).is_err());
    }

    #[test]
    fn dimension_parsing() {
        assert_eq!(parse_viewport("400x600").unwrap(), ViewportSize::new(400.0, 600.0));
        assert_eq!(parse_canvas("1200X5400").unwrap(), PixelSize::new(1200, 5400));
        assert!(parse_canvas("12.5x3").is_err());
        assert!(parse_viewport("0x10").is_err());
        assert!(parse_viewport("400").is_err());
    }
}
