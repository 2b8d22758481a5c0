//! Typed invention data, built only from a validated response.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FILE_STEM, STABILITY_LOW_PCT, STABILITY_NOMINAL_PCT};

/// A named waypoint in a simulated mission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropulsionPhase {
    pub phase: String,
    pub time_days: f64,
    /// Fraction of light speed; nominally in [0, 1].
    pub speed_c: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyRequirement {
    pub speed_c: f64,
    pub energy_j: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub propulsion_phases: Vec<PropulsionPhase>,
    pub energy_requirements: Vec<EnergyRequirement>,
}

/// Primitive shape of a model component. Unknown tags build a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Shape {
    Box,
    Sphere,
    Cylinder,
    Cone,
}

impl Shape {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "sphere" => Shape::Sphere,
            "cylinder" => Shape::Cylinder,
            "cone" => Shape::Cone,
            _ => Shape::Box,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Box => "box",
            Shape::Sphere => "sphere",
            Shape::Cylinder => "cylinder",
            Shape::Cone => "cone",
        }
    }
}

impl From<String> for Shape {
    fn from(tag: String) -> Self {
        Shape::from_tag(&tag)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub shape: Shape,
    pub scale: [f64; 3],
    pub position: [f64; 3],
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParams {
    /// First entry is the hull.
    pub components: Vec<Component>,
    pub primary_color: String,
    pub secondary_color: String,
}

/// One generation or refinement result. Replaced wholesale, never patched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventionOutput {
    pub text: String,
    pub image_url: Option<String>,
    pub chart_data: Option<ChartData>,
    pub model_params: Option<ModelParams>,
    pub stability_percentage: Option<f64>,
}

impl InventionOutput {
    /// First line of the document with its heading marker removed.
    pub fn title(&self) -> String {
        let text = self.text.replace("\\n", "\n");
        let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        first.trim().trim_start_matches('#').trim().to_string()
    }

    /// Download-friendly name built only from `[A-Za-z0-9_-]`. Any run of
    /// other characters becomes a single `_`, so a title like `../x` or
    /// `a/b` stays a plain file name.
    pub fn file_stem(&self) -> String {
        let mut stem = String::new();
        for c in self.title().chars() {
            if c.is_ascii_alphanumeric() || c == '-' {
                stem.push(c);
            } else if !stem.is_empty() && !stem.ends_with('_') {
                stem.push('_');
            }
        }
        let stem = stem.trim_end_matches('_');
        if stem.is_empty() {
            DEFAULT_FILE_STEM.to_string()
        } else {
            stem.to_string()
        }
    }

    pub fn propulsion_phases(&self) -> &[PropulsionPhase] {
        self.chart_data
            .as_ref()
            .map(|c| c.propulsion_phases.as_slice())
            .unwrap_or(&[])
    }

    pub fn energy_requirements(&self) -> &[EnergyRequirement] {
        self.chart_data
            .as_ref()
            .map(|c| c.energy_requirements.as_slice())
            .unwrap_or(&[])
    }
}

/// Coarse reading of a stability percentage, used to color its badge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StabilityBand {
    /// At or above 98%.
    Nominal,
    Marginal,
    /// Below 90%.
    Low,
}

impl StabilityBand {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= STABILITY_NOMINAL_PCT {
            StabilityBand::Nominal
        } else if pct < STABILITY_LOW_PCT {
            StabilityBand::Low
        } else {
            StabilityBand::Marginal
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            StabilityBand::Nominal => "stability-nominal",
            StabilityBand::Marginal => "stability-marginal",
            StabilityBand::Low => "stability-low",
        }
    }
}

/// sRGB color parsed from `#rgb` or `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Self {
                    r: short(0)?,
                    g: short(1)?,
                    b: short(2)?,
                })
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear-light channels in [0, 1], as glTF base color factors expect.
    pub fn to_linear(self) -> [f32; 3] {
        fn decode(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [decode(self.r), decode(self.g), decode(self.b)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str) -> InventionOutput {
        InventionOutput {
            text: text.to_string(),
            image_url: None,
            chart_data: None,
            model_params: None,
            stability_percentage: None,
        }
    }

    #[test]
    fn test_shape_unknown_tag_is_box() {
        assert_eq!(Shape::from_tag("torus"), Shape::Box);
        assert_eq!(Shape::from_tag(""), Shape::Box);
        assert_eq!(Shape::from_tag("Sphere"), Shape::Sphere);
        assert_eq!(Shape::from_tag("cone"), Shape::Cone);
    }

    #[test]
    fn test_shape_deserialize_tolerates_unknown() {
        let shape: Shape = serde_json::from_str("\"dodecahedron\"").unwrap();
        assert_eq!(shape, Shape::Box);
        assert_eq!(serde_json::to_string(&Shape::Cylinder).unwrap(), "\"cylinder\"");
    }

    #[test]
    fn test_rgb_long_and_short_forms() {
        assert_eq!(
            Rgb::parse_hex("#00ffff"),
            Some(Rgb { r: 0, g: 255, b: 255 })
        );
        assert_eq!(Rgb::parse_hex("#0ff"), Rgb::parse_hex("#00ffff"));
        assert_eq!(Rgb::parse_hex("00ffff"), None);
        assert_eq!(Rgb::parse_hex("#zzzzzz"), None);
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb { r: 136, g: 136, b: 136 }.to_hex(), "#888888");
    }

    #[test]
    fn test_rgb_linear_endpoints() {
        let white = Rgb { r: 255, g: 255, b: 255 }.to_linear();
        let black = Rgb { r: 0, g: 0, b: 0 }.to_linear();
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
        assert!(black.iter().all(|c| c.abs() < 1e-6));
    }

    #[test]
    fn test_title_and_file_stem() {
        let out = output("## Quantum  Harmonic Shield\nSummary line");
        assert_eq!(out.title(), "Quantum  Harmonic Shield");
        assert_eq!(out.file_stem(), "Quantum_Harmonic_Shield");
    }

    #[test]
    fn test_file_stem_handles_escaped_newlines() {
        let out = output("## Oort Probe\\nA small probe.");
        assert_eq!(out.file_stem(), "Oort_Probe");
    }

    #[test]
    fn test_file_stem_default_when_untitled() {
        assert_eq!(output("").file_stem(), DEFAULT_FILE_STEM);
        assert_eq!(output("##   ").file_stem(), DEFAULT_FILE_STEM);
    }

    #[test]
    fn test_file_stem_cannot_climb_out_of_directory() {
        let stem = output("## ../escaped\nbody").file_stem();
        assert_eq!(stem, "escaped");
        assert_eq!(output("## ../../etc/passwd").file_stem(), "etc_passwd");
        assert_eq!(output("## ..").file_stem(), DEFAULT_FILE_STEM);
    }

    #[test]
    fn test_file_stem_flattens_separators() {
        assert_eq!(output("## Warp/Drive Mk II").file_stem(), "Warp_Drive_Mk_II");
        assert_eq!(output("## C:\\Ship v2.0").file_stem(), "C_Ship_v2_0");
        assert_eq!(output("## Ion-Drive__X").file_stem(), "Ion-Drive_X");
    }

    #[test]
    fn test_stability_bands() {
        assert_eq!(StabilityBand::from_percentage(99.2), StabilityBand::Nominal);
        assert_eq!(StabilityBand::from_percentage(98.0), StabilityBand::Nominal);
        assert_eq!(StabilityBand::from_percentage(97.9), StabilityBand::Marginal);
        assert_eq!(StabilityBand::from_percentage(90.0), StabilityBand::Marginal);
        assert_eq!(StabilityBand::from_percentage(89.9), StabilityBand::Low);
        assert_eq!(StabilityBand::Low.css_class(), "stability-low");
    }

    #[test]
    fn test_output_wire_names() {
        let mut out = output("x");
        out.chart_data = Some(ChartData::default());
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("stabilityPercentage").is_some());
        assert!(json["chartData"].get("propulsionPhases").is_some());
    }
}
