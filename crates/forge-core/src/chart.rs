//! Chart projector: pure mapping from chart arrays to plot primitives.
//!
//! Two independent projections: speed over mission time (linear/linear) and
//! energy over speed (category/log10). Each returns `None` instead of an
//! empty frame when there is nothing to plot.

use crate::constants::SPEED_AXIS_HEADROOM;
use crate::format::escape_html;
use crate::invention::{EnergyRequirement, PropulsionPhase};

const SVG_WIDTH: f64 = 680.0;
const SVG_HEIGHT: f64 = 300.0;
const MARGIN: f64 = 56.0;
const ACCENT: &str = "#22d3ee";
const GRID: &str = "#0891b2";
const AXIS: &str = "#9ca3af";

/// JavaScript-style `toExponential`: `1.50e+24`, `1e-3`.
pub fn to_exponential(value: f64, digits: usize) -> String {
    let raw = format!("{value:.digits$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => raw,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub min: f64,
    pub max: f64,
}

impl LinearScale {
    fn new(min: f64, max: f64) -> Self {
        let max = if max - min > f64::EPSILON { max } else { min + 1.0 };
        Self { min, max }
    }

    /// Position of `v` along the axis in [0, 1].
    pub fn fraction(&self, v: f64) -> f64 {
        ((v - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    /// `count` evenly spaced tick values including both ends.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let count = count.max(2);
        (0..count)
            .map(|i| self.min + (self.max - self.min) * i as f64 / (count - 1) as f64)
            .collect()
    }
}

/// Whole-decade log10 axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogScale {
    pub min_exp: i32,
    pub max_exp: i32,
}

impl LogScale {
    fn spanning(min: f64, max: f64) -> Self {
        // log10 of exact powers of ten can land a hair off the integer.
        // The floor sits a full decade under the smallest value so its bar
        // keeps a visible height.
        let min_exp = (min.log10() - 1e-9).ceil() as i32 - 1;
        let mut max_exp = (max.log10() - 1e-9).ceil() as i32;
        if max_exp <= min_exp {
            max_exp = min_exp + 1;
        }
        Self { min_exp, max_exp }
    }

    pub fn fraction(&self, v: f64) -> f64 {
        let span = (self.max_exp - self.min_exp) as f64;
        ((v.log10() - self.min_exp as f64) / span).clamp(0.0, 1.0)
    }

    /// One tick per decade, thinned so at most 8 are labelled.
    pub fn ticks(&self) -> Vec<(f64, String)> {
        let decades = (self.max_exp - self.min_exp) as usize;
        let step = decades.div_ceil(7).max(1);
        (self.min_exp..=self.max_exp)
            .step_by(step)
            .map(|e| {
                let v = 10f64.powi(e);
                (v, to_exponential(v, 0))
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedPoint {
    pub phase: String,
    pub time_days: f64,
    pub speed_c: f64,
    /// Hover text: phase, time and speed.
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedChart {
    /// In source order.
    pub points: Vec<SpeedPoint>,
    /// Indices into `points`, ascending by time; drawing order of the line.
    pub path: Vec<usize>,
    pub x: LinearScale,
    pub y: LinearScale,
}

/// Speed over mission time. `None` when there are no phases.
pub fn project_speed(phases: &[PropulsionPhase]) -> Option<SpeedChart> {
    if phases.is_empty() {
        return None;
    }

    let points: Vec<SpeedPoint> = phases
        .iter()
        .map(|p| SpeedPoint {
            phase: p.phase.clone(),
            time_days: p.time_days,
            speed_c: p.speed_c,
            label: format!(
                "{}\nTime: {} days\nSpeed: {} c",
                p.phase, p.time_days, p.speed_c
            ),
        })
        .collect();

    let mut path: Vec<usize> = (0..points.len()).collect();
    path.sort_by(|&a, &b| points[a].time_days.total_cmp(&points[b].time_days));

    let t_min = points.iter().map(|p| p.time_days).fold(0.0, f64::min);
    let t_max = points.iter().map(|p| p.time_days).fold(f64::MIN, f64::max);
    let s_max = points.iter().map(|p| p.speed_c).fold(f64::MIN, f64::max);
    let s_min = points.iter().map(|p| p.speed_c).fold(0.0, f64::min);

    Some(SpeedChart {
        points,
        path,
        x: LinearScale::new(t_min, t_max),
        y: LinearScale::new(s_min, s_max + SPEED_AXIS_HEADROOM),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnergyBar {
    pub speed_c: f64,
    pub energy_j: f64,
    /// Category label with unit suffix, e.g. `0.5 c`.
    pub category: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnergyChart {
    pub bars: Vec<EnergyBar>,
    pub y: LogScale,
    /// Source indices dropped for non-positive or non-finite energy.
    pub rejected: Vec<usize>,
}

/// Energy over speed on a log axis. `None` when nothing plottable remains.
pub fn project_energy(requirements: &[EnergyRequirement]) -> Option<EnergyChart> {
    let mut bars = Vec::new();
    let mut rejected = Vec::new();

    for (i, r) in requirements.iter().enumerate() {
        if !(r.energy_j.is_finite() && r.energy_j > 0.0) {
            rejected.push(i);
            continue;
        }
        bars.push(EnergyBar {
            speed_c: r.speed_c,
            energy_j: r.energy_j,
            category: format!("{} c", r.speed_c),
            label: format!(
                "Speed: {} c\nEnergy: {} J",
                r.speed_c,
                to_exponential(r.energy_j, 2)
            ),
        });
    }

    if bars.is_empty() {
        return None;
    }

    let min = bars.iter().map(|b| b.energy_j).fold(f64::MAX, f64::min);
    let max = bars.iter().map(|b| b.energy_j).fold(f64::MIN, f64::max);

    Some(EnergyChart {
        bars,
        y: LogScale::spanning(min, max),
        rejected,
    })
}

// ---------------------------------------------------------------------------
// SVG rendering
// ---------------------------------------------------------------------------

fn plot_width() -> f64 {
    SVG_WIDTH - 2.0 * MARGIN
}

fn plot_height() -> f64 {
    SVG_HEIGHT - 2.0 * MARGIN
}

fn frame(title: &str, x_label: &str, y_label: &str, body: &str) -> String {
    let bottom = SVG_HEIGHT - MARGIN;
    let right = SVG_WIDTH - MARGIN;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="Roboto, sans-serif">
  <text x="{cx}" y="22" text-anchor="middle" font-size="15" font-weight="600" fill="{ACCENT}">{title}</text>
  <line x1="{MARGIN}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="{AXIS}"/>
  <line x1="{MARGIN}" y1="{MARGIN}" x2="{MARGIN}" y2="{bottom}" stroke="{AXIS}"/>
  <text x="{cx}" y="{xl}" text-anchor="middle" font-size="12" fill="{AXIS}">{x_label}</text>
  <text x="14" y="{cy}" text-anchor="middle" font-size="12" fill="{AXIS}" transform="rotate(-90, 14, {cy})">{y_label}</text>
{body}</svg>
"##,
        w = SVG_WIDTH,
        h = SVG_HEIGHT,
        cx = SVG_WIDTH / 2.0,
        cy = SVG_HEIGHT / 2.0,
        xl = SVG_HEIGHT - 12.0,
    )
}

impl SpeedChart {
    fn px(&self, time_days: f64, speed_c: f64) -> (f64, f64) {
        (
            MARGIN + self.x.fraction(time_days) * plot_width(),
            SVG_HEIGHT - MARGIN - self.y.fraction(speed_c) * plot_height(),
        )
    }

    pub fn to_svg(&self) -> String {
        let mut body = String::new();

        for v in self.y.ticks(5) {
            let (_, y) = self.px(self.x.min, v);
            body.push_str(&format!(
                "  <line x1=\"{MARGIN}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"{GRID}\" stroke-opacity=\"0.2\" stroke-dasharray=\"3 3\"/>\n  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"11\" fill=\"{AXIS}\">{v:.2}</text>\n",
                SVG_WIDTH - MARGIN,
                MARGIN - 6.0,
                y + 4.0,
            ));
        }
        for v in self.x.ticks(5) {
            let (x, _) = self.px(v, self.y.min);
            body.push_str(&format!(
                "  <text x=\"{x:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"11\" fill=\"{AXIS}\">{}</text>\n",
                SVG_HEIGHT - MARGIN + 16.0,
                v.round()
            ));
        }

        let line: Vec<String> = self
            .path
            .iter()
            .map(|&i| {
                let p = &self.points[i];
                let (x, y) = self.px(p.time_days, p.speed_c);
                format!("{x:.1},{y:.1}")
            })
            .collect();
        body.push_str(&format!(
            "  <polyline points=\"{}\" fill=\"none\" stroke=\"{ACCENT}\" stroke-width=\"2\"/>\n",
            line.join(" ")
        ));

        for p in &self.points {
            let (x, y) = self.px(p.time_days, p.speed_c);
            body.push_str(&format!(
                "  <circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"4\" fill=\"{ACCENT}\"><title>{}</title></circle>\n",
                escape_html(&p.label)
            ));
        }

        frame("Propulsion Phases", "Mission Time (days)", "Speed (c)", &body)
    }
}

impl EnergyChart {
    pub fn to_svg(&self) -> String {
        let mut body = String::new();
        let slot = plot_width() / self.bars.len() as f64;
        let baseline = SVG_HEIGHT - MARGIN;

        for (v, label) in self.y.ticks() {
            let y = baseline - self.y.fraction(v) * plot_height();
            body.push_str(&format!(
                "  <line x1=\"{MARGIN}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"{GRID}\" stroke-opacity=\"0.2\" stroke-dasharray=\"3 3\"/>\n  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"11\" fill=\"{AXIS}\">{label}</text>\n",
                SVG_WIDTH - MARGIN,
                MARGIN - 6.0,
                y + 4.0,
            ));
        }

        for (i, bar) in self.bars.iter().enumerate() {
            let height = self.y.fraction(bar.energy_j) * plot_height();
            let x = MARGIN + i as f64 * slot + slot * 0.15;
            body.push_str(&format!(
                "  <rect x=\"{x:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{height:.1}\" fill=\"{ACCENT}\"><title>{}</title></rect>\n  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"11\" fill=\"{AXIS}\">{}</text>\n",
                baseline - height,
                slot * 0.7,
                escape_html(&bar.label),
                x + slot * 0.35,
                baseline + 16.0,
                escape_html(&bar.category),
            ));
        }

        frame("Energy Requirements", "Speed (c)", "Energy (Joules)", &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn phase(name: &str, t: f64, s: f64) -> PropulsionPhase {
        PropulsionPhase {
            phase: name.to_string(),
            time_days: t,
            speed_c: s,
        }
    }

    fn energy(s: f64, e: f64) -> EnergyRequirement {
        EnergyRequirement {
            speed_c: s,
            energy_j: e,
        }
    }

    #[test]
    fn test_to_exponential_matches_js() {
        assert_eq!(to_exponential(1e24, 0), "1e+24");
        assert_eq!(to_exponential(1.5e24, 2), "1.50e+24");
        assert_eq!(to_exponential(0.001, 0), "1e-3");
        assert_eq!(to_exponential(3.0, 2), "3.00e+0");
    }

    #[test]
    fn test_empty_arrays_project_nothing() {
        assert!(project_speed(&[]).is_none());
        assert!(project_energy(&[]).is_none());
    }

    #[test]
    fn test_speed_domain_has_headroom() {
        let chart = project_speed(&[phase("Launch", 0.0, 0.0), phase("Cruise", 30.0, 0.9)]).unwrap();
        assert_relative_eq!(chart.y.min, 0.0);
        assert_relative_eq!(chart.y.max, 0.95);
        assert_relative_eq!(chart.x.max, 30.0);
    }

    #[test]
    fn test_speed_tolerates_unordered_and_duplicate_times() {
        let chart = project_speed(&[
            phase("Cruise", 50.0, 0.8),
            phase("Launch", 0.0, 0.0),
            phase("Boost", 10.0, 0.3),
            phase("Boost 2", 10.0, 0.4),
        ])
        .unwrap();
        // Source order preserved for labels, path sorted stably by time.
        assert_eq!(chart.points[0].phase, "Cruise");
        assert_eq!(chart.path, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_speed_single_instant_domain_not_degenerate() {
        let chart = project_speed(&[phase("Only", 0.0, 0.5)]).unwrap();
        assert!(chart.x.max > chart.x.min);
        let f = chart.x.fraction(0.0);
        assert!(f.is_finite());
    }

    #[test]
    fn test_speed_label() {
        let chart = project_speed(&[phase("Cruise", 120.0, 0.99)]).unwrap();
        assert_eq!(chart.points[0].label, "Cruise\nTime: 120 days\nSpeed: 0.99 c");
    }

    #[test]
    fn test_energy_large_value_on_log_axis() {
        let chart = project_energy(&[energy(0.99, 1e24)]).unwrap();
        assert_eq!(chart.y.min_exp, 23);
        assert_eq!(chart.y.max_exp, 24);
        let f = chart.y.fraction(1e24);
        assert!(f.is_finite());
        assert_relative_eq!(f, 1.0, epsilon = 1e-9);
        assert_eq!(chart.bars[0].label, "Speed: 0.99 c\nEnergy: 1.00e+24 J");
        assert_eq!(chart.bars[0].category, "0.99 c");
    }

    #[test]
    fn test_energy_zero_and_negative_rejected() {
        let chart = project_energy(&[
            energy(0.1, 1e20),
            energy(0.2, 0.0),
            energy(0.3, -5.0),
            energy(0.99, 1e24),
        ])
        .unwrap();
        assert_eq!(chart.rejected, vec![1, 2]);
        assert_eq!(chart.bars.len(), 2);
        assert!(chart.bars.iter().all(|b| b.energy_j > 0.0));
        assert!(chart.to_svg().contains("<rect"));
        assert!(!chart.to_svg().contains("inf"));
    }

    fn bar_heights(svg: &str) -> Vec<f64> {
        svg.lines()
            .filter(|l| l.trim_start().starts_with("<rect"))
            .filter_map(|l| l.split("height=\"").nth(1))
            .filter_map(|rest| rest.split('"').next())
            .filter_map(|h| h.parse().ok())
            .collect()
    }

    #[test]
    fn test_every_energy_bar_has_height() {
        for energies in [
            vec![1e24],
            vec![1e20, 1e24],
            vec![2e18, 3e21],
            vec![5.0, 5.0],
        ] {
            let reqs: Vec<_> = energies.iter().map(|&e| energy(0.5, e)).collect();
            let chart = project_energy(&reqs).unwrap();
            let heights = bar_heights(&chart.to_svg());
            assert_eq!(heights.len(), energies.len());
            assert!(
                heights.iter().all(|&h| h > 0.0),
                "{energies:?} gave heights {heights:?}"
            );
        }
    }

    #[test]
    fn test_power_of_ten_minimum_sits_above_floor() {
        let chart = project_energy(&[energy(0.1, 1e20), energy(0.99, 1e24)]).unwrap();
        assert_eq!(chart.y.min_exp, 19);
        assert_eq!(chart.y.max_exp, 24);
        assert!(chart.y.fraction(1e20) > 0.0);
    }

    #[test]
    fn test_energy_all_rejected_renders_nothing() {
        assert!(project_energy(&[energy(0.5, 0.0)]).is_none());
    }

    #[test]
    fn test_log_ticks_are_decades() {
        let chart = project_energy(&[energy(0.1, 2e18), energy(0.9, 3e21)]).unwrap();
        let labels: Vec<String> = chart.y.ticks().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["1e+18", "1e+19", "1e+20", "1e+21", "1e+22"]);
    }

    #[test]
    fn test_log_ticks_thinned_for_wide_span() {
        let chart = project_energy(&[energy(0.1, 1.0), energy(0.9, 1e30)]).unwrap();
        assert!(chart.y.ticks().len() <= 8);
    }

    #[test]
    fn test_speed_svg_has_hover_titles() {
        let svg = project_speed(&[phase("A&B", 0.0, 0.1), phase("C", 5.0, 0.2)])
            .unwrap()
            .to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<title>A&amp;B\nTime: 0 days\nSpeed: 0.1 c</title>"));
        assert!(svg.contains("<polyline"));
    }
}
