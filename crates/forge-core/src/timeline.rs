//! Mission timeline: positions phases along a 0–100% track and derives the
//! animation timing and trail effects for the animated view.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::constants::{
    BASE_CYCLE_SECS, GLOW_RADIUS_PX, GLOW_SPREAD_PX, MIN_TIMELINE_PHASES, SLOW_CYCLE_SPAN_SECS,
    STAR_COUNT, TRAIL_MAX_PX,
};
use crate::format::escape_html;
use crate::invention::PropulsionPhase;

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedPhase {
    pub phase: String,
    pub time_days: f64,
    pub speed_c: f64,
    /// Horizontal position in percent of the track, in [0, 100].
    pub position: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    pub phases: Vec<PlacedPhase>,
    pub max_speed: f64,
    pub total_time: f64,
}

impl Timeline {
    /// Place phases on the track. `None` below two phases.
    pub fn new(phases: &[PropulsionPhase]) -> Option<Self> {
        if phases.len() < MIN_TIMELINE_PHASES {
            return None;
        }

        let max_speed = phases.iter().map(|p| p.speed_c).fold(0.0, f64::max);
        let total_time = phases.iter().map(|p| p.time_days).fold(f64::MIN, f64::max);

        let phases = phases
            .iter()
            .map(|p| PlacedPhase {
                phase: p.phase.clone(),
                time_days: p.time_days,
                speed_c: p.speed_c,
                position: if total_time > 0.0 {
                    (p.time_days / total_time * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                },
            })
            .collect();

        Some(Self {
            phases,
            max_speed,
            total_time,
        })
    }

    /// Traversal cycle: 12s at or above 1c, up to 20s for a ship at rest.
    pub fn cycle_secs(&self) -> f64 {
        BASE_CYCLE_SECS + (1.0 - self.max_speed.min(1.0)) * SLOW_CYCLE_SPAN_SECS
    }

    pub fn animated(&self) -> AnimatedTimeline {
        let keyframes = self
            .phases
            .iter()
            .map(|p| {
                let speed = p.speed_c.max(0.0);
                let glow = speed.min(1.0);
                TrailKeyframe {
                    position: p.position,
                    length_px: (speed * TRAIL_MAX_PX).min(TRAIL_MAX_PX),
                    opacity: (speed * 2.0).min(1.0),
                    glow_radius_px: glow * GLOW_RADIUS_PX,
                    glow_spread_px: glow * GLOW_SPREAD_PX,
                }
            })
            .collect();

        AnimatedTimeline {
            timeline: self.clone(),
            cycle_secs: self.cycle_secs(),
            keyframes,
        }
    }

    pub fn static_view(&self) -> StaticTimeline {
        StaticTimeline {
            timeline: self.clone(),
        }
    }
}

/// Trail appearance when the ship passes one phase marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailKeyframe {
    pub position: f64,
    pub length_px: f64,
    pub opacity: f64,
    pub glow_radius_px: f64,
    pub glow_spread_px: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedTimeline {
    pub timeline: Timeline,
    pub cycle_secs: f64,
    pub keyframes: Vec<TrailKeyframe>,
}

impl AnimatedTimeline {
    pub fn to_css(&self) -> String {
        let mut trail = String::new();
        for k in &self.keyframes {
            trail.push_str(&format!(
                "  {:.2}% {{ width: {:.1}px; opacity: {:.3}; box-shadow: 0 0 {:.1}px {:.1}px rgba(77, 228, 255, 0.3); }}\n",
                k.position, k.length_px, k.opacity, k.glow_radius_px, k.glow_spread_px
            ));
        }
        format!(
            "@keyframes travel {{\n  from {{ left: -150px; }}\n  to {{ left: calc(100% + 150px); }}\n}}\n\
             @keyframes trail-fx {{\n{trail}}}\n\
             @keyframes twinkle {{\n  0% {{ opacity: 0; }}\n  50% {{ opacity: 1; }}\n  100% {{ opacity: 0; }}\n}}\n\
             .simulation {{ --animation-duration: {:.2}s; }}\n",
            self.cycle_secs
        )
    }

    /// Self-contained animated view. `seed` fixes the star field.
    pub fn to_html(&self, image_url: Option<&str>, seed: u64) -> String {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut stars = String::new();
        for _ in 0..STAR_COUNT {
            let left: f64 = rng.random::<f64>() * 100.0;
            let top: f64 = rng.random::<f64>() * 100.0;
            let delay: f64 = rng.random::<f64>() * 2.0;
            let duration: f64 = 2.0 + rng.random::<f64>() * 3.0;
            let scale: f64 = rng.random::<f64>() * 1.5;
            stars.push_str(&format!(
                "<div class=\"star\" style=\"left:{left:.2}%;top:{top:.2}%;animation-delay:{delay:.2}s;animation-duration:{duration:.2}s;transform:scale({scale:.2})\"></div>"
            ));
        }

        let markers: String = self
            .timeline
            .phases
            .iter()
            .map(|p| {
                format!(
                    "<div class=\"phase-marker\" style=\"left:{:.2}%\"><div class=\"marker-dot\"></div><div class=\"marker-text\"><span>{}</span><span class=\"speed\">{:.2}c</span></div></div>",
                    p.position,
                    escape_html(&p.phase),
                    p.speed_c
                )
            })
            .collect();

        format!(
            "<div class=\"simulation\">\n<style>\n{css}{SIMULATION_STYLE}</style>\n\
             <div class=\"stars\">{stars}</div>\n\
             <div class=\"ship-wrapper\"><div class=\"ship\"><div class=\"plasma-trail\"></div>{ship}</div></div>\n\
             <div class=\"track\"><div class=\"track-line\"></div>{markers}</div>\n\
             <div class=\"hud hud-left\">Max Speed: {:.2}c</div>\n\
             <div class=\"hud hud-right\">Journey Time: {} days</div>\n</div>\n",
            self.timeline.max_speed,
            self.timeline.total_time,
            css = self.to_css(),
            ship = ship_markup(image_url),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StaticTimeline {
    pub timeline: Timeline,
}

impl StaticTimeline {
    /// Caption under each marker, e.g. `0.50c at 30 days`.
    pub fn captions(&self) -> Vec<String> {
        self.timeline
            .phases
            .iter()
            .map(|p| format!("{:.2}c at {} days", p.speed_c, p.time_days))
            .collect()
    }

    /// Print-friendly markup: markers and labels, no animation.
    pub fn to_html(&self, image_url: Option<&str>) -> String {
        let markers: String = self
            .timeline
            .phases
            .iter()
            .zip(self.captions())
            .map(|(p, caption)| {
                format!(
                    "<div class=\"static-marker\" style=\"left:{:.2}%\"><div class=\"static-dot\"></div><div class=\"static-label\"><strong>{}</strong><span>{}</span></div></div>",
                    p.position,
                    escape_html(&p.phase),
                    caption
                )
            })
            .collect();

        let total = self.timeline.total_time;
        format!(
            "<section class=\"static-simulation\">\n<h3>Mission Simulation</h3>\n\
             <div class=\"static-summary\"><span>Max Speed: {:.2}c</span><span>Journey Time: {total} days</span></div>\n\
             <div class=\"static-track\"><div class=\"static-line\"></div>{markers}<div class=\"static-ship\">{}</div></div>\n\
             <div class=\"static-ends\"><span>Start (0 days)</span><span>End ({total} days)</span></div>\n</section>\n",
            self.timeline.max_speed,
            ship_markup(image_url),
        )
    }
}

fn ship_markup(image_url: Option<&str>) -> String {
    match image_url {
        Some(url) => format!(
            "<img class=\"ship-image\" src=\"{}\" alt=\"Invention concept\">",
            escape_html(url)
        ),
        None => "<span class=\"ship-icon\">&#128640;</span>".to_string(),
    }
}

const SIMULATION_STYLE: &str = "\
.simulation { position: relative; height: 16rem; background: #000; border-radius: 8px; overflow: hidden; }
.simulation .star { position: absolute; width: 2px; height: 2px; border-radius: 50%; background: #fff; opacity: 0; animation: twinkle linear infinite; }
.simulation .ship-wrapper { position: absolute; top: 50%; left: -150px; margin-top: -30px; transform: translateY(-50%); animation: travel var(--animation-duration) linear infinite; }
.simulation .ship { position: relative; display: flex; align-items: center; }
.simulation .ship-image { height: 60px; transform: rotate(90deg); filter: drop-shadow(0 0 10px rgba(173, 216, 230, 0.8)); }
.simulation .ship-icon { font-size: 48px; }
.simulation .plasma-trail { position: absolute; left: -10px; top: 50%; height: 8px; transform: translateY(-50%) translateX(-100%); border-radius: 4px; background: linear-gradient(to left, rgba(77, 228, 255, 1), rgba(167, 243, 252, 0.5), transparent); animation: trail-fx var(--animation-duration) linear infinite; }
.simulation .track { position: absolute; bottom: 1rem; left: 2rem; right: 2rem; height: 2.5rem; }
.simulation .track-line { position: absolute; top: 50%; width: 100%; border-top: 1px dashed rgba(8, 145, 178, 0.7); }
.simulation .phase-marker { position: absolute; top: 50%; transform: translate(-50%, -50%); text-align: center; }
.simulation .marker-dot { width: 8px; height: 8px; margin: 0 auto; border-radius: 50%; background: #0891b2; border: 2px solid #67e8f9; }
.simulation .marker-text { display: flex; flex-direction: column; font-size: 11px; color: #d1d5db; white-space: nowrap; }
.simulation .speed { color: #22d3ee; font-weight: 600; }
.simulation .hud { position: absolute; top: 0.5rem; color: #fff; font-size: 0.875rem; background: rgba(0, 0, 0, 0.5); padding: 0.25rem 0.5rem; }
.simulation .hud-left { left: 0.75rem; }
.simulation .hud-right { right: 0.75rem; }
";
