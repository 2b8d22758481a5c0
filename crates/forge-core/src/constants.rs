/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Headroom added above the fastest phase on the speed axis (fraction of c)
pub const SPEED_AXIS_HEADROOM: f64 = 0.05;

/// Shortest traversal cycle of the animated timeline, reached at >= 1c (seconds)
pub const BASE_CYCLE_SECS: f64 = 12.0;

/// Extra cycle time added for a ship that never moves (seconds)
pub const SLOW_CYCLE_SPAN_SECS: f64 = 8.0;

/// Trail length at 1c, also the cap (pixels)
pub const TRAIL_MAX_PX: f64 = 120.0;

/// Glow blur radius per unit of c (pixels)
pub const GLOW_RADIUS_PX: f64 = 15.0;

/// Glow spread per unit of c (pixels)
pub const GLOW_SPREAD_PX: f64 = 30.0;

/// Minimum number of phases before a timeline renders at all
pub const MIN_TIMELINE_PHASES: usize = 2;

/// Stars in the animated timeline background
pub const STAR_COUNT: usize = 100;

/// Radial / width segments used for curved primitives
pub const CURVE_SEGMENTS: u32 = 32;

/// Fallback hull color when the model supplies an unparsable hex string
pub const FALLBACK_COLOR: &str = "#888888";

/// File stem used when an invention has no title line
pub const DEFAULT_FILE_STEM: &str = "Stellar_Forge_Invention";

/// Stability at or above this reads as nominal (percent)
pub const STABILITY_NOMINAL_PCT: f64 = 98.0;

/// Stability below this reads as low (percent)
pub const STABILITY_LOW_PCT: f64 = 90.0;
