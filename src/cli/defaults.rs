pub const MAX_MARKER_GAP: i64 = 5_000_000;
pub const MIN_GROUP_MARKER_COUNT: usize = 200;
pub const HOM_BAF_MIN: f64 = 0.3;
pub const HOM_BAF_MAX: f64 = 0.7;
