/// A floating-point budget for pure differential privacy (an epsilon).
///
/// We use a plain f64 and ignore floating point arithmetic issues, except
/// where comparisons against a bound are logged when they get very close.
pub type PureDPBudget = f64;

/// Distances below this are reported as suspicious float comparisons.
pub const NEAR_TIE_TOLERANCE: f64 = 1e-9;
