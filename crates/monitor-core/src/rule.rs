//! Threshold Rule
//!
//! Classifies a single price against an asset's `(max, min)` bounds.
//! Bounds are validated once at config load, not here.

use serde::{Deserialize, Serialize};

/// Result of comparing one price to one pair of bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    None,
    MaxBreach,
    MinBreach,
}

impl Classification {
    pub const fn is_breach(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Classify `price` against `max_threshold` / `min_threshold`.
///
/// `price >= max` wins over `price <= min` when both hold. Any NaN input
/// yields [`Classification::None`] with a warning.
pub fn evaluate(price: f64, max_threshold: f64, min_threshold: f64) -> Classification {
    if price.is_nan() || max_threshold.is_nan() || min_threshold.is_nan() {
        tracing::warn!(
            price,
            max_threshold,
            min_threshold,
            "NaN in threshold evaluation, treating as no breach"
        );
        return Classification::None;
    }

    if price >= max_threshold {
        Classification::MaxBreach
    } else if price <= min_threshold {
        Classification::MinBreach
    } else {
        Classification::None
    }
}
