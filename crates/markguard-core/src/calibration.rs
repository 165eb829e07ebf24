//! Anchor-table score calibration.
//!
//! A raw similarity (cosine, phonetic caliber, ...) is mapped onto a
//! legally scaled `[0, 1]` score by piecewise-linear interpolation between
//! `(raw, calibrated)` anchors. Values outside the table clamp to its ends.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::CalibrationError;

/// One `(raw, calibrated)` point. Serializes as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor(pub f64, pub f64);

impl Anchor {
    pub fn raw(&self) -> f64 {
        self.0
    }

    pub fn calibrated(&self) -> f64 {
        self.1
    }
}

/// Ordered anchors for one similarity component.
///
/// Construction does not check ordering so that tables loaded from
/// configuration can be reported on rather than rejected outright; call
/// [`AnchorTable::validate`] to check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorTable(Vec<Anchor>);

impl AnchorTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self(pairs.into_iter().map(|(x, y)| Anchor(x, y)).collect())
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.0
    }

    /// Checks the table is non-empty, finite, and non-decreasing in both
    /// coordinates.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.0.is_empty() {
            return Err(CalibrationError::EmptyTable);
        }
        for (index, anchor) in self.0.iter().enumerate() {
            if !anchor.0.is_finite() || !anchor.1.is_finite() {
                return Err(CalibrationError::NonFiniteAnchor { index });
            }
            if index == 0 {
                continue;
            }
            let previous = self.0[index - 1];
            if anchor.0 < previous.0 {
                return Err(CalibrationError::Unordered {
                    index,
                    raw: anchor.0,
                    previous_raw: previous.0,
                });
            }
            if anchor.1 < previous.1 {
                return Err(CalibrationError::Decreasing { index });
            }
        }
        Ok(())
    }

    /// Calibrate `raw`, reporting malformed tables and non-finite input.
    pub fn try_calibrate(&self, raw: f64) -> Result<f64, CalibrationError> {
        self.validate()?;
        if !raw.is_finite() {
            return Err(CalibrationError::NonFiniteScore(raw));
        }

        let anchors = &self.0;
        let (first, last) = (anchors[0], anchors[anchors.len() - 1]);
        if raw <= first.0 {
            return Ok(first.1);
        }
        if raw >= last.0 {
            return Ok(last.1);
        }

        for pair in anchors.windows(2) {
            let (Anchor(x1, y1), Anchor(x2, y2)) = (pair[0], pair[1]);
            if x1 <= raw && raw <= x2 {
                if x1 == x2 {
                    return Ok(y1);
                }
                let y = y1 + (raw - x1) * (y2 - y1) / (x2 - x1);
                return Ok(round_to(y, 4));
            }
        }
        // Unreachable for a validated table: raw lies strictly inside [first, last].
        Ok(last.1)
    }
}

/// Total calibration: on a malformed table or non-finite input the anomaly is
/// logged and `raw` is returned unchanged.
pub fn calibrate(raw: f64, table: &AnchorTable) -> f64 {
    match table.try_calibrate(raw) {
        Ok(score) => score,
        Err(err) => {
            warn!(raw, error = %err, "calibration skipped, returning raw score");
            raw
        }
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AnchorTable {
        AnchorTable::from_pairs([(0.2, 0.0), (0.5, 0.3), (0.8, 0.9), (1.0, 1.0)])
    }

    #[test]
    fn clamps_outside_the_table() {
        let t = table();
        assert_eq!(calibrate(0.0, &t), 0.0);
        assert_eq!(calibrate(0.2, &t), 0.0);
        assert_eq!(calibrate(1.0, &t), 1.0);
        assert_eq!(calibrate(7.5, &t), 1.0);
    }

    #[test]
    fn interpolates_and_rounds() {
        let t = table();
        assert_eq!(calibrate(0.35, &t), 0.15);
        assert_eq!(calibrate(0.6, &t), 0.5);
        // 0.3 + (0.55 - 0.5) * 0.6 / 0.3 = 0.4 exactly after rounding
        assert_eq!(calibrate(0.55, &t), 0.4);
        assert_eq!(calibrate(0.512_345, &t), 0.3247);
    }

    #[test]
    fn never_decreases_across_the_range() {
        let t = table();
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=120 {
            let calibrated = calibrate(step as f64 / 100.0, &t);
            assert!(calibrated >= previous, "dropped at raw {}", step as f64 / 100.0);
            previous = calibrated;
        }
    }

    #[test]
    fn degenerate_segment_returns_left_value() {
        let t = AnchorTable::from_pairs([(0.0, 0.0), (0.5, 0.4), (0.5, 0.6), (1.0, 1.0)]);
        assert!(t.validate().is_ok());
        assert_eq!(calibrate(0.5, &t), 0.4);
    }

    #[test]
    fn malformed_tables_return_raw() {
        let empty = AnchorTable::from_pairs([]);
        assert_eq!(empty.try_calibrate(0.4), Err(CalibrationError::EmptyTable));
        assert_eq!(calibrate(0.4, &empty), 0.4);

        let unordered = AnchorTable::from_pairs([(0.5, 0.1), (0.2, 0.4)]);
        assert!(matches!(
            unordered.validate(),
            Err(CalibrationError::Unordered { index: 1, .. })
        ));
        assert_eq!(calibrate(0.3, &unordered), 0.3);

        let decreasing = AnchorTable::from_pairs([(0.0, 0.9), (1.0, 0.1)]);
        assert_eq!(
            decreasing.validate(),
            Err(CalibrationError::Decreasing { index: 1 })
        );
    }

    #[test]
    fn non_finite_raw_is_reported() {
        assert!(matches!(
            table().try_calibrate(f64::NAN),
            Err(CalibrationError::NonFiniteScore(_))
        ));
    }

    #[test]
    fn tables_deserialize_from_pair_arrays() {
        let t: AnchorTable = serde_json::from_str("[[0.0, 0.0], [1.0, 1.0]]").unwrap();
        assert_eq!(t.anchors(), &[Anchor(0.0, 0.0), Anchor(1.0, 1.0)]);
    }
}
