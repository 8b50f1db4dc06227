//! Rule-based gesture classification.
//!
//! Area and perimeter are normalized by constants fitted to a 320×240
//! frame, then matched against an ordered rule table; the first matching
//! rule wins. All bounds are exact, with no tolerance.
//!
//! | normArea   | normPerimeter | peaks | label        |
//! |------------|---------------|-------|--------------|
//! | (0.5,0.8)  | (0.6,0.83)    | 1     | OneFinger    |
//! | (0.5,0.8)  | (0.6,0.83)    | 2     | Victory      |
//! | (0.5,0.85) | (0.6,0.85)    | 3     | ThreeFingers |
//! | >0.8       | >0.8          | 4     | FourFingers  |
//! | >0.9       | >0.9          | 5     | OpenPalm     |
//! | <0.7       | <0.6          | any   | ClosedFist   |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::ClassifierParams;

/// Recognized hand gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureLabel {
    Unrecognized,
    OneFinger,
    Victory,
    ThreeFingers,
    FourFingers,
    OpenPalm,
    ClosedFist,
}

impl GestureLabel {
    /// Classification register value reported by the accelerator.
    pub const fn code(self) -> u32 {
        match self {
            Self::Unrecognized => 0,
            Self::OneFinger => 1,
            Self::Victory => 2,
            Self::ThreeFingers => 3,
            Self::FourFingers => 4,
            Self::OpenPalm => 5,
            Self::ClosedFist => 6,
        }
    }

    /// Decode a classification register value. Unknown codes are
    /// `Unrecognized`.
    pub const fn from_code(code: u32) -> Self {
        match code {
            1 => Self::OneFinger,
            2 => Self::Victory,
            3 => Self::ThreeFingers,
            4 => Self::FourFingers,
            5 => Self::OpenPalm,
            6 => Self::ClosedFist,
            _ => Self::Unrecognized,
        }
    }

    /// Human-readable label for terminal output.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unrecognized => "Not recognized",
            Self::OneFinger => "One finger up",
            Self::Victory => "Victory",
            Self::ThreeFingers => "Three fingers up",
            Self::FourFingers => "Four fingers up",
            Self::OpenPalm => "Open palm",
            Self::ClosedFist => "Closed fist",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bounds of one normalized quantity.
#[derive(Debug, Clone, Copy)]
enum Bound {
    /// Exclusive on both ends.
    Between(f64, f64),
    Above(f64),
    Below(f64),
}

impl Bound {
    fn contains(self, v: f64) -> bool {
        match self {
            Self::Between(lo, hi) => lo < v && v < hi,
            Self::Above(lo) => v > lo,
            Self::Below(hi) => v < hi,
        }
    }
}

struct Rule {
    area: Bound,
    perimeter: Bound,
    /// `None` matches any peak count.
    peaks: Option<u32>,
    label: GestureLabel,
}

const RULES: [Rule; 6] = [
    Rule {
        area: Bound::Between(0.5, 0.8),
        perimeter: Bound::Between(0.6, 0.83),
        peaks: Some(1),
        label: GestureLabel::OneFinger,
    },
    Rule {
        area: Bound::Between(0.5, 0.8),
        perimeter: Bound::Between(0.6, 0.83),
        peaks: Some(2),
        label: GestureLabel::Victory,
    },
    Rule {
        area: Bound::Between(0.5, 0.85),
        perimeter: Bound::Between(0.6, 0.85),
        peaks: Some(3),
        label: GestureLabel::ThreeFingers,
    },
    Rule {
        area: Bound::Above(0.8),
        perimeter: Bound::Above(0.8),
        peaks: Some(4),
        label: GestureLabel::FourFingers,
    },
    Rule {
        area: Bound::Above(0.9),
        perimeter: Bound::Above(0.9),
        peaks: Some(5),
        label: GestureLabel::OpenPalm,
    },
    // The fist rule has no peak bound.
    Rule {
        area: Bound::Below(0.7),
        perimeter: Bound::Below(0.6),
        peaks: None,
        label: GestureLabel::ClosedFist,
    },
];

/// Map `(area, perimeter, peak_count)` to a gesture.
pub fn classify(area: u32, perimeter: u32, peak_count: u32, params: &ClassifierParams) -> GestureLabel {
    let norm_area = area as f64 / params.area_norm;
    let norm_perimeter = perimeter as f64 / params.perimeter_norm;

    RULES
        .iter()
        .find(|rule| {
            rule.area.contains(norm_area)
                && rule.perimeter.contains(norm_perimeter)
                && rule.peaks.is_none_or(|p| p == peak_count)
        })
        .map_or(GestureLabel::Unrecognized, |rule| rule.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(area: u32, perimeter: u32, peaks: u32) -> GestureLabel {
        classify(area, perimeter, peaks, &ClassifierParams::default())
    }

    #[test]
    fn test_victory() {
        assert_eq!(run(8000, 500, 2), GestureLabel::Victory);
    }

    #[test]
    fn test_one_finger() {
        assert_eq!(run(8000, 500, 1), GestureLabel::OneFinger);
    }

    #[test]
    fn test_three_fingers_uses_wider_bounds() {
        // normArea 0.82, normPerimeter 0.84: outside the 1/2-finger box.
        assert_eq!(run(11808, 638, 3), GestureLabel::ThreeFingers);
    }

    #[test]
    fn test_four_fingers_and_open_palm() {
        assert_eq!(run(12240, 700, 4), GestureLabel::FourFingers);
        assert_eq!(run(13680, 722, 5), GestureLabel::OpenPalm);
        // Large enough for four, but five peaks need the tighter palm box.
        assert_eq!(run(12240, 700, 5), GestureLabel::Unrecognized);
    }

    #[test]
    fn test_closed_fist_ignores_peak_count() {
        for peaks in [0, 1, 2, 7] {
            assert_eq!(run(8000, 300, peaks), GestureLabel::ClosedFist);
        }
    }

    #[test]
    fn test_bounds_are_exclusive() {
        // normArea exactly 0.5
        assert_eq!(run(7200, 500, 2), GestureLabel::Unrecognized);
        // normPerimeter exactly 0.6 misses both the finger and fist boxes
        assert_eq!(run(8000, 456, 2), GestureLabel::Unrecognized);
    }

    #[test]
    fn test_peak_count_selects_finger_rule() {
        // Inside the finger box but outside the fist box (normPerimeter 0.605).
        assert_eq!(run(8652, 460, 1), GestureLabel::OneFinger);
        assert_eq!(run(8652, 460, 0), GestureLabel::Unrecognized);
    }

    #[test]
    fn test_codes_round_trip_and_unknown_codes() {
        for label in [
            GestureLabel::Unrecognized,
            GestureLabel::OneFinger,
            GestureLabel::Victory,
            GestureLabel::ThreeFingers,
            GestureLabel::FourFingers,
            GestureLabel::OpenPalm,
            GestureLabel::ClosedFist,
        ] {
            assert_eq!(GestureLabel::from_code(label.code()), label);
        }
        assert_eq!(GestureLabel::from_code(42), GestureLabel::Unrecognized);
    }
}
