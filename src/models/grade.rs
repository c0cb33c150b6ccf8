//! Grade taxonomy and the marks → grade / grade-point rules.

use serde::{Deserialize, Serialize};

/// Outcome letter printed in the result column of the source site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Pass,
    Fail,
    Absent,
}

impl ResultCode {
    /// Parse the result column text. The site prints single letters; long
    /// forms are accepted since the column label has changed across result
    /// cycles.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" | "PASS" => Some(ResultCode::Pass),
            "F" | "FAIL" => Some(ResultCode::Fail),
            "A" | "AB" | "ABSENT" => Some(ResultCode::Absent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Pass => "P",
            ResultCode::Fail => "F",
            ResultCode::Absent => "A",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorical grade stored on a `Score`. Derived from total marks and the
/// result code, never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    /// First class with distinction (total >= 75).
    Fcd,
    /// First class (total >= 60).
    Fc,
    /// Second class.
    Sc,
    /// Failed the subject.
    F,
    /// Absent for the exam.
    A,
}

impl Grade {
    /// Classify a subject outcome. Fail/Absent map straight through; only a
    /// passing result is banded by total marks.
    pub fn classify(total: u32, result: ResultCode) -> Self {
        match result {
            ResultCode::Pass => {
                if total >= 75 {
                    Grade::Fcd
                } else if total >= 60 {
                    Grade::Fc
                } else {
                    Grade::Sc
                }
            }
            ResultCode::Fail => Grade::F,
            ResultCode::Absent => Grade::A,
        }
    }

    /// F and A both count as one backlog.
    pub fn is_backlog(self) -> bool {
        matches!(self, Grade::F | Grade::A)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Fcd => "FCD",
            Grade::Fc => "FC",
            Grade::Sc => "SC",
            Grade::F => "F",
            Grade::A => "A",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grade point for one subject by total-marks band, used credit-weighted in
/// the SGPA computation.
pub fn grade_points(total: u32) -> u32 {
    match total {
        90.. => 10,
        80..=89 => 9,
        70..=79 => 8,
        60..=69 => 7,
        50..=59 => 6,
        40..=49 => 5,
        _ => 0,
    }
}

/// Round to two decimals. All derived ratio fields go through this so
/// recomputation is byte-stable.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_grades_band_by_total() {
        assert_eq!(Grade::classify(100, ResultCode::Pass), Grade::Fcd);
        assert_eq!(Grade::classify(75, ResultCode::Pass), Grade::Fcd);
        assert_eq!(Grade::classify(74, ResultCode::Pass), Grade::Fc);
        assert_eq!(Grade::classify(60, ResultCode::Pass), Grade::Fc);
        assert_eq!(Grade::classify(59, ResultCode::Pass), Grade::Sc);
        assert_eq!(Grade::classify(0, ResultCode::Pass), Grade::Sc);
    }

    #[test]
    fn fail_and_absent_ignore_totals() {
        assert_eq!(Grade::classify(92, ResultCode::Fail), Grade::F);
        assert_eq!(Grade::classify(0, ResultCode::Fail), Grade::F);
        assert_eq!(Grade::classify(88, ResultCode::Absent), Grade::A);
    }

    #[test]
    fn backlog_grades() {
        assert!(Grade::F.is_backlog());
        assert!(Grade::A.is_backlog());
        assert!(!Grade::Sc.is_backlog());
        assert!(!Grade::Fcd.is_backlog());
    }

    #[test]
    fn grade_point_bands() {
        assert_eq!(grade_points(95), 10);
        assert_eq!(grade_points(90), 10);
        assert_eq!(grade_points(89), 9);
        assert_eq!(grade_points(80), 9);
        assert_eq!(grade_points(79), 8);
        assert_eq!(grade_points(65), 7);
        assert_eq!(grade_points(55), 6);
        assert_eq!(grade_points(45), 5);
        assert_eq!(grade_points(39), 0);
    }

    #[test]
    fn result_labels_parse_both_forms() {
        assert_eq!(ResultCode::from_label("P"), Some(ResultCode::Pass));
        assert_eq!(ResultCode::from_label("pass"), Some(ResultCode::Pass));
        assert_eq!(ResultCode::from_label(" F "), Some(ResultCode::Fail));
        assert_eq!(ResultCode::from_label("AB"), Some(ResultCode::Absent));
        assert_eq!(ResultCode::from_label("W"), None);
    }

    #[test]
    fn rounding_is_stable() {
        assert_eq!(round2(68.499999999), 68.5);
        assert_eq!(round2(round2(7.3333333)), round2(7.3333333));
    }
}
