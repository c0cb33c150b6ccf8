//! Durable entities shared with the roster collaborator.
//!
//! The pipeline reads these through the `EntityStore` interface and writes
//! back only Scores, the derived aggregate rows, and the student rollup
//! fields (`cgpa`, `num_backlogs`). Row identity follows the collaborator's
//! integer primary keys.

use serde::{Deserialize, Serialize};

use crate::models::grade::Grade;

pub type SectionId = i64;
pub type SemesterId = i64;
pub type SubjectId = i64;
pub type StudentId = i64;
pub type ScoreId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    /// Single-letter section label (A, B, ...).
    pub name: String,
    /// Recorded roster size. This is the metrics denominator, not a live
    /// count, so aggregate rows stay comparable across recompute runs.
    pub num_students: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Semester {
    pub id: SemesterId,
    pub number: u32,
    /// Declared subject count; the percentage denominator is
    /// `num_subjects * 100`.
    pub num_subjects: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub semester_id: SemesterId,
    /// Unique within the semester; the join key against scraped rows.
    pub code: String,
    pub name: String,
    pub credits: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// University seat number, the identifier submitted to the result source.
    pub usn: String,
    pub name: String,
    pub section_id: SectionId,
    /// The student's current semester.
    pub semester_id: SemesterId,
    pub cgpa: f64,
    pub active: bool,
    pub num_backlogs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: ScoreId,
    pub student_id: StudentId,
    pub semester_id: SemesterId,
    pub subject_id: SubjectId,
    pub internal: u32,
    pub external: u32,
    pub total: u32,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPerformance {
    pub student_id: StudentId,
    pub semester_id: SemesterId,
    pub total: u32,
    pub percentage: f64,
    pub sgpa: f64,
    pub num_backlogs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMetrics {
    pub section_id: SectionId,
    pub subject_id: SubjectId,
    pub semester_id: SemesterId,
    pub avg_score: f64,
    pub pass_percentage: f64,
    pub fail_percentage: f64,
    pub absent_percentage: f64,
    pub fcd_count: u32,
    pub fc_count: u32,
    pub sc_count: u32,
    pub fail_count: u32,
    pub absent_count: u32,
    pub highest_score: u32,
    pub highest_scorer: Option<StudentId>,
}

impl SubjectMetrics {
    /// Zeroed row for a (section, subject, semester) key. Also the result
    /// when the section's recorded student count is zero.
    pub fn empty(section_id: SectionId, subject_id: SubjectId, semester_id: SemesterId) -> Self {
        Self {
            section_id,
            subject_id,
            semester_id,
            avg_score: 0.0,
            pass_percentage: 0.0,
            fail_percentage: 0.0,
            absent_percentage: 0.0,
            fcd_count: 0,
            fc_count: 0,
            sc_count: 0,
            fail_count: 0,
            absent_count: 0,
            highest_score: 0,
            highest_scorer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterMetrics {
    pub section_id: SectionId,
    pub semester_id: SemesterId,
    pub avg_sgpa: f64,
    pub pass_count: u32,
    pub fail_1_sub: u32,
    pub fail_2_subs: u32,
    pub fail_3_subs: u32,
    pub fail_greater_3_subs: u32,
    /// Number of students carrying at least one backlog this semester.
    pub total_backlogs: u32,
    pub pass_percentage: f64,
    pub fail_percentage: f64,
}

impl SemesterMetrics {
    pub fn empty(section_id: SectionId, semester_id: SemesterId) -> Self {
        Self {
            section_id,
            semester_id,
            avg_sgpa: 0.0,
            pass_count: 0,
            fail_1_sub: 0,
            fail_2_subs: 0,
            fail_3_subs: 0,
            fail_greater_3_subs: 0,
            total_backlogs: 0,
            pass_percentage: 0.0,
            fail_percentage: 0.0,
        }
    }
}
