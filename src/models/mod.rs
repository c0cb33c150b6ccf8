pub mod entities;
pub mod grade;
pub mod marksheet;

pub use entities::{
    Score, ScoreId, Section, SectionId, Semester, SemesterId, SemesterMetrics, Student,
    StudentId, StudentPerformance, Subject, SubjectId, SubjectMetrics,
};
pub use grade::{grade_points, round2, Grade, ResultCode};
pub use marksheet::{MarkRow, MarkSheet};
