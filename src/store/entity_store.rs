//! Narrow interface over the durable entity store.
//!
//! The roster collaborator owns the tables; this pipeline only needs the
//! queries and batched writes below. Rows are never deleted through this
//! interface.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    Score, Section, SectionId, Semester, SemesterId, SemesterMetrics, Student, StudentId,
    StudentPerformance, Subject, SubjectId, SubjectMetrics,
};

/// A staged batch of Score writes, applied in one round trip.
#[derive(Debug, Default, Clone)]
pub struct ScoreBatch {
    /// New rows; `id` is assigned by the store.
    pub created: Vec<Score>,
    /// Existing rows with refreshed marks and grade.
    pub updated: Vec<Score>,
}

impl ScoreBatch {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn section(&self, id: SectionId) -> AppResult<Option<Section>>;
    async fn semester(&self, id: SemesterId) -> AppResult<Option<Semester>>;
    async fn student(&self, id: StudentId) -> AppResult<Option<Student>>;

    /// All students of a section, active or not, in stable id order.
    async fn students_in_section(&self, section: SectionId) -> AppResult<Vec<Student>>;

    /// Active students of a section in stable id order; the scrape roster.
    async fn active_students_in_section(&self, section: SectionId) -> AppResult<Vec<Student>>;

    async fn subjects_for_semester(&self, semester: SemesterId) -> AppResult<Vec<Subject>>;

    /// A student's scores for one semester, in insertion order.
    async fn scores_for_student(
        &self,
        student: StudentId,
        semester: SemesterId,
    ) -> AppResult<Vec<Score>>;

    /// All scores for one subject in one semester, in insertion order.
    async fn scores_for_subject(
        &self,
        subject: SubjectId,
        semester: SemesterId,
    ) -> AppResult<Vec<Score>>;

    /// Apply a staged batch. Upsert semantics at the
    /// (student, semester, subject) key; re-ingesting the same sheet never
    /// duplicates rows.
    async fn upsert_scores(&self, batch: ScoreBatch) -> AppResult<()>;

    async fn performance(
        &self,
        student: StudentId,
        semester: SemesterId,
    ) -> AppResult<Option<StudentPerformance>>;

    async fn performances_for_student(
        &self,
        student: StudentId,
    ) -> AppResult<Vec<StudentPerformance>>;

    async fn upsert_performance(&self, perf: StudentPerformance) -> AppResult<()>;

    /// Write back the student rollup derived from performance rows.
    async fn update_student_rollup(
        &self,
        student: StudentId,
        cgpa: f64,
        num_backlogs: u32,
    ) -> AppResult<()>;

    async fn subject_metrics(
        &self,
        section: SectionId,
        subject: SubjectId,
        semester: SemesterId,
    ) -> AppResult<Option<SubjectMetrics>>;

    async fn upsert_subject_metrics(&self, metrics: SubjectMetrics) -> AppResult<()>;

    async fn semester_metrics(
        &self,
        section: SectionId,
        semester: SemesterId,
    ) -> AppResult<Option<SemesterMetrics>>;

    async fn upsert_semester_metrics(&self, metrics: SemesterMetrics) -> AppResult<()>;
}
