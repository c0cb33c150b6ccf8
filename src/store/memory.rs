//! In-memory `EntityStore` backing.
//!
//! Good enough for the CLI runner and the test suite; a database-backed
//! implementation slots in behind the same trait. Scores live in a `BTreeMap`
//! keyed by insertion id so iteration order is stable, which is what makes
//! the highest-score tie-break deterministic.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult, StoreError};
use crate::models::{
    Score, ScoreId, Section, SectionId, Semester, SemesterId, SemesterMetrics, Student,
    StudentId, StudentPerformance, Subject, SubjectId, SubjectMetrics,
};
use crate::store::entity_store::{EntityStore, ScoreBatch};

#[derive(Debug, Default)]
struct Tables {
    sections: HashMap<SectionId, Section>,
    semesters: HashMap<SemesterId, Semester>,
    students: BTreeMap<StudentId, Student>,
    subjects: BTreeMap<SubjectId, Subject>,
    scores: BTreeMap<ScoreId, Score>,
    next_score_id: ScoreId,
    performances: HashMap<(StudentId, SemesterId), StudentPerformance>,
    subject_metrics: HashMap<(SectionId, SubjectId, SemesterId), SubjectMetrics>,
    semester_metrics: HashMap<(SectionId, SemesterId), SemesterMetrics>,
}

#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding is the roster collaborator's job; these exist for the TOML
    // loader and tests.

    pub async fn insert_section(&self, section: Section) {
        self.tables.write().await.sections.insert(section.id, section);
    }

    pub async fn insert_semester(&self, semester: Semester) {
        self.tables
            .write()
            .await
            .semesters
            .insert(semester.id, semester);
    }

    pub async fn insert_subject(&self, subject: Subject) {
        self.tables.write().await.subjects.insert(subject.id, subject);
    }

    pub async fn insert_student(&self, student: Student) {
        self.tables.write().await.students.insert(student.id, student);
    }

    pub async fn score_count(&self) -> usize {
        self.tables.read().await.scores.len()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn section(&self, id: SectionId) -> AppResult<Option<Section>> {
        Ok(self.tables.read().await.sections.get(&id).cloned())
    }

    async fn semester(&self, id: SemesterId) -> AppResult<Option<Semester>> {
        Ok(self.tables.read().await.semesters.get(&id).cloned())
    }

    async fn student(&self, id: StudentId) -> AppResult<Option<Student>> {
        Ok(self.tables.read().await.students.get(&id).cloned())
    }

    async fn students_in_section(&self, section: SectionId) -> AppResult<Vec<Student>> {
        Ok(self
            .tables
            .read()
            .await
            .students
            .values()
            .filter(|s| s.section_id == section)
            .cloned()
            .collect())
    }

    async fn active_students_in_section(&self, section: SectionId) -> AppResult<Vec<Student>> {
        Ok(self
            .tables
            .read()
            .await
            .students
            .values()
            .filter(|s| s.section_id == section && s.active)
            .cloned()
            .collect())
    }

    async fn subjects_for_semester(&self, semester: SemesterId) -> AppResult<Vec<Subject>> {
        Ok(self
            .tables
            .read()
            .await
            .subjects
            .values()
            .filter(|s| s.semester_id == semester)
            .cloned()
            .collect())
    }

    async fn scores_for_student(
        &self,
        student: StudentId,
        semester: SemesterId,
    ) -> AppResult<Vec<Score>> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .values()
            .filter(|s| s.student_id == student && s.semester_id == semester)
            .cloned()
            .collect())
    }

    async fn scores_for_subject(
        &self,
        subject: SubjectId,
        semester: SemesterId,
    ) -> AppResult<Vec<Score>> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .values()
            .filter(|s| s.subject_id == subject && s.semester_id == semester)
            .cloned()
            .collect())
    }

    async fn upsert_scores(&self, batch: ScoreBatch) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        for mut score in batch.created {
            // Upsert at the unique triple even on the create path, so a
            // concurrent re-ingest of the same sheet can't duplicate rows.
            let existing_id = tables
                .scores
                .values()
                .find(|s| {
                    s.student_id == score.student_id
                        && s.semester_id == score.semester_id
                        && s.subject_id == score.subject_id
                })
                .map(|s| s.id);

            match existing_id {
                Some(id) => {
                    score.id = id;
                    tables.scores.insert(id, score);
                }
                None => {
                    tables.next_score_id += 1;
                    score.id = tables.next_score_id;
                    tables.scores.insert(score.id, score);
                }
            }
        }

        for score in batch.updated {
            tables.scores.insert(score.id, score);
        }

        Ok(())
    }

    async fn performance(
        &self,
        student: StudentId,
        semester: SemesterId,
    ) -> AppResult<Option<StudentPerformance>> {
        Ok(self
            .tables
            .read()
            .await
            .performances
            .get(&(student, semester))
            .cloned())
    }

    async fn performances_for_student(
        &self,
        student: StudentId,
    ) -> AppResult<Vec<StudentPerformance>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<StudentPerformance> = tables
            .performances
            .values()
            .filter(|p| p.student_id == student)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.semester_id);
        Ok(rows)
    }

    async fn upsert_performance(&self, perf: StudentPerformance) -> AppResult<()> {
        self.tables
            .write()
            .await
            .performances
            .insert((perf.student_id, perf.semester_id), perf);
        Ok(())
    }

    async fn update_student_rollup(
        &self,
        student: StudentId,
        cgpa: f64,
        num_backlogs: u32,
    ) -> AppResult<()> {
        match self.tables.write().await.students.get_mut(&student) {
            Some(row) => {
                row.cgpa = cgpa;
                row.num_backlogs = num_backlogs;
                Ok(())
            }
            None => Err(AppError::Store(StoreError::MissingStudent { id: student })),
        }
    }

    async fn subject_metrics(
        &self,
        section: SectionId,
        subject: SubjectId,
        semester: SemesterId,
    ) -> AppResult<Option<SubjectMetrics>> {
        Ok(self
            .tables
            .read()
            .await
            .subject_metrics
            .get(&(section, subject, semester))
            .cloned())
    }

    async fn upsert_subject_metrics(&self, metrics: SubjectMetrics) -> AppResult<()> {
        self.tables.write().await.subject_metrics.insert(
            (metrics.section_id, metrics.subject_id, metrics.semester_id),
            metrics,
        );
        Ok(())
    }

    async fn semester_metrics(
        &self,
        section: SectionId,
        semester: SemesterId,
    ) -> AppResult<Option<SemesterMetrics>> {
        Ok(self
            .tables
            .read()
            .await
            .semester_metrics
            .get(&(section, semester))
            .cloned())
    }

    async fn upsert_semester_metrics(&self, metrics: SemesterMetrics) -> AppResult<()> {
        self.tables
            .write()
            .await
            .semester_metrics
            .insert((metrics.section_id, metrics.semester_id), metrics);
        Ok(())
    }
}
