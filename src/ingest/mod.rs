//! Reconciles freshly scraped marks against existing Score rows.
//!
//! One call per (student, semester): resolve each scraped row to a subject,
//! derive the grade, stage creates/updates, apply them as one batched write,
//! then trigger the per-student recompute chain.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::error::AppError;
use crate::metrics::MetricsEngine;
use crate::models::grade::Grade;
use crate::models::{MarkRow, Score, Semester, Student, Subject, SubjectId};
use crate::store::{EntityStore, ScoreBatch};

/// Ingest failure for one student.
///
/// `UnknownSubject` is a data-integrity problem for that student only and is
/// reported alongside fetch failures; `Store` means the persistence
/// collaborator itself is failing and the whole batch must stop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown subject code {code}")]
    UnknownSubject { code: String },
    #[error(transparent)]
    Store(#[from] AppError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub created: usize,
    pub updated: usize,
    /// Subjects whose aggregate rows are now stale.
    pub subject_ids: Vec<SubjectId>,
}

#[derive(Clone)]
pub struct ScoreIngester {
    store: Arc<dyn EntityStore>,
    engine: MetricsEngine,
}

impl ScoreIngester {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let engine = MetricsEngine::new(store.clone());
        Self { store, engine }
    }

    pub async fn ingest(
        &self,
        student: &Student,
        semester: &Semester,
        rows: &[MarkRow],
    ) -> Result<IngestSummary, IngestError> {
        let subjects = self.store.subjects_for_semester(semester.id).await?;
        let by_code: HashMap<&str, &Subject> =
            subjects.iter().map(|s| (s.code.as_str(), s)).collect();

        let existing = self
            .store
            .scores_for_student(student.id, semester.id)
            .await?;
        let existing_by_subject: HashMap<SubjectId, Score> = existing
            .into_iter()
            .map(|score| (score.subject_id, score))
            .collect();

        // Resolve every row before writing anything, so an unknown subject
        // leaves the student's scores untouched.
        let mut batch = ScoreBatch::default();
        let mut subject_ids = Vec::with_capacity(rows.len());
        for row in rows {
            let subject =
                by_code
                    .get(row.subject_code.as_str())
                    .ok_or(IngestError::UnknownSubject {
                        code: row.subject_code.clone(),
                    })?;
            let grade = Grade::classify(row.total, row.result);
            subject_ids.push(subject.id);

            match existing_by_subject.get(&subject.id) {
                Some(current) => {
                    let mut refreshed = current.clone();
                    refreshed.internal = row.internal;
                    refreshed.external = row.external;
                    refreshed.total = row.total;
                    refreshed.grade = grade;
                    batch.updated.push(refreshed);
                }
                None => batch.created.push(Score {
                    id: 0,
                    student_id: student.id,
                    semester_id: subject.semester_id,
                    subject_id: subject.id,
                    internal: row.internal,
                    external: row.external,
                    total: row.total,
                    grade,
                }),
            }
        }

        let summary = IngestSummary {
            created: batch.created.len(),
            updated: batch.updated.len(),
            subject_ids,
        };

        if !batch.is_empty() {
            self.store.upsert_scores(batch).await?;
        }

        // The Score mutation invalidates the per-student aggregate; the
        // engine also refreshes the student's cgpa / backlog rollup.
        self.engine
            .recompute_student_performance(student.id, semester.id)
            .await?;

        debug!(
            "[{}] scores ingested: {} created, {} updated",
            student.usn, summary.created, summary.updated
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grade::ResultCode;
    use crate::models::{Section, SemesterId};
    use crate::store::InMemoryEntityStore;

    fn mark_row(code: &str, internal: u32, external: u32, result: ResultCode) -> MarkRow {
        MarkRow {
            subject_code: code.to_string(),
            subject_name: format!("Subject {code}"),
            internal,
            external,
            total: internal + external,
            result,
        }
    }

    fn semester(id: SemesterId, num_subjects: u32) -> Semester {
        Semester {
            id,
            number: 5,
            num_subjects,
        }
    }

    async fn seeded_store() -> (Arc<InMemoryEntityStore>, Student, Semester) {
        let store = Arc::new(InMemoryEntityStore::new());
        store
            .insert_section(Section {
                id: 1,
                name: "A".to_string(),
                num_students: 1,
            })
            .await;
        let sem = semester(5, 2);
        store.insert_semester(sem.clone()).await;
        store
            .insert_subject(Subject {
                id: 51,
                semester_id: 5,
                code: "21CS51".to_string(),
                name: "Computer Networks".to_string(),
                credits: 4,
            })
            .await;
        store
            .insert_subject(Subject {
                id: 52,
                semester_id: 5,
                code: "21CS52".to_string(),
                name: "Operating Systems".to_string(),
                credits: 3,
            })
            .await;
        let student = Student {
            id: 101,
            usn: "1OX21CS001".to_string(),
            name: "Asha Rao".to_string(),
            section_id: 1,
            semester_id: 5,
            cgpa: 0.0,
            active: true,
            num_backlogs: 0,
        };
        store.insert_student(student.clone()).await;
        (store, student, sem)
    }

    #[tokio::test]
    async fn first_ingest_creates_rows_and_performance() {
        let (store, student, sem) = seeded_store().await;
        let ingester = ScoreIngester::new(store.clone());

        let rows = vec![
            mark_row("21CS51", 20, 62, ResultCode::Pass),
            mark_row("21CS52", 15, 30, ResultCode::Fail),
        ];
        let summary = ingester.ingest(&student, &sem, &rows).await.expect("ingest");

        assert_eq!(summary.created, 2);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.subject_ids, vec![51, 52]);
        assert_eq!(store.score_count().await, 2);

        let performance = store
            .performance(101, 5)
            .await
            .expect("query")
            .expect("present");
        assert_eq!(performance.total, 127);
        assert_eq!(performance.num_backlogs, 1);
    }

    #[tokio::test]
    async fn reingest_updates_instead_of_duplicating() {
        let (store, student, sem) = seeded_store().await;
        let ingester = ScoreIngester::new(store.clone());

        let rows = vec![mark_row("21CS51", 20, 62, ResultCode::Pass)];
        ingester.ingest(&student, &sem, &rows).await.expect("first");

        // Revaluation bumped the external marks.
        let rows = vec![mark_row("21CS51", 20, 70, ResultCode::Pass)];
        let summary = ingester.ingest(&student, &sem, &rows).await.expect("second");

        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);
        assert_eq!(store.score_count().await, 1);

        let scores = store.scores_for_student(101, 5).await.expect("scores");
        assert_eq!(scores[0].total, 90);
        assert_eq!(scores[0].grade, Grade::Fcd);
    }

    #[tokio::test]
    async fn same_sheet_twice_is_idempotent() {
        let (store, student, sem) = seeded_store().await;
        let ingester = ScoreIngester::new(store.clone());

        let rows = vec![
            mark_row("21CS51", 20, 62, ResultCode::Pass),
            mark_row("21CS52", 18, 55, ResultCode::Pass),
        ];
        ingester.ingest(&student, &sem, &rows).await.expect("first");
        let first = store.scores_for_student(101, 5).await.expect("scores");

        ingester.ingest(&student, &sem, &rows).await.expect("second");
        let second = store.scores_for_student(101, 5).await.expect("scores");

        assert_eq!(first, second);
        assert_eq!(store.score_count().await, 2);
    }

    #[tokio::test]
    async fn unknown_subject_aborts_before_any_write() {
        let (store, student, sem) = seeded_store().await;
        let ingester = ScoreIngester::new(store.clone());

        let rows = vec![
            mark_row("21CS51", 20, 62, ResultCode::Pass),
            mark_row("99XX99", 10, 10, ResultCode::Pass),
        ];
        let err = ingester
            .ingest(&student, &sem, &rows)
            .await
            .expect_err("unknown subject");

        assert!(matches!(err, IngestError::UnknownSubject { ref code } if code == "99XX99"));
        assert_eq!(store.score_count().await, 0);
    }
}
