//! Recomputes the derived aggregate rows from the Score table.
//!
//! Every method is a full recompute of one row, never a partial-field patch,
//! so a derived row always equals the recompute function applied to the
//! current Scores, and re-running on unchanged Scores is byte-identical.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{AppError, AppResult, StoreError};
use crate::models::grade::{grade_points, round2, Grade};
use crate::models::{
    SectionId, SemesterId, SemesterMetrics, StudentId, StudentPerformance, SubjectId,
    SubjectMetrics,
};
use crate::store::EntityStore;

#[derive(Clone)]
pub struct MetricsEngine {
    store: Arc<dyn EntityStore>,
}

impl MetricsEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Rebuild one (student, semester) performance row from its Scores,
    /// then refresh the student's cgpa / backlog rollup.
    pub async fn recompute_student_performance(
        &self,
        student_id: StudentId,
        semester_id: SemesterId,
    ) -> AppResult<StudentPerformance> {
        let semester = self
            .store
            .semester(semester_id)
            .await?
            .ok_or(AppError::Store(StoreError::MissingSemester { id: semester_id }))?;

        let scores = self.store.scores_for_student(student_id, semester_id).await?;
        let subjects = self.store.subjects_for_semester(semester_id).await?;
        let credits: HashMap<SubjectId, u32> =
            subjects.iter().map(|s| (s.id, s.credits)).collect();

        let total: u32 = scores.iter().map(|s| s.total).sum();

        let mut weighted_points = 0u32;
        let mut total_credits = 0u32;
        for score in &scores {
            let subject_credits = credits.get(&score.subject_id).copied().unwrap_or(0);
            weighted_points += grade_points(score.total) * subject_credits;
            total_credits += subject_credits;
        }
        let sgpa = if total_credits > 0 {
            round2(f64::from(weighted_points) / f64::from(total_credits))
        } else {
            0.0
        };

        let num_backlogs = scores.iter().filter(|s| s.grade.is_backlog()).count() as u32;

        let percentage = if semester.num_subjects > 0 {
            let max_total = f64::from(semester.num_subjects * 100);
            round2(f64::from(total) / max_total * 100.0)
        } else {
            0.0
        };

        let performance = StudentPerformance {
            student_id,
            semester_id,
            total,
            percentage,
            sgpa,
            num_backlogs,
        };
        self.store.upsert_performance(performance.clone()).await?;

        debug!(
            "performance recomputed: student={} semester={} sgpa={} backlogs={}",
            student_id, semester_id, sgpa, num_backlogs
        );

        self.recompute_student_rollup(student_id).await?;

        Ok(performance)
    }

    /// Refresh a student's cgpa (mean sgpa over recorded semesters) and
    /// overall backlog count (semesters with at least one backlog count the
    /// backlogged subjects once each via their performance rows).
    pub async fn recompute_student_rollup(&self, student_id: StudentId) -> AppResult<()> {
        let rows = self.store.performances_for_student(student_id).await?;

        let cgpa = if rows.is_empty() {
            0.0
        } else {
            round2(rows.iter().map(|p| p.sgpa).sum::<f64>() / rows.len() as f64)
        };
        let num_backlogs = rows.iter().filter(|p| p.num_backlogs > 0).count() as u32;

        self.store
            .update_student_rollup(student_id, cgpa, num_backlogs)
            .await
    }

    /// Rebuild one (section, subject, semester) aggregate from the Scores of
    /// that section's students. The denominator is the section's recorded
    /// student count; students without a Score yet are excluded from the
    /// numerator only.
    pub async fn recompute_subject_metrics(
        &self,
        section_id: SectionId,
        subject_id: SubjectId,
        semester_id: SemesterId,
    ) -> AppResult<SubjectMetrics> {
        let section = self
            .store
            .section(section_id)
            .await?
            .ok_or(AppError::Store(StoreError::MissingSection { id: section_id }))?;

        let mut metrics = SubjectMetrics::empty(section_id, subject_id, semester_id);

        let denominator = section.num_students;
        if denominator == 0 {
            self.store.upsert_subject_metrics(metrics.clone()).await?;
            return Ok(metrics);
        }

        let members: HashSet<StudentId> = self
            .store
            .students_in_section(section_id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let scores = self.store.scores_for_subject(subject_id, semester_id).await?;

        let mut total_score = 0u64;
        for score in scores.iter().filter(|s| members.contains(&s.student_id)) {
            match score.grade {
                Grade::Fcd => metrics.fcd_count += 1,
                Grade::Fc => metrics.fc_count += 1,
                Grade::Sc => metrics.sc_count += 1,
                Grade::F => metrics.fail_count += 1,
                Grade::A => metrics.absent_count += 1,
            }
            total_score += u64::from(score.total);

            // Strict comparison: ties keep the first-encountered holder.
            if metrics.highest_scorer.is_none() || score.total > metrics.highest_score {
                metrics.highest_score = score.total;
                metrics.highest_scorer = Some(score.student_id);
            }
        }

        let denom = f64::from(denominator);
        let passes = metrics.fcd_count + metrics.fc_count + metrics.sc_count;
        metrics.avg_score = round2(total_score as f64 / denom);
        metrics.pass_percentage = round2(f64::from(passes) / denom * 100.0);
        metrics.fail_percentage = round2(f64::from(metrics.fail_count) / denom * 100.0);
        metrics.absent_percentage = round2(f64::from(metrics.absent_count) / denom * 100.0);

        self.store.upsert_subject_metrics(metrics.clone()).await?;
        Ok(metrics)
    }

    /// Rebuild one (section, semester) aggregate from the section's active
    /// students paired with their performance rows. Runs only after all
    /// per-student recomputes of a batch have completed.
    pub async fn recompute_semester_metrics(
        &self,
        section_id: SectionId,
        semester_id: SemesterId,
    ) -> AppResult<SemesterMetrics> {
        let section = self
            .store
            .section(section_id)
            .await?
            .ok_or(AppError::Store(StoreError::MissingSection { id: section_id }))?;

        let mut metrics = SemesterMetrics::empty(section_id, semester_id);

        let denominator = section.num_students;
        if denominator == 0 {
            self.store.upsert_semester_metrics(metrics.clone()).await?;
            return Ok(metrics);
        }

        let students = self.store.active_students_in_section(section_id).await?;

        let mut sgpa_sum = 0.0;
        for student in &students {
            let scores = self.store.scores_for_student(student.id, semester_id).await?;
            let fail_count = scores.iter().filter(|s| s.grade.is_backlog()).count();

            match fail_count {
                0 => metrics.pass_count += 1,
                1 => metrics.fail_1_sub += 1,
                2 => metrics.fail_2_subs += 1,
                3 => metrics.fail_3_subs += 1,
                _ => metrics.fail_greater_3_subs += 1,
            }
            if fail_count > 0 {
                metrics.total_backlogs += 1;
            }

            if let Some(performance) = self.store.performance(student.id, semester_id).await? {
                sgpa_sum += performance.sgpa;
            }
        }

        let denom = f64::from(denominator);
        metrics.avg_sgpa = round2(sgpa_sum / denom);
        metrics.pass_percentage = round2(f64::from(metrics.pass_count) / denom * 100.0);
        metrics.fail_percentage = round2(f64::from(metrics.total_backlogs) / denom * 100.0);

        self.store.upsert_semester_metrics(metrics.clone()).await?;
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grade::ResultCode;
    use crate::models::{Score, Section, Semester, Student, Subject};
    use crate::store::{InMemoryEntityStore, ScoreBatch};

    fn section(num_students: u32) -> Section {
        Section {
            id: 1,
            name: "A".to_string(),
            num_students,
        }
    }

    fn semester(num_subjects: u32) -> Semester {
        Semester {
            id: 5,
            number: 5,
            num_subjects,
        }
    }

    fn subject(id: i64, code: &str, credits: u32) -> Subject {
        Subject {
            id,
            semester_id: 5,
            code: code.to_string(),
            name: format!("Subject {code}"),
            credits,
        }
    }

    fn student(id: i64, usn: &str, active: bool) -> Student {
        Student {
            id,
            usn: usn.to_string(),
            name: format!("Student {usn}"),
            section_id: 1,
            semester_id: 5,
            cgpa: 0.0,
            active,
            num_backlogs: 0,
        }
    }

    fn score(student_id: i64, subject_id: i64, total: u32, result: ResultCode) -> Score {
        Score {
            id: 0,
            student_id,
            semester_id: 5,
            subject_id,
            internal: total.min(20),
            external: total.saturating_sub(total.min(20)),
            total,
            grade: Grade::classify(total, result),
        }
    }

    async fn seed_two_student_section() -> Arc<InMemoryEntityStore> {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(2)).await;
        store.insert_semester(semester(1)).await;
        store.insert_subject(subject(51, "21CS51", 4)).await;
        store.insert_student(student(101, "1OX21CS001", true)).await;
        store.insert_student(student(102, "1OX21CS002", true)).await;
        store
            .upsert_scores(ScoreBatch {
                created: vec![
                    score(101, 51, 82, ResultCode::Pass),
                    score(102, 51, 55, ResultCode::Fail),
                ],
                updated: vec![],
            })
            .await
            .expect("seed scores");
        store
    }

    #[tokio::test]
    async fn subject_metrics_two_student_scenario() {
        let store = seed_two_student_section().await;
        let engine = MetricsEngine::new(store);

        let metrics = engine
            .recompute_subject_metrics(1, 51, 5)
            .await
            .expect("recompute");

        assert_eq!(metrics.avg_score, 68.5);
        assert_eq!(metrics.fc_count, 0);
        assert_eq!(metrics.fcd_count, 1);
        assert_eq!(metrics.fail_count, 1);
        assert_eq!(metrics.pass_percentage, 50.0);
        assert_eq!(metrics.fail_percentage, 50.0);
        assert_eq!(metrics.highest_score, 82);
        assert_eq!(metrics.highest_scorer, Some(101));
    }

    #[tokio::test]
    async fn subject_metrics_zero_denominator_resets() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(0)).await;
        store.insert_semester(semester(1)).await;
        let engine = MetricsEngine::new(store);

        let metrics = engine
            .recompute_subject_metrics(1, 51, 5)
            .await
            .expect("recompute");
        assert_eq!(metrics, SubjectMetrics::empty(1, 51, 5));
    }

    #[tokio::test]
    async fn highest_score_tie_keeps_first_encountered() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(2)).await;
        store.insert_semester(semester(1)).await;
        store.insert_subject(subject(51, "21CS51", 4)).await;
        store.insert_student(student(101, "1OX21CS001", true)).await;
        store.insert_student(student(102, "1OX21CS002", true)).await;
        store
            .upsert_scores(ScoreBatch {
                created: vec![
                    score(101, 51, 77, ResultCode::Pass),
                    score(102, 51, 77, ResultCode::Pass),
                ],
                updated: vec![],
            })
            .await
            .expect("seed scores");
        let engine = MetricsEngine::new(store);

        let metrics = engine
            .recompute_subject_metrics(1, 51, 5)
            .await
            .expect("recompute");
        assert_eq!(metrics.highest_scorer, Some(101));
    }

    #[tokio::test]
    async fn performance_percentage_from_declared_subject_count() {
        // 5 declared subjects => 500 max; a total of 410 is 82%.
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(1)).await;
        store.insert_semester(semester(5)).await;
        for (i, code) in ["21CS51", "21CS52", "21CS53", "21CS54", "21CS55"]
            .iter()
            .enumerate()
        {
            store.insert_subject(subject(51 + i as i64, code, 4)).await;
        }
        store.insert_student(student(101, "1OX21CS001", true)).await;
        store
            .upsert_scores(ScoreBatch {
                created: vec![
                    score(101, 51, 90, ResultCode::Pass),
                    score(101, 52, 85, ResultCode::Pass),
                    score(101, 53, 80, ResultCode::Pass),
                    score(101, 54, 80, ResultCode::Pass),
                    score(101, 55, 75, ResultCode::Pass),
                ],
                updated: vec![],
            })
            .await
            .expect("seed scores");
        let engine = MetricsEngine::new(store.clone());

        let performance = engine
            .recompute_student_performance(101, 5)
            .await
            .expect("recompute");

        assert_eq!(performance.total, 410);
        assert_eq!(performance.percentage, 82.0);
        assert!(performance.sgpa >= 0.0 && performance.sgpa <= 10.0);
        // (10+9+9+9+8)*4 / 20 = 9.0
        assert_eq!(performance.sgpa, 9.0);

        let refreshed = store.student(101).await.expect("get").expect("present");
        assert_eq!(refreshed.cgpa, 9.0);
        assert_eq!(refreshed.num_backlogs, 0);
    }

    #[tokio::test]
    async fn sgpa_zero_when_no_credits() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(1)).await;
        store.insert_semester(semester(0)).await;
        store.insert_student(student(101, "1OX21CS001", true)).await;
        let engine = MetricsEngine::new(store);

        let performance = engine
            .recompute_student_performance(101, 5)
            .await
            .expect("recompute");
        assert_eq!(performance.sgpa, 0.0);
        assert_eq!(performance.percentage, 0.0);
        assert_eq!(performance.total, 0);
    }

    #[tokio::test]
    async fn backlog_rollup_counts_semesters_with_backlogs() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(1)).await;
        store.insert_semester(semester(2)).await;
        store.insert_subject(subject(51, "21CS51", 4)).await;
        store.insert_subject(subject(52, "21CS52", 3)).await;
        store.insert_student(student(101, "1OX21CS001", true)).await;
        store
            .upsert_scores(ScoreBatch {
                created: vec![
                    score(101, 51, 30, ResultCode::Fail),
                    score(101, 52, 0, ResultCode::Absent),
                ],
                updated: vec![],
            })
            .await
            .expect("seed scores");
        let engine = MetricsEngine::new(store.clone());

        let performance = engine
            .recompute_student_performance(101, 5)
            .await
            .expect("recompute");
        assert_eq!(performance.num_backlogs, 2);

        let refreshed = store.student(101).await.expect("get").expect("present");
        // One recorded semester with backlogs.
        assert_eq!(refreshed.num_backlogs, 1);
    }

    #[tokio::test]
    async fn semester_metrics_buckets_and_percentages() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert_section(section(4)).await;
        store.insert_semester(semester(4)).await;
        for (i, code) in ["21CS51", "21CS52", "21CS53", "21CS54"].iter().enumerate() {
            store.insert_subject(subject(51 + i as i64, code, 4)).await;
        }
        // s1: clean pass; s2: one backlog; s3: four backlogs; s4: inactive.
        store.insert_student(student(101, "1OX21CS001", true)).await;
        store.insert_student(student(102, "1OX21CS002", true)).await;
        store.insert_student(student(103, "1OX21CS003", true)).await;
        store.insert_student(student(104, "1OX21CS004", false)).await;
        store
            .upsert_scores(ScoreBatch {
                created: vec![
                    score(101, 51, 80, ResultCode::Pass),
                    score(102, 51, 30, ResultCode::Fail),
                    score(102, 52, 65, ResultCode::Pass),
                    score(103, 51, 10, ResultCode::Fail),
                    score(103, 52, 12, ResultCode::Fail),
                    score(103, 53, 0, ResultCode::Absent),
                    score(103, 54, 20, ResultCode::Fail),
                    // Inactive student's scores are not iterated.
                    score(104, 51, 90, ResultCode::Pass),
                ],
                updated: vec![],
            })
            .await
            .expect("seed scores");
        let engine = MetricsEngine::new(store.clone());

        for id in [101, 102, 103] {
            engine
                .recompute_student_performance(id, 5)
                .await
                .expect("per-student recompute");
        }

        let metrics = engine
            .recompute_semester_metrics(1, 5)
            .await
            .expect("recompute");

        assert_eq!(metrics.pass_count, 1);
        assert_eq!(metrics.fail_1_sub, 1);
        assert_eq!(metrics.fail_2_subs, 0);
        assert_eq!(metrics.fail_greater_3_subs, 1);
        assert_eq!(metrics.total_backlogs, 2);
        // Recorded section count (4) is the denominator.
        assert_eq!(metrics.pass_percentage, 25.0);
        assert_eq!(metrics.fail_percentage, 50.0);
    }

    #[tokio::test]
    async fn recompute_is_idempotent_on_unchanged_scores() {
        let store = seed_two_student_section().await;
        let engine = MetricsEngine::new(store.clone());

        let perf_a = engine
            .recompute_student_performance(101, 5)
            .await
            .expect("first");
        let subj_a = engine
            .recompute_subject_metrics(1, 51, 5)
            .await
            .expect("first");
        let sem_a = engine
            .recompute_semester_metrics(1, 5)
            .await
            .expect("first");

        let perf_b = engine
            .recompute_student_performance(101, 5)
            .await
            .expect("second");
        let subj_b = engine
            .recompute_subject_metrics(1, 51, 5)
            .await
            .expect("second");
        let sem_b = engine
            .recompute_semester_metrics(1, 5)
            .await
            .expect("second");

        assert_eq!(perf_a, perf_b);
        assert_eq!(subj_a, subj_b);
        assert_eq!(sem_a, sem_b);
    }
}
