//! Dependency-ordered recompute requests.
//!
//! Score mutations fan out into derived-row recomputations. Rather than
//! hidden save-hooks, callers queue tagged requests and drain them once;
//! the queue de-duplicates and executes in dependency rank order
//! (per-student rows before subject aggregates before semester aggregates).

use crate::error::AppResult;
use crate::metrics::engine::MetricsEngine;
use crate::models::{SectionId, SemesterId, StudentId, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecomputeRequest {
    StudentPerformance {
        student_id: StudentId,
        semester_id: SemesterId,
    },
    SubjectMetrics {
        section_id: SectionId,
        subject_id: SubjectId,
        semester_id: SemesterId,
    },
    SemesterMetrics {
        section_id: SectionId,
        semester_id: SemesterId,
    },
}

impl RecomputeRequest {
    fn rank(&self) -> u8 {
        match self {
            RecomputeRequest::StudentPerformance { .. } => 0,
            RecomputeRequest::SubjectMetrics { .. } => 1,
            RecomputeRequest::SemesterMetrics { .. } => 2,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecomputeQueue {
    requests: Vec<RecomputeRequest>,
}

impl RecomputeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request; duplicates collapse so each derived row is
    /// recomputed at most once per drain.
    pub fn push(&mut self, request: RecomputeRequest) {
        if !self.requests.contains(&request) {
            self.requests.push(request);
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Execute everything queued, low rank first. Stable sort keeps
    /// same-rank requests in queue order.
    pub async fn drain(self, engine: &MetricsEngine) -> AppResult<()> {
        let mut requests = self.requests;
        requests.sort_by_key(RecomputeRequest::rank);

        for request in requests {
            match request {
                RecomputeRequest::StudentPerformance {
                    student_id,
                    semester_id,
                } => {
                    engine
                        .recompute_student_performance(student_id, semester_id)
                        .await?;
                }
                RecomputeRequest::SubjectMetrics {
                    section_id,
                    subject_id,
                    semester_id,
                } => {
                    engine
                        .recompute_subject_metrics(section_id, subject_id, semester_id)
                        .await?;
                }
                RecomputeRequest::SemesterMetrics {
                    section_id,
                    semester_id,
                } => {
                    engine
                        .recompute_semester_metrics(section_id, semester_id)
                        .await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let mut queue = RecomputeQueue::new();
        queue.push(RecomputeRequest::SubjectMetrics {
            section_id: 1,
            subject_id: 51,
            semester_id: 5,
        });
        queue.push(RecomputeRequest::SubjectMetrics {
            section_id: 1,
            subject_id: 51,
            semester_id: 5,
        });
        queue.push(RecomputeRequest::SemesterMetrics {
            section_id: 1,
            semester_id: 5,
        });
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn ranks_order_low_to_high() {
        let semester = RecomputeRequest::SemesterMetrics {
            section_id: 1,
            semester_id: 5,
        };
        let subject = RecomputeRequest::SubjectMetrics {
            section_id: 1,
            subject_id: 51,
            semester_id: 5,
        };
        let student = RecomputeRequest::StudentPerformance {
            student_id: 101,
            semester_id: 5,
        };
        assert!(student.rank() < subject.rank());
        assert!(subject.rank() < semester.rank());
    }
}
