//! Closed failure taxonomy for one student's scrape.
//!
//! Everything here is per-student: the orchestrator records the failure in
//! the job's error list and moves on. Fatal batch-level problems travel as
//! `AppError` instead.

use thiserror::Error;

/// Where in the fetch state machine an unexpected error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Navigate,
    SolveCaptcha,
    Submit,
    Classify,
    Parse,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FetchStage::Navigate => "navigate",
            FetchStage::SolveCaptcha => "solve-captcha",
            FetchStage::Submit => "submit",
            FetchStage::Classify => "classify",
            FetchStage::Parse => "parse",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeFailure {
    /// The source reports the USN as unavailable or invalid. Permanent.
    #[error("USN is not available or invalid")]
    InvalidIdentifier,

    /// The captcha was rejected on every budgeted attempt. Permanent.
    #[error("captcha failed after {attempts} attempts")]
    CaptchaExhausted { attempts: usize },

    /// The source kept cooling down past the retry bound. Transient upstream,
    /// permanent for this student in this batch.
    #[error("result source still cooling down after {rounds} rounds")]
    SourceCooldown { rounds: usize },

    /// The result page could not be reached at all.
    #[error("transport error: {detail}")]
    Transport { detail: String },

    /// Scraped marks referenced a subject the semester does not declare.
    /// Raised by the ingester, reported with the fetch failures.
    #[error("unknown subject code {code}")]
    UnknownSubject { code: String },

    /// Catch-all with stage context; includes exceeded element waits and
    /// unrecognized modal text.
    #[error("unexpected error at {stage}: {detail}")]
    Unexpected { stage: FetchStage, detail: String },
}

impl ScrapeFailure {
    pub fn unexpected(stage: FetchStage, detail: impl std::fmt::Display) -> Self {
        ScrapeFailure::Unexpected {
            stage,
            detail: detail.to_string(),
        }
    }
}
