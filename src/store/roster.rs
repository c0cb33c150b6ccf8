//! TOML roster loading.
//!
//! The CLI runner seeds the in-memory entity store from one roster file
//! describing a section, its semester, the semester's subjects and the
//! student list.

use std::path::Path;

use serde::Deserialize;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{Section, SectionId, Semester, SemesterId, Student, Subject};
use crate::store::memory::InMemoryEntityStore;

#[derive(Debug, Deserialize)]
pub struct RosterFile {
    pub section: SectionEntry,
    pub semester: SemesterEntry,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
    #[serde(default)]
    pub students: Vec<StudentEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SectionEntry {
    pub id: SectionId,
    pub name: String,
    pub num_students: u32,
}

#[derive(Debug, Deserialize)]
pub struct SemesterEntry {
    pub id: SemesterId,
    pub number: u32,
    pub num_subjects: u32,
}

#[derive(Debug, Deserialize)]
pub struct SubjectEntry {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub credits: u32,
}

#[derive(Debug, Deserialize)]
pub struct StudentEntry {
    pub id: i64,
    pub usn: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Load a roster file from disk.
pub async fn load_roster(path: &Path) -> AppResult<RosterFile> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let roster: RosterFile = toml::from_str(&content)
        .map_err(|e| AppError::toml_parse_failed(path.display().to_string(), e))?;

    Ok(roster)
}

/// Seed an in-memory store from a parsed roster.
pub async fn seed_store(store: &InMemoryEntityStore, roster: &RosterFile) {
    store
        .insert_section(Section {
            id: roster.section.id,
            name: roster.section.name.clone(),
            num_students: roster.section.num_students,
        })
        .await;

    store
        .insert_semester(Semester {
            id: roster.semester.id,
            number: roster.semester.number,
            num_subjects: roster.semester.num_subjects,
        })
        .await;

    for subject in &roster.subjects {
        store
            .insert_subject(Subject {
                id: subject.id,
                semester_id: roster.semester.id,
                code: subject.code.trim().to_uppercase(),
                name: subject.name.clone(),
                credits: subject.credits,
            })
            .await;
    }

    for student in &roster.students {
        store
            .insert_student(Student {
                id: student.id,
                usn: student.usn.trim().to_uppercase(),
                name: student.name.clone(),
                section_id: roster.section.id,
                semester_id: roster.semester.id,
                cgpa: 0.0,
                active: student.active,
                num_backlogs: 0,
            })
            .await;
    }

    info!(
        "✓ roster loaded: section {} with {} subjects, {} students",
        roster.section.name,
        roster.subjects.len(),
        roster.students.len()
    );
}
