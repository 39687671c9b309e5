//! Master deadline intake and fan-out into per-student task rows.
//!
//! StudentTasks is derived from MasterDeadlines joined with the Schedule on
//! (Course, Block, Teacher). Reconciliation diffs that join against the existing
//! StudentTasks on the full natural key, Due included, so repeated runs never
//! insert a row twice.

use crate::error::{SaveStatus, TrackerError, TrackerResult};
use crate::persistence::{TableStore, append_records, load_records, save_records};
use crate::records::{DeadlineKey, MasterDeadline, ScheduleEntry, StudentTask, parse_date};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// A deadline as typed by a user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadlineEntry {
    pub task: String,
    pub course: String,
    pub block: String,
    pub teacher: String,
    pub due: String,
    pub grade: String,
}

impl DeadlineEntry {
    pub fn new(
        task: impl Into<String>,
        course: impl Into<String>,
        block: impl Into<String>,
        teacher: impl Into<String>,
        due: impl Into<String>,
    ) -> Self {
        Self {
            task: task.into(),
            course: course.into(),
            block: block.into(),
            teacher: teacher.into(),
            due: due.into(),
            grade: String::new(),
        }
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = grade.into();
        self
    }

    fn trimmed(&self) -> Self {
        Self {
            task: self.task.trim().to_string(),
            course: self.course.trim().to_string(),
            block: self.block.trim().to_string(),
            teacher: self.teacher.trim().to_string(),
            due: self.due.trim().to_string(),
            grade: self.grade.trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        [
            &self.task,
            &self.course,
            &self.block,
            &self.teacher,
            &self.due,
            &self.grade,
        ]
        .iter()
        .all(|field| field.is_empty())
    }

    fn validate(self, row: usize) -> TrackerResult<MasterDeadline> {
        let required = [
            ("Task", &self.task),
            ("Course", &self.course),
            ("Block", &self.block),
            ("Teacher", &self.teacher),
            ("Due", &self.due),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(TrackerError::InvalidEntry {
                row,
                reason: format!("{name} is required"),
            });
        }
        let due = parse_date(&self.due).map_err(|_| TrackerError::InvalidEntry {
            row,
            reason: format!("Due '{}' is not a date (expected YYYY-MM-DD)", self.due),
        })?;
        Ok(MasterDeadline {
            task: self.task,
            course: self.course,
            block: self.block,
            teacher: self.teacher,
            due,
            grade: if self.grade.is_empty() {
                None
            } else {
                Some(self.grade)
            },
        })
    }
}

pub struct DeadlineReconciler<'a> {
    store: &'a dyn TableStore,
}

impl<'a> DeadlineReconciler<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Validates and merges new master deadlines, then reconciles student tasks.
    ///
    /// Blank rows are dropped; if nothing is left the store is not touched. A row
    /// with a missing required field or bad Due date rejects the whole batch.
    /// Deadlines already present under the same natural key are skipped.
    pub fn submit_deadlines(&self, entries: &[DeadlineEntry]) -> TrackerResult<SaveStatus> {
        let entries: Vec<DeadlineEntry> = entries
            .iter()
            .map(DeadlineEntry::trimmed)
            .filter(|entry| !entry.is_blank())
            .collect();
        if entries.is_empty() {
            info!("event=submit_deadlines status=no_valid_data");
            return Ok(SaveStatus::NoValidData);
        }

        let submitted = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| entry.validate(idx + 1))
            .collect::<TrackerResult<Vec<_>>>()?;

        let mut deadlines: Vec<MasterDeadline> = load_records(self.store)?;
        let mut known: HashSet<DeadlineKey> = deadlines.iter().map(MasterDeadline::key).collect();
        let mut added = 0usize;
        for deadline in submitted {
            if known.insert(deadline.key()) {
                deadlines.push(deadline);
                added += 1;
            } else {
                debug!(
                    "event=submit_deadlines status=duplicate task={} due={}",
                    deadline.task, deadline.due
                );
            }
        }

        if added > 0 {
            deadlines.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.teacher.cmp(&b.teacher)));
            save_records(self.store, &deadlines)?;
        }
        let inserted = self.reconcile_student_tasks()?;
        info!("event=submit_deadlines status=saved deadlines={added} student_tasks={inserted}");

        Ok(SaveStatus::Saved(format!(
            "Saved {added} new deadline(s); added {inserted} student task(s)."
        )))
    }

    /// Inserts a StudentTask for every (enrolled student, deadline) pair that does
    /// not have one yet. Returns the number of rows inserted.
    pub fn reconcile_student_tasks(&self) -> TrackerResult<usize> {
        let deadlines: Vec<MasterDeadline> = load_records(self.store)?;
        let schedule: Vec<ScheduleEntry> = load_records(self.store)?;
        let existing: Vec<StudentTask> = load_records(self.store)?;

        let mut sections: HashMap<(&str, &str, &str), Vec<&str>> = HashMap::new();
        for entry in &schedule {
            let students = sections
                .entry((entry.course.as_str(), entry.block.as_str(), entry.teacher.as_str()))
                .or_default();
            if !students.contains(&entry.student.as_str()) {
                students.push(&entry.student);
            }
        }

        let mut known: HashSet<(String, DeadlineKey)> = existing
            .iter()
            .map(|task| (task.student.clone(), task.deadline_key()))
            .collect();

        let mut fresh = Vec::new();
        for deadline in &deadlines {
            let section = (
                deadline.course.as_str(),
                deadline.block.as_str(),
                deadline.teacher.as_str(),
            );
            let Some(students) = sections.get(&section) else {
                continue;
            };
            let key = deadline.key();
            for student in students {
                if known.insert((student.to_string(), key.clone())) {
                    fresh.push(StudentTask::for_student(student, deadline));
                }
            }
        }

        append_records(self.store, &fresh)?;
        debug!("event=reconcile inserted={}", fresh.len());
        Ok(fresh.len())
    }
}
