use crate::error::TrackerResult;
use crate::persistence::{TableStore, load_records};
use crate::records::ScheduleEntry;

/// Read-only view of the Schedule table.
pub struct Roster<'a> {
    store: &'a dyn TableStore,
}

impl<'a> Roster<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Distinct student names in the order they first appear.
    pub fn student_list(&self) -> TrackerResult<Vec<String>> {
        let schedule: Vec<ScheduleEntry> = load_records(self.store)?;
        let mut students: Vec<String> = Vec::new();
        for entry in schedule {
            if !entry.student.is_empty() && !students.contains(&entry.student) {
                students.push(entry.student);
            }
        }
        Ok(students)
    }

    pub fn student_schedule(&self, student: &str) -> TrackerResult<Vec<ScheduleEntry>> {
        let schedule: Vec<ScheduleEntry> = load_records(self.store)?;
        Ok(schedule
            .into_iter()
            .filter(|entry| entry.student == student)
            .collect())
    }
}
