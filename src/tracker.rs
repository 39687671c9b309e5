use crate::error::TrackerResult;
use crate::persistence::{TableStore, load_records, save_records};
use crate::records::{DeadlineKey, StudentTask, display_date};
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashSet;

/// A visible task row as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task: String,
    pub course: String,
    pub block: String,
    pub teacher: String,
    pub grade: Option<String>,
    pub due: NaiveDate,
    pub due_display: String,
}

impl TaskView {
    pub fn key(&self) -> DeadlineKey {
        DeadlineKey::new(
            self.task.clone(),
            self.course.clone(),
            self.block.clone(),
            self.teacher.clone(),
            self.due,
        )
    }
}

impl From<&StudentTask> for TaskView {
    fn from(task: &StudentTask) -> Self {
        Self {
            task: task.task.clone(),
            course: task.course.clone(),
            block: task.block.clone(),
            teacher: task.teacher.clone(),
            grade: task.grade.clone(),
            due: task.due,
            due_display: display_date(task.due),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleTasks {
    pub rows: Vec<TaskView>,
    /// Positions in `rows` whose task is completed.
    pub completed: Vec<usize>,
}

/// Applies user edits to one student's task rows.
///
/// Both edits reload the full persisted set and compare by `DeadlineKey`, so row
/// order on the caller's side does not matter. A blank student matches no rows.
pub struct TaskStateTracker<'a> {
    store: &'a dyn TableStore,
}

impl<'a> TaskStateTracker<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    pub fn list_visible_tasks(&self, student: &str) -> TrackerResult<VisibleTasks> {
        let tasks: Vec<StudentTask> = load_records(self.store)?;
        let mut visible = VisibleTasks::default();
        for task in tasks
            .iter()
            .filter(|task| task.student == student && !task.hidden)
        {
            if task.completed {
                visible.completed.push(visible.rows.len());
            }
            visible.rows.push(TaskView::from(task));
        }
        debug!(
            "event=list_visible_tasks student={student} rows={} completed={}",
            visible.rows.len(),
            visible.completed.len()
        );
        Ok(visible)
    }

    /// Hides every persisted task of `student` missing from `visible`.
    /// Returns the number of rows newly hidden.
    pub fn apply_deletions(&self, visible: &[DeadlineKey], student: &str) -> TrackerResult<usize> {
        if student.trim().is_empty() {
            return Ok(0);
        }
        let keep: HashSet<&DeadlineKey> = visible.iter().collect();
        let mut tasks: Vec<StudentTask> = load_records(self.store)?;

        let mut hidden = 0usize;
        for task in tasks.iter_mut().filter(|task| task.student == student) {
            if !task.hidden && !keep.contains(&task.deadline_key()) {
                task.hidden = true;
                hidden += 1;
            }
        }

        if hidden > 0 {
            save_records(self.store, &tasks)?;
        }
        info!("event=apply_deletions student={student} hidden={hidden}");
        Ok(hidden)
    }

    /// Makes `selected` the exact completed set among the student's visible tasks.
    /// Returns the number of rows now completed.
    pub fn apply_completions(&self, selected: &[DeadlineKey], student: &str) -> TrackerResult<usize> {
        if student.trim().is_empty() {
            return Ok(0);
        }
        let chosen: HashSet<&DeadlineKey> = selected.iter().collect();
        let mut tasks: Vec<StudentTask> = load_records(self.store)?;

        let mut changed = false;
        let mut completed = 0usize;
        for task in tasks
            .iter_mut()
            .filter(|task| task.student == student && !task.hidden)
        {
            let done = chosen.contains(&task.deadline_key());
            changed |= task.completed != done;
            task.completed = done;
            if done {
                completed += 1;
            }
        }

        if changed {
            save_records(self.store, &tasks)?;
        }
        info!("event=apply_completions student={student} completed={completed}");
        Ok(completed)
    }
}

