use crate::persistence::{Row, StoreError, StoreResult, Table};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Conversion between a typed record and a stored row.
pub trait TableRecord: Sized {
    const TABLE: Table;

    fn to_row(&self) -> Row;
    fn from_row(row: &[String]) -> StoreResult<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::Absent,
        AttendanceStatus::Excused,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Late => "L",
            AttendanceStatus::Absent => "A",
            AttendanceStatus::Excused => "AE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Excused => "Excused",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "P" => Some(AttendanceStatus::Present),
            "L" => Some(AttendanceStatus::Late),
            "A" => Some(AttendanceStatus::Absent),
            "AE" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ordinal work-habit scale, `OffTask = 0` through `OnTask = 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HabitLevel {
    OffTask,
    MostlyOffTask,
    EquallyOnOffTask,
    MostlyOnTask,
    OnTask,
}

impl HabitLevel {
    pub const ALL: [HabitLevel; 5] = [
        HabitLevel::OffTask,
        HabitLevel::MostlyOffTask,
        HabitLevel::EquallyOnOffTask,
        HabitLevel::MostlyOnTask,
        HabitLevel::OnTask,
    ];

    pub fn score(&self) -> u8 {
        match self {
            HabitLevel::OffTask => 0,
            HabitLevel::MostlyOffTask => 1,
            HabitLevel::EquallyOnOffTask => 2,
            HabitLevel::MostlyOnTask => 3,
            HabitLevel::OnTask => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HabitLevel::OffTask => "Off-task",
            HabitLevel::MostlyOffTask => "Mostly Off-task",
            HabitLevel::EquallyOnOffTask => "Equally On/Off-task",
            HabitLevel::MostlyOnTask => "Mostly On-task",
            HabitLevel::OnTask => "On-task",
        }
    }

    pub fn from_score(score: u8) -> Option<Self> {
        Self::ALL.get(usize::from(score)).copied()
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for HabitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub student: String,
    pub block: String,
    pub course: String,
    pub teacher: String,
}

impl ScheduleEntry {
    pub fn new(
        student: impl Into<String>,
        block: impl Into<String>,
        course: impl Into<String>,
        teacher: impl Into<String>,
    ) -> Self {
        Self {
            student: student.into(),
            block: block.into(),
            course: course.into(),
            teacher: teacher.into(),
        }
    }

    pub fn is_support(&self, marker: &str) -> bool {
        is_support_course(&self.course, marker)
    }
}

impl TableRecord for ScheduleEntry {
    const TABLE: Table = Table::Schedule;

    fn to_row(&self) -> Row {
        vec![
            self.student.clone(),
            self.block.clone(),
            self.course.clone(),
            self.teacher.clone(),
        ]
    }

    fn from_row(row: &[String]) -> StoreResult<Self> {
        let row = Fields::new(Self::TABLE, row)?;
        Ok(Self {
            student: row.text(0),
            block: row.text(1),
            course: row.text(2),
            teacher: row.text(3),
        })
    }
}

/// Natural key of a deadline: (Task, Course, Block, Teacher, Due).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeadlineKey {
    pub task: String,
    pub course: String,
    pub block: String,
    pub teacher: String,
    pub due: NaiveDate,
}

impl DeadlineKey {
    pub fn new(
        task: impl Into<String>,
        course: impl Into<String>,
        block: impl Into<String>,
        teacher: impl Into<String>,
        due: NaiveDate,
    ) -> Self {
        Self {
            task: task.into(),
            course: course.into(),
            block: block.into(),
            teacher: teacher.into(),
            due,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterDeadline {
    pub task: String,
    pub course: String,
    pub block: String,
    pub teacher: String,
    pub due: NaiveDate,
    pub grade: Option<String>,
}

impl MasterDeadline {
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

impl TableRecord for MasterDeadline {
    const TABLE: Table = Table::MasterDeadlines;

    fn to_row(&self) -> Row {
        vec![
            self.task.clone(),
            self.course.clone(),
            self.block.clone(),
            self.teacher.clone(),
            format_date(self.due),
            self.grade.clone().unwrap_or_default(),
        ]
    }

    fn from_row(row: &[String]) -> StoreResult<Self> {
        let row = Fields::new(Self::TABLE, row)?;
        Ok(Self {
            task: row.text(0),
            course: row.text(1),
            block: row.text(2),
            teacher: row.text(3),
            due: row.date(4)?,
            grade: row.optional_text(5),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentTask {
    pub student: String,
    pub task: String,
    pub course: String,
    pub block: String,
    pub teacher: String,
    pub grade: Option<String>,
    pub due: NaiveDate,
    pub completed: bool,
    pub hidden: bool,
}

impl StudentTask {
    pub fn for_student(student: &str, deadline: &MasterDeadline) -> Self {
        Self {
            student: student.to_string(),
            task: deadline.task.clone(),
            course: deadline.course.clone(),
            block: deadline.block.clone(),
            teacher: deadline.teacher.clone(),
            grade: deadline.grade.clone(),
            due: deadline.due,
            completed: false,
            hidden: false,
        }
    }

    pub fn deadline_key(&self) -> DeadlineKey {
        DeadlineKey::new(
            self.task.clone(),
            self.course.clone(),
            self.block.clone(),
            self.teacher.clone(),
            self.due,
        )
    }
}

impl TableRecord for StudentTask {
    const TABLE: Table = Table::StudentTasks;

    fn to_row(&self) -> Row {
        vec![
            self.student.clone(),
            self.task.clone(),
            self.course.clone(),
            self.block.clone(),
            self.teacher.clone(),
            self.grade.clone().unwrap_or_default(),
            format_date(self.due),
            self.completed.to_string(),
            self.hidden.to_string(),
        ]
    }

    fn from_row(row: &[String]) -> StoreResult<Self> {
        let row = Fields::new(Self::TABLE, row)?;
        Ok(Self {
            student: row.text(0),
            task: row.text(1),
            course: row.text(2),
            block: row.text(3),
            teacher: row.text(4),
            grade: row.optional_text(5),
            due: row.date(6)?,
            completed: row.flag(7)?,
            hidden: row.flag(8)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceObservation {
    pub student: String,
    pub date: NaiveDate,
    pub course: String,
    pub block: String,
    pub teacher: String,
    pub attendance: Option<AttendanceStatus>,
    pub habit: Option<HabitLevel>,
    pub work: Option<String>,
}

impl AttendanceObservation {
    pub fn is_support(&self, marker: &str) -> bool {
        is_support_course(&self.course, marker)
    }
}

impl TableRecord for AttendanceObservation {
    const TABLE: Table = Table::AttendanceObservations;

    fn to_row(&self) -> Row {
        vec![
            self.student.clone(),
            format_date(self.date),
            self.course.clone(),
            self.block.clone(),
            self.teacher.clone(),
            self.attendance.map(|a| a.code().to_string()).unwrap_or_default(),
            self.habit.map(|h| h.label().to_string()).unwrap_or_default(),
            self.work.clone().unwrap_or_default(),
        ]
    }

    fn from_row(row: &[String]) -> StoreResult<Self> {
        let row = Fields::new(Self::TABLE, row)?;
        let attendance = match row.optional_text(5) {
            None => None,
            Some(code) => Some(AttendanceStatus::from_code(&code).ok_or_else(|| {
                StoreError::InvalidData(format!("unknown attendance status '{code}'"))
            })?),
        };
        let habit = match row.optional_text(6) {
            None => None,
            Some(label) => Some(HabitLevel::from_label(&label).ok_or_else(|| {
                StoreError::InvalidData(format!("unknown work habit '{label}'"))
            })?),
        };
        Ok(Self {
            student: row.text(0),
            date: row.date(1)?,
            course: row.text(2),
            block: row.text(3),
            teacher: row.text(4),
            attendance,
            habit,
            work: row.optional_text(7),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub student: String,
    pub note: String,
}

impl TableRecord for Note {
    const TABLE: Table = Table::Notes;

    fn to_row(&self) -> Row {
        vec![self.student.clone(), self.note.clone()]
    }

    fn from_row(row: &[String]) -> StoreResult<Self> {
        let row = Fields::new(Self::TABLE, row)?;
        Ok(Self {
            student: row.text(0),
            note: row.raw(1).to_string(),
        })
    }
}

pub fn is_support_course(course: &str, marker: &str) -> bool {
    !marker.is_empty() && course.contains(marker)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Short month-day display form, e.g. `May-01`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%b-%d").to_string()
}

/// Parses an ISO date, tolerating a trailing time component.
pub fn parse_date(input: &str) -> StoreResult<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }
    Err(StoreError::InvalidData(format!("invalid date '{input}'")))
}

pub fn parse_bool(input: &str) -> StoreResult<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(StoreError::InvalidData(format!("invalid boolean '{other}'"))),
    }
}

struct Fields<'a> {
    row: &'a [String],
}

impl<'a> Fields<'a> {
    fn new(table: Table, row: &'a [String]) -> StoreResult<Self> {
        let expected = table.schema().columns.len();
        if row.len() != expected {
            return Err(StoreError::InvalidData(format!(
                "{table} row has {} fields, expected {expected}",
                row.len()
            )));
        }
        Ok(Self { row })
    }

    fn raw(&self, idx: usize) -> &'a str {
        &self.row[idx]
    }

    fn text(&self, idx: usize) -> String {
        self.raw(idx).trim().to_string()
    }

    fn optional_text(&self, idx: usize) -> Option<String> {
        let value = self.raw(idx).trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn date(&self, idx: usize) -> StoreResult<NaiveDate> {
        parse_date(self.raw(idx))
    }

    fn flag(&self, idx: usize) -> StoreResult<bool> {
        parse_bool(self.raw(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn habit_levels_follow_ordinal_table() {
        let labels: Vec<_> = (0..=4)
            .map(|s| HabitLevel::from_score(s).unwrap().label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Off-task",
                "Mostly Off-task",
                "Equally On/Off-task",
                "Mostly On-task",
                "On-task"
            ]
        );
        assert_eq!(HabitLevel::from_score(5), None);
        assert_eq!(HabitLevel::from_label("mostly on-task"), Some(HabitLevel::MostlyOnTask));
    }

    #[test]
    fn parse_date_accepts_datetime_suffix() {
        assert_eq!(parse_date("2024-05-01").unwrap(), d(2024, 5, 1));
        assert_eq!(parse_date("2024-05-01 00:00:00").unwrap(), d(2024, 5, 1));
        assert!(parse_date("05/01/2024").is_err());
    }

    #[test]
    fn parse_bool_accepts_pandas_spelling() {
        assert!(parse_bool("True").unwrap());
        assert!(!parse_bool("FALSE").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn student_task_row_round_trips_flags() {
        let task = StudentTask {
            student: "A".into(),
            task: "Quiz1".into(),
            course: "Math".into(),
            block: "1-1".into(),
            teacher: "Smith".into(),
            grade: None,
            due: d(2024, 5, 1),
            completed: true,
            hidden: false,
        };
        let row = task.to_row();
        assert_eq!(row[6], "2024-05-01");
        assert_eq!(row[7], "true");
        assert_eq!(StudentTask::from_row(&row).unwrap(), task);
    }

    #[test]
    fn observation_rejects_unknown_status() {
        let row: Row = ["A", "2024-05-01", "Math", "1-1", "Smith", "X", "", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(
            AttendanceObservation::from_row(&row),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn display_date_uses_short_month() {
        assert_eq!(display_date(d(2024, 5, 1)), "May-01");
    }
}
