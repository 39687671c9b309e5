use crate::error::TrackerResult;
use crate::persistence::{TableStore, load_records};
use crate::records::{AttendanceObservation, AttendanceStatus};
use log::debug;
use polars::prelude::*;
use std::collections::BTreeMap;

pub const OVERALL_LABEL: &str = "Overall";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceCounts {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub excused: u32,
}

impl AttendanceCounts {
    pub fn get(&self, status: AttendanceStatus) -> u32 {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Late => self.late,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Excused => self.excused,
        }
    }

    fn add(&mut self, status: AttendanceStatus, count: u32) {
        let slot = match status {
            AttendanceStatus::Present => &mut self.present,
            AttendanceStatus::Late => &mut self.late,
            AttendanceStatus::Absent => &mut self.absent,
            AttendanceStatus::Excused => &mut self.excused,
        };
        *slot += count;
    }

    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent + self.excused
    }

    /// Every status, zero counts included, in P, L, A, AE order.
    pub fn entries(&self) -> [(AttendanceStatus, u32); 4] {
        AttendanceStatus::ALL.map(|status| (status, self.get(status)))
    }

    /// Share of each status in P, L, A, AE order, in percent with two decimals.
    /// All zero when there are no observations.
    pub fn percentages(&self) -> [f64; 4] {
        let total = self.total();
        AttendanceStatus::ALL.map(|status| {
            if total == 0 {
                0.0
            } else {
                round2(f64::from(self.get(status)) / f64::from(total) * 100.0)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub label: String,
    pub counts: AttendanceCounts,
    pub percentages: [f64; 4],
}

impl BreakdownRow {
    fn new(label: impl Into<String>, counts: AttendanceCounts) -> Self {
        Self {
            label: label.into(),
            percentages: counts.percentages(),
            counts,
        }
    }

    pub fn placeholder() -> Self {
        Self::new("", AttendanceCounts::default())
    }

    pub fn percent(&self, status: AttendanceStatus) -> f64 {
        let idx = AttendanceStatus::ALL
            .iter()
            .position(|s| *s == status)
            .unwrap_or_default();
        self.percentages[idx]
    }
}

pub struct AttendanceAggregator<'a> {
    store: &'a dyn TableStore,
}

impl<'a> AttendanceAggregator<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    pub fn attendance_counts(&self, student: &str) -> TrackerResult<AttendanceCounts> {
        let tallies = self.tally(student, false)?;
        Ok(tallies
            .into_values()
            .next()
            .unwrap_or_default())
    }

    /// Percentage breakdown for charting.
    ///
    /// Without a student, a single all-zero row. With `overall`, one row for all
    /// courses. Otherwise one row per course, in reverse lexical course order.
    pub fn attendance_breakdown(
        &self,
        student: Option<&str>,
        overall: bool,
    ) -> TrackerResult<Vec<BreakdownRow>> {
        let Some(student) = student.filter(|s| !s.trim().is_empty()) else {
            return Ok(vec![BreakdownRow::placeholder()]);
        };
        if overall {
            let counts = self.attendance_counts(student)?;
            return Ok(vec![BreakdownRow::new(OVERALL_LABEL, counts)]);
        }
        Ok(self
            .tally(student, true)?
            .into_iter()
            .rev()
            .map(|(course, counts)| BreakdownRow::new(course, counts))
            .collect())
    }

    fn tally(
        &self,
        student: &str,
        by_course: bool,
    ) -> TrackerResult<BTreeMap<String, AttendanceCounts>> {
        let observations: Vec<AttendanceObservation> = load_records(self.store)?;
        let (courses, codes): (Vec<&str>, Vec<&str>) = observations
            .iter()
            .filter(|obs| obs.student == student)
            .filter_map(|obs| obs.attendance.map(|status| (obs.course.as_str(), status.code())))
            .unzip();

        let mut tallies = BTreeMap::new();
        if courses.is_empty() {
            return Ok(tallies);
        }

        let frame = DataFrame::new(vec![
            Series::new(PlSmallStr::from_static("Course"), courses).into_column(),
            Series::new(PlSmallStr::from_static("Attendance"), codes).into_column(),
        ])?;
        let keys = if by_course {
            vec![col("Course"), col("Attendance")]
        } else {
            vec![col("Attendance")]
        };
        let grouped = frame
            .lazy()
            .group_by(keys)
            .agg([len().cast(DataType::Int64).alias("count")])
            .collect()?;

        let codes = grouped.column("Attendance")?.str()?;
        let counts = grouped.column("count")?.i64()?;
        let courses = if by_course {
            Some(grouped.column("Course")?.str()?)
        } else {
            None
        };

        for idx in 0..grouped.height() {
            let Some(status) = codes.get(idx).and_then(AttendanceStatus::from_code) else {
                continue;
            };
            let course = courses
                .and_then(|ca| ca.get(idx))
                .unwrap_or(OVERALL_LABEL)
                .to_string();
            let count = u32::try_from(counts.get(idx).unwrap_or(0)).unwrap_or(u32::MAX);
            tallies
                .entry(course)
                .or_insert_with(AttendanceCounts::default)
                .add(status, count);
        }
        debug!(
            "event=attendance_tally student={student} by_course={by_course} groups={}",
            tallies.len()
        );
        Ok(tallies)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
