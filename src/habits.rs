//! Daily work-habit intake and trend analysis over support sessions.

use crate::config::DashboardConfig;
use crate::error::{SaveStatus, TrackerError, TrackerResult};
use crate::persistence::{TableStore, load_records, save_records};
use crate::records::{AttendanceObservation, AttendanceStatus, HabitLevel, ScheduleEntry};
use chrono::NaiveDate;
use log::{debug, info, warn};

/// Observations needed before a trend is reported.
pub const MIN_TREND_OBSERVATIONS: usize = 5;
const TREND_WINDOW: usize = 3;
const EPSILON: f64 = 1e-6;

pub const NULL_MARKER: &str = "∅";
pub const CONSISTENT_ICON: &str = "🔄";
pub const INCREASE_ICON: &str = "📈";
pub const DECREASE_ICON: &str = "⚠️";

/// One row of the daily habit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyHabitEntry {
    pub student: String,
    /// 0 (Off-task) through 4 (On-task); `None` when not observed.
    pub score: Option<u8>,
    pub focus: String,
    /// Support-session attendance code (P, L, A, AE).
    pub attendance: String,
}

impl DailyHabitEntry {
    pub fn new(
        student: impl Into<String>,
        score: Option<u8>,
        focus: impl Into<String>,
        attendance: impl Into<String>,
    ) -> Self {
        Self {
            student: student.into(),
            score,
            focus: focus.into(),
            attendance: attendance.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.student.trim().is_empty()
            && self.score.is_none()
            && self.focus.trim().is_empty()
            && self.attendance.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magnitude {
    Small,
    Moderate,
    Large,
}

impl Magnitude {
    fn from_percent(change: f64) -> Self {
        let change = change.abs();
        if change <= 5.0 {
            Magnitude::Small
        } else if change <= 10.0 {
            Magnitude::Moderate
        } else {
            Magnitude::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Magnitude::Small => "small",
            Magnitude::Moderate => "moderate",
            Magnitude::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HabitTrend {
    InsufficientData,
    Consistent {
        average: f64,
    },
    Change {
        magnitude: Magnitude,
        direction: Direction,
        average: f64,
        percent_change: f64,
    },
}

impl HabitTrend {
    pub fn label(&self) -> String {
        match self {
            HabitTrend::InsufficientData => "insufficient data".to_string(),
            HabitTrend::Consistent { .. } => "consistent".to_string(),
            HabitTrend::Change {
                magnitude,
                direction,
                ..
            } => format!("{} {}", magnitude.as_str(), direction.as_str()),
        }
    }

    /// Recent average, rounded to one decimal.
    pub fn average(&self) -> Option<f64> {
        match self {
            HabitTrend::InsufficientData => None,
            HabitTrend::Consistent { average } | HabitTrend::Change { average, .. } => {
                Some(*average)
            }
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            HabitTrend::InsufficientData => NULL_MARKER,
            HabitTrend::Consistent { .. } => CONSISTENT_ICON,
            HabitTrend::Change {
                direction: Direction::Increase,
                ..
            } => INCREASE_ICON,
            HabitTrend::Change { .. } => DECREASE_ICON,
        }
    }

    /// `(message, average, icon)` as displayed, `∅` standing in for no value.
    pub fn display(&self) -> (String, String, String) {
        let average = self
            .average()
            .map(|avg| format!("{avg:.1}"))
            .unwrap_or_else(|| NULL_MARKER.to_string());
        (self.label(), average, self.icon().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitTimeline {
    pub points: Vec<(NaiveDate, HabitLevel)>,
    /// Support sessions with no habit recorded.
    pub absent_dates: Vec<NaiveDate>,
}

pub struct WorkHabitAnalyzer<'a> {
    store: &'a dyn TableStore,
    config: &'a DashboardConfig,
}

impl<'a> WorkHabitAnalyzer<'a> {
    pub fn new(store: &'a dyn TableStore, config: &'a DashboardConfig) -> Self {
        Self { store, config }
    }

    /// Appends one support-session observation per entry, stamped with `date`,
    /// then rewrites the table sorted by (Student, Date).
    ///
    /// Entries for students without a support block are skipped.
    pub fn record_daily_habits(
        &self,
        entries: &[DailyHabitEntry],
        date: NaiveDate,
    ) -> TrackerResult<SaveStatus> {
        let entries: Vec<&DailyHabitEntry> = entries.iter().filter(|e| !e.is_blank()).collect();
        if entries.is_empty() {
            info!("event=record_daily_habits status=no_valid_data");
            return Ok(SaveStatus::NoValidData);
        }

        let schedule: Vec<ScheduleEntry> = load_records(self.store)?;
        let marker = self.config.support_marker.as_str();

        let mut fresh = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let row = idx + 1;
            let student = entry.student.trim();
            if student.is_empty() {
                return Err(TrackerError::InvalidEntry {
                    row,
                    reason: "Student is required".to_string(),
                });
            }
            let habit = match entry.score {
                None => None,
                Some(score) => Some(HabitLevel::from_score(score).ok_or_else(|| {
                    TrackerError::InvalidEntry {
                        row,
                        reason: format!("work habit score {score} is outside 0-4"),
                    }
                })?),
            };
            let attendance = match entry.attendance.trim() {
                "" => None,
                code => Some(AttendanceStatus::from_code(code).ok_or_else(|| {
                    TrackerError::InvalidEntry {
                        row,
                        reason: format!("unknown attendance code '{code}'"),
                    }
                })?),
            };

            let Some(support) = schedule
                .iter()
                .find(|e| e.student == student && e.is_support(marker))
            else {
                warn!("event=record_daily_habits status=skipped student={student} reason=no_support_block");
                continue;
            };

            let focus = entry.focus.trim();
            fresh.push(AttendanceObservation {
                student: student.to_string(),
                date,
                course: support.course.clone(),
                block: support.block.clone(),
                teacher: support.teacher.clone(),
                attendance,
                habit,
                work: (!focus.is_empty()).then(|| focus.to_string()),
            });
        }

        if fresh.is_empty() {
            return Ok(SaveStatus::NoValidData);
        }

        let added = fresh.len();
        let mut observations: Vec<AttendanceObservation> = load_records(self.store)?;
        observations.extend(fresh);
        observations.sort_by(|a, b| a.student.cmp(&b.student).then_with(|| a.date.cmp(&b.date)));
        save_records(self.store, &observations)?;
        info!("event=record_daily_habits status=saved rows={added} date={date}");

        Ok(SaveStatus::Saved(format!(
            "Saved {added} work habit record(s) for {date}."
        )))
    }

    /// Compares the mean of the three most recent habit scores against the three
    /// before them.
    pub fn trend(&self, student: &str) -> TrackerResult<HabitTrend> {
        let mut scored: Vec<(NaiveDate, HabitLevel)> = self
            .support_sessions(student)?
            .into_iter()
            .filter_map(|obs| obs.habit.map(|habit| (obs.date, habit)))
            .collect();
        if scored.len() < MIN_TREND_OBSERVATIONS {
            debug!(
                "event=trend student={student} status=insufficient observations={}",
                scored.len()
            );
            return Ok(HabitTrend::InsufficientData);
        }

        // Newest first; on equal dates the later-stored row wins.
        scored.reverse();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let recent = mean_score(scored.iter().take(TREND_WINDOW).map(|(_, h)| *h));
        let previous = mean_score(
            scored
                .iter()
                .skip(TREND_WINDOW)
                .take(TREND_WINDOW)
                .map(|(_, h)| *h),
        );
        if previous.abs() <= EPSILON {
            return Err(TrackerError::DivideByZeroInTrend {
                student: student.to_string(),
            });
        }

        let percent_change = (recent - previous) / previous * 100.0;
        let average = round1(recent);
        if percent_change.abs() <= EPSILON {
            return Ok(HabitTrend::Consistent { average });
        }
        let direction = if percent_change > 0.0 {
            Direction::Increase
        } else {
            Direction::Decrease
        };
        Ok(HabitTrend::Change {
            magnitude: Magnitude::from_percent(percent_change),
            direction,
            average,
            percent_change,
        })
    }

    pub fn habit_timeline(&self, student: &str) -> TrackerResult<HabitTimeline> {
        let mut sessions = self.support_sessions(student)?;
        sessions.sort_by_key(|obs| obs.date);
        let mut timeline = HabitTimeline::default();
        for obs in sessions {
            match obs.habit {
                Some(habit) => timeline.points.push((obs.date, habit)),
                None => timeline.absent_dates.push(obs.date),
            }
        }
        Ok(timeline)
    }

    fn support_sessions(&self, student: &str) -> TrackerResult<Vec<AttendanceObservation>> {
        let marker = self.config.support_marker.as_str();
        let observations: Vec<AttendanceObservation> = load_records(self.store)?;
        Ok(observations
            .into_iter()
            .filter(|obs| obs.student == student && obs.is_support(marker))
            .collect())
    }
}

fn mean_score(levels: impl Iterator<Item = HabitLevel>) -> f64 {
    let (sum, count) = levels.fold((0u32, 0u32), |(sum, count), level| {
        (sum + u32::from(level.score()), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        f64::from(sum) / f64::from(count)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
