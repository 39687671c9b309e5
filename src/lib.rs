pub mod attendance;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod habits;
pub mod logging;
pub mod notes;
pub mod persistence;
pub mod reconcile;
pub mod records;
pub mod roster;
pub mod tracker;

pub use attendance::{AttendanceAggregator, AttendanceCounts, BreakdownRow};
pub use config::{ConfigError, DashboardConfig, LoggingConfig, TableFiles};
pub use dashboard::Dashboard;
pub use error::{SaveStatus, TrackerError, TrackerResult};
pub use habits::{DailyHabitEntry, HabitTimeline, HabitTrend, WorkHabitAnalyzer};
pub use notes::NoteStore;
#[cfg(feature = "sqlite")]
pub use persistence::SqliteTableStore;
pub use persistence::{
    CsvTableStore, MemoryTableStore, Row, StoreError, Table, TableStore, append_records,
    load_records, save_records,
};
pub use reconcile::{DeadlineEntry, DeadlineReconciler};
pub use records::{
    AttendanceObservation, AttendanceStatus, DeadlineKey, HabitLevel, MasterDeadline, Note,
    ScheduleEntry, StudentTask, TableRecord,
};
pub use roster::Roster;
pub use tracker::{TaskStateTracker, TaskView, VisibleTasks};
