use crate::persistence::Table;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_SUPPORT_MARKER: &str = "Support";

/// File name of each table inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFiles {
    pub schedule: String,
    pub deadlines: String,
    pub student_tasks: String,
    pub attendance: String,
    pub notes: String,
}

impl Default for TableFiles {
    fn default() -> Self {
        Self {
            schedule: "student.csv".to_string(),
            deadlines: "deadlines.csv".to_string(),
            student_tasks: "student_tasks.csv".to_string(),
            attendance: "attendance_records.csv".to_string(),
            notes: "notes.csv".to_string(),
        }
    }
}

impl TableFiles {
    pub fn file_name(&self, table: Table) -> &str {
        match table {
            Table::Schedule => &self.schedule,
            Table::MasterDeadlines => &self.deadlines,
            Table::StudentTasks => &self.student_tasks,
            Table::AttendanceObservations => &self.attendance,
            Table::Notes => &self.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace.
    pub level: String,
    /// Directory for rotated log files. Empty disables file logging.
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    /// Substring of a Course name that marks a support session.
    pub support_marker: String,
    pub tables: TableFiles,
    pub logging: LoggingConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            support_marker: DEFAULT_SUPPORT_MARKER.to_string(),
            tables: TableFiles::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config io error: {err}"),
            ConfigError::Parse(err) => write!(f, "config parse error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl DashboardConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Loads a TOML file. A relative `data_dir` is resolved against the file's
    /// directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }
        Ok(config)
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
}
