use crate::attendance::AttendanceAggregator;
use crate::config::DashboardConfig;
use crate::habits::WorkHabitAnalyzer;
use crate::notes::NoteStore;
use crate::persistence::{CsvTableStore, TableStore};
use crate::reconcile::DeadlineReconciler;
use crate::roster::Roster;
use crate::tracker::TaskStateTracker;

/// Entry point for callers: owns the store and hands out the components that
/// operate on it.
pub struct Dashboard {
    store: Box<dyn TableStore>,
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(store: impl TableStore + 'static, config: DashboardConfig) -> Self {
        Self {
            store: Box::new(store),
            config,
        }
    }

    /// CSV files under `config.data_dir`.
    pub fn open_csv(config: DashboardConfig) -> Self {
        let store = CsvTableStore::with_files(&config.data_dir, config.tables.clone());
        Self::new(store, config)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    pub fn roster(&self) -> Roster<'_> {
        Roster::new(self.store())
    }

    pub fn reconciler(&self) -> DeadlineReconciler<'_> {
        DeadlineReconciler::new(self.store())
    }

    pub fn tasks(&self) -> TaskStateTracker<'_> {
        TaskStateTracker::new(self.store())
    }

    pub fn attendance(&self) -> AttendanceAggregator<'_> {
        AttendanceAggregator::new(self.store())
    }

    pub fn habits(&self) -> WorkHabitAnalyzer<'_> {
        WorkHabitAnalyzer::new(self.store(), &self.config)
    }

    pub fn notes(&self) -> NoteStore<'_> {
        NoteStore::new(self.store())
    }
}
