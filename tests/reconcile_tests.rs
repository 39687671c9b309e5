use chrono::NaiveDate;
use support_tracker::{
    DeadlineEntry, DeadlineReconciler, MasterDeadline, MemoryTableStore, SaveStatus, ScheduleEntry,
    StudentTask, TableRecord, TrackerError, load_records,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store_with_schedule(entries: &[ScheduleEntry]) -> MemoryTableStore {
    let rows = entries.iter().map(TableRecord::to_row).collect();
    MemoryTableStore::new()
        .with_rows(ScheduleEntry::TABLE, rows)
        .unwrap()
}

fn math_section() -> MemoryTableStore {
    store_with_schedule(&[
        ScheduleEntry::new("A", "1-1", "Math", "Smith"),
        ScheduleEntry::new("A", "1-3", "Support", "Jones"),
        ScheduleEntry::new("B", "1-2", "Science", "Lee"),
    ])
}

fn quiz1() -> DeadlineEntry {
    DeadlineEntry::new("Quiz1", "Math", "1-1", "Smith", "2024-05-01")
}

#[test]
fn deadline_fans_out_to_enrolled_students() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);

    let status = reconciler.submit_deadlines(&[quiz1()]).unwrap();
    assert!(status.is_saved());

    let tasks: Vec<StudentTask> = load_records(&store).unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.student, "A");
    assert_eq!(task.task, "Quiz1");
    assert_eq!(task.due, d(2024, 5, 1));
    assert!(!task.completed);
    assert!(!task.hidden);
}

#[test]
fn reconcile_is_idempotent() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler.submit_deadlines(&[quiz1()]).unwrap();

    assert_eq!(reconciler.reconcile_student_tasks().unwrap(), 0);
    assert_eq!(reconciler.reconcile_student_tasks().unwrap(), 0);
    let tasks: Vec<StudentTask> = load_records(&store).unwrap();
    assert_eq!(tasks.len(), 1);
}

#[test]
fn reconcile_keeps_user_state_on_existing_rows() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler.submit_deadlines(&[quiz1()]).unwrap();

    let mut tasks: Vec<StudentTask> = load_records(&store).unwrap();
    tasks[0].hidden = true;
    support_tracker::save_records(&store, &tasks).unwrap();

    assert_eq!(reconciler.reconcile_student_tasks().unwrap(), 0);
    let tasks: Vec<StudentTask> = load_records(&store).unwrap();
    assert!(tasks[0].hidden);
}

#[test]
fn same_task_with_new_due_date_is_a_new_deadline() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler.submit_deadlines(&[quiz1()]).unwrap();
    reconciler
        .submit_deadlines(&[DeadlineEntry::new("Quiz1", "Math", "1-1", "Smith", "2024-05-08")])
        .unwrap();

    let tasks: Vec<StudentTask> = load_records(&store).unwrap();
    let mut dues: Vec<NaiveDate> = tasks.iter().map(|t| t.due).collect();
    dues.sort();
    assert_eq!(dues, vec![d(2024, 5, 1), d(2024, 5, 8)]);
}

#[test]
fn duplicate_submission_is_skipped() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler.submit_deadlines(&[quiz1(), quiz1()]).unwrap();
    reconciler.submit_deadlines(&[quiz1()]).unwrap();

    let deadlines: Vec<MasterDeadline> = load_records(&store).unwrap();
    assert_eq!(deadlines.len(), 1);
    let tasks: Vec<StudentTask> = load_records(&store).unwrap();
    assert_eq!(tasks.len(), 1);
}

#[test]
fn blank_rows_only_is_no_valid_data() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    let blank = DeadlineEntry::new(" ", "", "", "", "");

    let status = reconciler.submit_deadlines(&[blank]).unwrap();
    assert_eq!(status, SaveStatus::NoValidData);
    assert_eq!(status.message(), "No valid data to save.");
    assert_eq!(store.row_count(MasterDeadline::TABLE), 0);
}

#[test]
fn partial_row_rejects_the_whole_batch() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    let partial = DeadlineEntry::new("Lab", "Science", "", "Lee", "2024-05-02");

    let err = reconciler.submit_deadlines(&[quiz1(), partial]).unwrap_err();
    match err {
        TrackerError::InvalidEntry { row, reason } => {
            assert_eq!(row, 2);
            assert!(reason.contains("Block"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.row_count(MasterDeadline::TABLE), 0);
    assert_eq!(store.row_count(StudentTask::TABLE), 0);
}

#[test]
fn unparseable_due_is_invalid() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    let bad = DeadlineEntry::new("Quiz1", "Math", "1-1", "Smith", "next friday");
    assert!(matches!(
        reconciler.submit_deadlines(&[bad]),
        Err(TrackerError::InvalidEntry { row: 1, .. })
    ));
}

#[test]
fn deadlines_are_sorted_by_due_then_teacher() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler
        .submit_deadlines(&[
            DeadlineEntry::new("Essay", "Math", "1-1", "Smith", "2024-06-01"),
            DeadlineEntry::new("Lab", "Science", "1-2", "Lee", "2024-05-01"),
            DeadlineEntry::new("Quiz1", "Math", "1-1", "Smith", "2024-05-01").with_grade("10"),
        ])
        .unwrap();

    let deadlines: Vec<MasterDeadline> = load_records(&store).unwrap();
    let order: Vec<&str> = deadlines.iter().map(|d| d.task.as_str()).collect();
    assert_eq!(order, vec!["Lab", "Quiz1", "Essay"]);
    assert_eq!(deadlines[1].grade.as_deref(), Some("10"));

    let tasks: Vec<StudentTask> = load_records(&store).unwrap();
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().any(|t| t.student == "B" && t.task == "Lab"));
}

#[test]
fn deadline_for_unknown_section_creates_no_tasks() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler
        .submit_deadlines(&[DeadlineEntry::new("Quiz1", "Math", "2-1", "Smith", "2024-05-01")])
        .unwrap();
    assert_eq!(store.row_count(MasterDeadline::TABLE), 1);
    assert_eq!(store.row_count(StudentTask::TABLE), 0);
}

#[test]
fn newly_enrolled_student_is_picked_up() {
    let store = math_section();
    let reconciler = DeadlineReconciler::new(&store);
    reconciler.submit_deadlines(&[quiz1()]).unwrap();

    let mut schedule: Vec<ScheduleEntry> = load_records(&store).unwrap();
    schedule.push(ScheduleEntry::new("C", "1-1", "Math", "Smith"));
    support_tracker::save_records(&store, &schedule).unwrap();

    assert_eq!(reconciler.reconcile_student_tasks().unwrap(), 1);
}
