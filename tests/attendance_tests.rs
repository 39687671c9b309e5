use chrono::NaiveDate;
use support_tracker::{
    AttendanceAggregator, AttendanceCounts, AttendanceObservation, AttendanceStatus, BreakdownRow,
    MemoryTableStore, save_records,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn obs(student: &str, day: u32, course: &str, code: Option<&str>) -> AttendanceObservation {
    AttendanceObservation {
        student: student.to_string(),
        date: d(2024, 4, day),
        course: course.to_string(),
        block: "1-1".to_string(),
        teacher: "Smith".to_string(),
        attendance: code.and_then(AttendanceStatus::from_code),
        habit: None,
        work: None,
    }
}

fn seeded_store() -> MemoryTableStore {
    let store = MemoryTableStore::new();
    save_records(
        &store,
        &[
            obs("A", 1, "Math", Some("P")),
            obs("A", 2, "Math", Some("L")),
            obs("A", 3, "Math", Some("P")),
            obs("A", 1, "Science", Some("A")),
            obs("A", 2, "Science", Some("AE")),
            obs("A", 3, "Support", Some("P")),
            obs("A", 4, "Support", None),
            obs("B", 1, "Math", Some("A")),
        ],
    )
    .unwrap();
    store
}

#[test]
fn counts_cover_every_status() {
    let store = seeded_store();
    let aggregator = AttendanceAggregator::new(&store);
    let counts = aggregator.attendance_counts("A").unwrap();
    assert_eq!(
        counts,
        AttendanceCounts {
            present: 3,
            late: 1,
            absent: 1,
            excused: 1,
        }
    );
    assert_eq!(counts.total(), 6);
}

#[test]
fn unknown_student_has_all_zero_counts() {
    let store = seeded_store();
    let aggregator = AttendanceAggregator::new(&store);
    let counts = aggregator.attendance_counts("Nobody").unwrap();
    assert_eq!(counts, AttendanceCounts::default());
    assert_eq!(counts.entries().len(), 4);
}

#[test]
fn overall_breakdown_percentages_sum_to_hundred() {
    let store = seeded_store();
    let aggregator = AttendanceAggregator::new(&store);
    let rows = aggregator.attendance_breakdown(Some("A"), true).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].label, "Overall");
    assert_eq!(rows[0].percent(AttendanceStatus::Present), 50.0);
    let sum: f64 = rows[0].percentages.iter().sum();
    assert!((sum - 100.0).abs() <= 0.1, "{sum}");
}

#[test]
fn per_course_rows_are_in_reverse_course_order() {
    let store = seeded_store();
    let aggregator = AttendanceAggregator::new(&store);
    let rows = aggregator.attendance_breakdown(Some("A"), false).unwrap();
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Support", "Science", "Math"]);

    let math = &rows[2];
    assert_eq!(math.counts.present, 2);
    assert_eq!(math.counts.late, 1);
    assert_eq!(math.percent(AttendanceStatus::Present), 66.67);
    assert_eq!(math.percent(AttendanceStatus::Absent), 0.0);

    let total: u32 = rows.iter().map(|r| r.counts.total()).sum();
    assert_eq!(total, aggregator.attendance_counts("A").unwrap().total());
}

#[test]
fn no_student_gives_placeholder_row() {
    let store = seeded_store();
    let aggregator = AttendanceAggregator::new(&store);
    assert_eq!(
        aggregator.attendance_breakdown(None, false).unwrap(),
        vec![BreakdownRow::placeholder()]
    );
    assert_eq!(
        aggregator.attendance_breakdown(Some(""), true).unwrap(),
        vec![BreakdownRow::placeholder()]
    );
}

#[test]
fn overall_for_student_without_observations_is_all_zero() {
    let store = seeded_store();
    let aggregator = AttendanceAggregator::new(&store);
    let rows = aggregator.attendance_breakdown(Some("Nobody"), true).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].label, "Overall");
    assert_eq!(rows[0].counts, AttendanceCounts::default());
    assert_eq!(rows[0].percentages, [0.0; 4]);
}
