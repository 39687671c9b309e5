use std::io::{self, Write};
use chrono::NaiveDate;
use support_tracker::{
    AttendanceStatus, DailyHabitEntry, Dashboard, DashboardConfig, DeadlineEntry, DeadlineKey,
    TrackerResult, logging,
};

const CONFIG_ENV: &str = "SUPPORT_TRACKER_CONFIG";

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(ci) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&render_row(&widths, &cells));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn render_row(widths: &[usize], cells: &[&str]) -> String {
    let mut line = String::from("|");
    for (width, cell) in widths.iter().zip(cells) {
        let pad = width.saturating_sub(cell.chars().count());
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  students                           List students\n  schedule <student>                 Show a student's schedule\n  deadline <task>|<course>|<block>|<teacher>|<YYYY-MM-DD>[|<grade>]\n                                     Submit a master deadline\n  reconcile                          Create missing student tasks\n  tasks    <student>                 Show visible tasks (* = completed)\n  hide     <student> <pos,...>       Hide tasks at the listed positions\n  complete <student> [pos,...]       Mark exactly these positions completed\n  attendance <student> [overall]     Attendance breakdown\n  habit <YYYY-MM-DD> <student> <score|-> <P|L|A|AE|-> [focus...]\n                                     Record a support-session observation\n  trend    <student>                 Work-habit trend\n  timeline <student>                 Work-habit timeline\n  note     <student> [text...]       Show or replace the student's note\n  quit|exit                          Exit"
    );
}

fn parse_positions(s: &str) -> Option<Vec<usize>> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<usize>().ok())
        .collect()
}

fn load_config() -> DashboardConfig {
    let mut args = std::env::args().skip(1);
    let mut path = std::env::var(CONFIG_ENV).ok();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            path = args.next();
        }
    }
    match path {
        Some(path) => match DashboardConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Could not read config {path}: {e}; using defaults");
                DashboardConfig::default()
            }
        },
        None => DashboardConfig::default(),
    }
}

fn visible_keys(dashboard: &Dashboard, student: &str) -> TrackerResult<Vec<DeadlineKey>> {
    Ok(dashboard
        .tasks()
        .list_visible_tasks(student)?
        .rows
        .iter()
        .map(|row| row.key())
        .collect())
}

fn show_tasks(dashboard: &Dashboard, student: &str) -> TrackerResult<String> {
    let visible = dashboard.tasks().list_visible_tasks(student)?;
    let rows: Vec<Vec<String>> = visible
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            vec![
                idx.to_string(),
                if visible.completed.contains(&idx) { "*".into() } else { String::new() },
                row.task.clone(),
                row.course.clone(),
                row.block.clone(),
                row.teacher.clone(),
                row.grade.clone().unwrap_or_default(),
                row.due_display.clone(),
            ]
        })
        .collect();
    Ok(render_table(
        &["#", "Done", "Task", "Course", "Block", "Teacher", "Grade", "Due"],
        &rows,
    ))
}

fn run(dashboard: &Dashboard, cmd: &str, rest: &str) -> TrackerResult<String> {
    let mut parts = rest.split_whitespace();
    match cmd {
        "students" => Ok(dashboard.roster().student_list()?.join("\n")),
        "schedule" => {
            let Some(student) = parts.next() else { return Ok("Usage: schedule <student>".into()) };
            let rows: Vec<Vec<String>> = dashboard
                .roster()
                .student_schedule(student)?
                .into_iter()
                .map(|e| vec![e.block, e.course, e.teacher])
                .collect();
            Ok(render_table(&["Block", "Course", "Teacher"], &rows))
        }
        "deadline" => {
            let fields: Vec<&str> = rest.split('|').collect();
            if fields.len() < 5 {
                return Ok("Usage: deadline <task>|<course>|<block>|<teacher>|<YYYY-MM-DD>[|<grade>]".into());
            }
            let mut entry = DeadlineEntry::new(fields[0], fields[1], fields[2], fields[3], fields[4]);
            if let Some(grade) = fields.get(5) {
                entry = entry.with_grade(*grade);
            }
            Ok(dashboard.reconciler().submit_deadlines(&[entry])?.to_string())
        }
        "reconcile" => {
            let inserted = dashboard.reconciler().reconcile_student_tasks()?;
            Ok(format!("Added {inserted} student task(s)."))
        }
        "tasks" => {
            let Some(student) = parts.next() else { return Ok("Usage: tasks <student>".into()) };
            show_tasks(dashboard, student)
        }
        "hide" | "complete" => {
            let Some(student) = parts.next() else { return Ok(format!("Usage: {cmd} <student> <pos,...>")) };
            let Some(positions) = parse_positions(parts.next().unwrap_or("")) else {
                return Ok("Positions must be numbers, e.g. 0,2".into());
            };
            let keys = visible_keys(dashboard, student)?;
            if cmd == "hide" {
                let remaining: Vec<DeadlineKey> = keys
                    .into_iter()
                    .enumerate()
                    .filter(|(idx, _)| !positions.contains(idx))
                    .map(|(_, key)| key)
                    .collect();
                let hidden = dashboard.tasks().apply_deletions(&remaining, student)?;
                Ok(format!("Hid {hidden} task(s).\n{}", show_tasks(dashboard, student)?))
            } else {
                let selected: Vec<DeadlineKey> = positions
                    .iter()
                    .filter_map(|idx| keys.get(*idx).cloned())
                    .collect();
                let done = dashboard.tasks().apply_completions(&selected, student)?;
                Ok(format!("{done} task(s) completed.\n{}", show_tasks(dashboard, student)?))
            }
        }
        "attendance" => {
            let student = parts.next();
            let overall = parts.next() == Some("overall");
            let rows: Vec<Vec<String>> = dashboard
                .attendance()
                .attendance_breakdown(student, overall)?
                .into_iter()
                .map(|row| {
                    let mut cells = vec![row.label.clone()];
                    for (status, count) in row.counts.entries() {
                        cells.push(format!("{count} ({:.2}%)", row.percent(status)));
                    }
                    cells
                })
                .collect();
            let labels: Vec<&str> = AttendanceStatus::ALL.iter().map(|s| s.label()).collect();
            let mut headers = vec!["Course"];
            headers.extend(labels);
            Ok(render_table(&headers, &rows))
        }
        "habit" => {
            let (Some(date_s), Some(student), Some(score_s), Some(code)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Ok("Usage: habit <YYYY-MM-DD> <student> <score|-> <P|L|A|AE|-> [focus...]".into());
            };
            let date = match NaiveDate::parse_from_str(date_s, "%Y-%m-%d") { Ok(d) => d, Err(_) => return Ok("Invalid date (YYYY-MM-DD)".into()) };
            let score = match score_s { "-" => None, s => match s.parse::<u8>() { Ok(v) => Some(v), Err(_) => return Ok("Invalid score (0-4 or -)".into()) } };
            let code = if code == "-" { "" } else { code };
            let focus = parts.collect::<Vec<_>>().join(" ");
            let entry = DailyHabitEntry::new(student, score, focus, code);
            Ok(dashboard.habits().record_daily_habits(&[entry], date)?.to_string())
        }
        "trend" => {
            let Some(student) = parts.next() else { return Ok("Usage: trend <student>".into()) };
            let (message, average, icon) = dashboard.habits().trend(student)?.display();
            Ok(format!("{icon} {message} (recent average {average})"))
        }
        "timeline" => {
            let Some(student) = parts.next() else { return Ok("Usage: timeline <student>".into()) };
            let timeline = dashboard.habits().habit_timeline(student)?;
            let mut rows: Vec<(NaiveDate, String)> = timeline
                .points
                .iter()
                .map(|(date, habit)| (*date, habit.label().to_string()))
                .collect();
            rows.extend(timeline.absent_dates.iter().map(|date| (*date, "Absent".to_string())));
            rows.sort_by_key(|(date, _)| *date);
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|(date, label)| vec![date.format("%b-%d").to_string(), label])
                .collect();
            Ok(render_table(&["Date", "Habit"], &rows))
        }
        "note" => {
            let Some(student) = parts.next() else { return Ok("Usage: note <student> [text...]".into()) };
            let text = parts.collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                let note = dashboard.notes().get_note(student)?;
                Ok(note.unwrap_or_else(|| "(no note)".into()))
            } else {
                dashboard.notes().save_note(student, &text)?;
                Ok("Note saved.".into())
            }
        }
        _ => Ok("Unknown command. Type 'help'.".into()),
    }
}

fn main() {
    let config = load_config();
    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Logging disabled: {e}");
    }
    let dashboard = Dashboard::open_csv(config);

    println!(
        "Support Tracker (CLI) - data in {} - type 'help' for commands\n",
        dashboard.config().data_dir.display()
    );

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() { continue; }

        let (cmd, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            _ => match run(&dashboard, cmd, rest.trim()) {
                Ok(output) => println!("{output}"),
                Err(e) => println!("Error: {e}"),
            },
        }
    }
}
