//! Plain-text rendering of planning views
//!
//! Every function is a pure full refresh: it takes a read view and returns the
//! text to print.

use colored::*;
use planningstore::{
    History, MemberStats, Note, NoteEntry, NoteSource, Overview, Roster, SlotView, WeekSummary, WeekView, day_name,
};
use std::fmt::Write;
use std::path::PathBuf;

fn note_line(note: &Note) -> String {
    let mut line = note.summary();
    if let Some(time) = note.time {
        line.push_str(&format!(" ({})", time.format("%Y-%m-%d %H:%M")).dimmed().to_string());
    }
    line
}

fn slot_block(out: &mut String, slot: &SlotView) {
    let counter = format!("{}/{}", slot.present, slot.total());
    let _ = writeln!(
        out,
        "  {} {} {}",
        format!("{:<10}", slot.shift().to_string()).bold(),
        slot.shift().hours().dimmed(),
        counter.cyan()
    );

    if slot.members.is_empty() {
        let _ = writeln!(out, "    {}", "nobody yet".dimmed());
    }
    for member in &slot.members {
        let mark = if member.present { "✓".green() } else { "✗".red() };
        let _ = writeln!(out, "    {} {}", mark, member.name);
    }
    for task in &slot.tasks {
        let who = match &task.assignee {
            Some(name) => name.yellow().to_string(),
            None => "-".dimmed().to_string(),
        };
        let _ = writeln!(out, "    {} {}: {}", "•".blue(), task.name, who);
    }
    if let Some(note) = &slot.note {
        let _ = writeln!(out, "    {} {}", "note:".magenta(), note_line(note));
    }
    if !slot.candidates.is_empty() {
        let _ = writeln!(out, "    {} {}", "+".dimmed(), slot.candidates.join(", ").dimmed());
    }
}

/// The week grid
pub fn week(view: &WeekView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.label.bold());
    match &view.current_user {
        Some(me) => {
            let _ = writeln!(out, "You are {}", me.cyan());
        }
        None => {
            let _ = writeln!(out, "{}", "No current user (kb me <name>)".dimmed());
        }
    }

    for day in &view.days {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {}",
            day_name(day.day).bold().underline(),
            day.date.format("%d/%m").to_string().dimmed()
        );
        for slot in &day.slots {
            slot_block(&mut out, slot);
        }
    }

    if !view.notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Week notes".bold());
        for (n, note) in view.notes.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", n + 1, note_line(note));
        }
    }
    out
}

pub fn members(roster: &Roster) -> String {
    if roster.is_empty() {
        return format!("{}\n", "No members".dimmed());
    }
    let mut out = String::new();
    for name in roster.names() {
        if roster.current_user() == Some(name.as_str()) {
            let _ = writeln!(out, "{} {}", name, "(you)".cyan());
        } else {
            let _ = writeln!(out, "{}", name);
        }
    }
    out
}

/// Week notes numbered from 1, then slot notes
pub fn notes(label: &str, feed: &[NoteEntry]) -> String {
    let mut out = format!("{}\n", label.bold());
    if feed.is_empty() {
        let _ = writeln!(out, "{}", "No notes".dimmed());
        return out;
    }
    for entry in feed {
        let place = match entry.source {
            NoteSource::Week { index } => format!("week #{}", index + 1),
            NoteSource::Slot(key) => format!("{} {}", day_name(key.day()), key.shift()),
        };
        let _ = writeln!(out, "[{}] {}", place.yellow(), note_line(&entry.note));
    }
    out
}

pub fn history(history: &History) -> String {
    if history.is_empty() {
        return format!("{}\n", "No snapshots".dimmed());
    }
    let mut out = String::new();
    for (n, snapshot) in history.iter().enumerate() {
        let (present, total) = snapshot.data.slots.values().fold((0, 0), |(p, t), s| {
            (p + s.present_count(), t + s.members.len())
        });
        let _ = writeln!(
            out,
            "{:>3}. {}  saved {}  {}",
            n + 1,
            snapshot.date.label(),
            snapshot.saved_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            format!("{}/{}", present, total).cyan()
        );
    }
    out
}

pub fn stats(overview: &Overview, members: &[MemberStats]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Attendance {} ({}%)",
        format!("{}/{}", overview.present, overview.records).cyan(),
        overview.presence_rate()
    );
    let _ = writeln!(
        out,
        "Tasks assigned {} ({}%)",
        format!("{}/{}", overview.assigned_tasks, overview.offered_tasks).cyan(),
        overview.task_rate()
    );
    let _ = writeln!(out);
    for member in members.iter().filter(|m| m.total > 0) {
        let _ = writeln!(
            out,
            "{:<20} {:>3}/{:<3} {:>3}%  absent {}",
            member.name,
            member.present,
            member.total,
            member.rate(),
            member.absent
        );
    }
    if members.iter().all(|m| m.total == 0) {
        let _ = writeln!(out, "{}", "No attendance recorded".dimmed());
    }
    out
}

pub fn weeks(summaries: &[WeekSummary]) -> String {
    if summaries.is_empty() {
        return format!("{}\n", "No stored weeks".dimmed());
    }
    let mut out = String::new();
    for summary in summaries {
        let _ = writeln!(
            out,
            "{}  {}  {} {}%  notes {}",
            summary.week,
            summary.label,
            format!("{}/{}", summary.present, summary.total).cyan(),
            summary.rate(),
            summary.notes
        );
    }
    out
}

/// What `info` reports about the storage directory
#[derive(Debug, Clone)]
pub struct StorageInfo {
    pub dir: PathBuf,
    /// Each stored file with its size, `None` when not written yet
    pub files: Vec<(PathBuf, Option<u64>)>,
    pub members: usize,
    pub weeks: usize,
    pub snapshots: usize,
}

pub fn info(info: &StorageInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Storage".bold(), info.dir.display());
    for (path, size) in &info.files {
        let size = match size {
            Some(bytes) => format!("{} bytes", bytes).cyan().to_string(),
            None => "not written yet".dimmed().to_string(),
        };
        let _ = writeln!(out, "  {}  {}", path.display(), size);
    }
    let _ = writeln!(
        out,
        "Members {}  weeks {}  snapshots {}",
        info.members, info.weeks, info.snapshots
    );
    out
}
