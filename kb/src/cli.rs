//! CLI argument parsing for kfetboard

use chrono::Weekday;
use clap::{Parser, Subcommand, ValueEnum};
use planningstore::{PlanningResult, Shift, SlotKey, WeekKey};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kb")]
#[command(author, version, about = "Kfet shift planning board", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Any date inside the week to work on (default: today)
    #[arg(short, long, global = true, value_name = "DATE")]
    pub week: Option<WeekKey>,

    /// Weeks to move from the selected week (negative goes back)
    #[arg(
        long,
        global = true,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-520..=520),
        value_name = "N"
    )]
    pub offset: Option<i32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The week selected by `--week` and `--offset`
    pub fn target_week(&self) -> PlanningResult<WeekKey> {
        let base = self.week.unwrap_or_else(WeekKey::current);
        base.checked_shift(self.offset.unwrap_or(0))
    }
}

/// Weekday the board is open
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayArg {
    #[value(alias = "monday", alias = "lundi")]
    Mon,
    #[value(alias = "tuesday", alias = "mardi")]
    Tue,
    #[value(alias = "wednesday", alias = "mercredi")]
    Wed,
    #[value(alias = "thursday", alias = "jeudi")]
    Thu,
    #[value(alias = "friday", alias = "vendredi")]
    Fri,
}

impl From<DayArg> for Weekday {
    fn from(day: DayArg) -> Self {
        match day {
            DayArg::Mon => Weekday::Mon,
            DayArg::Tue => Weekday::Tue,
            DayArg::Wed => Weekday::Wed,
            DayArg::Thu => Weekday::Thu,
            DayArg::Fri => Weekday::Fri,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftArg {
    #[value(alias = "am", alias = "matin")]
    Morning,
    #[value(alias = "pm", alias = "apres-midi")]
    Afternoon,
}

impl From<ShiftArg> for Shift {
    fn from(shift: ShiftArg) -> Self {
        match shift {
            ShiftArg::Morning => Shift::Morning,
            ShiftArg::Afternoon => Shift::Afternoon,
        }
    }
}

/// A day and shift inside the selected week
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct SlotArgs {
    /// Day of the week
    #[arg(value_enum)]
    pub day: DayArg,

    /// Shift (morning or afternoon)
    #[arg(value_enum)]
    pub shift: ShiftArg,
}

impl SlotArgs {
    pub fn key(&self, week: WeekKey) -> PlanningResult<SlotKey> {
        SlotKey::in_week(week, self.day.into(), self.shift.into())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the planning grid for the week
    Show,

    /// Manage the member roster
    Member {
        #[command(subcommand)]
        command: MemberCommand,
    },

    /// Show, set or clear who you are
    Me {
        /// Name to use as the current user
        name: Option<String>,

        /// Forget the current user
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },

    /// Add yourself (or --name) to a slot
    Join {
        #[command(flatten)]
        slot: SlotArgs,

        /// Member to add instead of the current user
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove yourself (or --name) from a slot
    Leave {
        #[command(flatten)]
        slot: SlotArgs,

        /// Member to remove instead of the current user
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Flip a member's attendance in a slot
    Toggle {
        #[command(flatten)]
        slot: SlotArgs,

        /// Member name
        name: String,
    },

    /// Assign a chore to a member of the slot
    Assign {
        #[command(flatten)]
        slot: SlotArgs,

        /// Task name
        task: String,

        /// Member name
        name: String,
    },

    /// Clear a chore assignment
    Unassign {
        #[command(flatten)]
        slot: SlotArgs,

        /// Task name
        task: String,
    },

    /// Slot notes
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },

    /// Week-level notes
    WeekNote {
        #[command(subcommand)]
        command: WeekNoteCommand,
    },

    /// List every note of the week
    Notes,

    /// Week snapshots
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Attendance statistics over all weeks
    Stats,

    /// Stored weeks with their attendance
    Weeks,

    /// Export data
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },

    /// Replace roster and weeks from a JSON export
    Import {
        /// JSON file produced by `export json`
        file: PathBuf,

        /// Confirm replacing the current data
        #[arg(long)]
        yes: bool,
    },

    /// Delete planning data
    Reset {
        #[command(subcommand)]
        command: ResetCommand,
    },

    /// Storage location, stored sizes and counts
    Info,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Add a member
    Add { name: String },

    /// Remove a member from the roster (slot records stay)
    Remove { name: String },

    /// List members
    List,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Set or replace the note of a slot
    Set {
        #[command(flatten)]
        slot: SlotArgs,

        /// Note text
        text: String,

        /// Author (default: current user)
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Delete the note of a slot
    Delete {
        #[command(flatten)]
        slot: SlotArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeekNoteCommand {
    /// Add a week note
    Add {
        text: String,

        #[arg(short, long)]
        author: Option<String>,
    },

    /// Replace a week note
    Update {
        /// Note number as listed by `notes`
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,

        text: String,

        #[arg(short, long)]
        author: Option<String>,
    },

    /// Delete a week note
    Delete {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Snapshot the selected week
    Save,

    /// List snapshots, oldest first
    List,

    /// Restore a snapshot over its week
    Restore {
        /// Snapshot number as listed by `history list`
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,
    },

    /// Delete a snapshot
    Delete {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    /// Full JSON bundle
    Json {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// CSV table of the selected week
    Csv {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResetCommand {
    /// Clear the selected week
    Week {
        #[arg(long)]
        yes: bool,
    },

    /// Delete all members, weeks and history
    All {
        #[arg(long)]
        yes: bool,
    },
}

/// 1-based number from the command line to a 0-based index
pub fn index(number: u32) -> usize {
    (number as usize).saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_join_with_aliases() {
        let cli = Cli::try_parse_from(["kb", "--week", "2024-01-17", "join", "mardi", "pm"]).unwrap();
        let week = cli.target_week().unwrap();
        assert_eq!(week.to_string(), "2024-01-15");
        match cli.command {
            Some(Command::Join { slot, name }) => {
                assert_eq!(slot.day, DayArg::Tue);
                assert_eq!(slot.shift, ShiftArg::Afternoon);
                assert!(name.is_none());
                assert_eq!(slot.key(week).unwrap().to_string(), "2024-01-16_afternoon");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_negative_offset() {
        let cli = Cli::try_parse_from(["kb", "--week", "2024-01-15", "--offset", "-2", "show"]).unwrap();
        assert_eq!(cli.target_week().unwrap().to_string(), "2024-01-01");
    }

    #[test]
    fn test_week_range_is_checked() {
        assert!(Cli::try_parse_from(["kb", "--week", "+262142-12-31", "show"]).is_err());
        let cli = Cli::try_parse_from(["kb", "--week", "9999-12-31", "--offset", "1", "show"]).unwrap();
        assert!(cli.target_week().is_err());
        let cli = Cli::try_parse_from(["kb", "--week", "0001-01-03", "--offset", "-1", "show"]).unwrap();
        assert!(cli.target_week().is_err());
    }

    #[test]
    fn test_parse_info() {
        let cli = Cli::try_parse_from(["kb", "info"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Info)));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["kb", "--week", "not-a-date", "show"]).is_err());
        assert!(Cli::try_parse_from(["kb", "--offset", "9999", "show"]).is_err());
        assert!(Cli::try_parse_from(["kb", "join", "sat", "morning"]).is_err());
        assert!(Cli::try_parse_from(["kb", "history", "restore", "0"]).is_err());
    }

    #[test]
    fn test_index_is_one_based() {
        assert_eq!(index(1), 0);
        assert_eq!(index(3), 2);
    }
}
