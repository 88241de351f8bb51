//! Kfetboard - Kfet shift planning board
//!
//! CLI entry point: one store command per invocation.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use tracing::{debug, info, warn};

use kfetboard::cli::{
    Cli, Command, ExportCommand, HistoryCommand, MemberCommand, NoteCommand, ResetCommand, WeekNoteCommand, index,
};
use kfetboard::config::Config;
use kfetboard::render::{self, StorageInfo};
use planningstore::{
    FileStorage, HISTORY_KEY, PlanningError, PlanningStore, STATE_KEY, SlotKey, WeekKey, day_name, week_csv,
};

type Store = PlanningStore<FileStorage>;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kfetboard")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("kfetboard.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let week = cli.target_week().unwrap_or_else(|e| fail(&e));
    info!(storage = %config.storage.path.display(), %week, "kfetboard starting");

    let storage = FileStorage::open(&config.storage.path).context("Failed to open storage")?;
    let mut store = PlanningStore::open(storage, config.store_options())?;

    let command = cli.command.unwrap_or(Command::Show);
    debug!(?command, "main: dispatching command");
    if let Err(e) = dispatch(&mut store, week, command) {
        if let Some(err) = e.downcast_ref::<PlanningError>() {
            fail(err);
        }
        return Err(e);
    }
    Ok(())
}

/// One-line notification for a library error, then exit 1
fn fail(err: &PlanningError) -> ! {
    warn!(kind = %err.kind(), error = %err, "Command failed");
    eprintln!("{} {} ({})", "✗".red(), err, err.kind());
    std::process::exit(1);
}

fn slot_label(key: &SlotKey) -> String {
    format!("{} {} ({})", day_name(key.day()), key.shift(), key.date())
}

fn done(message: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), message);
}

fn notice(message: impl std::fmt::Display) {
    println!("{} {}", "!".yellow(), message);
}

fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).context(format!("Failed to write {}", path.display()))?;
            done(format!("Wrote {}", path.display()));
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn dispatch(store: &mut Store, week: WeekKey, command: Command) -> Result<()> {
    match command {
        Command::Show => print!("{}", render::week(&store.week_view(&week))),
        Command::Member { command } => cmd_member(store, command)?,
        Command::Me { name, clear } => cmd_me(store, name, clear)?,
        Command::Join { slot, name } => {
            let key = slot.key(week)?;
            let who = match name {
                Some(name) => store.add_member_to_slot(&key, &name)?,
                None => store.join_current_user(&key)?,
            };
            done(format!("{} joined {}", who.cyan(), slot_label(&key)));
        }
        Command::Leave { slot, name } => {
            let key = slot.key(week)?;
            let who = match name {
                Some(name) => name,
                None => store
                    .roster()
                    .current_user()
                    .map(str::to_string)
                    .ok_or(PlanningError::NoCurrentUser)?,
            };
            if store.remove_member_from_slot(&key, &who)? {
                done(format!("{} left {}", who.cyan(), slot_label(&key)));
            } else {
                notice(format!("{} is not in {}", who, slot_label(&key)));
            }
        }
        Command::Toggle { slot, name } => {
            let key = slot.key(week)?;
            match store.toggle_attendance(&key, &name)? {
                Some(true) => done(format!("{} marked present", name.cyan())),
                Some(false) => done(format!("{} marked absent", name.cyan())),
                None => notice(format!("{} is not in {}", name, slot_label(&key))),
            }
        }
        Command::Assign { slot, task, name } => {
            let key = slot.key(week)?;
            match store.assign_task(&key, &task, &name)? {
                Some(previous) => done(format!("{} reassigned from {} to {}", task, previous, name.cyan())),
                None => done(format!("{} assigned to {}", task, name.cyan())),
            }
        }
        Command::Unassign { slot, task } => {
            let key = slot.key(week)?;
            match store.unassign_task(&key, &task)? {
                Some(previous) => done(format!("{} unassigned from {}", task, previous)),
                None => notice(format!("{} was not assigned", task)),
            }
        }
        Command::Note { command } => cmd_note(store, week, command)?,
        Command::WeekNote { command } => cmd_week_note(store, week, command)?,
        Command::Notes => print!("{}", render::notes(&week.label(), &store.notes_feed(&week))),
        Command::History { command } => cmd_history(store, week, command)?,
        Command::Stats => print!("{}", render::stats(&store.overview(), &store.member_stats())),
        Command::Weeks => print!("{}", render::weeks(&store.week_summaries())),
        Command::Export { command } => match command {
            ExportCommand::Json { output } => write_output(output.as_ref(), &store.export_json()?)?,
            ExportCommand::Csv { output } => write_output(output.as_ref(), &week_csv(&store.week_view(&week)))?,
        },
        Command::Import { file, yes } => {
            if !yes {
                bail!("Import replaces all members and weeks; pass --yes to confirm");
            }
            let content = fs::read_to_string(&file).context(format!("Failed to read {}", file.display()))?;
            store.import_json(&content)?;
            done(format!(
                "Imported {} members and {} weeks",
                store.roster().len(),
                store.weeks().len()
            ));
        }
        Command::Reset { command } => cmd_reset(store, week, command)?,
        Command::Info => print!("{}", render::info(&storage_info(store)?)),
    }
    Ok(())
}

fn storage_info(store: &Store) -> Result<StorageInfo> {
    let storage = store.storage();
    let mut files = Vec::new();
    for key in [STATE_KEY, HISTORY_KEY] {
        let path = storage.path_of(key).map_err(PlanningError::from)?;
        files.push((path, storage.size_of(key).map_err(PlanningError::from)?));
    }
    Ok(StorageInfo {
        dir: storage.dir().to_path_buf(),
        files,
        members: store.roster().len(),
        weeks: store.weeks().len(),
        snapshots: store.history().len(),
    })
}

fn cmd_member(store: &mut Store, command: MemberCommand) -> Result<()> {
    match command {
        MemberCommand::Add { name } => {
            let name = store.add_member(&name)?;
            done(format!("Added {}", name.cyan()));
        }
        MemberCommand::Remove { name } => {
            let name = store.remove_member(&name)?;
            done(format!("Removed {} from the roster", name.cyan()));
        }
        MemberCommand::List => print!("{}", render::members(store.roster())),
    }
    Ok(())
}

fn cmd_me(store: &mut Store, name: Option<String>, clear: bool) -> Result<()> {
    if clear {
        match store.clear_current_user()? {
            Some(previous) => done(format!("Forgot {}", previous)),
            None => notice("No current user was set"),
        }
        return Ok(());
    }
    match name {
        Some(name) => {
            let name = store.set_current_user(&name)?;
            done(format!("You are now {}", name.cyan()));
        }
        None => match store.roster().current_user() {
            Some(me) => println!("{}", me),
            None => notice("No current user (kb me <name>)"),
        },
    }
    Ok(())
}

fn cmd_note(store: &mut Store, week: WeekKey, command: NoteCommand) -> Result<()> {
    match command {
        NoteCommand::Set { slot, text, author } => {
            let key = slot.key(week)?;
            store.set_slot_note(&key, &text, author.as_deref())?;
            done(format!("Note saved on {}", slot_label(&key)));
        }
        NoteCommand::Delete { slot } => {
            let key = slot.key(week)?;
            store.delete_slot_note(&key)?;
            done(format!("Note deleted from {}", slot_label(&key)));
        }
    }
    Ok(())
}

fn cmd_week_note(store: &mut Store, week: WeekKey, command: WeekNoteCommand) -> Result<()> {
    match command {
        WeekNoteCommand::Add { text, author } => {
            let n = store.add_week_note(&week, &text, author.as_deref())? + 1;
            done(format!("Added week note #{}", n));
        }
        WeekNoteCommand::Update { number, text, author } => {
            store.update_week_note(&week, index(number), &text, author.as_deref())?;
            done(format!("Updated week note #{}", number));
        }
        WeekNoteCommand::Delete { number } => {
            store.delete_week_note(&week, index(number))?;
            done(format!("Deleted week note #{}", number));
        }
    }
    Ok(())
}

fn cmd_history(store: &mut Store, week: WeekKey, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::Save => {
            let n = store.snapshot_week(&week)? + 1;
            done(format!("Saved snapshot #{} of {}", n, week.label()));
        }
        HistoryCommand::List => print!("{}", render::history(store.history())),
        HistoryCommand::Restore { number } => {
            let restored = store.restore_snapshot(index(number))?;
            done(format!("Restored {}", restored.label()));
        }
        HistoryCommand::Delete { number } => {
            let snapshot = store.delete_snapshot(index(number))?;
            done(format!("Deleted snapshot #{} of {}", number, snapshot.date.label()));
        }
    }
    Ok(())
}

fn cmd_reset(store: &mut Store, week: WeekKey, command: ResetCommand) -> Result<()> {
    match command {
        ResetCommand::Week { yes } => {
            if !yes {
                bail!("Reset clears every slot and note of {}; pass --yes to confirm", week.label());
            }
            if store.reset_week(&week)? {
                done(format!("Cleared {}", week.label()));
            } else {
                notice(format!("Nothing stored for {}", week.label()));
            }
        }
        ResetCommand::All { yes } => {
            if !yes {
                bail!("Reset deletes all members, weeks and history; pass --yes to confirm");
            }
            store.clear_all()?;
            done("All planning data deleted");
        }
    }
    Ok(())
}
