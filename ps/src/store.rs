//! PlanningStore: the planning state plus its write-through persistence
//!
//! Every command validates its input before touching state, mutates in place,
//! then writes the whole state back through the [`KeyValueStore`]. When that
//! write fails the command returns [`PlanningError::Persistence`] but the
//! in-memory change stays applied; nothing reconciles the two afterwards.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::document::{PlanningState, Preferences, Week};
use crate::error::{PersistenceError, PlanningError, PlanningResult};
use crate::history::{DEFAULT_HISTORY_CAPACITY, History, Snapshot};
use crate::note::Note;
use crate::persistence::KeyValueStore;
use crate::roster::{NamePolicy, Roster};
use crate::slot::{Slot, SlotKey, TaskCatalog};
use crate::week::WeekKey;

/// Storage key of the planning state
pub const STATE_KEY: &str = "kfet";

/// Storage key of the snapshot history
pub const HISTORY_KEY: &str = "kfet_history";

/// Tunables for a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub names: NamePolicy,
    pub history_capacity: usize,
    pub tasks: TaskCatalog,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            names: NamePolicy::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            tasks: TaskCatalog::default(),
        }
    }
}

/// Roster, weeks and history behind one persistence port
pub struct PlanningStore<S: KeyValueStore> {
    storage: S,
    options: StoreOptions,
    state: PlanningState,
    history: History,
}

impl<S: KeyValueStore> PlanningStore<S> {
    /// Load state from `storage`, starting empty when nothing is stored
    ///
    /// A stored value that cannot be decoded is logged and replaced by an
    /// empty state in memory; storage is only overwritten by the next command.
    pub fn open(storage: S, options: StoreOptions) -> PlanningResult<Self> {
        let state = match storage.get(STATE_KEY)? {
            Some(json) => PlanningState::decode(&json, &options.names).unwrap_or_else(|e| {
                warn!(error = %e, "Stored planning state is unreadable, starting empty");
                PlanningState::default()
            }),
            None => {
                info!("No stored planning state, starting empty");
                PlanningState::default()
            }
        };

        let history = match storage.get(HISTORY_KEY)? {
            Some(json) => match serde_json::from_str::<Vec<Snapshot>>(&json) {
                Ok(entries) => History::from_entries(entries, options.history_capacity),
                Err(source) => {
                    let e = PersistenceError::Decode {
                        key: HISTORY_KEY.to_string(),
                        source,
                    };
                    warn!(error = %e, "Stored history is unreadable, starting empty");
                    History::new(options.history_capacity)
                }
            },
            None => History::new(options.history_capacity),
        };

        debug!(
            members = state.roster.len(),
            weeks = state.weeks.len(),
            snapshots = history.len(),
            "PlanningStore::open: loaded"
        );
        Ok(Self {
            storage,
            options,
            state,
            history,
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn roster(&self) -> &Roster {
        &self.state.roster
    }

    pub fn preferences(&self) -> &Preferences {
        &self.state.preferences
    }

    pub fn weeks(&self) -> &BTreeMap<WeekKey, Week> {
        &self.state.weeks
    }

    pub fn week(&self, week: &WeekKey) -> Option<&Week> {
        self.state.weeks.get(week)
    }

    pub fn slot(&self, key: &SlotKey) -> Option<&Slot> {
        self.state.weeks.get(&key.week()).and_then(|w| w.slots.get(key))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // ---------------------------------------------------------------------
    // Roster
    // ---------------------------------------------------------------------

    /// Add a member to the roster
    pub fn add_member(&mut self, name: &str) -> PlanningResult<String> {
        debug!(%name, "add_member: called");
        let name = self.state.roster.add(name, &self.options.names)?;
        info!(%name, "Member added");
        self.persist_state()?;
        Ok(name)
    }

    /// Remove a member from the roster; slot records keep their entries
    pub fn remove_member(&mut self, name: &str) -> PlanningResult<String> {
        debug!(%name, "remove_member: called");
        let removed = self.state.roster.remove(name, &self.options.names)?;
        info!(name = %removed, "Member removed from roster");
        self.persist_state()?;
        Ok(removed)
    }

    /// Set who "me" is; adds them to the roster when missing
    pub fn set_current_user(&mut self, name: &str) -> PlanningResult<String> {
        debug!(%name, "set_current_user: called");
        let name = self.state.roster.set_current_user(name, &self.options.names)?;
        info!(%name, "Current user set");
        self.persist_state()?;
        Ok(name)
    }

    pub fn clear_current_user(&mut self) -> PlanningResult<Option<String>> {
        let previous = self.state.roster.clear_current_user();
        if previous.is_some() {
            self.persist_state()?;
        }
        Ok(previous)
    }

    // ---------------------------------------------------------------------
    // Slots
    // ---------------------------------------------------------------------

    /// The slot at `key`, created empty on first access
    ///
    /// Empty slots are never written to storage, so this does not persist.
    pub fn ensure_slot(&mut self, key: &SlotKey) -> &Slot {
        self.slot_entry(key)
    }

    /// Flip attendance of `name` in the slot
    ///
    /// Returns the new attendance, or `None` without touching anything when
    /// the member is not in the slot.
    pub fn toggle_attendance(&mut self, key: &SlotKey, name: &str) -> PlanningResult<Option<bool>> {
        debug!(%key, %name, "toggle_attendance: called");
        let policy = self.options.names.clone();
        let Some(slot) = self.slot_mut_existing(key) else {
            debug!(%key, "toggle_attendance: no such slot, ignoring");
            return Ok(None);
        };
        let Some(present) = slot.toggle(name.trim(), &policy) else {
            debug!(%key, %name, "toggle_attendance: member not in slot, ignoring");
            return Ok(None);
        };
        self.persist_state()?;
        Ok(Some(present))
    }

    /// Add `name` to the slot as present
    pub fn add_member_to_slot(&mut self, key: &SlotKey, name: &str) -> PlanningResult<String> {
        debug!(%key, %name, "add_member_to_slot: called");
        let policy = self.options.names.clone();
        let name = policy.validate(name)?;
        if self.slot(key).is_some_and(|s| s.has_member(&name, &policy)) {
            return Err(PlanningError::AlreadyPresent(name));
        }
        self.slot_entry(key).add_member(&name, &policy)?;
        info!(%key, %name, "Member added to slot");
        self.persist_state()?;
        Ok(name)
    }

    /// Add the current user to the slot
    pub fn join_current_user(&mut self, key: &SlotKey) -> PlanningResult<String> {
        let me = self
            .state
            .roster
            .current_user()
            .map(str::to_string)
            .ok_or(PlanningError::NoCurrentUser)?;
        self.add_member_to_slot(key, &me)
    }

    /// Remove `name` from the slot along with any task assigned to them
    ///
    /// Returns false without touching anything when the member is absent.
    pub fn remove_member_from_slot(&mut self, key: &SlotKey, name: &str) -> PlanningResult<bool> {
        debug!(%key, %name, "remove_member_from_slot: called");
        let policy = self.options.names.clone();
        let removed = match self.slot_mut_existing(key) {
            Some(slot) => slot.remove_member(name.trim(), &policy),
            None => false,
        };
        if !removed {
            return Ok(false);
        }
        self.prune(key);
        info!(%key, %name, "Member removed from slot");
        self.persist_state()?;
        Ok(true)
    }

    /// Assign `task` to `member`, replacing any previous assignee
    ///
    /// The task must be offered by the slot and the member must be in it.
    pub fn assign_task(&mut self, key: &SlotKey, task: &str, member: &str) -> PlanningResult<Option<String>> {
        debug!(%key, %task, %member, "assign_task: called");
        let task = task.trim();
        if !self.options.tasks.offers(key, task) {
            return Err(PlanningError::NotFound(format!("task {} in slot {}", task, key)));
        }
        let assignee = self
            .slot(key)
            .and_then(|s| s.member(member.trim(), &self.options.names))
            .map(|m| m.name.clone())
            .ok_or_else(|| PlanningError::NotFound(format!("member {} in slot {}", member.trim(), key)))?;

        let previous = self.slot_entry(key).assign(task, &assignee);
        info!(%key, %task, %assignee, ?previous, "Task assigned");
        self.persist_state()?;
        Ok(previous)
    }

    /// Clear the assignment of `task`; no-op returning `None` when unassigned
    pub fn unassign_task(&mut self, key: &SlotKey, task: &str) -> PlanningResult<Option<String>> {
        debug!(%key, %task, "unassign_task: called");
        let previous = self.slot_mut_existing(key).and_then(|s| s.unassign(task.trim()));
        if previous.is_none() {
            return Ok(None);
        }
        self.prune(key);
        self.persist_state()?;
        Ok(previous)
    }

    /// Remove everything stored for `week`; returns false if there was nothing
    pub fn reset_week(&mut self, week: &WeekKey) -> PlanningResult<bool> {
        debug!(%week, "reset_week: called");
        if self.state.weeks.remove(week).is_none() {
            return Ok(false);
        }
        info!(%week, "Week reset");
        self.persist_state()?;
        Ok(true)
    }

    /// Drop roster, current user, every week and the whole history
    pub fn clear_all(&mut self) -> PlanningResult<()> {
        warn!("Clearing all planning data");
        let preferences = self.state.preferences.clone();
        self.state = PlanningState {
            preferences,
            ..PlanningState::default()
        };
        self.history.clear();
        self.storage.remove(STATE_KEY)?;
        self.storage.remove(HISTORY_KEY)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------------

    /// Set (or replace) the slot note, stamped now
    pub fn set_slot_note(&mut self, key: &SlotKey, text: &str, author: Option<&str>) -> PlanningResult<()> {
        debug!(%key, "set_slot_note: called");
        let author = self.resolve_author(author)?;
        let note = Note::new(text, author.as_deref(), Utc::now())?;
        self.register_author(author.as_deref());
        self.slot_entry(key).note = Some(note);
        info!(%key, ?author, "Slot note saved");
        self.persist_state()
    }

    /// Delete the slot note and prune the slot if it is now empty
    pub fn delete_slot_note(&mut self, key: &SlotKey) -> PlanningResult<Note> {
        debug!(%key, "delete_slot_note: called");
        let note = self
            .slot_mut_existing(key)
            .and_then(|s| s.note.take())
            .ok_or_else(|| PlanningError::NotFound(format!("note in slot {}", key)))?;
        self.prune(key);
        info!(%key, "Slot note deleted");
        self.persist_state()?;
        Ok(note)
    }

    /// Append a week note; returns its index
    pub fn add_week_note(&mut self, week: &WeekKey, text: &str, author: Option<&str>) -> PlanningResult<usize> {
        debug!(%week, "add_week_note: called");
        let author = self.resolve_author(author)?;
        let note = Note::new(text, author.as_deref(), Utc::now())?;
        self.register_author(author.as_deref());
        let notes = &mut self.state.weeks.entry(*week).or_default().notes;
        notes.push(note);
        let index = notes.len() - 1;
        info!(%week, index, "Week note added");
        self.persist_state()?;
        Ok(index)
    }

    /// Replace the week note at `index`, restamping it
    pub fn update_week_note(
        &mut self,
        week: &WeekKey,
        index: usize,
        text: &str,
        author: Option<&str>,
    ) -> PlanningResult<()> {
        debug!(%week, index, "update_week_note: called");
        if self.week_note(week, index).is_none() {
            return Err(PlanningError::NotFound(format!("week note {} in week {}", index, week)));
        }
        let author = self.resolve_author(author)?;
        let note = Note::new(text, author.as_deref(), Utc::now())?;
        self.register_author(author.as_deref());
        if let Some(existing) = self.state.weeks.get_mut(week).and_then(|w| w.notes.get_mut(index)) {
            *existing = note;
        }
        info!(%week, index, "Week note updated");
        self.persist_state()
    }

    /// Remove the week note at `index`; the week is dropped if nothing is left
    pub fn delete_week_note(&mut self, week: &WeekKey, index: usize) -> PlanningResult<Note> {
        debug!(%week, index, "delete_week_note: called");
        let entry = self
            .state
            .weeks
            .get_mut(week)
            .filter(|w| index < w.notes.len())
            .ok_or_else(|| PlanningError::NotFound(format!("week note {} in week {}", index, week)))?;
        let note = entry.notes.remove(index);
        if entry.is_empty() {
            self.state.weeks.remove(week);
        }
        info!(%week, index, "Week note deleted");
        self.persist_state()?;
        Ok(note)
    }

    pub fn week_note(&self, week: &WeekKey, index: usize) -> Option<&Note> {
        self.state.weeks.get(week).and_then(|w| w.notes.get(index))
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Copy `week` into the history; returns the snapshot's index
    pub fn snapshot_week(&mut self, week: &WeekKey) -> PlanningResult<usize> {
        debug!(%week, "snapshot_week: called");
        let mut data = self.state.weeks.get(week).cloned().unwrap_or_default();
        data.prune();
        let evicted = self.history.push(Snapshot {
            date: *week,
            saved_at: Utc::now(),
            data,
        });
        if let Some(old) = evicted {
            info!(week = %old.date, saved_at = %old.saved_at, "Oldest snapshot evicted");
        }
        info!(%week, snapshots = self.history.len(), "Week snapshot saved");
        self.persist_history()?;
        Ok(self.history.len() - 1)
    }

    /// Replace the live contents of the snapshot's week with a copy of it
    pub fn restore_snapshot(&mut self, index: usize) -> PlanningResult<WeekKey> {
        debug!(index, "restore_snapshot: called");
        let snapshot = self
            .history
            .get(index)
            .ok_or_else(|| PlanningError::NotFound(format!("snapshot {}", index)))?;
        let week = snapshot.date;
        let data = snapshot.data.clone();
        if data.is_empty() {
            self.state.weeks.remove(&week);
        } else {
            self.state.weeks.insert(week, data);
        }
        info!(%week, index, "Snapshot restored");
        self.persist_state()?;
        Ok(week)
    }

    pub fn delete_snapshot(&mut self, index: usize) -> PlanningResult<Snapshot> {
        debug!(index, "delete_snapshot: called");
        let snapshot = self
            .history
            .remove(index)
            .ok_or_else(|| PlanningError::NotFound(format!("snapshot {}", index)))?;
        self.persist_history()?;
        Ok(snapshot)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Replace roster names and weeks wholesale, keeping current user and preferences
    ///
    /// The incoming data is normalized like a load. A `history` of `Some`
    /// replaces the snapshot list as well.
    pub(crate) fn replace_contents(
        &mut self,
        members: Vec<String>,
        weeks: BTreeMap<WeekKey, Week>,
        history: Option<Vec<Snapshot>>,
    ) -> PlanningResult<()> {
        let current = self.state.roster.current_user().map(str::to_string);
        self.state.roster = Roster::from_parts(members, current, &self.options.names);
        self.state.weeks = weeks;
        self.state.normalize(&self.options.names);
        self.persist_state()?;

        if let Some(mut entries) = history {
            for snapshot in &mut entries {
                snapshot.data.normalize(&self.options.names);
            }
            self.history = History::from_entries(entries, self.options.history_capacity);
            info!(snapshots = self.history.len(), "History replaced");
            self.persist_history()?;
        }
        Ok(())
    }

    fn slot_entry(&mut self, key: &SlotKey) -> &mut Slot {
        self.state
            .weeks
            .entry(key.week())
            .or_default()
            .slots
            .entry(*key)
            .or_default()
    }

    fn slot_mut_existing(&mut self, key: &SlotKey) -> Option<&mut Slot> {
        self.state.weeks.get_mut(&key.week()).and_then(|w| w.slots.get_mut(key))
    }

    /// Drop the slot if empty, then its week if empty
    fn prune(&mut self, key: &SlotKey) {
        let week_key = key.week();
        let Some(week) = self.state.weeks.get_mut(&week_key) else {
            return;
        };
        if week.slots.get(key).is_some_and(Slot::is_empty) {
            week.slots.remove(key);
            debug!(%key, "Pruned empty slot");
        }
        if week.is_empty() {
            self.state.weeks.remove(&week_key);
        }
    }

    /// Explicit author in the roster's spelling, else the current user, else anonymous
    fn resolve_author(&self, author: Option<&str>) -> PlanningResult<Option<String>> {
        match author.map(str::trim).filter(|a| !a.is_empty()) {
            Some(author) => {
                let author = self.options.names.validate(author)?;
                let known = self.state.roster.find(&author, &self.options.names).map(str::to_string);
                Ok(Some(known.unwrap_or(author)))
            }
            None => Ok(self.state.roster.current_user().map(str::to_string)),
        }
    }

    fn register_author(&mut self, author: Option<&str>) {
        if let Some(author) = author
            && self.state.roster.ensure(author, &self.options.names)
        {
            info!(%author, "Note author added to roster");
        }
    }

    fn persist_state(&mut self) -> PlanningResult<()> {
        let json = self.state.encode().map_err(|source| PersistenceError::Encode {
            key: STATE_KEY.to_string(),
            source,
        })?;
        self.storage.set(STATE_KEY, &json).map_err(|e| {
            warn!(error = %e, "Failed to persist planning state; memory and storage now differ");
            PlanningError::from(e)
        })
    }

    fn persist_history(&mut self) -> PlanningResult<()> {
        let json = serde_json::to_string(&self.history.to_vec()).map_err(|source| PersistenceError::Encode {
            key: HISTORY_KEY.to_string(),
            source,
        })?;
        self.storage.set(HISTORY_KEY, &json).map_err(|e| {
            warn!(error = %e, "Failed to persist history; memory and storage now differ");
            PlanningError::from(e)
        })
    }
}
