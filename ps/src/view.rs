//! Read-only views handed to renderers

use chrono::{Datelike, NaiveDate, Weekday};

use crate::note::{Note, WeekNote};
use crate::persistence::KeyValueStore;
use crate::slot::{Shift, SlotKey, SlotMember};
use crate::store::PlanningStore;
use crate::week::WeekKey;

/// A chore offered by a slot and who has it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub name: String,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub key: SlotKey,
    pub members: Vec<SlotMember>,
    pub present: usize,
    pub tasks: Vec<TaskView>,
    pub note: Option<Note>,
    /// Roster names not yet in the slot
    pub candidates: Vec<String>,
}

impl SlotView {
    pub fn shift(&self) -> Shift {
        self.key.shift()
    }

    pub fn total(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub date: NaiveDate,
    pub day: Weekday,
    /// Morning then afternoon
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekView {
    pub week: WeekKey,
    pub label: String,
    pub current_user: Option<String>,
    pub days: Vec<DayView>,
    pub notes: Vec<WeekNote>,
}

impl WeekView {
    pub fn slots(&self) -> impl Iterator<Item = &SlotView> {
        self.days.iter().flat_map(|d| d.slots.iter())
    }
}

/// Where a note in the feed lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    Week { index: usize },
    Slot(SlotKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub source: NoteSource,
    pub note: Note,
}

/// English day name
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl<S: KeyValueStore> PlanningStore<S> {
    /// The full grid for `week`; slots with no stored data show up empty
    pub fn week_view(&self, week: &WeekKey) -> WeekView {
        let policy = &self.options().names;
        let catalog = &self.options().tasks;
        let stored = self.week(week);

        let days = week
            .days()
            .into_iter()
            .map(|date| {
                let slots = Shift::ALL
                    .iter()
                    .filter_map(|shift| SlotKey::new(date, *shift).ok())
                    .map(|key| {
                        let slot = stored.and_then(|w| w.slots.get(&key)).cloned().unwrap_or_default();

                        let mut tasks: Vec<TaskView> = catalog
                            .tasks_for(&key)
                            .into_iter()
                            .map(|name| TaskView {
                                name: name.to_string(),
                                assignee: slot.tasks.get(name).cloned(),
                            })
                            .collect();
                        // Assignments for tasks the catalog no longer offers stay visible
                        for (name, who) in &slot.tasks {
                            if !tasks.iter().any(|t| &t.name == name) {
                                tasks.push(TaskView {
                                    name: name.clone(),
                                    assignee: Some(who.clone()),
                                });
                            }
                        }

                        let taken: Vec<&str> = slot.members.iter().map(|m| m.name.as_str()).collect();
                        let candidates = self
                            .roster()
                            .candidates(&taken, policy)
                            .into_iter()
                            .map(str::to_string)
                            .collect();

                        SlotView {
                            key,
                            present: slot.present_count(),
                            members: slot.members,
                            tasks,
                            note: slot.note,
                            candidates,
                        }
                    })
                    .collect();
                DayView {
                    date,
                    day: date.weekday(),
                    slots,
                }
            })
            .collect();

        WeekView {
            week: *week,
            label: week.label(),
            current_user: self.roster().current_user().map(str::to_string),
            days,
            notes: stored.map(|w| w.notes.clone()).unwrap_or_default(),
        }
    }

    /// Week notes first, then slot notes in slot order
    pub fn notes_feed(&self, week: &WeekKey) -> Vec<NoteEntry> {
        let Some(stored) = self.week(week) else {
            return Vec::new();
        };
        let week_notes = stored.notes.iter().enumerate().map(|(index, note)| NoteEntry {
            source: NoteSource::Week { index },
            note: note.clone(),
        });
        let slot_notes = stored.slots.iter().filter_map(|(key, slot)| {
            slot.note.as_ref().map(|note| NoteEntry {
                source: NoteSource::Slot(*key),
                note: note.clone(),
            })
        });
        week_notes.chain(slot_notes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use crate::store::StoreOptions;

    fn store() -> PlanningStore<MemoryStorage> {
        PlanningStore::open(MemoryStorage::new(), StoreOptions::default()).unwrap()
    }

    fn week() -> WeekKey {
        "2024-01-15".parse().unwrap()
    }

    #[test]
    fn test_empty_week_view_has_ten_slots() {
        let view = store().week_view(&week());
        assert_eq!(view.label, "Week of 15 to 19 January 2024");
        assert_eq!(view.days.len(), 5);
        assert_eq!(view.days[0].day, Weekday::Mon);
        assert_eq!(view.slots().count(), 10);
        assert!(view.slots().all(|s| s.members.is_empty() && s.note.is_none()));
    }

    #[test]
    fn test_slot_view_tasks_and_candidates() {
        let mut store = store();
        store.add_member("Alice").unwrap();
        store.add_member("Bob").unwrap();
        let key = SlotKey::in_week(week(), Weekday::Tue, Shift::Afternoon).unwrap();
        store.add_member_to_slot(&key, "bob").unwrap();
        store.assign_task(&key, "Cleaning", "Bob").unwrap();

        let view = store.week_view(&week());
        let slot = view.slots().find(|s| s.key == key).unwrap();
        assert_eq!(slot.present, 1);
        assert_eq!(slot.total(), 1);
        assert_eq!(slot.candidates, ["Alice"]);
        let names: Vec<&str> = slot.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Accounts", "Trash", "Cleaning"]);
        assert_eq!(slot.tasks[2].assignee.as_deref(), Some("bob"));

        let morning = view.slots().find(|s| s.key.shift() == Shift::Morning).unwrap();
        assert!(morning.tasks.is_empty());
        assert_eq!(morning.candidates, ["Alice", "Bob"]);
    }

    #[test]
    fn test_notes_feed_order() {
        let mut store = store();
        let wed = SlotKey::in_week(week(), Weekday::Wed, Shift::Morning).unwrap();
        let mon = SlotKey::in_week(week(), Weekday::Mon, Shift::Afternoon).unwrap();
        store.set_slot_note(&wed, "Wednesday", None).unwrap();
        store.set_slot_note(&mon, "Monday", None).unwrap();
        store.add_week_note(&week(), "General", Some("Ana")).unwrap();

        let feed = store.notes_feed(&week());
        let texts: Vec<&str> = feed.iter().map(|e| e.note.text.as_str()).collect();
        assert_eq!(texts, ["General", "Monday", "Wednesday"]);
        assert_eq!(feed[0].source, NoteSource::Week { index: 0 });
        assert_eq!(feed[1].source, NoteSource::Slot(mon));

        assert!(store.notes_feed(&week().shift(1)).is_empty());
    }
}
