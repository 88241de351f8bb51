//! Persisted shape of the planning state
//!
//! ```text
//! {
//!   "members": ["Alice", "Bob"],
//!   "weekData": {
//!     "2024-01-15": {
//!       "2024-01-15_morning": { "members": [{"name": "Bob", "present": true}], "tasks": {} },
//!       "2024-01-16_afternoon": { "members": [...], "tasks": {"Trash": "Bob"}, "note": {...} },
//!       "weekNotes": [{"text": "...", "author": "Ana", "time": "..."}]
//!     }
//!   },
//!   "theme": "violet",
//!   "darkMode": false,
//!   "currentUser": "Ana"
//! }
//! ```
//!
//! Slot entries sit next to `weekNotes` in the week object. A legacy `notes`
//! string memo is read and folded into the week notes; it is never written.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{PlanningError, PlanningResult};
use crate::note::{StoredNote, WeekNote};
use crate::roster::{NamePolicy, Roster};
use crate::slot::{Slot, SlotKey, SlotMember};
use crate::week::WeekKey;

const WEEK_NOTES_FIELD: &str = "weekNotes";

/// Contents of one week
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WeekRepr")]
pub struct Week {
    pub slots: BTreeMap<SlotKey, Slot>,
    pub notes: Vec<WeekNote>,
}

impl Week {
    /// No non-empty slot and no week note
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.slots.values().all(Slot::is_empty)
    }

    /// Drop empty slots
    pub fn prune(&mut self) {
        self.slots.retain(|_, slot| !slot.is_empty());
    }

    /// Normalize every slot under `policy`, then drop the empty ones
    pub fn normalize(&mut self, policy: &NamePolicy) {
        for (key, slot) in self.slots.iter_mut() {
            if slot.normalize(policy) {
                debug!(%key, "Normalized slot members and tasks");
            }
        }
        self.prune();
    }

    /// Authors of the slot notes and week notes
    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.slots
            .values()
            .filter_map(|s| s.note.as_ref())
            .chain(self.notes.iter())
            .filter_map(|n| n.author.as_deref())
    }

    /// Fails when a slot date lies outside `week`
    pub(crate) fn check_belongs_to(&self, week: WeekKey) -> PlanningResult<()> {
        match self.slots.keys().find(|k| k.week() != week) {
            Some(key) => Err(PlanningError::InvalidKey(format!("slot {} is not in week {}", key, week))),
            None => Ok(()),
        }
    }
}

impl Serialize for Week {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let slots: Vec<_> = self.slots.iter().filter(|(_, s)| !s.is_empty()).collect();
        let mut map = serializer.serialize_map(None)?;
        for (key, slot) in slots {
            map.serialize_entry(&key.to_string(), &SlotRef::from(slot))?;
        }
        if !self.notes.is_empty() {
            map.serialize_entry(WEEK_NOTES_FIELD, &self.notes)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct WeekRepr {
    #[serde(rename = "weekNotes", default)]
    week_notes: Vec<StoredNote>,
    #[serde(default)]
    notes: Option<StoredNote>,
    #[serde(flatten)]
    slots: BTreeMap<String, SlotRepr>,
}

impl TryFrom<WeekRepr> for Week {
    type Error = PlanningError;

    fn try_from(repr: WeekRepr) -> Result<Self, Self::Error> {
        let mut slots = BTreeMap::new();
        for (key, slot) in repr.slots {
            slots.insert(key.parse::<SlotKey>()?, Slot::from(slot));
        }
        let notes = repr
            .notes
            .into_iter()
            .chain(repr.week_notes)
            .filter_map(StoredNote::into_note)
            .collect();
        Ok(Self { slots, notes })
    }
}

#[derive(Serialize)]
struct SlotRef<'a> {
    members: &'a [SlotMember],
    tasks: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a crate::note::Note>,
}

impl<'a> From<&'a Slot> for SlotRef<'a> {
    fn from(slot: &'a Slot) -> Self {
        Self {
            members: &slot.members,
            tasks: &slot.tasks,
            note: slot.note.as_ref(),
        }
    }
}

#[derive(Deserialize)]
struct SlotRepr {
    #[serde(default)]
    members: Vec<SlotMember>,
    #[serde(default)]
    tasks: BTreeMap<String, Option<String>>,
    #[serde(default)]
    note: Option<StoredNote>,
}

impl From<SlotRepr> for Slot {
    fn from(repr: SlotRepr) -> Self {
        Self {
            members: repr.members,
            tasks: repr
                .tasks
                .into_iter()
                .filter_map(|(task, who)| who.filter(|w| !w.trim().is_empty()).map(|w| (task, w)))
                .collect(),
            note: repr.note.and_then(StoredNote::into_note),
        }
    }
}

/// Display preferences; stored and reloaded untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub theme: String,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "violet".to_string(),
            dark_mode: false,
        }
    }
}

/// Everything stored under the state key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanningState {
    pub roster: Roster,
    pub weeks: BTreeMap<WeekKey, Week>,
    pub preferences: Preferences,
}

#[derive(Deserialize)]
struct StateRepr {
    #[serde(default)]
    members: Vec<String>,
    #[serde(rename = "weekData", default)]
    week_data: BTreeMap<WeekKey, Week>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(rename = "darkMode", default)]
    dark_mode: bool,
    #[serde(rename = "currentUser", default)]
    current_user: Option<String>,
}

#[derive(Serialize)]
struct StateRef<'a> {
    members: &'a [String],
    #[serde(rename = "weekData")]
    week_data: BTreeMap<&'a WeekKey, &'a Week>,
    theme: &'a str,
    #[serde(rename = "darkMode")]
    dark_mode: bool,
    #[serde(rename = "currentUser")]
    current_user: &'a str,
}

impl PlanningState {
    /// Decode the stored JSON document
    pub fn decode(json: &str, policy: &NamePolicy) -> PlanningResult<Self> {
        let repr: StateRepr = serde_json::from_str(json).map_err(|e| PlanningError::ImportFormat(e.to_string()))?;
        for (key, week) in &repr.week_data {
            week.check_belongs_to(*key)?;
        }
        let mut state = Self {
            roster: Roster::from_parts(repr.members, repr.current_user, policy),
            weeks: repr.week_data,
            preferences: Preferences {
                theme: repr.theme.unwrap_or_else(|| Preferences::default().theme),
                dark_mode: repr.dark_mode,
            },
        };
        state.normalize(policy);
        Ok(state)
    }

    /// Encode to the stored JSON document; empty weeks are left out
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let state = StateRef {
            members: self.roster.names(),
            week_data: self.weeks.iter().filter(|(_, w)| !w.is_empty()).collect(),
            theme: &self.preferences.theme,
            dark_mode: self.preferences.dark_mode,
            current_user: self.roster.current_user().unwrap_or_default(),
        };
        serde_json::to_string(&state)
    }

    /// Enforce slot membership and author rules on data read from outside
    ///
    /// Slots lose repeated members and dangling assignments, empty slots and
    /// weeks are dropped, and every note author joins the roster.
    pub fn normalize(&mut self, policy: &NamePolicy) {
        for week in self.weeks.values_mut() {
            week.normalize(policy);
        }
        self.weeks.retain(|_, week| !week.is_empty());
        for author in self.weeks.values().flat_map(Week::authors) {
            if self.roster.ensure(author, policy) {
                debug!(%author, "Note author added to roster");
            }
        }
    }

    /// Remove empty slots and weeks
    pub fn prune(&mut self) {
        for week in self.weeks.values_mut() {
            week.prune();
        }
        self.weeks.retain(|_, week| !week.is_empty());
    }
}
