//! Slots: one (day, shift) scheduling unit
//!
//! A slot owns its member records, its chore assignments and an optional note.
//! Slot-level mutations live here and are pure; the store wraps them with
//! lookup, pruning and persistence.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{PlanningError, PlanningResult};
use crate::note::Note;
use crate::roster::NamePolicy;
use crate::week::WeekKey;

/// Half-day shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    #[serde(rename = "morning", alias = "Matin", alias = "matin")]
    Morning,
    #[serde(rename = "afternoon", alias = "Après-midi", alias = "après-midi")]
    Afternoon,
}

impl Shift {
    pub const ALL: [Shift; 2] = [Shift::Morning, Shift::Afternoon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
        }
    }

    /// Serving window shown next to the shift name
    pub fn hours(&self) -> &'static str {
        match self {
            Self::Morning => "9h50 - 10h10",
            Self::Afternoon => "15h20 - 15h40",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepts the canonical names and the labels used by older exports
impl FromStr for Shift {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" | "matin" | "am" => Ok(Self::Morning),
            "afternoon" | "après-midi" | "apres-midi" | "pm" => Ok(Self::Afternoon),
            _ => Err(PlanningError::InvalidKey(format!("unknown shift: {}", s))),
        }
    }
}

/// Identifies a slot by its weekday date and shift; text form `YYYY-MM-DD_shift`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    date: NaiveDate,
    shift: Shift,
}

impl SlotKey {
    /// Build a key, rejecting Saturday and Sunday
    pub fn new(date: NaiveDate, shift: Shift) -> PlanningResult<Self> {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => Err(PlanningError::Weekend(date)),
            _ => Ok(Self { date, shift }),
        }
    }

    /// Slot on `day` of `week`
    pub fn in_week(week: WeekKey, day: Weekday, shift: Shift) -> PlanningResult<Self> {
        let date = week.monday() + chrono::TimeDelta::days(day.num_days_from_monday() as i64);
        Self::new(date, shift)
    }

    pub(crate) fn weekday(date: NaiveDate, shift: Shift) -> Self {
        Self { date, shift }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn shift(&self) -> Shift {
        self.shift
    }

    pub fn day(&self) -> Weekday {
        self.date.weekday()
    }

    /// Week owning this slot
    pub fn week(&self) -> WeekKey {
        WeekKey::of(self.date)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date.format("%Y-%m-%d"), self.shift)
    }
}

impl FromStr for SlotKey {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, shift) = s
            .split_once('_')
            .ok_or_else(|| PlanningError::InvalidKey(format!("slot key without shift: {}", s)))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| PlanningError::InvalidKey(format!("{}: {}", s, e)))?;
        Self::new(date, shift.parse()?)
    }
}

impl Serialize for SlotKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A member record inside one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMember {
    pub name: String,
    #[serde(default)]
    pub present: bool,
}

/// Contents of one slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub members: Vec<SlotMember>,
    /// Task name to assignee; unassigned tasks have no entry
    pub tasks: BTreeMap<String, String>,
    pub note: Option<Note>,
}

impl Slot {
    /// No members, no assignments and no note
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.tasks.is_empty() && self.note.is_none()
    }

    pub fn present_count(&self) -> usize {
        self.members.iter().filter(|m| m.present).count()
    }

    pub fn member(&self, name: &str, policy: &NamePolicy) -> Option<&SlotMember> {
        self.members.iter().find(|m| policy.same(&m.name, name))
    }

    pub fn has_member(&self, name: &str, policy: &NamePolicy) -> bool {
        self.member(name, policy).is_some()
    }

    /// Append `name` as present
    pub fn add_member(&mut self, name: &str, policy: &NamePolicy) -> PlanningResult<()> {
        let name = policy.validate(name)?;
        if self.has_member(&name, policy) {
            return Err(PlanningError::AlreadyPresent(name));
        }
        self.members.push(SlotMember { name, present: true });
        Ok(())
    }

    /// Remove `name` and every assignment pointing at it; returns false if absent
    pub fn remove_member(&mut self, name: &str, policy: &NamePolicy) -> bool {
        let before = self.members.len();
        self.members.retain(|m| !policy.same(&m.name, name));
        if self.members.len() == before {
            return false;
        }
        self.tasks.retain(|_, assignee| !policy.same(assignee, name));
        true
    }

    /// Flip attendance; no-op returning None when the member is not in the slot
    pub fn toggle(&mut self, name: &str, policy: &NamePolicy) -> Option<bool> {
        let member = self.members.iter_mut().find(|m| policy.same(&m.name, name))?;
        member.present = !member.present;
        Some(member.present)
    }

    /// Record `assignee` for `task`, replacing any previous assignee
    pub fn assign(&mut self, task: &str, assignee: &str) -> Option<String> {
        self.tasks.insert(task.to_string(), assignee.to_string())
    }

    /// Drop the assignment for `task`; returns the previous assignee
    pub fn unassign(&mut self, task: &str) -> Option<String> {
        self.tasks.remove(task)
    }

    /// Drop blank and repeated members, then assignments to non-members
    ///
    /// The first spelling of a name wins and assignees take the member's
    /// spelling. Returns true if anything changed.
    pub fn normalize(&mut self, policy: &NamePolicy) -> bool {
        let before = (self.members.clone(), self.tasks.clone());

        let mut members: Vec<SlotMember> = Vec::with_capacity(self.members.len());
        for member in self.members.drain(..) {
            let name = member.name.trim();
            if !name.is_empty() && !members.iter().any(|m| policy.same(&m.name, name)) {
                members.push(SlotMember {
                    name: name.to_string(),
                    present: member.present,
                });
            }
        }
        self.members = members;

        let members = &self.members;
        self.tasks = std::mem::take(&mut self.tasks)
            .into_iter()
            .filter_map(|(task, who)| {
                members
                    .iter()
                    .find(|m| policy.same(&m.name, who.trim()))
                    .map(|m| (task, m.name.clone()))
            })
            .collect();

        before.0 != self.members || before.1 != self.tasks
    }
}

/// One chore rule: the task is offered on `shift` for the listed days (all weekdays if empty)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRule {
    pub name: String,
    pub shift: Shift,
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl TaskRule {
    pub fn new(name: impl Into<String>, shift: Shift, days: Vec<Weekday>) -> Self {
        Self {
            name: name.into(),
            shift,
            days,
        }
    }

    pub fn applies_to(&self, slot: &SlotKey) -> bool {
        self.shift == slot.shift() && (self.days.is_empty() || self.days.contains(&slot.day()))
    }
}

/// The set of chores each slot offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCatalog {
    rules: Vec<TaskRule>,
}

impl Default for TaskCatalog {
    fn default() -> Self {
        Self {
            rules: vec![
                TaskRule::new("Accounts", Shift::Afternoon, vec![]),
                TaskRule::new("Trash", Shift::Afternoon, vec![]),
                TaskRule::new("Cleaning", Shift::Afternoon, vec![Weekday::Tue]),
            ],
        }
    }
}

impl TaskCatalog {
    pub fn new(rules: Vec<TaskRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TaskRule] {
        &self.rules
    }

    /// Task names offered by `slot`, in rule order
    pub fn tasks_for(&self, slot: &SlotKey) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.applies_to(slot)) {
            if !names.contains(&rule.name.as_str()) {
                names.push(&rule.name);
            }
        }
        names
    }

    pub fn offers(&self, slot: &SlotKey, task: &str) -> bool {
        self.rules.iter().any(|r| r.name == task && r.applies_to(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn policy() -> NamePolicy {
        NamePolicy::default()
    }

    #[test]
    fn test_slot_key_round_trip_text() {
        let key: SlotKey = "2024-01-16_afternoon".parse().unwrap();
        assert_eq!(key.day(), Weekday::Tue);
        assert_eq!(key.shift(), Shift::Afternoon);
        assert_eq!(key.week().to_string(), "2024-01-15");
        assert_eq!(key.to_string(), "2024-01-16_afternoon");
    }

    #[test]
    fn test_slot_key_accepts_legacy_labels() {
        let key: SlotKey = "2024-01-15_Matin".parse().unwrap();
        assert_eq!(key.shift(), Shift::Morning);
        let key: SlotKey = "2024-01-15_Après-midi".parse().unwrap();
        assert_eq!(key.shift(), Shift::Afternoon);
    }

    #[test]
    fn test_slot_key_rejects_weekend_and_garbage() {
        assert!(matches!(
            "2024-01-20_morning".parse::<SlotKey>(),
            Err(PlanningError::Weekend(_))
        ));
        assert!("2024-01-15".parse::<SlotKey>().is_err());
        assert!("2024-01-15_night".parse::<SlotKey>().is_err());
        assert!("weekNotes".parse::<SlotKey>().is_err());
    }

    #[test]
    fn test_in_week() {
        let week = WeekKey::of(monday());
        let key = SlotKey::in_week(week, Weekday::Fri, Shift::Morning).unwrap();
        assert_eq!(key.to_string(), "2024-01-19_morning");
        assert!(SlotKey::in_week(week, Weekday::Sat, Shift::Morning).is_err());
    }

    #[test]
    fn test_add_member_defaults_present_and_rejects_duplicates() {
        let mut slot = Slot::default();
        slot.add_member("Bob", &policy()).unwrap();
        assert_eq!(slot.members, vec![SlotMember { name: "Bob".into(), present: true }]);

        let err = slot.add_member("bob", &policy()).unwrap_err();
        assert!(matches!(err, PlanningError::AlreadyPresent(_)));
        assert_eq!(slot.members.len(), 1);
    }

    #[test]
    fn test_remove_member_cascades_tasks() {
        let mut slot = Slot::default();
        slot.add_member("Bob", &policy()).unwrap();
        slot.add_member("Eve", &policy()).unwrap();
        slot.assign("Trash", "Bob");
        slot.assign("Accounts", "Bob");
        slot.assign("Cleaning", "Eve");

        assert!(slot.remove_member("Bob", &policy()));
        assert_eq!(slot.members.len(), 1);
        assert_eq!(slot.tasks.len(), 1);
        assert_eq!(slot.tasks.get("Cleaning").map(String::as_str), Some("Eve"));

        assert!(!slot.remove_member("Bob", &policy()));
    }

    #[test]
    fn test_toggle_is_noop_for_unknown_member() {
        let mut slot = Slot::default();
        slot.add_member("Bob", &policy()).unwrap();
        assert_eq!(slot.toggle("Bob", &policy()), Some(false));
        assert_eq!(slot.toggle("Bob", &policy()), Some(true));
        assert_eq!(slot.toggle("Zed", &policy()), None);
        assert_eq!(slot.present_count(), 1);
    }

    #[test]
    fn test_assign_is_last_write_wins() {
        let mut slot = Slot::default();
        assert_eq!(slot.assign("Trash", "Bob"), None);
        assert_eq!(slot.assign("Trash", "Eve"), Some("Bob".into()));
        assert_eq!(slot.unassign("Trash"), Some("Eve".into()));
        assert_eq!(slot.unassign("Trash"), None);
        assert!(slot.is_empty());
    }

    #[test]
    fn test_normalize_dedups_members() {
        let mut slot = Slot {
            members: vec![
                SlotMember { name: "Bob".into(), present: true },
                SlotMember { name: "bob".into(), present: false },
                SlotMember { name: " Bob ".into(), present: false },
                SlotMember { name: "  ".into(), present: true },
                SlotMember { name: " Eve".into(), present: false },
            ],
            ..Slot::default()
        };
        assert!(slot.normalize(&policy()));
        assert_eq!(
            slot.members,
            vec![
                SlotMember { name: "Bob".into(), present: true },
                SlotMember { name: "Eve".into(), present: false },
            ]
        );
        assert!(!slot.normalize(&policy()));
    }

    #[test]
    fn test_normalize_drops_assignments_to_non_members() {
        let mut slot = Slot::default();
        slot.add_member("Bob", &policy()).unwrap();
        slot.assign("Trash", "Ghost");
        slot.assign("Accounts", "bob");
        assert!(slot.normalize(&policy()));
        assert_eq!(slot.tasks.len(), 1);
        assert_eq!(slot.tasks.get("Accounts").map(String::as_str), Some("Bob"));
    }

    #[test]
    fn test_default_catalog() {
        let catalog = TaskCatalog::default();
        let week = WeekKey::of(monday());
        let mon_am = SlotKey::in_week(week, Weekday::Mon, Shift::Morning).unwrap();
        let mon_pm = SlotKey::in_week(week, Weekday::Mon, Shift::Afternoon).unwrap();
        let tue_pm = SlotKey::in_week(week, Weekday::Tue, Shift::Afternoon).unwrap();

        assert!(catalog.tasks_for(&mon_am).is_empty());
        assert_eq!(catalog.tasks_for(&mon_pm), vec!["Accounts", "Trash"]);
        assert_eq!(catalog.tasks_for(&tue_pm), vec!["Accounts", "Trash", "Cleaning"]);
        assert!(catalog.offers(&tue_pm, "Cleaning"));
        assert!(!catalog.offers(&mon_pm, "Cleaning"));
    }
}
