//! Member roster and name rules

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanningError, PlanningResult};

/// Default cap on member name length, in characters
pub const DEFAULT_MAX_NAME_LEN: usize = 30;

/// How member names are validated and compared
///
/// The same policy governs the roster and slot membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NamePolicy {
    pub case_insensitive: bool,
    /// `None` disables the cap
    pub max_name_len: Option<usize>,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            max_name_len: Some(DEFAULT_MAX_NAME_LEN),
        }
    }
}

impl NamePolicy {
    /// Whether two names identify the same member
    pub fn same(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }

    /// Trim and check a name; returns the trimmed form
    pub fn validate(&self, name: &str) -> PlanningResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlanningError::EmptyName);
        }
        let len = name.chars().count();
        if let Some(max) = self.max_name_len
            && len > max
        {
            return Err(PlanningError::NameTooLong { len, max });
        }
        Ok(name.to_string())
    }
}

/// Ordered set of known member names plus the current user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
    current_user: Option<String>,
}

impl Roster {
    /// Build from persisted data, dropping blanks and duplicates under `policy`
    pub fn from_parts(names: Vec<String>, current_user: Option<String>, policy: &NamePolicy) -> Self {
        let mut roster = Self::default();
        for name in names {
            let name = name.trim();
            if !name.is_empty() && !roster.contains(name, policy) {
                roster.names.push(name.to_string());
            }
        }
        if let Some(user) = current_user.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            roster.ensure(&user, policy);
            roster.current_user = Some(user);
        }
        roster
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str, policy: &NamePolicy) -> bool {
        self.find(name, policy).is_some()
    }

    /// The roster's spelling of `name`
    pub fn find(&self, name: &str, policy: &NamePolicy) -> Option<&str> {
        self.names.iter().find(|n| policy.same(n, name)).map(String::as_str)
    }

    /// Append a new member; fails on blank, too long or duplicate names
    pub fn add(&mut self, name: &str, policy: &NamePolicy) -> PlanningResult<String> {
        let name = policy.validate(name)?;
        if self.contains(&name, policy) {
            return Err(PlanningError::Duplicate(name));
        }
        debug!(%name, "Roster::add: appending");
        self.names.push(name.clone());
        Ok(name)
    }

    /// Remove a member from the roster only; slot records are untouched
    pub fn remove(&mut self, name: &str, policy: &NamePolicy) -> PlanningResult<String> {
        let name = name.trim();
        let idx = self
            .names
            .iter()
            .position(|n| policy.same(n, name))
            .ok_or_else(|| PlanningError::NotFound(format!("member {}", name)))?;
        Ok(self.names.remove(idx))
    }

    /// Insert `name` if missing; returns true when it was added
    pub fn ensure(&mut self, name: &str, policy: &NamePolicy) -> bool {
        if self.contains(name, policy) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Set the current user, adding them to the roster if needed
    pub fn set_current_user(&mut self, name: &str, policy: &NamePolicy) -> PlanningResult<String> {
        let name = policy.validate(name)?;
        self.ensure(&name, policy);
        self.current_user = Some(name.clone());
        Ok(name)
    }

    pub fn clear_current_user(&mut self) -> Option<String> {
        self.current_user.take()
    }

    /// Roster names not matched by any of `taken`
    pub fn candidates<'a>(&'a self, taken: &[&str], policy: &NamePolicy) -> Vec<&'a str> {
        self.names
            .iter()
            .filter(|n| !taken.iter().any(|t| policy.same(n, t)))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_member_case_insensitive_duplicate() {
        let policy = NamePolicy::default();
        let mut roster = Roster::default();
        roster.add("Alice", &policy).unwrap();
        assert_eq!(roster.names(), ["Alice"]);

        let err = roster.add("alice", &policy).unwrap_err();
        assert!(matches!(err, PlanningError::Duplicate(_)));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_case_sensitive_policy() {
        let policy = NamePolicy {
            case_insensitive: false,
            max_name_len: None,
        };
        let mut roster = Roster::default();
        roster.add("Alice", &policy).unwrap();
        roster.add("alice", &policy).unwrap();
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_add_member_trims_and_validates() {
        let policy = NamePolicy::default();
        let mut roster = Roster::default();
        assert_eq!(roster.add("  Bob  ", &policy).unwrap(), "Bob");
        assert!(matches!(roster.add("   ", &policy), Err(PlanningError::EmptyName)));
        let long = "x".repeat(31);
        assert!(matches!(
            roster.add(&long, &policy),
            Err(PlanningError::NameTooLong { len: 31, max: 30 })
        ));
        assert!(roster.add(&"x".repeat(30), &policy).is_ok());
    }

    #[test]
    fn test_uncapped_policy_accepts_long_names() {
        let policy = NamePolicy {
            case_insensitive: true,
            max_name_len: None,
        };
        let mut roster = Roster::default();
        assert!(roster.add(&"y".repeat(80), &policy).is_ok());
    }

    #[test]
    fn test_remove_member() {
        let policy = NamePolicy::default();
        let mut roster = Roster::default();
        roster.add("Alice", &policy).unwrap();
        assert_eq!(roster.remove("ALICE", &policy).unwrap(), "Alice");
        assert!(matches!(roster.remove("Alice", &policy), Err(PlanningError::NotFound(_))));
    }

    #[test]
    fn test_set_current_user_auto_adds() {
        let policy = NamePolicy::default();
        let mut roster = Roster::default();
        assert!(matches!(roster.set_current_user(" ", &policy), Err(PlanningError::EmptyName)));
        roster.set_current_user(" Ana ", &policy).unwrap();
        assert_eq!(roster.current_user(), Some("Ana"));
        assert_eq!(roster.names(), ["Ana"]);

        roster.set_current_user("ana", &policy).unwrap();
        assert_eq!(roster.names(), ["Ana"]);
    }

    #[test]
    fn test_from_parts_dedups() {
        let policy = NamePolicy::default();
        let roster = Roster::from_parts(
            vec!["Bob".into(), "bob".into(), " ".into(), "Eve".into()],
            Some("Zoe".into()),
            &policy,
        );
        assert_eq!(roster.names(), ["Bob", "Eve", "Zoe"]);
        assert_eq!(roster.current_user(), Some("Zoe"));
    }

    #[test]
    fn test_find_returns_roster_spelling() {
        let policy = NamePolicy::default();
        let roster = Roster::from_parts(vec!["Ana".into()], None, &policy);
        assert_eq!(roster.find("ANA", &policy), Some("Ana"));
        assert_eq!(roster.find("Bob", &policy), None);
    }

    #[test]
    fn test_candidates_exclude_taken() {
        let policy = NamePolicy::default();
        let roster = Roster::from_parts(vec!["Bob".into(), "Eve".into()], None, &policy);
        assert_eq!(roster.candidates(&["bob"], &policy), vec!["Eve"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String),
        Remove(String),
    }

    fn op() -> impl Strategy<Value = Op> {
        let name = prop::sample::select(vec!["Alice", "alice", "ALICE", "Bob", "bob ", " Eve", "Zoé", "zoé"]);
        prop_oneof![
            name.clone().prop_map(|n| Op::Add(n.to_string())),
            name.prop_map(|n| Op::Remove(n.to_string())),
        ]
    }

    proptest! {
        #[test]
        fn prop_roster_never_holds_duplicates(ops in prop::collection::vec(op(), 0..40)) {
            let policy = NamePolicy::default();
            let mut roster = Roster::default();
            for op in ops {
                match op {
                    Op::Add(n) => { let _ = roster.add(&n, &policy); }
                    Op::Remove(n) => { let _ = roster.remove(&n, &policy); }
                }
            }
            let names = roster.names();
            for (i, a) in names.iter().enumerate() {
                for b in &names[i + 1..] {
                    prop_assert!(!policy.same(a, b));
                }
            }
        }
    }
}
