//! Attendance statistics over every stored week

use crate::document::Week;
use crate::persistence::KeyValueStore;
use crate::store::PlanningStore;
use crate::week::WeekKey;

/// Rounded percentage, 0 when there is nothing to divide
pub fn rate(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStats {
    pub name: String,
    pub present: usize,
    pub absent: usize,
    pub total: usize,
}

impl MemberStats {
    pub fn rate(&self) -> u32 {
        rate(self.present, self.total)
    }
}

/// Totals across all weeks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overview {
    /// Member records across every slot
    pub records: usize,
    pub present: usize,
    pub assigned_tasks: usize,
    /// Tasks the catalog offers over the stored weeks
    pub offered_tasks: usize,
}

impl Overview {
    pub fn presence_rate(&self) -> u32 {
        rate(self.present, self.records)
    }

    pub fn task_rate(&self) -> u32 {
        rate(self.assigned_tasks, self.offered_tasks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSummary {
    pub week: WeekKey,
    pub label: String,
    pub present: usize,
    pub total: usize,
    pub notes: usize,
}

impl WeekSummary {
    pub fn rate(&self) -> u32 {
        rate(self.present, self.total)
    }
}

fn tally(week: &Week) -> (usize, usize) {
    week.slots.values().fold((0, 0), |(present, total), slot| {
        (present + slot.present_count(), total + slot.members.len())
    })
}

impl<S: KeyValueStore> PlanningStore<S> {
    /// Per roster member, most present first then by name
    pub fn member_stats(&self) -> Vec<MemberStats> {
        let policy = &self.options().names;
        let mut stats: Vec<MemberStats> = self
            .roster()
            .names()
            .iter()
            .map(|name| MemberStats {
                name: name.clone(),
                present: 0,
                absent: 0,
                total: 0,
            })
            .collect();

        let records = self
            .weeks()
            .values()
            .flat_map(|w| w.slots.values())
            .flat_map(|s| s.members.iter());
        for record in records {
            if let Some(entry) = stats.iter_mut().find(|s| policy.same(&s.name, &record.name)) {
                entry.total += 1;
                if record.present {
                    entry.present += 1;
                } else {
                    entry.absent += 1;
                }
            }
        }

        stats.sort_by(|a, b| b.present.cmp(&a.present).then_with(|| a.name.cmp(&b.name)));
        stats
    }

    pub fn overview(&self) -> Overview {
        let catalog = &self.options().tasks;
        let mut overview = Overview::default();
        for (key, week) in self.weeks() {
            let (present, total) = tally(week);
            overview.present += present;
            overview.records += total;
            for slot_key in key.slots() {
                let offered = catalog.tasks_for(&slot_key);
                overview.offered_tasks += offered.len();
                if let Some(slot) = week.slots.get(&slot_key) {
                    overview.assigned_tasks += offered.iter().filter(|t| slot.tasks.contains_key(**t)).count();
                }
            }
        }
        overview
    }

    /// One row per stored week, newest first
    pub fn week_summaries(&self) -> Vec<WeekSummary> {
        self.weeks()
            .iter()
            .rev()
            .map(|(key, week)| {
                let (present, total) = tally(week);
                WeekSummary {
                    week: *key,
                    label: key.label(),
                    present,
                    total,
                    notes: week.notes.len() + week.slots.values().filter(|s| s.note.is_some()).count(),
                }
            })
            .collect()
    }
}
