//! JSON bundle export/import and CSV export

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::document::Week;
use crate::error::{PersistenceError, PlanningError, PlanningResult};
use crate::history::Snapshot;
use crate::persistence::KeyValueStore;
use crate::store::PlanningStore;
use crate::view::{WeekView, day_name};
use crate::week::WeekKey;

/// CSV header row
pub const CSV_HEADER: &str = "date,day,shift,member,present,tasks,note";

#[derive(Serialize)]
struct ExportRef<'a> {
    members: &'a [String],
    #[serde(rename = "weekData")]
    week_data: BTreeMap<&'a WeekKey, &'a Week>,
    #[serde(rename = "currentUser")]
    current_user: &'a str,
    history: Vec<&'a Snapshot>,
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ImportRepr {
    members: Vec<String>,
    #[serde(rename = "weekData")]
    week_data: BTreeMap<WeekKey, Week>,
    #[serde(default)]
    history: Option<Vec<Snapshot>>,
}

impl<S: KeyValueStore> PlanningStore<S> {
    /// Pretty-printed `{members, weekData, currentUser, history, date}` bundle
    pub fn export_json(&self) -> PlanningResult<String> {
        let bundle = ExportRef {
            members: self.roster().names(),
            week_data: self.weeks().iter().filter(|(_, w)| !w.is_empty()).collect(),
            current_user: self.roster().current_user().unwrap_or_default(),
            history: self.history().to_vec(),
            date: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&bundle).map_err(|source| PersistenceError::Encode {
            key: "export".to_string(),
            source,
        })?;
        Ok(json)
    }

    /// Replace roster names and the week map with the bundle's
    ///
    /// The history is replaced too when the bundle carries one. Slot members
    /// and assignments are normalized and note authors join the roster. The
    /// local current user and preferences are kept. Nothing changes when the
    /// payload is rejected.
    pub fn import_json(&mut self, json: &str) -> PlanningResult<()> {
        debug!(bytes = json.len(), "import_json: called");
        let repr: ImportRepr = serde_json::from_str(json).map_err(|e| PlanningError::ImportFormat(e.to_string()))?;
        let snapshots = repr.history.iter().flatten().map(|s| (s.date, &s.data));
        for (key, week) in repr.week_data.iter().map(|(k, w)| (*k, w)).chain(snapshots) {
            week.check_belongs_to(key).map_err(|e| PlanningError::ImportFormat(e.to_string()))?;
        }
        let (members, weeks) = (repr.members.len(), repr.week_data.len());
        let snapshots = repr.history.as_ref().map(Vec::len);
        self.replace_contents(repr.members, repr.week_data, repr.history)?;
        info!(members, weeks, ?snapshots, "Planning data imported");
        Ok(())
    }
}

/// One row per slot member, or one member-less row for an empty slot
pub fn week_csv(view: &WeekView) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for day in &view.days {
        for slot in &day.slots {
            let date = day.date.format("%Y-%m-%d").to_string();
            let note = slot.note.as_ref().map(|n| n.summary()).unwrap_or_default();
            if slot.members.is_empty() {
                let row = [date.as_str(), day_name(day.day), slot.shift().as_str(), "", "", "", &note];
                push_row(&mut out, &row);
                continue;
            }
            for member in &slot.members {
                let tasks = slot
                    .tasks
                    .iter()
                    .filter(|t| t.assignee.as_deref() == Some(member.name.as_str()))
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                let present = if member.present { "yes" } else { "no" };
                let row = [
                    date.as_str(),
                    day_name(day.day),
                    slot.shift().as_str(),
                    &member.name,
                    present,
                    &tasks,
                    &note,
                ];
                push_row(&mut out, &row);
            }
        }
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// RFC 4180 field quoting
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
