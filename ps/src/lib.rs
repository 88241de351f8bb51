//! PlanningStore - week-keyed shift planning for the Kfet board
//!
//! Holds the member roster, per-week slot assignments (two shifts on each
//! weekday), chores, slot and week notes and a bounded history of week
//! snapshots. Every command writes the whole state through a
//! [`KeyValueStore`].
//!
//! # Storage layout
//!
//! ```text
//! <storage dir>/
//! ├── kfet.json           # roster, weekData, preferences, currentUser
//! ├── kfet_history.json   # snapshot list, oldest first
//! └── .lock               # held while writing
//! ```
//!
//! # Example
//!
//! ```ignore
//! use planningstore::{FileStorage, PlanningStore, Shift, SlotKey, StoreOptions, WeekKey};
//!
//! let mut store = PlanningStore::open(FileStorage::open(".kfetboard")?, StoreOptions::default())?;
//! let week = WeekKey::current();
//! let slot = SlotKey::in_week(week, chrono::Weekday::Tue, Shift::Afternoon)?;
//! store.add_member_to_slot(&slot, "Alice")?;
//! store.assign_task(&slot, "Trash", "Alice")?;
//! ```

pub mod document;
pub mod error;
pub mod exchange;
pub mod history;
pub mod note;
pub mod persistence;
pub mod roster;
pub mod slot;
pub mod stats;
pub mod store;
pub mod view;
pub mod week;

pub use document::{PlanningState, Preferences, Week};
pub use error::{ErrorKind, PersistenceError, PlanningError, PlanningResult};
pub use exchange::{CSV_HEADER, week_csv};
pub use history::{DEFAULT_HISTORY_CAPACITY, History, Snapshot};
pub use note::{Note, WeekNote};
pub use persistence::{FileStorage, KeyValueStore, MemoryStorage};
pub use roster::{DEFAULT_MAX_NAME_LEN, NamePolicy, Roster};
pub use slot::{Shift, Slot, SlotKey, SlotMember, TaskCatalog, TaskRule};
pub use stats::{MemberStats, Overview, WeekSummary};
pub use store::{HISTORY_KEY, PlanningStore, STATE_KEY, StoreOptions};
pub use view::{DayView, NoteEntry, NoteSource, SlotView, TaskView, WeekView, day_name};
pub use week::{WORK_DAYS, WeekKey, YEARS};
