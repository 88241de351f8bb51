//! Slot notes and week notes
//!
//! Notes were historically stored either as a bare string or as
//! `{text, author, time}`. Both shapes are read through [`StoredNote`] and
//! normalized once into [`Note`]; only the object shape is ever written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlanningError, PlanningResult};

/// A free-text note with optional author and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Week-level notes share the slot note shape
pub type WeekNote = Note;

impl Note {
    /// Build a note stamped with `time`; blank text is rejected
    pub fn new(text: &str, author: Option<&str>, time: DateTime<Utc>) -> PlanningResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlanningError::EmptyNote);
        }
        Ok(Self {
            text: text.to_string(),
            author: author.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string),
            time: Some(time),
        })
    }

    /// "author: text" or just the text for anonymous notes
    pub fn summary(&self) -> String {
        match &self.author {
            Some(author) => format!("{}: {}", author, self.text),
            None => self.text.clone(),
        }
    }
}

/// Persisted note in either historical shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredNote {
    Text(String),
    Full {
        #[serde(default)]
        text: String,
        #[serde(default)]
        author: Option<String>,
        #[serde(default)]
        time: Option<String>,
    },
}

impl StoredNote {
    /// Normalize; blank notes (including the legacy empty string) become `None`
    pub fn into_note(self) -> Option<Note> {
        let (text, author, time) = match self {
            Self::Text(text) => (text, None, None),
            Self::Full { text, author, time } => (text, author, time),
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Note {
            text: text.to_string(),
            author: author.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            time: time.and_then(|t| DateTime::parse_from_rfc3339(&t).ok()).map(|t| t.with_timezone(&Utc)),
        })
    }
}
