//! Shift notes: per-bed clinical to-dos with optional reminders.

use crate::reminders::ReminderQueue;
use crate::storage::{self, KeyValueStore, NOTES_KEY};
use crate::{Error, NotePriority, Result, ShiftNote};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Reminder title for a note on `bed_id`
fn reminder_title(bed_id: &str) -> String {
    format!("ICU action: {}", bed_id)
}

/// Persisted note list plus the reminders scheduled for it
#[derive(Debug)]
pub struct ShiftNotes<S: KeyValueStore + Clone> {
    storage: S,
    notes: Vec<ShiftNote>,
    reminders: ReminderQueue<S>,
}

impl<S: KeyValueStore + Clone> ShiftNotes<S> {
    /// Load notes and reminders; unreadable data yields empty lists
    pub fn load(storage: S) -> Self {
        let notes: Vec<ShiftNote> = storage::load_json(&storage, NOTES_KEY).unwrap_or_default();
        tracing::debug!("Loaded {} shift notes", notes.len());
        Self {
            reminders: ReminderQueue::load(storage.clone()),
            storage,
            notes,
        }
    }

    /// Append a note and schedule its reminder, if any
    pub fn add(
        &mut self,
        bed_id: &str,
        content: &str,
        priority: NotePriority,
        reminder_time: Option<DateTime<Utc>>,
    ) -> Result<ShiftNote> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::InvalidValue {
                field: "content".into(),
                value: String::new(),
            });
        }

        let note = ShiftNote {
            id: Uuid::new_v4(),
            bed_id: bed_id.to_string(),
            content: content.to_string(),
            priority,
            completed: false,
            reminder_time,
            created_at: Utc::now(),
        };

        self.notes.push(note.clone());
        self.persist()?;
        if let Some(at) = note.reminder_time {
            self.schedule_reminder(&note, at)?;
        }

        tracing::info!("Added note {} for bed {}", note.id, bed_id);
        Ok(note)
    }

    /// Replace a note by id, rescheduling or cancelling its reminder
    pub fn update(&mut self, note: ShiftNote) -> Result<()> {
        let slot = self
            .notes
            .iter_mut()
            .find(|n| n.id == note.id)
            .ok_or_else(|| Error::NoteNotFound(note.id.to_string()))?;
        *slot = note.clone();

        self.persist()?;
        self.sync_reminder(&note)
    }

    /// Mark a note done or not done
    pub fn set_completed(&mut self, id: Uuid, completed: bool) -> Result<()> {
        let mut note = self
            .find(id)
            .cloned()
            .ok_or_else(|| Error::NoteNotFound(id.to_string()))?;
        note.completed = completed;
        self.update(note)
    }

    /// Remove a note and its reminder
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            return Err(Error::NoteNotFound(id.to_string()));
        }

        self.persist()?;
        self.reminders.cancel(id)?;
        tracing::info!("Deleted note {}", id);
        Ok(())
    }

    /// All notes in creation order
    pub fn list(&self) -> &[ShiftNote] {
        &self.notes
    }

    pub fn for_bed<'a>(&'a self, bed_id: &'a str) -> impl Iterator<Item = &'a ShiftNote> {
        self.notes.iter().filter(move |n| n.bed_id == bed_id)
    }

    pub fn find(&self, id: Uuid) -> Option<&ShiftNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Resolve a full id or a unique prefix of one
    pub fn resolve_id(&self, text: &str) -> Result<Uuid> {
        let text = text.trim().to_lowercase();
        if let Ok(id) = Uuid::parse_str(&text) {
            return Ok(id);
        }

        let mut matches = self
            .notes
            .iter()
            .filter(|n| !text.is_empty() && n.id.to_string().starts_with(&text));
        match (matches.next(), matches.next()) {
            (Some(note), None) => Ok(note.id),
            (Some(_), Some(_)) => Err(Error::Other(format!("note id '{}' is ambiguous", text))),
            _ => Err(Error::NoteNotFound(text.clone())),
        }
    }

    pub fn reminders(&self) -> &ReminderQueue<S> {
        &self.reminders
    }

    pub fn reminders_mut(&mut self) -> &mut ReminderQueue<S> {
        &mut self.reminders
    }

    /// Bring the reminder in line with the note.
    ///
    /// A reminder time that has already passed is only kept if it is still
    /// pending; once it has fired or been cancelled it is not rescheduled.
    fn sync_reminder(&mut self, note: &ShiftNote) -> Result<()> {
        match note.reminder_time {
            Some(at) if !note.completed => {
                let pending = self
                    .reminders
                    .get(note.id)
                    .map_or(false, |r| !r.triggered);
                if pending || at > Utc::now() {
                    self.schedule_reminder(note, at)
                } else {
                    tracing::debug!(
                        "Reminder for note {} has passed, not rescheduling",
                        note.id
                    );
                    Ok(())
                }
            }
            _ => self.reminders.cancel(note.id).map(|_| ()),
        }
    }

    fn schedule_reminder(&mut self, note: &ShiftNote, at: DateTime<Utc>) -> Result<()> {
        self.reminders.schedule(
            note.id,
            reminder_title(&note.bed_id),
            note.content.clone(),
            at,
        )
    }

    fn persist(&mut self) -> Result<()> {
        storage::save_json(&mut self.storage, NOTES_KEY, &self.notes)
    }
}
