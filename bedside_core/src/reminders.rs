//! Scheduled reminder queue.
//!
//! Reminders are persisted so they survive restarts. A host polls
//! [`ReminderQueue::take_due`] and shows whatever it returns; each reminder
//! is returned once.

use crate::storage::{self, KeyValueStore, REMINDERS_KEY};
use crate::{Result, ScheduledNotification};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// How long triggered reminders are kept before being purged
const TRIGGERED_RETENTION_HOURS: i64 = 1;

/// Persisted list of reminders
#[derive(Debug)]
pub struct ReminderQueue<S: KeyValueStore> {
    storage: S,
    entries: Vec<ScheduledNotification>,
}

impl<S: KeyValueStore> ReminderQueue<S> {
    /// Load the queue; unreadable data yields an empty queue
    pub fn load(storage: S) -> Self {
        let entries = storage::load_json(&storage, REMINDERS_KEY).unwrap_or_default();
        Self { storage, entries }
    }

    /// Add a reminder, replacing any existing one with the same id
    pub fn schedule(
        &mut self,
        id: Uuid,
        title: impl Into<String>,
        body: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.entries.retain(|n| n.id != id);
        self.entries.push(ScheduledNotification {
            id,
            title: title.into(),
            body: body.into(),
            scheduled_time: at,
            triggered: false,
        });
        tracing::debug!("Scheduled reminder {} at {}", id, at);
        self.persist()
    }

    /// Remove a reminder; returns whether one existed
    pub fn cancel(&mut self, id: Uuid) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        tracing::debug!("Cancelled reminder {}", id);
        self.persist()?;
        Ok(true)
    }

    /// Return reminders that are due at `now` and mark them triggered.
    ///
    /// Triggered reminders older than an hour are purged afterwards.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotification>> {
        let mut due = Vec::new();
        for entry in &mut self.entries {
            if !entry.triggered && entry.scheduled_time <= now {
                entry.triggered = true;
                due.push(entry.clone());
            }
        }

        if due.is_empty() {
            return Ok(due);
        }

        let cutoff = now - Duration::hours(TRIGGERED_RETENTION_HOURS);
        self.entries
            .retain(|n| !n.triggered || n.scheduled_time > cutoff);

        tracing::info!("{} reminder(s) due", due.len());
        self.persist()?;
        Ok(due)
    }

    /// Untriggered reminders, soonest first
    pub fn pending(&self) -> Vec<&ScheduledNotification> {
        let mut pending: Vec<_> = self.entries.iter().filter(|n| !n.triggered).collect();
        pending.sort_by_key(|n| n.scheduled_time);
        pending
    }

    pub fn get(&self, id: Uuid) -> Option<&ScheduledNotification> {
        self.entries.iter().find(|n| n.id == id)
    }

    fn persist(&mut self) -> Result<()> {
        storage::save_json(&mut self.storage, REMINDERS_KEY, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    #[test]
    fn test_due_reminders_fire_once() {
        let mut queue = ReminderQueue::load(MemoryStore::new());
        let early = Uuid::new_v4();
        let late = Uuid::new_v4();
        queue.schedule(early, "ICU action: 1-1", "Check lactate", at(10)).unwrap();
        queue.schedule(late, "ICU action: 2-1", "Wean FiO2", at(60)).unwrap();

        assert!(queue.take_due(at(5)).unwrap().is_empty());

        let due = queue.take_due(at(10)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, early);
        assert_eq!(due[0].body, "Check lactate");

        assert!(queue.take_due(at(30)).unwrap().is_empty());
        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.pending()[0].id, late);
    }

    #[test]
    fn test_schedule_replaces_same_id() {
        let mut queue = ReminderQueue::load(MemoryStore::new());
        let id = Uuid::new_v4();
        queue.schedule(id, "a", "first", at(10)).unwrap();
        queue.schedule(id, "a", "second", at(20)).unwrap();

        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.get(id).unwrap().body, "second");
    }

    #[test]
    fn test_cancel() {
        let mut queue = ReminderQueue::load(MemoryStore::new());
        let id = Uuid::new_v4();
        queue.schedule(id, "a", "b", at(10)).unwrap();

        assert!(queue.cancel(id).unwrap());
        assert!(!queue.cancel(id).unwrap());
        assert!(queue.take_due(at(20)).unwrap().is_empty());
    }

    #[test]
    fn test_old_triggered_reminders_purged() {
        let mut queue = ReminderQueue::load(MemoryStore::new());
        let old = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        queue.schedule(old, "a", "old", at(0)).unwrap();
        queue.take_due(at(1)).unwrap();

        queue.schedule(fresh, "a", "fresh", at(120)).unwrap();
        queue.take_due(at(120)).unwrap();

        assert!(queue.get(old).is_none());
        assert!(queue.get(fresh).unwrap().triggered);
    }

    #[test]
    fn test_queue_persists() {
        let backing = MemoryStore::new();
        let id = Uuid::new_v4();
        {
            let mut queue = ReminderQueue::load(backing.clone());
            queue.schedule(id, "title", "body", at(15)).unwrap();
        }

        let mut reloaded = ReminderQueue::load(backing);
        let due = reloaded.take_due(at(15)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "title");
    }
}
