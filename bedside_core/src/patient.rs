//! Patient record store.
//!
//! Owns one `BedRecord` per configured bed plus the selected bed, and
//! persists both through a `KeyValueStore`. Stored data from older schema
//! versions is backfilled on load; unreadable data is replaced by defaults.

use crate::storage::{self, KeyValueStore, BEDS_KEY, SELECTED_BED_KEY};
use crate::{derived, BedRecord, Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Fields that are computed or identify the record
const READ_ONLY_FIELDS: &[&str] = &[
    "bed_id",
    "ideal_body_weight",
    "body_mass_index",
    "body_surface_area",
];

/// Single source of truth for all bed records
#[derive(Debug)]
pub struct PatientStore<S: KeyValueStore> {
    storage: S,
    records: Vec<BedRecord>,
    selected: usize,
}

impl<S: KeyValueStore> PatientStore<S> {
    /// Load the bed list and selection from `storage`.
    ///
    /// The resulting list always matches `bed_ids` in length and order:
    /// stored records are reused by id, missing beds get an empty record and
    /// stored beds that are no longer configured are dropped.
    pub fn initialize(storage: S, bed_ids: &[String]) -> Result<Self> {
        if bed_ids.is_empty() {
            return Err(Error::Config("at least one bed id is required".into()));
        }

        let stored: Option<Vec<Value>> = storage::load_json(&storage, BEDS_KEY);
        let records = match stored {
            Some(stored) => reconcile(parse_records(stored), bed_ids),
            None => {
                tracing::info!("No stored bed list, creating {} empty beds", bed_ids.len());
                bed_ids.iter().map(BedRecord::empty).collect()
            }
        };

        let stored_selection = match storage.get(SELECTED_BED_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Unable to read selected bed: {}. Using first bed.", e);
                None
            }
        };

        let selected = stored_selection
            .as_deref()
            .map(str::trim)
            .and_then(|id| records.iter().position(|r| r.bed_id == id))
            .unwrap_or_else(|| {
                if let Some(id) = &stored_selection {
                    tracing::info!("Stored bed '{}' no longer exists, selecting first bed", id);
                }
                0
            });

        Ok(Self {
            storage,
            records,
            selected,
        })
    }

    /// All records in ward order
    pub fn records(&self) -> &[BedRecord] {
        &self.records
    }

    /// Configured bed ids in ward order
    pub fn bed_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.bed_id.as_str())
    }

    /// Look up a record by bed id
    pub fn record(&self, bed_id: &str) -> Option<&BedRecord> {
        self.records.iter().find(|r| r.bed_id == bed_id)
    }

    pub fn selected_bed_id(&self) -> &str {
        &self.records[self.selected].bed_id
    }

    /// The selected bed's record
    pub fn current(&self) -> &BedRecord {
        &self.records[self.selected]
    }

    /// Mutable access for screens; call `save()` afterwards
    pub fn current_mut(&mut self) -> &mut BedRecord {
        &mut self.records[self.selected]
    }

    /// Select `bed_id` and persist the selection.
    ///
    /// Returns `Ok(false)` without changing anything when the id is unknown.
    pub fn select_bed(&mut self, bed_id: &str) -> Result<bool> {
        let Some(index) = self.records.iter().position(|r| r.bed_id == bed_id) else {
            tracing::debug!("Ignoring selection of unknown bed '{}'", bed_id);
            return Ok(false);
        };

        self.selected = index;
        self.persist()?;
        tracing::info!("Selected bed {}", bed_id);
        Ok(true)
    }

    /// Recompute derived values on the current record and persist everything
    pub fn save(&mut self) -> Result<()> {
        derived::recompute(self.current_mut());
        self.persist()
    }

    /// Empty the current record, keeping its bed id, and persist
    pub fn clear_current_bed(&mut self) -> Result<()> {
        self.current_mut().clear();
        tracing::info!("Cleared bed {}", self.selected_bed_id());
        self.persist()
    }

    /// Empty every record and persist; the selection is kept
    pub fn reset_all_beds(&mut self) -> Result<()> {
        for record in &mut self.records {
            record.clear();
        }
        tracing::info!("Reset all {} beds", self.records.len());
        self.persist()
    }

    /// Set one field on the current record by dotted path.
    ///
    /// Paths follow the stored field names, e.g. `weight_kg`, `sex`,
    /// `gas_exchange.fio2` or `ventilation.controlled.peep`. An empty value
    /// or `null` clears the field. Nothing is persisted until `save()`.
    pub fn update_current(&mut self, path: &str, raw: &str) -> Result<()> {
        let path = path.trim();
        if READ_ONLY_FIELDS.contains(&path) {
            return Err(Error::ReadOnlyField(path.to_string()));
        }

        let pointer = format!("/{}", path.replace('.', "/"));
        let mut value = serde_json::to_value(self.current())?;

        let slot = value
            .pointer_mut(&pointer)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        if slot.is_object() {
            // A group, not a field
            return Err(Error::UnknownField(path.to_string()));
        }
        *slot = parse_field_value(path, raw)?;

        let updated: BedRecord =
            serde_json::from_value(value).map_err(|_| Error::InvalidValue {
                field: path.to_string(),
                value: raw.to_string(),
            })?;
        *self.current_mut() = updated;

        tracing::debug!("Bed {}: set {} = {}", self.selected_bed_id(), path, raw);
        Ok(())
    }

    /// The underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&mut self) -> Result<()> {
        storage::save_json(&mut self.storage, BEDS_KEY, &self.records)?;
        let selected = self.records[self.selected].bed_id.clone();
        self.storage.set(SELECTED_BED_KEY, &selected)?;
        tracing::debug!("Persisted {} beds", self.records.len());
        Ok(())
    }
}

/// Deserialize stored records one at a time so a bad record only costs itself
fn parse_records(stored: Vec<Value>) -> Vec<BedRecord> {
    stored
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let bed_id = value
                .get("bed_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));
            match serde_json::from_value::<BedRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        "Unreadable stored bed '{}': {}. Using an empty record.",
                        bed_id,
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Order stored records by the configured bed list
fn reconcile(stored: Vec<BedRecord>, bed_ids: &[String]) -> Vec<BedRecord> {
    let mut by_id: HashMap<String, BedRecord> = HashMap::with_capacity(stored.len());
    for record in stored {
        if by_id.contains_key(&record.bed_id) {
            tracing::warn!("Duplicate stored bed '{}', keeping the first", record.bed_id);
            continue;
        }
        by_id.insert(record.bed_id.clone(), record);
    }

    let records: Vec<BedRecord> = bed_ids
        .iter()
        .map(|id| {
            by_id.remove(id).unwrap_or_else(|| {
                tracing::info!("Bed '{}' missing from stored data, adding it", id);
                BedRecord::empty(id)
            })
        })
        .collect();

    for id in by_id.keys() {
        tracing::warn!("Dropping stored bed '{}' that is not configured", id);
    }

    records
}

fn parse_field_value(path: &str, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(if path == "name" {
            Value::String(String::new())
        } else {
            Value::Null
        });
    }

    match path {
        "name" => Ok(Value::String(raw.to_string())),
        "sex" => match raw.to_lowercase().as_str() {
            "m" | "male" => Ok(Value::String("male".into())),
            "v" | "f" | "female" => Ok(Value::String("female".into())),
            _ => Err(Error::InvalidValue {
                field: path.to_string(),
                value: raw.to_string(),
            }),
        },
        "age" => match raw.parse::<f64>() {
            Ok(years) if years.is_finite() && years >= 0.0 => Ok(Value::from(years)),
            _ => Err(Error::InvalidValue {
                field: path.to_string(),
                value: raw.to_string(),
            }),
        },
        _ => {
            if let Ok(n) = raw.parse::<u64>() {
                return Ok(Value::from(n));
            }
            raw.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| Error::InvalidValue {
                    field: path.to_string(),
                    value: raw.to_string(),
                })
        }
    }
}
