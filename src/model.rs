use crate::calendar::{self, WeekdaySet};
use crate::shift::ShiftError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Identifiant fort pour un bénévole
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolunteerId(String);

impl VolunteerId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolunteerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour une occurrence de créneau
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShiftId(String);

impl ShiftId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// État dérivé d'une occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftState {
    /// Places restantes, inscriptions ouvertes.
    Scheduled,
    Full,
    /// Terminal.
    Deleted,
}

impl ShiftState {
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftState::Scheduled => "scheduled",
            ShiftState::Full => "full",
            ShiftState::Deleted => "deleted",
        }
    }
}

/// Occurrence concrète d'un créneau (UTC).
///
/// Les champs sont en lecture seule hors du crate : toute mutation passe par
/// les opérations de [`crate::shift`], qui garantissent `volunteers.len() <= capacity`.
/// La désérialisation revérifie ces bornes (tableau édité à la main).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOccurrence")]
pub struct ShiftOccurrence {
    pub(crate) id: ShiftId,
    pub(crate) name: String,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) recurrence: WeekdaySet,
    pub(crate) capacity: u32,
    pub(crate) volunteers: BTreeSet<VolunteerId>,
    /// Révision pour la concurrence optimiste.
    pub(crate) revision: u64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) deleted: bool,
}

#[derive(Deserialize)]
struct RawOccurrence {
    id: ShiftId,
    name: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    recurrence: WeekdaySet,
    capacity: u32,
    #[serde(default)]
    volunteers: BTreeSet<VolunteerId>,
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    deleted: bool,
}

impl TryFrom<RawOccurrence> for ShiftOccurrence {
    type Error = ShiftError;

    fn try_from(raw: RawOccurrence) -> Result<Self, Self::Error> {
        if raw.end <= raw.start {
            return Err(ShiftError::invalid_range());
        }
        if raw.volunteers.len() > raw.capacity as usize {
            return Err(ShiftError::Validation(format!(
                "shift {} has {} signup(s) for capacity {}",
                raw.id,
                raw.volunteers.len(),
                raw.capacity
            )));
        }
        Ok(Self {
            id: raw.id,
            name: raw.name,
            start: raw.start,
            end: raw.end,
            recurrence: raw.recurrence,
            capacity: raw.capacity,
            volunteers: raw.volunteers,
            revision: raw.revision,
            deleted: raw.deleted,
        })
    }
}

impl ShiftOccurrence {
    pub fn id(&self) -> &ShiftId {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
    pub fn recurrence(&self) -> WeekdaySet {
        self.recurrence
    }
    pub fn is_recurring(&self) -> bool {
        !self.recurrence.is_empty()
    }
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
    pub fn volunteers(&self) -> &BTreeSet<VolunteerId> {
        &self.volunteers
    }
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Date calendaire UTC du début.
    pub fn date(&self) -> NaiveDate {
        calendar::normalize(&self.start)
    }

    pub fn signed_up(&self) -> usize {
        self.volunteers.len()
    }

    pub fn remaining(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.volunteers.len())
    }

    pub fn is_signed_up(&self, volunteer: &VolunteerId) -> bool {
        self.volunteers.contains(volunteer)
    }

    pub fn state(&self) -> ShiftState {
        if self.deleted {
            ShiftState::Deleted
        } else if self.volunteers.len() >= self.capacity as usize {
            ShiftState::Full
        } else {
            ShiftState::Scheduled
        }
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored(start_hour: u32, end_hour: u32, capacity: u32, volunteers: &[&str]) -> String {
        let start = Utc.with_ymd_and_hms(2024, 10, 2, start_hour, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 10, 2, end_hour, 0, 0).unwrap();
        serde_json::json!({
            "id": "s1",
            "name": "Tri",
            "start": start,
            "end": end,
            "capacity": capacity,
            "volunteers": volunteers,
            "revision": 4,
        })
        .to_string()
    }

    #[test]
    fn deserialize_checks_bounds() {
        let ok: ShiftOccurrence = serde_json::from_str(&stored(9, 12, 2, &["ana", "bob"])).unwrap();
        assert_eq!((ok.revision(), ok.state()), (4, ShiftState::Full));
        assert!(!ok.is_recurring());

        let overbooked = serde_json::from_str::<ShiftOccurrence>(&stored(9, 12, 1, &["ana", "bob"]));
        assert!(overbooked.unwrap_err().to_string().contains("2 signup(s) for capacity 1"));

        let backwards = serde_json::from_str::<ShiftOccurrence>(&stored(12, 9, 2, &[]));
        assert!(backwards.unwrap_err().to_string().contains("end must be strictly after start"));
        assert!(serde_json::from_str::<ShiftOccurrence>(&stored(9, 9, 2, &[])).is_err());
    }

    #[test]
    fn serialized_occurrence_reads_back() {
        let shift: ShiftOccurrence = serde_json::from_str(&stored(9, 12, 3, &["ana"])).unwrap();
        let json = serde_json::to_string(&shift).unwrap();
        assert!(!json.contains("deleted"));
        assert_eq!(serde_json::from_str::<ShiftOccurrence>(&json).unwrap(), shift);
    }
}
