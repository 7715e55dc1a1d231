//! Gestion des occurrences : capacité, inscriptions, replanification.
//!
//! Seules ces opérations modifient une [`ShiftOccurrence`] ; elles valident
//! avant d'écrire, donc une erreur ne laisse jamais d'état partiel.

mod mutate;
mod types;

pub use types::ShiftError;

use crate::calendar::WeekdaySet;
use crate::model::{ShiftId, ShiftOccurrence};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Contrôle d'une capacité reçue de l'extérieur (`>= 0`, tient dans un `u32`).
pub fn checked_capacity(raw: i64) -> Result<u32, ShiftError> {
    if raw < 0 {
        return Err(ShiftError::Validation(format!(
            "capacity must be >= 0 (got {raw})"
        )));
    }
    u32::try_from(raw)
        .map_err(|_| ShiftError::Validation(format!("capacity too large: {raw}")))
}

impl ShiftOccurrence {
    /// Crée une occurrence en validant que `end > start`.
    pub fn create(
        name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capacity: u32,
        recurrence: WeekdaySet,
    ) -> Result<Self, ShiftError> {
        if end <= start {
            return Err(ShiftError::invalid_range());
        }
        Ok(Self {
            id: ShiftId::random(),
            name: name.into(),
            start,
            end,
            recurrence,
            capacity,
            volunteers: BTreeSet::new(),
            revision: 0,
            deleted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ShiftState, VolunteerId};
    use chrono::TimeZone;

    fn occ(capacity: u32) -> ShiftOccurrence {
        let start = Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 10, 2, 12, 0, 0).unwrap();
        ShiftOccurrence::create("Banque alimentaire", start, end, capacity, WeekdaySet::new())
            .unwrap()
    }

    fn v(s: &str) -> VolunteerId {
        VolunteerId::new(s)
    }

    #[test]
    fn create_rejects_inverted_range() {
        let t = Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).unwrap();
        let err = ShiftOccurrence::create("x", t, t, 1, WeekdaySet::new()).unwrap_err();
        assert!(matches!(err, ShiftError::Validation(_)));
    }

    #[test]
    fn checked_capacity_bounds() {
        assert_eq!(checked_capacity(0), Ok(0));
        assert_eq!(checked_capacity(12), Ok(12));
        assert!(matches!(checked_capacity(-1), Err(ShiftError::Validation(_))));
        assert!(matches!(
            checked_capacity(i64::from(u32::MAX) + 1),
            Err(ShiftError::Validation(_))
        ));
    }

    #[test]
    fn zero_capacity_is_full_and_rejects_signup() {
        let mut o = occ(0);
        assert_eq!(o.state(), ShiftState::Full);
        assert_eq!(
            o.sign_up(&v("a")),
            Err(ShiftError::CapacityExceeded { capacity: 0 })
        );
    }

    #[test]
    fn duplicate_signup_is_rejected() {
        let mut o = occ(3);
        o.sign_up(&v("a")).unwrap();
        assert_eq!(o.sign_up(&v("a")), Err(ShiftError::AlreadySignedUp("a".into())));
        assert_eq!(o.signed_up(), 1);
    }

    #[test]
    fn full_shift_reports_capacity_before_duplicate() {
        let mut o = occ(1);
        o.sign_up(&v("a")).unwrap();
        assert_eq!(
            o.sign_up(&v("a")),
            Err(ShiftError::CapacityExceeded { capacity: 1 })
        );
    }

    #[test]
    fn withdraw_unknown_volunteer() {
        let mut o = occ(1);
        assert_eq!(o.withdraw(&v("zoe")), Err(ShiftError::NotSignedUp("zoe".into())));
    }

    #[test]
    fn capacity_cannot_drop_below_signups() {
        let mut o = occ(3);
        o.sign_up(&v("a")).unwrap();
        o.sign_up(&v("b")).unwrap();
        let before = o.clone();
        assert_eq!(
            o.update_capacity(1),
            Err(ShiftError::CapacityBelowSignups { requested: 1, signed_up: 2 })
        );
        assert_eq!(o, before);
        o.update_capacity(2).unwrap();
        assert_eq!(o.state(), ShiftState::Full);
        o.update_capacity(5).unwrap();
        assert_eq!(o.remaining(), 3);
    }

    #[test]
    fn reschedule_keeps_signups() {
        let mut o = occ(2);
        o.sign_up(&v("a")).unwrap();
        let new_start = Utc.with_ymd_and_hms(2024, 10, 9, 14, 0, 0).unwrap();
        let new_end = Utc.with_ymd_and_hms(2024, 10, 9, 17, 0, 0).unwrap();
        assert!(matches!(
            o.reschedule(new_end, new_start),
            Err(ShiftError::Validation(_))
        ));
        o.reschedule(new_start, new_end).unwrap();
        assert_eq!(o.start(), new_start);
        assert_eq!(o.capacity(), 2);
        assert!(o.is_signed_up(&v("a")));
        assert_eq!(o.duration_minutes(), 180);
    }

    #[test]
    fn delete_requires_force_with_signups() {
        let mut o = occ(2);
        o.sign_up(&v("a")).unwrap();
        assert_eq!(o.delete(false), Err(ShiftError::HasActiveSignups(1)));
        assert_eq!(o.state(), ShiftState::Scheduled);
        let cascaded = o.delete(true).unwrap();
        assert_eq!(cascaded, vec![v("a")]);
        assert_eq!(o.state(), ShiftState::Deleted);
        assert_eq!(o.sign_up(&v("b")), Err(ShiftError::Deleted));
        assert_eq!(o.delete(true), Err(ShiftError::Deleted));
    }
}
