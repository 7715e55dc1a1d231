use super::ShiftError;
use crate::model::{ShiftOccurrence, VolunteerId};
use chrono::{DateTime, Utc};

impl ShiftOccurrence {
    fn ensure_live(&self) -> Result<(), ShiftError> {
        if self.deleted {
            return Err(ShiftError::Deleted);
        }
        Ok(())
    }

    /// Inscrit un bénévole. La capacité est vérifiée avant le doublon.
    pub fn sign_up(&mut self, volunteer: &VolunteerId) -> Result<(), ShiftError> {
        self.ensure_live()?;
        if self.volunteers.len() >= self.capacity as usize {
            return Err(ShiftError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        if self.volunteers.contains(volunteer) {
            return Err(ShiftError::AlreadySignedUp(volunteer.as_str().to_string()));
        }
        self.volunteers.insert(volunteer.clone());
        Ok(())
    }

    pub fn withdraw(&mut self, volunteer: &VolunteerId) -> Result<(), ShiftError> {
        self.ensure_live()?;
        if !self.volunteers.remove(volunteer) {
            return Err(ShiftError::NotSignedUp(volunteer.as_str().to_string()));
        }
        Ok(())
    }

    /// Jamais en dessous du nombre d'inscrits.
    pub fn update_capacity(&mut self, capacity: u32) -> Result<(), ShiftError> {
        self.ensure_live()?;
        if (capacity as usize) < self.volunteers.len() {
            return Err(ShiftError::CapacityBelowSignups {
                requested: capacity,
                signed_up: self.volunteers.len(),
            });
        }
        self.capacity = capacity;
        Ok(())
    }

    pub fn reschedule(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ShiftError> {
        self.ensure_live()?;
        if end <= start {
            return Err(ShiftError::invalid_range());
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Passe l'occurrence à l'état supprimé.
    ///
    /// Sans `force`, refuse tant qu'il reste des inscrits. Avec `force`, vide
    /// les inscriptions et renvoie les bénévoles concernés pour que l'appelant
    /// trace la cascade.
    pub fn delete(&mut self, force: bool) -> Result<Vec<VolunteerId>, ShiftError> {
        self.ensure_live()?;
        if !self.volunteers.is_empty() && !force {
            return Err(ShiftError::HasActiveSignups(self.volunteers.len()));
        }
        let cascaded = std::mem::take(&mut self.volunteers).into_iter().collect();
        self.deleted = true;
        Ok(cascaded)
    }
}
