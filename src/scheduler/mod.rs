//! Façade de planification : valide les requêtes externes, applique les
//! opérations du gestionnaire d'occurrences sous concurrence optimiste, puis
//! notifie.

mod types;

pub use types::{NewShift, SchedulingError};

use crate::access::{Action, AllowAll, Authorizer, Caller};
use crate::calendar::DateWindow;
use crate::config::SchedulingOptions;
use crate::model::{ShiftId, ShiftOccurrence, VolunteerId};
use crate::notification::{NoopNotifier, Notifier, SignupChange, SignupEvent};
use crate::plan::ShiftPlan;
use crate::shift::{checked_capacity, ShiftError};
use crate::storage::{ShiftStore, StoreError};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use types::Attempt;

/// Scheduler : point d'entrée de la couche API.
pub struct Scheduler<S, A = AllowAll, N = NoopNotifier> {
    store: S,
    authorizer: A,
    notifier: N,
    options: SchedulingOptions,
}

impl<S: ShiftStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            authorizer: AllowAll,
            notifier: NoopNotifier,
            options: SchedulingOptions::default(),
        }
    }
}

impl<S, A, N> Scheduler<S, A, N>
where
    S: ShiftStore,
    A: Authorizer,
    N: Notifier,
{
    pub fn with_authorizer<B: Authorizer>(self, authorizer: B) -> Scheduler<S, B, N> {
        Scheduler {
            store: self.store,
            authorizer,
            notifier: self.notifier,
            options: self.options,
        }
    }

    pub fn with_notifier<M: Notifier>(self, notifier: M) -> Scheduler<S, A, M> {
        Scheduler {
            store: self.store,
            authorizer: self.authorizer,
            notifier,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: SchedulingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SchedulingOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_shift(
        &self,
        caller: &Caller,
        request: NewShift,
    ) -> Result<ShiftOccurrence, SchedulingError> {
        self.authorize(caller, Action::CreateShift, None)?;
        if request.name.trim().is_empty() {
            return Err(ShiftError::Validation("shift name cannot be empty".into()).into());
        }
        let capacity = checked_capacity(request.capacity)?;
        let shift = ShiftOccurrence::create(
            request.name,
            request.start,
            request.end,
            capacity,
            request.days,
        )?;
        self.store.insert(&shift)?;
        info!(shift = %shift.id(), caller = %caller.id, capacity, "shift created");
        Ok(shift)
    }

    /// Expanse un plan et enregistre toutes ses occurrences en une écriture :
    /// un échec de stockage n'en laisse aucune.
    pub fn plan_shifts(
        &self,
        caller: &Caller,
        plan: &ShiftPlan,
    ) -> Result<Vec<ShiftOccurrence>, SchedulingError> {
        self.authorize(caller, Action::CreateShift, None)?;
        let shifts = plan.expand()?;
        self.store.insert_many(&shifts)?;
        info!(
            plan = %plan.name,
            window = %plan.window,
            count = shifts.len(),
            "recurring shifts created"
        );
        Ok(shifts)
    }

    pub fn shift(&self, id: &ShiftId) -> Result<ShiftOccurrence, SchedulingError> {
        Ok(self.store.load(id)?)
    }

    pub fn shifts(&self) -> Result<Vec<ShiftOccurrence>, SchedulingError> {
        Ok(self.store.list()?)
    }

    /// Occurrences dont la date (UTC) tombe dans la fenêtre.
    pub fn shifts_in(&self, window: &DateWindow) -> Result<Vec<ShiftOccurrence>, SchedulingError> {
        let mut shifts = self.store.list()?;
        shifts.retain(|s| window.contains(s.date()));
        Ok(shifts)
    }

    pub fn sign_up(
        &self,
        caller: &Caller,
        id: &ShiftId,
        volunteer: &VolunteerId,
    ) -> Result<ShiftOccurrence, SchedulingError> {
        self.authorize(caller, Action::SignUp, Some(id))?;
        let (shift, ()) = self.mutate(id, |shift| shift.sign_up(volunteer))?;
        info!(shift = %id, %volunteer, state = shift.state().as_str(), "volunteer signed up");
        self.emit(SignupEvent::new(SignupChange::SignedUp, volunteer, &shift));
        Ok(shift)
    }

    pub fn withdraw(
        &self,
        caller: &Caller,
        id: &ShiftId,
        volunteer: &VolunteerId,
    ) -> Result<ShiftOccurrence, SchedulingError> {
        self.authorize(caller, Action::Withdraw, Some(id))?;
        let (shift, ()) = self.mutate(id, |shift| shift.withdraw(volunteer))?;
        info!(shift = %id, %volunteer, "volunteer withdrew");
        self.emit(SignupEvent::new(SignupChange::Withdrew, volunteer, &shift));
        Ok(shift)
    }

    pub fn update_capacity(
        &self,
        caller: &Caller,
        id: &ShiftId,
        capacity: i64,
    ) -> Result<ShiftOccurrence, SchedulingError> {
        self.authorize(caller, Action::UpdateCapacity, Some(id))?;
        let capacity = checked_capacity(capacity)?;
        let (shift, ()) = self.mutate(id, |shift| shift.update_capacity(capacity))?;
        info!(shift = %id, capacity, "capacity updated");
        Ok(shift)
    }

    pub fn reschedule(
        &self,
        caller: &Caller,
        id: &ShiftId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ShiftOccurrence, SchedulingError> {
        self.authorize(caller, Action::Reschedule, Some(id))?;
        let (shift, ()) = self.mutate(id, |shift| shift.reschedule(start, end))?;
        info!(shift = %id, start = %start.to_rfc3339(), end = %end.to_rfc3339(), "shift rescheduled");
        Ok(shift)
    }

    /// Supprime une occurrence. Avec `force`, les inscriptions sont annulées en
    /// cascade et renvoyées.
    pub fn delete(
        &self,
        caller: &Caller,
        id: &ShiftId,
        force: bool,
    ) -> Result<Vec<VolunteerId>, SchedulingError> {
        let action = if force { Action::ForceDelete } else { Action::Delete };
        self.authorize(caller, action, Some(id))?;

        let (removed, cascaded) = self.retrying(id, || {
            let mut shift = self.store.load(id)?;
            let expected = shift.revision();
            let cascaded = shift.delete(force)?;
            match self.store.delete(id, expected) {
                Ok(()) => Ok(Attempt::Done((shift, cascaded))),
                Err(StoreError::VersionConflict { .. }) => Ok(Attempt::Conflict),
                Err(err) => Err(err.into()),
            }
        })?;

        if cascaded.is_empty() {
            info!(shift = %id, caller = %caller.id, "shift deleted");
        } else {
            warn!(
                shift = %id,
                caller = %caller.id,
                cancelled = cascaded.len(),
                "shift force-deleted, signups cancelled"
            );
            for volunteer in &cascaded {
                self.emit(SignupEvent::new(SignupChange::Cancelled, volunteer, &removed));
            }
        }
        Ok(cascaded)
    }

    fn authorize(
        &self,
        caller: &Caller,
        action: Action,
        shift: Option<&ShiftId>,
    ) -> Result<(), SchedulingError> {
        if self.authorizer.allows(caller, action, shift) {
            return Ok(());
        }
        warn!(caller = %caller.id, action = action.as_str(), "mutation refused");
        Err(SchedulingError::forbidden(&caller.id, action))
    }

    /// Lecture, application sur une copie, écriture conditionnée à la révision lue.
    fn mutate<T>(
        &self,
        id: &ShiftId,
        mut op: impl FnMut(&mut ShiftOccurrence) -> Result<T, ShiftError>,
    ) -> Result<(ShiftOccurrence, T), SchedulingError> {
        self.retrying(id, || {
            let mut shift = self.store.load(id)?;
            let expected = shift.revision();
            let out = op(&mut shift)?;
            match self.store.save(&shift, expected) {
                Ok(revision) => {
                    shift.revision = revision;
                    Ok(Attempt::Done((shift, out)))
                }
                Err(StoreError::VersionConflict { .. }) => Ok(Attempt::Conflict),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn retrying<T>(
        &self,
        id: &ShiftId,
        mut attempt: impl FnMut() -> Result<Attempt<T>, SchedulingError>,
    ) -> Result<T, SchedulingError> {
        let attempts = self.options.max_attempts.max(1);
        for n in 1..=attempts {
            match attempt()? {
                Attempt::Done(value) => return Ok(value),
                Attempt::Conflict => debug!(shift = %id, attempt = n, "version conflict, retrying"),
            }
        }
        warn!(shift = %id, attempts, "giving up after repeated version conflicts");
        Err(SchedulingError::Transient {
            id: id.as_str().to_string(),
            attempts,
        })
    }

    fn emit(&self, event: SignupEvent) {
        if let Err(err) = self.notifier.notify(&event) {
            warn!(shift = %event.shift_id, volunteer = %event.volunteer, error = %err, "notification failed");
        }
    }
}
