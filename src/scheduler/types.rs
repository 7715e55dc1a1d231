use crate::access::Action;
use crate::calendar::WeekdaySet;
use crate::shift::ShiftError;
use crate::storage::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Demande de création d'un créneau ponctuel ou d'une occurrence récurrente.
///
/// La capacité arrive telle quelle de l'extérieur et n'est validée qu'ici.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShift {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub capacity: i64,
    #[serde(default)]
    pub days: WeekdaySet,
}

/// Erreurs exposées à la couche API.
///
/// Les erreurs métier passent telles quelles ; les conflits de version restent
/// internes et deviennent `Transient` après épuisement des tentatives.
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error(transparent)]
    Shift(#[from] ShiftError),
    #[error("shift not found: {0}")]
    NotFound(String),
    #[error("caller {caller} may not {action}")]
    Forbidden { caller: String, action: &'static str },
    #[error("shift {id} is busy, gave up after {attempts} attempt(s)")]
    Transient { id: String, attempts: u32 },
    #[error("storage failure: {0}")]
    Store(anyhow::Error),
}

impl SchedulingError {
    pub(super) fn forbidden(caller: &str, action: Action) -> Self {
        SchedulingError::Forbidden {
            caller: caller.to_string(),
            action: action.as_str(),
        }
    }

    /// Vrai si l'appelant peut réessayer plus tard.
    pub fn is_transient(&self) -> bool {
        matches!(self, SchedulingError::Transient { .. })
    }
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SchedulingError::NotFound(id),
            StoreError::VersionConflict { id, .. } => SchedulingError::Transient { id, attempts: 1 },
            StoreError::Backend(source) => SchedulingError::Store(source),
            other => SchedulingError::Store(anyhow::Error::new(other)),
        }
    }
}

/// Issue d'une tentative lecture-modification-écriture.
pub(super) enum Attempt<T> {
    Done(T),
    Conflict,
}
