use thiserror::Error;

/// Erreurs du gestionnaire d'occurrences. Chaque échec laisse l'occurrence intacte.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShiftError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("shift is full (capacity {capacity})")]
    CapacityExceeded { capacity: u32 },
    #[error("capacity {requested} is below the {signed_up} volunteer(s) already signed up")]
    CapacityBelowSignups { requested: u32, signed_up: usize },
    #[error("volunteer {0} is already signed up")]
    AlreadySignedUp(String),
    #[error("volunteer {0} is not signed up")]
    NotSignedUp(String),
    #[error("shift still has {0} active signup(s); use force to cascade")]
    HasActiveSignups(usize),
    #[error("shift has been deleted")]
    Deleted,
}

impl ShiftError {
    pub(crate) fn invalid_range() -> Self {
        ShiftError::Validation("end must be strictly after start".to_string())
    }
}
