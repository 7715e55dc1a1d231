#![forbid(unsafe_code)]
//! Shiftboard : moteur de planification de créneaux bénévoles récurrents.
//!
//! - Récurrences hebdomadaires (ensemble de jours + fenêtre de dates).
//! - Occurrences avec capacité ; jamais plus d'inscrits que de places.
//! - Concurrence optimiste par révision, tentatives bornées.
//! - Tout en UTC ; parsing ISO 8601 ; affichage local en dehors de la lib.

pub mod access;
pub mod calendar;
pub mod config;
pub mod io;
pub mod model;
pub mod notification;
pub mod plan;
pub mod recurrence;
pub mod scheduler;
pub mod shift;
pub mod storage;

pub use access::{Action, AllowAll, Authorizer, Caller, Role};
pub use calendar::{
    combine, enumerate_weekdays, normalize, week_range, CalendarError, DateWindow, WeekdaySet,
};
pub use config::{load_options, SchedulingOptions};
pub use model::{ShiftId, ShiftOccurrence, ShiftState, VolunteerId};
pub use notification::{
    prepare_reminder, LogNotifier, NoopNotifier, NoticeRenderer, Notifier, Reminder,
    SignupChange, SignupEvent, TextNotice,
};
pub use plan::{load_plan_from_file, ShiftPlan};
pub use recurrence::{find_next_occurrence, is_within_recurrence, occurrence_dates};
pub use scheduler::{NewShift, Scheduler, SchedulingError};
pub use shift::{checked_capacity, ShiftError};
pub use storage::{JsonStore, MemoryStore, ShiftStore, StoreError};
