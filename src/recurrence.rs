//! Résolution des récurrences hebdomadaires. Fonctions pures : aucune lecture
//! de l'horloge, aucune mutation.

use crate::calendar::{parse_day_symbol, DateWindow, WeekdaySet};
use chrono::{Datelike, NaiveDate, Weekday};

/// Premier jour `day` à partir de `window.start`, bornes incluses.
pub fn find_next_occurrence(day: Weekday, window: &DateWindow) -> Option<NaiveDate> {
    window.days().find(|d| d.weekday() == day)
}

/// Variante par symbole (`Mo`, `We`...) ; `None` si le symbole est inconnu.
pub fn find_next_by_symbol(symbol: &str, window: &DateWindow) -> Option<NaiveDate> {
    let day = parse_day_symbol(symbol)?;
    find_next_occurrence(day, window)
}

/// Vrai si `date` est dans la fenêtre et tombe un jour de la règle.
/// Une règle vide (créneau ponctuel) ne correspond jamais.
pub fn is_within_recurrence(date: NaiveDate, rule: WeekdaySet, window: &DateWindow) -> bool {
    !rule.is_empty() && window.contains(date) && rule.contains(date.weekday())
}

/// Toutes les dates de la règle dans la fenêtre, en ordre croissant.
pub fn occurrence_dates(rule: WeekdaySet, window: &DateWindow) -> Vec<NaiveDate> {
    if rule.is_empty() {
        return Vec::new();
    }
    window
        .days()
        .filter(|d| rule.contains(d.weekday()))
        .collect()
}

/// Première date de la fenêtre qui correspond à un des jours de la règle.
pub fn next_occurrence(rule: WeekdaySet, window: &DateWindow) -> Option<NaiveDate> {
    if rule.is_empty() {
        return None;
    }
    window.days().find(|d| rule.contains(d.weekday()))
}
