use crate::calendar::{self, DateWindow, WeekdaySet};
use crate::model::ShiftOccurrence;
use crate::recurrence;
use crate::shift::ShiftError;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Définition d'un créneau (récurrent ou ponctuel) avant expansion en occurrences.
///
/// Avec `days` vide, le plan décrit un créneau ponctuel : la fenêtre doit alors
/// tenir sur un seul jour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftPlan {
    pub name: String,
    #[serde(default)]
    pub days: WeekdaySet,
    pub window: DateWindow,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: u32,
}

impl ShiftPlan {
    pub fn validate(&self) -> Result<(), ShiftError> {
        if self.name.trim().is_empty() {
            return Err(ShiftError::Validation("plan name cannot be empty".into()));
        }
        if self.start_time == self.end_time {
            return Err(ShiftError::Validation(
                "start_time and end_time cannot be equal".into(),
            ));
        }
        if self.days.is_empty() && self.window.len_days() != 1 {
            return Err(ShiftError::Validation(
                "a one-off plan must cover a single day".into(),
            ));
        }
        Ok(())
    }

    /// Dates concernées par le plan.
    pub fn dates(&self) -> Vec<NaiveDate> {
        if self.days.is_empty() {
            vec![self.window.start()]
        } else {
            recurrence::occurrence_dates(self.days, &self.window)
        }
    }

    /// Génère une occurrence par date. Un créneau dont l'heure de fin précède
    /// l'heure de début se termine le lendemain.
    pub fn expand(&self) -> Result<Vec<ShiftOccurrence>, ShiftError> {
        self.validate()?;
        self.dates()
            .into_iter()
            .map(|date| {
                let (start, end) = build_datetimes(date, self.start_time, self.end_time)?;
                ShiftOccurrence::create(self.name.clone(), start, end, self.capacity, self.days)
            })
            .collect()
    }
}

fn build_datetimes(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ShiftError> {
    let start = calendar::combine(date, start_time);
    let end_date = if end_time <= start_time {
        date.succ_opt()
            .ok_or_else(|| ShiftError::Validation("date overflow".into()))?
    } else {
        date
    };
    Ok((start, calendar::combine(end_date, end_time)))
}

pub fn load_plan_from_file<P: AsRef<Path>>(path: P) -> Result<ShiftPlan> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading plan {}", path.display()))?;
    let plan: ShiftPlan = serde_json::from_slice(&data)
        .with_context(|| format!("parsing plan {}", path.display()))?;
    plan.validate()?;
    Ok(plan)
}

pub fn export_plan_json<P: AsRef<Path>>(path: P, plan: &ShiftPlan) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;
    fs::write(path, json)?;
    Ok(())
}
