use crate::calendar::{self, DateWindow, WeekdaySet};
use crate::model::ShiftOccurrence;
use crate::plan::ShiftPlan;
use crate::shift::checked_capacity;
use anyhow::{bail, Context};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// Import de plans: header `name,days,start_date,end_date,start_time,end_time,capacity`.
///
/// `days` vide = créneau ponctuel (start_date == end_date).
pub fn import_plans_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ShiftPlan>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let row = line + 2;
        let field = |idx: usize, name: &str| {
            rec.get(idx)
                .map(str::trim)
                .with_context(|| format!("row {row}: missing {name}"))
        };
        let name = field(0, "name")?;
        if name.is_empty() {
            bail!("row {row}: empty name");
        }
        let days: WeekdaySet = field(1, "days")?
            .parse()
            .with_context(|| format!("row {row}: invalid days"))?;
        let start = calendar::parse_date(field(2, "start_date")?)?;
        let end = calendar::parse_date(field(3, "end_date")?)?;
        let window = DateWindow::new(start, end).with_context(|| format!("row {row}"))?;
        let start_time = calendar::parse_time(field(4, "start_time")?)?;
        let end_time = calendar::parse_time(field(5, "end_time")?)?;
        let raw_capacity: i64 = field(6, "capacity")?
            .parse()
            .with_context(|| format!("row {row}: capacity is not an integer"))?;
        let plan = ShiftPlan {
            name: name.to_string(),
            days,
            window,
            start_time,
            end_time,
            capacity: checked_capacity(raw_capacity)?,
        };
        plan.validate().with_context(|| format!("row {row}"))?;
        out.push(plan);
    }
    Ok(out)
}

/// Export JSON des occurrences (jolie mise en forme)
pub fn export_shifts_json<P: AsRef<Path>>(path: P, shifts: &[ShiftOccurrence]) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(shifts)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV: header `id,name,start,end,days,capacity,signed_up,state`
pub fn export_shifts_csv<P: AsRef<Path>>(path: P, shifts: &[ShiftOccurrence]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["id", "name", "start", "end", "days", "capacity", "signed_up", "state"])?;
    for s in shifts {
        w.write_record(shift_record(s))?;
    }
    w.flush()?;
    Ok(())
}

fn shift_record(s: &ShiftOccurrence) -> [String; 8] {
    [
        s.id().as_str().to_string(),
        s.name().to_string(),
        s.start().to_rfc3339(),
        s.end().to_rfc3339(),
        s.recurrence().to_string(),
        s.capacity().to_string(),
        s.signed_up().to_string(),
        s.state().as_str().to_string(),
    ]
}
