use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options du planificateur. Un champ absent du fichier garde sa valeur par défaut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingOptions {
    /// Nombre de tentatives lecture-modification-écriture avant échec transitoire.
    pub max_attempts: u32,
    pub reminder_days_before: i64,
}

impl Default for SchedulingOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            reminder_days_before: 2,
        }
    }
}

impl SchedulingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("max_attempts must be > 0");
        }
        if self.reminder_days_before < 0 {
            bail!("reminder_days_before must be >= 0");
        }
        Ok(())
    }
}

pub fn load_options<P: AsRef<Path>>(path: P) -> Result<SchedulingOptions> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let options: SchedulingOptions = serde_json::from_slice(&data)
        .with_context(|| format!("parsing config {}", path.display()))?;
    options.validate()?;
    Ok(options)
}
