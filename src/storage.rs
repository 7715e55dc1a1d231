use crate::model::{ShiftId, ShiftOccurrence};
use anyhow::{anyhow, Context};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("shift not found: {0}")]
    NotFound(String),
    #[error("shift already exists: {0}")]
    AlreadyExists(String),
    #[error("version conflict on {id}: expected revision {expected}, found {found}")]
    VersionConflict { id: String, expected: u64, found: u64 },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Support de persistance des occurrences, avec écriture conditionnelle
/// sur la révision (concurrence optimiste).
pub trait ShiftStore {
    fn load(&self, id: &ShiftId) -> Result<ShiftOccurrence, StoreError>;
    /// Ajoute une occurrence neuve (révision conservée telle quelle).
    fn insert(&self, shift: &ShiftOccurrence) -> Result<(), StoreError>;
    /// Ajoute un lot d'occurrences neuves : tout ou rien.
    fn insert_many(&self, shifts: &[ShiftOccurrence]) -> Result<(), StoreError>;
    /// Écrit `shift` si la révision stockée vaut `expected`; renvoie la nouvelle révision.
    fn save(&self, shift: &ShiftOccurrence, expected: u64) -> Result<u64, StoreError>;
    /// Supprime si la révision stockée vaut `expected`.
    fn delete(&self, id: &ShiftId, expected: u64) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<ShiftOccurrence>, StoreError>;
}

/// Contenu d'un tableau de créneaux, tel que sérialisé sur disque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub shifts: Vec<ShiftOccurrence>,
}

impl Board {
    fn position(&self, id: &ShiftId) -> Option<usize> {
        self.shifts.iter().position(|s| &s.id == id)
    }

    fn insert(&mut self, shift: &ShiftOccurrence) -> Result<(), StoreError> {
        if self.position(&shift.id).is_some() {
            return Err(StoreError::AlreadyExists(shift.id.as_str().to_string()));
        }
        self.shifts.push(shift.clone());
        Ok(())
    }

    /// Le tableau n'est réécrit que si tout le lot passe.
    fn insert_many(&mut self, shifts: &[ShiftOccurrence]) -> Result<(), StoreError> {
        shifts.iter().try_for_each(|shift| self.insert(shift))
    }

    fn save(&mut self, shift: &ShiftOccurrence, expected: u64) -> Result<u64, StoreError> {
        let pos = self
            .position(&shift.id)
            .ok_or_else(|| StoreError::NotFound(shift.id.as_str().to_string()))?;
        let stored = &mut self.shifts[pos];
        check_revision(stored, expected)?;
        let mut next = shift.clone();
        next.revision = expected + 1;
        *stored = next;
        Ok(expected + 1)
    }

    fn delete(&mut self, id: &ShiftId, expected: u64) -> Result<(), StoreError> {
        let pos = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))?;
        check_revision(&self.shifts[pos], expected)?;
        self.shifts.remove(pos);
        Ok(())
    }
}

fn check_revision(stored: &ShiftOccurrence, expected: u64) -> Result<(), StoreError> {
    if stored.revision != expected {
        return Err(StoreError::VersionConflict {
            id: stored.id.as_str().to_string(),
            expected,
            found: stored.revision,
        });
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend(anyhow!("store lock poisoned")))
}

/// Stockage en mémoire, partageable entre threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    shifts: Mutex<HashMap<ShiftId, ShiftOccurrence>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShiftStore for MemoryStore {
    fn load(&self, id: &ShiftId) -> Result<ShiftOccurrence, StoreError> {
        lock(&self.shifts)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))
    }

    fn insert(&self, shift: &ShiftOccurrence) -> Result<(), StoreError> {
        let mut shifts = lock(&self.shifts)?;
        if shifts.contains_key(&shift.id) {
            return Err(StoreError::AlreadyExists(shift.id.as_str().to_string()));
        }
        shifts.insert(shift.id.clone(), shift.clone());
        Ok(())
    }

    fn insert_many(&self, batch: &[ShiftOccurrence]) -> Result<(), StoreError> {
        let mut shifts = lock(&self.shifts)?;
        let mut seen = HashSet::new();
        for shift in batch {
            if shifts.contains_key(&shift.id) || !seen.insert(&shift.id) {
                return Err(StoreError::AlreadyExists(shift.id.as_str().to_string()));
            }
        }
        for shift in batch {
            shifts.insert(shift.id.clone(), shift.clone());
        }
        Ok(())
    }

    fn save(&self, shift: &ShiftOccurrence, expected: u64) -> Result<u64, StoreError> {
        let mut shifts = lock(&self.shifts)?;
        let stored = shifts
            .get_mut(&shift.id)
            .ok_or_else(|| StoreError::NotFound(shift.id.as_str().to_string()))?;
        check_revision(stored, expected)?;
        let mut next = shift.clone();
        next.revision = expected + 1;
        *stored = next;
        Ok(expected + 1)
    }

    fn delete(&self, id: &ShiftId, expected: u64) -> Result<(), StoreError> {
        let mut shifts = lock(&self.shifts)?;
        let stored = shifts
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))?;
        check_revision(stored, expected)?;
        shifts.remove(id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ShiftOccurrence>, StoreError> {
        let mut out: Vec<_> = lock(&self.shifts)?.values().cloned().collect();
        out.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

/// Stockage fichier JSON. Chaque écriture relit le fichier, applique la
/// modification puis remplace le fichier de manière atomique.
///
/// Lecture-vérification-écriture sous verrou exclusif sur `<board>.lock`,
/// lectures sous verrou partagé : plusieurs processus (ou plusieurs
/// `JsonStore` sur le même chemin) voient des révisions cohérentes.
pub struct JsonStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl JsonStore {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        Ok(Self {
            path,
            lock_path: PathBuf::from(lock_name),
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> anyhow::Result<RwLock<File>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("opening lock {}", self.lock_path.display()))?;
        Ok(RwLock::new(file))
    }

    /// Lit le tableau sous verrou partagé.
    fn read_shared(&self) -> Result<Board, StoreError> {
        let _held = lock(&self.guard)?;
        let file_lock = self.lock_file()?;
        let _shared = file_lock
            .read()
            .with_context(|| format!("locking {}", self.lock_path.display()))?;
        Ok(self.read_board()?)
    }

    /// Fichier absent = tableau vide.
    fn read_board(&self) -> anyhow::Result<Board> {
        if !self.path.exists() {
            return Ok(Board::default());
        }
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let board: Board = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(board)
    }

    fn write_board(&self, board: &Board) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(board)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }

    fn update<T>(
        &self,
        apply: impl FnOnce(&mut Board) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _held = lock(&self.guard)?;
        let mut file_lock = self.lock_file()?;
        let _exclusive = file_lock
            .write()
            .with_context(|| format!("locking {}", self.lock_path.display()))?;
        let mut board = self.read_board()?;
        let out = apply(&mut board)?;
        self.write_board(&board)?;
        Ok(out)
    }
}

impl ShiftStore for JsonStore {
    fn load(&self, id: &ShiftId) -> Result<ShiftOccurrence, StoreError> {
        self.read_shared()?
            .shifts
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))
    }

    fn insert(&self, shift: &ShiftOccurrence) -> Result<(), StoreError> {
        self.update(|board| board.insert(shift))
    }

    fn insert_many(&self, shifts: &[ShiftOccurrence]) -> Result<(), StoreError> {
        self.update(|board| board.insert_many(shifts))
    }

    fn save(&self, shift: &ShiftOccurrence, expected: u64) -> Result<u64, StoreError> {
        self.update(|board| board.save(shift, expected))
    }

    fn delete(&self, id: &ShiftId, expected: u64) -> Result<(), StoreError> {
        self.update(|board| board.delete(id, expected))
    }

    fn list(&self) -> Result<Vec<ShiftOccurrence>, StoreError> {
        let mut shifts = self.read_shared()?.shifts;
        shifts.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(shifts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WeekdaySet;
    use crate::model::VolunteerId;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn sample() -> ShiftOccurrence {
        let start = Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 10, 2, 12, 0, 0).unwrap();
        ShiftOccurrence::create("Tri", start, end, 2, WeekdaySet::new()).unwrap()
    }

    fn exercise(store: &dyn ShiftStore) {
        let shift = sample();
        store.insert(&shift).unwrap();
        assert!(matches!(store.insert(&shift), Err(StoreError::AlreadyExists(_))));

        let mut loaded = store.load(&shift.id).unwrap();
        loaded.sign_up(&VolunteerId::new("a")).unwrap();
        assert_eq!(store.save(&loaded, 0).unwrap(), 1);
        assert!(matches!(
            store.save(&loaded, 0),
            Err(StoreError::VersionConflict { expected: 0, found: 1, .. })
        ));
        assert_eq!(store.load(&shift.id).unwrap().signed_up(), 1);

        assert!(matches!(
            store.delete(&shift.id, 0),
            Err(StoreError::VersionConflict { .. })
        ));
        store.delete(&shift.id, 1).unwrap();
        assert!(matches!(store.load(&shift.id), Err(StoreError::NotFound(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn memory_store_conditional_writes() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn json_store_conditional_writes() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&JsonStore::open(dir.path().join("board.json")).unwrap());
    }

    #[test]
    fn json_handles_on_same_file_share_revisions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let shift = sample();
        JsonStore::open(&path).unwrap().insert(&shift).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|name| {
                let store = JsonStore::open(&path).unwrap();
                let barrier = Arc::clone(&barrier);
                let id = shift.id.clone();
                thread::spawn(move || {
                    let mut mine = store.load(&id).unwrap();
                    mine.sign_up(&VolunteerId::new(name)).unwrap();
                    barrier.wait();
                    store.save(&mine, 0)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StoreError::VersionConflict { expected: 0, found: 1, .. }))));
        let stored = JsonStore::open(&path).unwrap().load(&shift.id).unwrap();
        assert_eq!((stored.revision(), stored.signed_up()), (1, 1));
        assert!(dir.path().join("board.json.lock").exists());
    }

    #[test]
    fn insert_many_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let json = JsonStore::open(dir.path().join("board.json")).unwrap();
        let memory = MemoryStore::new();
        let stores: [&dyn ShiftStore; 2] = [&json, &memory];
        for store in stores {
            let existing = sample();
            store.insert(&existing).unwrap();
            let fresh = sample();
            assert!(matches!(
                store.insert_many(&[fresh.clone(), existing.clone()]),
                Err(StoreError::AlreadyExists(_))
            ));
            assert!(matches!(
                store.insert_many(&[fresh.clone(), fresh.clone()]),
                Err(StoreError::AlreadyExists(_))
            ));
            assert_eq!(store.list().unwrap().len(), 1);

            store.insert_many(&[fresh, sample()]).unwrap();
            assert_eq!(store.list().unwrap().len(), 3);
        }
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
