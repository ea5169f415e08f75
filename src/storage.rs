use crate::error::VitalResult;
use crate::session::VitalSigns;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Symptom severities are rated on a 0–5 scale.
pub const MAX_RATING: u8 = 5;

/// The ten symptom-severity ratings collected after measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomRatings {
    pub nausea: u8,
    pub headache: u8,
    pub diarrhea: u8,
    pub sore_throat: u8,
    pub fever: u8,
    pub cough: u8,
    pub muscle_ache: u8,
    pub feeling_tired: u8,
    pub shortness_of_breath: u8,
    pub loss_of_smell_and_taste: u8,
}

impl SymptomRatings {
    /// Build from raw levels in declaration order, clamping each to the
    /// rating scale.
    pub fn from_levels(levels: [u8; 10]) -> Self {
        let c = |v: u8| v.min(MAX_RATING);
        SymptomRatings {
            nausea: c(levels[0]),
            headache: c(levels[1]),
            diarrhea: c(levels[2]),
            sore_throat: c(levels[3]),
            fever: c(levels[4]),
            cough: c(levels[5]),
            muscle_ache: c(levels[6]),
            feeling_tired: c(levels[7]),
            shortness_of_breath: c(levels[8]),
            loss_of_smell_and_taste: c(levels[9]),
        }
    }
}

/// One finalized session record: the two vitals plus the symptom checklist.
/// Vitals cross the screen handoff as floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub recorded_at: String,
    pub heart_rate: f32,
    pub respiratory_rate: f32,
    #[serde(flatten)]
    pub symptoms: SymptomRatings,
}

impl HealthRecord {
    pub fn new(vitals: VitalSigns, symptoms: SymptomRatings) -> Self {
        HealthRecord {
            recorded_at: Utc::now().to_rfc3339(),
            heart_rate: vitals.heart_rate as f32,
            respiratory_rate: vitals.respiratory_rate as f32,
            symptoms,
        }
    }
}

/// Record store backed by a JSON-lines file. Created once at startup and
/// passed by reference to whoever persists; no hidden global handle.
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn open(path: &Path) -> VitalResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Storage {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Blocking file IO; callers on the interactive
    /// sequence go through `spawn_blocking`.
    pub fn insert(&self, record: &HealthRecord) -> VitalResult<()> {
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        info!("Stored health record at {}", self.path.display());
        Ok(())
    }

    /// Read every stored record back, oldest first.
    pub fn load_all(&self) -> VitalResult<Vec<HealthRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_clamp_to_scale() {
        let ratings = SymptomRatings::from_levels([0, 1, 2, 3, 4, 5, 6, 7, 200, 5]);
        assert_eq!(ratings.nausea, 0);
        assert_eq!(ratings.cough, 5);
        assert_eq!(ratings.muscle_ache, 5);
        assert_eq!(ratings.shortness_of_breath, 5);
        assert_eq!(ratings.loss_of_smell_and_taste, 5);
    }

    #[test]
    fn test_record_roundtrip() {
        let dir = std::env::temp_dir().join("vital_monitor_storage_test");
        let path = dir.join("records.jsonl");
        let _ = fs::remove_file(&path);

        let storage = Storage::open(&path).unwrap();
        let vitals = VitalSigns {
            heart_rate: 72,
            respiratory_rate: 16,
        };
        let record = HealthRecord::new(vitals, SymptomRatings::from_levels([1; 10]));
        storage.insert(&record).unwrap();
        storage.insert(&record).unwrap();

        let records = storage.load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].heart_rate, 72.0);
        assert_eq!(records[0].respiratory_rate, 16.0);
        assert_eq!(records[0].symptoms.fever, 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_from_missing_file_is_empty() {
        let storage =
            Storage::open(&std::env::temp_dir().join("vital_monitor_none/records.jsonl")).unwrap();
        assert!(storage.load_all().unwrap().is_empty());
    }
}
