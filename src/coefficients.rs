// src/coefficients.rs

use std::{collections::HashMap, fs, path::Path};

use crate::{
    engine::normalize::subject::{
        ANGLAIS, ART_MUSIQUE, CHIMIE, ECONOMIE, EDUCATION_CIVIQUE, ESPAGNOL, FRANCAIS,
        HISTOIRE_GEO, INFORMATIQUE, KREYOL, LITTERATURE, MATHEMATIQUES, PHILOSOPHIE, PHYSIQUE,
        SCIENCES_SOCIALES, SVT, normalize_subject,
    },
    error::{AppError, CoefficientError},
};

/// Per-track weighting of subjects in the bac average.
pub trait CoefficientSource: Send + Sync {
    /// Coefficient of `subject` in `track`; unknown combinations weigh 1.
    fn coefficient(&self, track: &str, subject: &str) -> Result<f64, CoefficientError>;
}

/// Built-in weights per track.
const DEFAULT_COEFFICIENTS: &[(&str, &[(&str, f64)])] = &[
    (
        "SVT",
        &[
            (SVT, 4.0),
            (CHIMIE, 3.0),
            (PHYSIQUE, 3.0),
            (MATHEMATIQUES, 3.0),
            (FRANCAIS, 2.0),
            (KREYOL, 2.0),
            (PHILOSOPHIE, 2.0),
            (ANGLAIS, 1.0),
            (ESPAGNOL, 1.0),
            (HISTOIRE_GEO, 1.0),
            (INFORMATIQUE, 1.0),
        ],
    ),
    (
        "SMP",
        &[
            (MATHEMATIQUES, 4.0),
            (PHYSIQUE, 4.0),
            (CHIMIE, 3.0),
            (SVT, 2.0),
            (FRANCAIS, 2.0),
            (KREYOL, 2.0),
            (PHILOSOPHIE, 2.0),
            (INFORMATIQUE, 2.0),
            (ANGLAIS, 1.0),
            (ESPAGNOL, 1.0),
            (HISTOIRE_GEO, 1.0),
        ],
    ),
    (
        "SES",
        &[
            (ECONOMIE, 4.0),
            (SCIENCES_SOCIALES, 3.0),
            (HISTOIRE_GEO, 3.0),
            (MATHEMATIQUES, 2.0),
            (FRANCAIS, 2.0),
            (KREYOL, 2.0),
            (PHILOSOPHIE, 2.0),
            (ANGLAIS, 2.0),
            (ESPAGNOL, 1.0),
            (EDUCATION_CIVIQUE, 1.0),
        ],
    ),
    (
        "LLA",
        &[
            (FRANCAIS, 4.0),
            (LITTERATURE, 4.0),
            (PHILOSOPHIE, 3.0),
            (KREYOL, 3.0),
            (ANGLAIS, 2.0),
            (ESPAGNOL, 2.0),
            (ART_MUSIQUE, 2.0),
            (HISTOIRE_GEO, 2.0),
            (MATHEMATIQUES, 1.0),
        ],
    ),
];

/// Track -> canonical subject -> coefficient.
#[derive(Debug, Clone)]
pub struct CoefficientTable {
    tracks: HashMap<String, HashMap<String, f64>>,
}

impl Default for CoefficientTable {
    fn default() -> Self {
        let tracks = DEFAULT_COEFFICIENTS
            .iter()
            .map(|(track, subjects)| {
                let subjects = subjects
                    .iter()
                    .map(|(subject, coef)| (subject.to_string(), *coef))
                    .collect();
                (track.to_string(), subjects)
            })
            .collect();
        Self { tracks }
    }
}

impl CoefficientTable {
    /// Built-in defaults overridden by a JSON file shaped `{track: {subject: coefficient}}`.
    ///
    /// Subjects in the file may use any known alias.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let overrides: HashMap<String, HashMap<String, f64>> = serde_json::from_str(&raw)?;

        let mut table = Self::default();
        for (track, subjects) in overrides {
            let entry = table.tracks.entry(track_key(&track)).or_default();
            for (subject, coef) in subjects {
                entry.insert(normalize_subject(&subject), coef);
            }
        }
        tracing::info!("Loaded coefficient overrides from {}", path.display());
        Ok(table)
    }

    /// Known tracks, sorted.
    pub fn tracks(&self) -> Vec<&str> {
        let mut tracks: Vec<&str> = self.tracks.keys().map(String::as_str).collect();
        tracks.sort_unstable();
        tracks
    }
}

fn track_key(track: &str) -> String {
    track.trim().to_uppercase()
}

impl CoefficientSource for CoefficientTable {
    fn coefficient(&self, track: &str, subject: &str) -> Result<f64, CoefficientError> {
        if track.trim().is_empty() {
            return Err(CoefficientError::MissingTrack);
        }
        if subject.trim().is_empty() {
            return Err(CoefficientError::MissingSubject);
        }

        let subject = normalize_subject(subject);
        let Some(value) = self
            .tracks
            .get(&track_key(track))
            .and_then(|subjects| subjects.get(&subject))
            .copied()
        else {
            return Ok(1.0);
        };

        if !value.is_finite() || value <= 0.0 {
            return Err(CoefficientError::InvalidValue {
                track: track.trim().to_string(),
                subject,
                value,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookup() {
        let table = CoefficientTable::default();
        assert_eq!(table.coefficient("SMP", "Mathématiques").unwrap(), 4.0);
        assert_eq!(table.coefficient("smp", "maths").unwrap(), 4.0);
        assert_eq!(table.coefficient(" svt ", "Biologie").unwrap(), 4.0);
        assert_eq!(table.tracks(), vec!["LLA", "SES", "SMP", "SVT"]);
    }

    #[test]
    fn test_unknown_combination_weighs_one() {
        let table = CoefficientTable::default();
        assert_eq!(table.coefficient("LLA", "Chimie").unwrap(), 1.0);
        assert_eq!(table.coefficient("XYZ", "Chimie").unwrap(), 1.0);
    }

    #[test]
    fn test_blank_inputs_fail() {
        let table = CoefficientTable::default();
        assert!(matches!(
            table.coefficient("", "Chimie"),
            Err(CoefficientError::MissingTrack)
        ));
        assert!(matches!(
            table.coefficient("SVT", "  "),
            Err(CoefficientError::MissingSubject)
        ));
    }

    #[test]
    fn test_overrides_from_file() {
        let path = std::env::temp_dir().join(format!("coefficients-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"svt": {"chimie": 5}, "SES": {"Philosophie": 0}, "sms": {"Biologie": 3}}"#,
        )
        .unwrap();

        let table = CoefficientTable::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(table.coefficient("SVT", "Chimie").unwrap(), 5.0);
        assert_eq!(table.coefficient("SVT", "SVT").unwrap(), 4.0);
        assert_eq!(table.tracks(), vec!["LLA", "SES", "SMP", "SMS", "SVT"]);
        assert!(matches!(
            table.coefficient("SES", "Philosophie"),
            Err(CoefficientError::InvalidValue { .. })
        ));
    }
}
