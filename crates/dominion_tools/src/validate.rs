//! Data validation utilities.
//!
//! A data directory holds `races/*.ron`, `spells/*.ron` and an optional
//! `rules.ron`. Every file must parse and every reference must resolve.

use std::path::Path;

use dominion_core::registry::{read_ron, RaceRegistry};
use dominion_core::rules::InvasionRules;
use dominion_core::spells::SpellBook;

use crate::error::{ToolError, ToolResult};

/// Everything loaded from a data directory.
#[derive(Debug, Clone, Default)]
pub struct GameData {
    /// Invasion rules; defaults when `rules.ron` is absent.
    pub rules: InvasionRules,
    /// Races.
    pub races: RaceRegistry,
    /// Spells.
    pub spells: SpellBook,
}

/// Load a data directory without validating it.
///
/// Unlike the core loaders, a file that fails to parse is an error here.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed.
pub fn load_data_directory(path: &Path) -> ToolResult<GameData> {
    let mut data = GameData::default();

    let rules_path = path.join("rules.ron");
    if rules_path.exists() {
        data.rules = InvasionRules::load(&rules_path)?;
    }

    for file in ron_files(&path.join("races"))? {
        data.races.load_from_file(&file)?;
    }
    for file in ron_files(&path.join("spells"))? {
        data.spells.load_from_file(&file)?;
    }

    tracing::debug!(
        races = data.races.len(),
        spells = data.spells.len(),
        "Loaded data directory"
    );
    Ok(data)
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns an error if any data file fails to load or validate.
pub fn validate_data_directory(path: &Path) -> ToolResult<GameData> {
    let data = load_data_directory(path)?;

    let mut problems = data.rules.validate();
    problems.extend(data.races.validate());
    problems.extend(data.spells.validate());
    for spell in data.spells.iter() {
        for race in &spell.races {
            if data.races.get(race).is_none() {
                problems.push(format!("Spell '{}' is limited to unknown race '{race}'", spell.key));
            }
        }
    }

    if problems.is_empty() {
        Ok(data)
    } else {
        Err(ToolError::Validation(problems))
    }
}

fn ron_files(dir: &Path) -> ToolResult<Vec<std::path::PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| dominion_core::error::GameError::IoError {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;
    let mut files: Vec<_> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// Parse a single file of any data type, for ad-hoc checks.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> ToolResult<T> {
    Ok(read_ron(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RACE: &str = r#"RaceData(
        key: "human",
        name: "Human",
        home_land_type: plain,
        units: [
            UnitData(slot: One, name: "Spearman", offense: 3.0, defense: 0.0),
            UnitData(slot: Two, name: "Archer", offense: 0.0, defense: 3.0),
            UnitData(slot: Three, name: "Knight", offense: 6.0, defense: 2.0),
            UnitData(slot: Four, name: "Cavalry", offense: 5.0, defense: 2.0,
                perks: {"fixed_casualties": "50"}),
        ],
    )"#;

    fn write_data(dir: &Path, spells: &str) {
        std::fs::create_dir_all(dir.join("races")).expect("races dir");
        std::fs::create_dir_all(dir.join("spells")).expect("spells dir");
        std::fs::write(dir.join("races/human.ron"), RACE).expect("write race");
        std::fs::write(dir.join("spells/self.ron"), spells).expect("write spells");
    }

    #[test]
    fn test_valid_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_data(
            dir.path(),
            r#"[SpellData(key: "crusade", name: "Crusade", scope: own, class: active,
                perks: {"offensive_power": "5"}, races: ["human"])]"#,
        );
        let data = validate_data_directory(dir.path()).expect("valid");
        assert_eq!(data.races.len(), 1);
        assert_eq!(data.spells.len(), 1);
    }

    #[test]
    fn test_unknown_race_reference_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_data(
            dir.path(),
            r#"[SpellData(key: "crusade", name: "Crusade", scope: own, class: active, races: ["nox"])]"#,
        );
        match validate_data_directory(dir.path()) {
            Err(ToolError::Validation(problems)) => {
                assert!(problems.iter().any(|p| p.contains("nox")));
            }
            other => panic!("expected validation problems, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_data(dir.path(), "[");
        assert!(matches!(load_data_directory(dir.path()), Err(ToolError::Game(_))));
    }

    #[test]
    fn test_missing_directories_load_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = load_data_directory(dir.path()).expect("load");
        assert!(data.races.is_empty());
        assert_eq!(data.rules, InvasionRules::default());
    }
}
