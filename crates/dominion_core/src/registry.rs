//! Race and spell loading from RON files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::data::{RaceData, SpellData};
use crate::error::{GameError, Result};
use crate::spells::SpellBook;

/// Registry holding every loaded race.
#[derive(Debug, Clone, Default)]
pub struct RaceRegistry {
    races: BTreeMap<String, RaceData>,
}

impl RaceRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a race definition.
    pub fn register(&mut self, race: RaceData) {
        self.races.insert(race.key.clone(), race);
    }

    /// Builder: register a race definition.
    #[must_use]
    pub fn with(mut self, race: RaceData) -> Self {
        self.register(race);
        self
    }

    /// Load a race from a RON file.
    pub fn load_from_file(&mut self, path: &Path) -> Result<String> {
        let race: RaceData = read_ron(path)?;
        let key = race.key.clone();
        self.register(race);
        Ok(key)
    }

    /// Load all races from a directory of RON files.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<Vec<String>> {
        let mut loaded = Vec::new();
        for path in ron_files(dir)? {
            match self.load_from_file(&path) {
                Ok(key) => loaded.push(key),
                Err(e) => {
                    tracing::warn!("Failed to load race from {:?}: {}", path, e);
                }
            }
        }
        Ok(loaded)
    }

    /// Race by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RaceData> {
        self.races.get(key)
    }

    /// Race by key, failing on unknown keys.
    pub fn require(&self, key: &str) -> Result<&RaceData> {
        self.get(key)
            .ok_or_else(|| GameError::UnknownRace(key.to_string()))
    }

    /// All races in key order.
    pub fn iter(&self) -> impl Iterator<Item = &RaceData> {
        self.races.values()
    }

    /// Number of loaded races.
    #[must_use]
    pub fn len(&self) -> usize {
        self.races.len()
    }

    /// Whether no races are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.races.is_empty()
    }

    /// Validate every race.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.races.values().flat_map(RaceData::validate).collect()
    }
}

impl SpellBook {
    /// Load a list of spells from one RON file.
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize> {
        let spells: Vec<SpellData> = read_ron(path)?;
        let count = spells.len();
        for spell in spells {
            self.register(spell);
        }
        Ok(count)
    }

    /// Load every spell file in a directory.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<usize> {
        let mut total = 0;
        for path in ron_files(dir)? {
            match self.load_from_file(&path) {
                Ok(count) => total += count,
                Err(e) => {
                    tracing::warn!("Failed to load spells from {:?}: {}", path, e);
                }
            }
        }
        Ok(total)
    }
}

/// Parse a RON file into any deserializable type.
pub fn read_ron<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| GameError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    ron::from_str(&content).map_err(|e| GameError::DataParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// RON files of a directory in sorted order.
fn ron_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let io_error = |e: std::io::Error| GameError::IoError {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.extension().is_some_and(|e| e == "ron") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RACE: &str = r#"RaceData(
        key: "goblin",
        name: "Goblin",
        home_land_type: hill,
        units: [
            UnitData(slot: One, name: "Raider", offense: 4.0, defense: 0.0),
            UnitData(slot: Two, name: "Shaman", offense: 0.0, defense: 2.0),
            UnitData(slot: Three, name: "Hobgoblin", offense: 4.0, defense: 5.0),
            UnitData(slot: Four, name: "Wolf Rider", offense: 6.0, defense: 2.0,
                perks: {"plunders": "platinum,20;gems,5"}),
        ],
    )"#;

    #[test]
    fn test_load_race_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("goblin.ron"), RACE).expect("write");
        fs::write(dir.path().join("broken.ron"), "RaceData(").expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let mut registry = RaceRegistry::new();
        let loaded = registry.load_from_directory(dir.path()).expect("load");

        assert_eq!(loaded, vec!["goblin".to_string()]);
        let goblin = registry.require("goblin").expect("goblin");
        assert_eq!(goblin.boat_capacity, 30);
        assert!(registry.validate().is_empty());
    }

    #[test]
    fn test_unknown_race() {
        let registry = RaceRegistry::new();
        assert!(matches!(
            registry.require("nox"),
            Err(GameError::UnknownRace(key)) if key == "nox"
        ));
    }

    #[test]
    fn test_load_spell_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("spells.ron");
        fs::write(
            &path,
            r#"[
                SpellData(key: "ares_call", name: "Ares' Call", scope: own, class: active,
                    perks: {"defensive_power": "10"}),
            ]"#,
        )
        .expect("write");

        let mut book = SpellBook::new();
        assert_eq!(book.load_from_file(&path).expect("load"), 1);
        assert!(book.get("ares_call").is_some());
    }
}
