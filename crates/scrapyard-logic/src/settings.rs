//! Per-world settings — user exemptions that outrank the built-in rules.
//!
//! The authoritative side keeps the settings in a JSON file in the world's
//! storage and mirrors them into a shared session variable. Everyone else
//! reads the shared variable, so participants never need file access.
//!
//! ```json
//! {
//!   "ExemptBlocks": [
//!     "CubeBlock/BlockSubtype"
//!   ]
//! }
//! ```
//!
//! Each exemption is `Type/SubtypeSubstring` (or just `Type`) and becomes a
//! free-to-build [`Rule`] placed ahead of every built-in rule.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::Rule;

/// File name of the settings file in world storage.
pub const SETTINGS_FILE: &str = "BuildRestrictions.json";

/// Shared session variable holding the serialized settings.
pub const SHARED_SETTINGS_KEY: &str = "BuildRestrictions.Settings";

/// Example exemption written into fresh settings files.
pub const SAMPLE_EXEMPTION: &str = "CubeBlock/BlockSubtype";

/// Settings problems. None of these stop a session; they all fall back to defaults.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("settings could not be parsed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed exemption pattern {0:?}, expected Type/Subtype")]
    MalformedPattern(String),

    #[error("shared variable {0} is not set")]
    MissingSharedValue(String),
}

/// Which side of the session is loading settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRole {
    /// Owns the world files (dedicated server or single player host).
    Authority,
    /// Joined client; sees only what the authority shares.
    Participant,
}

/// User-editable settings, immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "ExemptBlocks", default)]
    pub exemption_patterns: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exemption_patterns: vec![SAMPLE_EXEMPTION.to_string()],
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Exemption rules in configured order. Malformed patterns are logged
    /// and left out.
    pub fn exemption_rules(&self) -> Vec<Rule> {
        self.exemption_patterns
            .iter()
            .filter_map(|pattern| match parse_exemption(pattern) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    log::warn!("BuildRestrictions: ignoring exemption: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Parse `Type/SubtypeSubstring` into a free-to-build rule.
///
/// The subtype part is optional; the type may carry the host's
/// `MyObjectBuilder_` prefix.
pub fn parse_exemption(pattern: &str) -> Result<Rule, SettingsError> {
    let trimmed = pattern.trim();
    let (type_name, subtype) = match trimmed.split_once('/') {
        Some((t, s)) => (t.trim(), Some(s.trim())),
        None => (trimmed, None),
    };

    let valid_type = !type_name.is_empty()
        && type_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_type {
        return Err(SettingsError::MalformedPattern(pattern.to_string()));
    }

    Ok(Rule::exempt(type_name, subtype))
}

/// Per-world file storage provided by the host.
pub trait WorldStorage {
    fn read(&self, name: &str) -> io::Result<String>;
    fn write(&self, name: &str, contents: &str) -> io::Result<()>;
}

/// Session-wide string variables every participant can read.
pub trait SharedVariables {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// World storage backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FsWorldStorage {
    root: PathBuf,
}

impl FsWorldStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorldStorage for FsWorldStorage {
    fn read(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(name))
    }

    fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(name), contents)
    }
}

/// In-process shared variables.
#[derive(Debug, Clone, Default)]
pub struct MemoryVariables {
    values: HashMap<String, String>,
}

impl SharedVariables for MemoryVariables {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

fn read_settings_file<S: WorldStorage + ?Sized>(storage: &S) -> Result<Settings, SettingsError> {
    let contents = storage.read(SETTINGS_FILE)?;
    Settings::from_json(&contents)
}

fn write_settings_file<S: WorldStorage + ?Sized>(
    storage: &S,
    settings: &Settings,
) -> Result<(), SettingsError> {
    storage.write(SETTINGS_FILE, &settings.to_json()?)?;
    Ok(())
}

/// Authority path: file first, fresh defaults on any failure, then share.
pub fn load_authoritative<S, V>(storage: &S, shared: &mut V) -> Settings
where
    S: WorldStorage + ?Sized,
    V: SharedVariables + ?Sized,
{
    let settings = match read_settings_file(storage) {
        Ok(settings) => {
            log::info!(
                "BuildRestrictions: loaded {} exemption(s) from {}",
                settings.exemption_patterns.len(),
                SETTINGS_FILE
            );
            settings
        }
        Err(e) => {
            log::warn!(
                "BuildRestrictions: {} unusable ({}), writing defaults",
                SETTINGS_FILE,
                e
            );
            let defaults = Settings::default();
            if let Err(e) = write_settings_file(storage, &defaults) {
                log::warn!("BuildRestrictions: could not write {}: {}", SETTINGS_FILE, e);
            }
            defaults
        }
    };

    match settings.to_json() {
        Ok(json) => shared.set(SHARED_SETTINGS_KEY, json),
        Err(e) => log::warn!("BuildRestrictions: could not share settings: {}", e),
    }

    settings
}

/// Participant path: shared variable or in-memory defaults, never persisted.
pub fn load_shared<V: SharedVariables + ?Sized>(shared: &V) -> Settings {
    let parsed = shared
        .get(SHARED_SETTINGS_KEY)
        .ok_or_else(|| SettingsError::MissingSharedValue(SHARED_SETTINGS_KEY.to_string()))
        .and_then(|json| Settings::from_json(&json));

    match parsed {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("BuildRestrictions: {}, using defaults", e);
            Settings::default()
        }
    }
}

/// Load settings for the given side of the session.
pub fn load_settings<S, V>(role: SessionRole, storage: &S, shared: &mut V) -> Settings
where
    S: WorldStorage + ?Sized,
    V: SharedVariables + ?Sized,
{
    match role {
        SessionRole::Authority => load_authoritative(storage, shared),
        SessionRole::Participant => load_shared(shared),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleType;

    #[test]
    fn test_parse_type_and_subtype() {
        let rule = parse_exemption("CubeBlock/BlockSubtype").unwrap();
        assert_eq!(rule.block_type, RuleType::ByString("CubeBlock".into()));
        assert_eq!(rule.subtype.as_deref(), Some("BlockSubtype"));
        assert!(!rule.is_restricted());
    }

    #[test]
    fn test_parse_type_only() {
        let rule = parse_exemption("  MyObjectBuilder_Thrust ").unwrap();
        assert_eq!(rule.block_type, RuleType::ByString("Thrust".into()));
        assert_eq!(rule.subtype, None);

        let rule = parse_exemption("Thrust/").unwrap();
        assert_eq!(rule.subtype, None);
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "/Armor", "Cube Block/Armor", "  "] {
            assert!(
                matches!(parse_exemption(bad), Err(SettingsError::MalformedPattern(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_exemption_rules_skip_malformed() {
        let settings = Settings {
            exemption_patterns: vec![
                "Gyro".into(),
                "/nope".into(),
                "Thrust/Hydrogen".into(),
            ],
        };
        let rules = settings.exemption_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].block_type.name(), "Gyro");
        assert_eq!(rules[1].subtype.as_deref(), Some("Hydrogen"));
    }

    #[test]
    fn test_json_tag() {
        let settings = Settings::from_json(r#"{"ExemptBlocks":["Door"]}"#).unwrap();
        assert_eq!(settings.exemption_patterns, vec!["Door".to_string()]);
        assert!(settings.to_json().unwrap().contains("ExemptBlocks"));

        let empty = Settings::from_json("{}").unwrap();
        assert!(empty.exemption_patterns.is_empty());
    }

    #[test]
    fn test_authority_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsWorldStorage::new(dir.path());
        storage
            .write(SETTINGS_FILE, r#"{"ExemptBlocks":["Reactor"]}"#)
            .unwrap();
        let mut shared = MemoryVariables::default();

        let settings = load_settings(SessionRole::Authority, &storage, &mut shared);
        assert_eq!(settings.exemption_patterns, vec!["Reactor".to_string()]);

        let mirrored = Settings::from_json(&shared.get(SHARED_SETTINGS_KEY).unwrap()).unwrap();
        assert_eq!(mirrored, settings);
    }

    #[test]
    fn test_authority_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsWorldStorage::new(dir.path().join("world"));
        let mut shared = MemoryVariables::default();

        let settings = load_settings(SessionRole::Authority, &storage, &mut shared);
        assert_eq!(settings, Settings::default());

        let written = Settings::from_json(&storage.read(SETTINGS_FILE).unwrap()).unwrap();
        assert_eq!(written, Settings::default());
        assert!(shared.get(SHARED_SETTINGS_KEY).is_some());
    }

    #[test]
    fn test_authority_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsWorldStorage::new(dir.path());
        storage.write(SETTINGS_FILE, "<not json>").unwrap();
        let mut shared = MemoryVariables::default();

        let settings = load_authoritative(&storage, &mut shared);
        assert_eq!(settings, Settings::default());
        assert!(Settings::from_json(&storage.read(SETTINGS_FILE).unwrap()).is_ok());
    }

    #[test]
    fn test_participant_reads_shared_variable() {
        let mut shared = MemoryVariables::default();
        shared.set(SHARED_SETTINGS_KEY, r#"{"ExemptBlocks":["Beacon"]}"#.into());
        let settings = load_shared(&shared);
        assert_eq!(settings.exemption_patterns, vec!["Beacon".to_string()]);
    }

    #[test]
    fn test_participant_falls_back_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsWorldStorage::new(dir.path());
        let mut shared = MemoryVariables::default();

        let settings = load_settings(SessionRole::Participant, &storage, &mut shared);
        assert_eq!(settings, Settings::default());
        assert!(storage.read(SETTINGS_FILE).is_err());
        assert!(shared.get(SHARED_SETTINGS_KEY).is_none());

        shared.set(SHARED_SETTINGS_KEY, "garbage".into());
        assert_eq!(load_shared(&shared), Settings::default());
    }
}
