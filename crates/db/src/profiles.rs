use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dicebot_models::Profile;

/// Named-profile store backed by a single JSON file. Profiles map CLI
/// `-P key=value` bindings one to one, so a loaded profile behaves exactly
/// like retyping the flags.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open(config_dir: &Path) -> Self {
        Self::new(config_dir.join("profiles.json"))
    }

    fn read(&self) -> Result<BTreeMap<String, Profile>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn write(&self, profiles: &BTreeMap<String, Profile>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, text).with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn list(&self) -> Result<Vec<Profile>> {
        Ok(self.read()?.into_values().collect())
    }

    pub fn load(&self, name: &str) -> Result<Option<Profile>> {
        Ok(self.read()?.remove(name))
    }

    pub fn save(&self, profile: &Profile) -> Result<()> {
        let mut profiles = self.read()?;
        profiles.insert(profile.name.clone(), profile.clone());
        self.write(&profiles)
    }

    pub fn delete(&self, name: &str) -> Result<bool> {
        let mut profiles = self.read()?;
        let removed = profiles.remove(name).is_some();
        if removed {
            self.write(&profiles)?;
        }
        Ok(removed)
    }
}
