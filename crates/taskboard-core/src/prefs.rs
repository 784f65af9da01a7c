use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::i18n::Locale;

pub const LANGUAGE_KEY: &str = "preferred-language";

/// Scalar key-value storage; last write wins.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One file per key inside `dir`.
#[derive(Debug)]
pub struct FilePreferences {
    pub dir: PathBuf,
}

impl FilePreferences {
    #[tracing::instrument(skip(dir))]
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let dir = dir.to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        info!(dir = %dir.display(), "opened preference store");
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.');
        if !valid || key.starts_with('.') {
            return Err(anyhow!("invalid preference key: {key:?}"));
        }
        Ok(self.dir.join(key))
    }
}

impl PreferenceStore for FilePreferences {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            debug!(file = %path.display(), "preference not set");
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    #[tracing::instrument(skip(self))]
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.key_path(key)?;
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        writeln!(temp, "{value}")?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    map: RefCell<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stored language, or `default` when absent or unrecognized. A storage
/// failure is logged and treated as absent.
pub fn load_locale(prefs: &dyn PreferenceStore, default: Locale) -> Locale {
    match prefs.get(LANGUAGE_KEY) {
        Ok(Some(raw)) => Locale::from_code(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "unrecognized stored language; using default");
            default
        }),
        Ok(None) => default,
        Err(err) => {
            warn!(error = %err, "failed to read language preference; using default");
            default
        }
    }
}

pub fn save_locale(prefs: &dyn PreferenceStore, locale: Locale) -> anyhow::Result<()> {
    prefs
        .set(LANGUAGE_KEY, locale.code())
        .context("failed to save language preference")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{
        FilePreferences, LANGUAGE_KEY, MemoryPreferences, PreferenceStore, load_locale,
        save_locale,
    };
    use crate::i18n::Locale;

    #[test]
    fn absent_or_unknown_language_uses_default() {
        let prefs = MemoryPreferences::new();
        assert_eq!(load_locale(&prefs, Locale::En), Locale::En);

        prefs.set(LANGUAGE_KEY, "de").expect("set");
        assert_eq!(load_locale(&prefs, Locale::En), Locale::En);
    }

    #[test]
    fn file_store_roundtrips_and_last_write_wins() {
        let temp = tempdir().expect("tempdir");
        let prefs = FilePreferences::open(temp.path()).expect("open");

        save_locale(&prefs, Locale::Ru).expect("save ru");
        assert_eq!(load_locale(&prefs, Locale::En), Locale::Ru);

        save_locale(&prefs, Locale::En).expect("save en");
        let reopened = FilePreferences::open(temp.path()).expect("reopen");
        assert_eq!(load_locale(&reopened, Locale::Ru), Locale::En);
        assert_eq!(
            reopened.get(LANGUAGE_KEY).expect("get").as_deref(),
            Some("en")
        );
    }

    #[test]
    fn rejects_path_like_keys() {
        let temp = tempdir().expect("tempdir");
        let prefs = FilePreferences::open(temp.path()).expect("open");
        assert!(prefs.set("../escape", "x").is_err());
        assert!(prefs.get("").is_err());
    }
}
