use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const EN_RESOURCE: &str = include_str!("../locales/en.json");
const RU_RESOURCE: &str = include_str!("../locales/ru.json");

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Ru, Locale::En];

    /// Locale consulted when a message is missing from the active one.
    pub const FALLBACK: Locale = Locale::En;

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" => Some(Locale::En),
            "ru" | "ru-ru" => Some(Locale::Ru),
            _ => None,
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Ru => "Русский",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s).ok_or_else(|| anyhow!("unsupported locale: {s}"))
    }
}

/// Immutable translation table keyed by locale and dotted message id
/// (`taskForm.validation.titleRequired`).
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<Locale, HashMap<String, String>>,
}

impl Catalog {
    #[tracing::instrument]
    pub fn builtin() -> anyhow::Result<Self> {
        let catalog = Self::from_resources(&[(Locale::En, EN_RESOURCE), (Locale::Ru, RU_RESOURCE)])?;
        for locale in Locale::ALL {
            let missing = catalog.missing_keys(locale);
            if !missing.is_empty() {
                warn!(locale = %locale, ?missing, "catalog is missing messages; fallback will be used");
            }
        }
        Ok(catalog)
    }

    pub fn from_resources(resources: &[(Locale, &str)]) -> anyhow::Result<Self> {
        let mut tables = HashMap::new();
        for (locale, raw) in resources {
            let root: Value = serde_json::from_str(raw)
                .with_context(|| format!("failed parsing {locale} message resource"))?;
            let mut table = HashMap::new();
            flatten_messages("", &root, &mut table)
                .with_context(|| format!("invalid {locale} message resource"))?;
            debug!(locale = %locale, count = table.len(), "loaded messages");
            tables.insert(*locale, table);
        }
        Ok(Self { tables })
    }

    /// Exact lookup, no fallback.
    pub fn lookup(&self, locale: Locale, id: &str) -> Option<&str> {
        self.tables
            .get(&locale)
            .and_then(|table| table.get(id))
            .map(String::as_str)
    }

    /// Lookup with fallback to [`Locale::FALLBACK`] and finally to the id
    /// itself.
    pub fn text<'a>(&'a self, locale: Locale, id: &'a str) -> &'a str {
        self.lookup(locale, id)
            .or_else(|| self.lookup(Locale::FALLBACK, id))
            .unwrap_or(id)
    }

    /// Like [`Catalog::text`], replacing `{{name}}` placeholders in one
    /// pass. Substituted values are not scanned again; unknown placeholders
    /// are kept as written.
    pub fn format(&self, locale: Locale, id: &str, args: &[(&str, &str)]) -> String {
        let template = self.text(locale, id);
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let name = &after[..end];
            match args.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }

    pub fn missing_keys(&self, locale: Locale) -> Vec<&str> {
        let Some(reference) = self.tables.get(&Locale::FALLBACK) else {
            return vec![];
        };
        let mut missing: Vec<&str> = reference
            .keys()
            .filter(|key| self.lookup(locale, key).is_none())
            .map(String::as_str)
            .collect();
        missing.sort_unstable();
        missing
    }
}

fn flatten_messages(
    prefix: &str,
    value: &Value,
    out: &mut HashMap<String, String>,
) -> anyhow::Result<()> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let id = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_messages(&id, child, out)?;
            }
            Ok(())
        }
        Value::String(text) => {
            out.insert(prefix.to_string(), text.clone());
            Ok(())
        }
        other => Err(anyhow!("message {prefix} must be a string, got {other}")),
    }
}

/// A catalog bound to the active locale.
#[derive(Debug, Clone, Copy)]
pub struct Messages<'a> {
    pub catalog: &'a Catalog,
    pub locale: Locale,
}

impl<'a> Messages<'a> {
    pub fn new(catalog: &'a Catalog, locale: Locale) -> Self {
        Self { catalog, locale }
    }

    pub fn t(&self, id: &'a str) -> &'a str {
        self.catalog.text(self.locale, id)
    }

    pub fn fmt(&self, id: &str, args: &[(&str, &str)]) -> String {
        self.catalog.format(self.locale, id, args)
    }
}
