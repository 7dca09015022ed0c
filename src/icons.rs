//! Playstyle icon catalog

use std::collections::HashMap;

use crate::{Error, Result};

const RUSHDOWN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="lucide lucide-sword"><path d="m11 19-6-6"/><path d="m5 21-2-2"/><path d="m8 16-4 4"/><path d="M9.5 17.5 21 6V3h-3L6.5 14.5"/></svg>"#;
const ZONING: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" aria-hidden="true"><path fill="currentColor" d="M12 3a9 9 0 1 0 9 9 9 9 0 0 0-9-9Zm0 2a7 7 0 1 1-7 7 7 7 0 0 1 7-7Zm0 3a4 4 0 1 0 4 4 4 4 0 0 0-4-4Zm0 2.5a1.5 1.5 0 1 1-1.5 1.5A1.5 1.5 0 0 1 12 10.5Z"/></svg>"#;
const MIXUPS: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="lucide lucide-arrow-right-left"><path d="m16 3 4 4-4 4"/><path d="M20 7H4"/><path d="m8 21-4-4 4-4"/><path d="M4 17h16"/></svg>"#;
const GRAPPLER: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="lucide lucide-biceps-flexed"><path d="M12.409 13.017A5 5 0 0 1 22 15c0 3.866-4 7-9 7-4.077 0-8.153-.82-10.371-2.462-.426-.316-.631-.832-.62-1.362C2.118 12.723 2.627 2 10 2a3 3 0 0 1 3 3 2 2 0 0 1-2 2c-1.105 0-1.64-.444-2-1"/><path d="M15 14a5 5 0 0 0-7.584 2"/><path d="M9.964 6.825C8.019 7.977 9.5 13 8 15"/></svg>"#;
const ALLROUNDER: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="lucide lucide-star"><path d="M11.525 2.295a.53.53 0 0 1 .95 0l2.31 4.679a2.123 2.123 0 0 0 1.595 1.16l5.166.756a.53.53 0 0 1 .294.904l-3.736 3.638a2.123 2.123 0 0 0-.611 1.878l.882 5.14a.53.53 0 0 1-.771.56l-4.618-2.428a2.122 2.122 0 0 0-1.973 0L6.396 21.01a.53.53 0 0 1-.77-.56l.881-5.139a2.122 2.122 0 0 0-.611-1.879L2.16 9.795a.53.53 0 0 1 .294-.906l5.165-.755a2.122 2.122 0 0 0 1.597-1.16z"/></svg>"#;

/// Immutable mapping from playstyle keys to inline SVG markup.
///
/// Icon markup is trusted and inserted into the card unescaped; only keys
/// come from the caller.
#[derive(Debug, Clone)]
pub struct IconCatalog {
    icons: HashMap<String, String>,
    default_key: String,
}

impl IconCatalog {
    /// Build a catalog; keys are stored lowercase and `default_key` must be present.
    pub fn new<I, K, V>(entries: I, default_key: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let icons: HashMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (k.into().to_lowercase(), v.into()))
            .collect();
        let default_key = default_key.to_lowercase();
        if !icons.contains_key(&default_key) {
            return Err(Error::Config(format!(
                "default icon key {default_key:?} is not in the catalog"
            )));
        }
        Ok(Self { icons, default_key })
    }

    /// The stock fighting-game playstyle icons, defaulting to `rushdown`.
    pub fn builtin() -> Self {
        let icons = [
            ("rushdown", RUSHDOWN),
            ("zoning", ZONING),
            ("mixups", MIXUPS),
            ("grappler", GRAPPLER),
            ("allrounder", ALLROUNDER),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            icons,
            default_key: "rushdown".to_string(),
        }
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    /// Icon markup for `key` (case-insensitive), or the default icon.
    pub fn resolve(&self, key: Option<&str>) -> &str {
        let key = key.map(|k| k.trim().to_lowercase()).filter(|k| !k.is_empty());
        key.and_then(|k| self.icons.get(&k))
            .or_else(|| self.icons.get(&self.default_key))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Default for IconCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
