//! WMO weather interpretation codes (used by Open-Meteo).

use std::collections::HashMap;

use serde::Deserialize;

const BUNDLED: &str = include_str!("../assets/wmocodes.json");

#[derive(Debug, Clone, Deserialize)]
pub struct WmoDescription {
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WmoEntry {
    day: WmoDescription,
    night: WmoDescription,
}

/// Read-only lookup from WMO code to day/night descriptions.
#[derive(Debug, Clone)]
pub struct WmoCodeTable {
    entries: HashMap<i64, WmoEntry>,
}

impl WmoCodeTable {
    /// Parses the table shipped with the crate.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED)
    }

    /// Parses a table keyed by stringified code, each with `day` and `night` entries.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, WmoEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .filter_map(|(code, entry)| code.trim().parse().ok().map(|code| (code, entry)))
            .collect();
        Ok(Self { entries })
    }

    pub fn lookup(&self, code: i64, is_day: bool) -> Option<&WmoDescription> {
        self.entries
            .get(&code)
            .map(|entry| if is_day { &entry.day } else { &entry.night })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
