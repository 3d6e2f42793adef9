use std::path::Path;

use serde::{Deserialize, Serialize};

/// Reserved bucket for windows no remembered fragment claims. Always present,
/// never deletable or renamable.
pub const UNCATEGORIZED_GROUP: &str = "Uncategorized";

/// On-disk settings. Field names match the persisted JSON contract:
/// `{ "Groups": [ { "Name": ..., "Files": [...] } ] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    #[serde(rename = "Groups", default)]
    pub groups: Vec<GroupData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Files", default)]
    pub files: Vec<String>,
}

impl GroupData {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
        }
    }
}

impl GroupSettings {
    /// Re-establishes the reserved-group invariant: exactly one
    /// "Uncategorized" group, inserted first when missing.
    pub fn ensure_uncategorized(&mut self) {
        if !self
            .groups
            .iter()
            .any(|group| group.name == UNCATEGORIZED_GROUP)
        {
            self.groups.insert(0, GroupData::named(UNCATEGORIZED_GROUP));
        }
    }
}

/// Loads settings from disk. A missing file or unreadable JSON falls back to
/// the empty default without surfacing an error; the reserved group is
/// guaranteed present afterwards either way.
pub fn load(path: &Path) -> GroupSettings {
    let mut settings = read_settings(path);
    settings.ensure_uncategorized();
    settings
}

fn read_settings(path: &Path) -> GroupSettings {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return GroupSettings::default();
    };
    serde_json::from_str::<GroupSettings>(&raw).unwrap_or_default()
}

/// Writes settings as pretty-printed JSON, creating the parent directory on
/// demand. Failures come back as messages for the caller to surface; the
/// in-memory state is already mutated and stays that way.
pub fn save(path: &Path, settings: &GroupSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create settings dir: {e}"))?;
    }
    let encoded = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("failed to encode settings: {e}"))?;
    std::fs::write(path, encoded).map_err(|e| format!("failed to write settings: {e}"))
}

/// Trims and validates a user-entered group name. Blank input is an error the
/// caller decides whether to surface (the create prompt ignores it silently).
pub fn validate_group_name(input: &str) -> Result<String, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Group name must not be blank.".to_string());
    }
    Ok(trimmed.to_string())
}
