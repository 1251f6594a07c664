//! Owner-managed ad configuration.
//!
//! An explicitly-scoped settings store: reads and writes go through this
//! module's load/save port backed by `local_settings`, and the command
//! layer emits `ads_config_changed` after every save so interested views
//! subscribe to changes instead of re-reading ambient global state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::db::{self, DbState};

const SETTINGS_CATEGORY: &str = "ads";
const SETTINGS_KEY: &str = "settings";

/// AdSense client ids must carry this prefix to be taken seriously.
const ADSENSE_CLIENT_PREFIX: &str = "ca-pub-";

/// Owner-provided AdSense settings. Safe by default: disabled, empty ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdsSettings {
    pub enabled: bool,
    pub adsense_client_id: String,
    pub top_banner_slot_id: String,
    pub bottom_banner_slot_id: String,
    pub enable_on_capacitor: bool,
}

impl Default for AdsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            adsense_client_id: String::new(),
            top_banner_slot_id: String::new(),
            bottom_banner_slot_id: String::new(),
            enable_on_capacitor: false,
        }
    }
}

/// Validation errors for a proposed settings save. Only enforced when
/// ads are being enabled; a disabled config may be as empty as it likes.
pub fn validate_settings(settings: &AdsSettings) -> Vec<String> {
    let mut errors = Vec::new();
    if settings.enabled {
        if settings.adsense_client_id.trim().is_empty() {
            errors.push("AdSense Client ID is required".to_string());
        } else if !settings.adsense_client_id.starts_with(ADSENSE_CLIENT_PREFIX) {
            errors.push(format!(
                "AdSense Client ID must start with \"{ADSENSE_CLIENT_PREFIX}\""
            ));
        }
        if settings.top_banner_slot_id.trim().is_empty() {
            errors.push("Top Banner Slot ID is required".to_string());
        }
    }
    errors
}

/// Load settings, merging whatever is stored over the defaults so old
/// partial documents keep working after new fields are added.
pub fn load_settings(db: &DbState) -> Result<AdsSettings, String> {
    let stored = db::get_json_setting(db, SETTINGS_CATEGORY, SETTINGS_KEY)?;
    if stored.is_null() {
        return Ok(AdsSettings::default());
    }
    let mut merged = serde_json::to_value(AdsSettings::default())
        .map_err(|e| format!("serialize defaults: {e}"))?;
    if let (Value::Object(base), Value::Object(overlay)) = (&mut merged, stored) {
        for (k, v) in overlay {
            base.insert(k, v);
        }
    }
    serde_json::from_value(merged).map_err(|e| format!("parse ads settings: {e}"))
}

/// Validate and persist. Returns the stored settings on success.
pub fn save_settings(db: &DbState, settings: AdsSettings) -> Result<AdsSettings, String> {
    let errors = validate_settings(&settings);
    if !errors.is_empty() {
        return Err(errors.join("; "));
    }
    let doc = serde_json::to_value(&settings).map_err(|e| format!("serialize ads settings: {e}"))?;
    db::set_json_setting(db, SETTINGS_CATEGORY, SETTINGS_KEY, &doc)?;
    info!(enabled = settings.enabled, "Ads settings saved");
    Ok(settings)
}

// ---------------------------------------------------------------------------
// Snippet builders (pure)
// ---------------------------------------------------------------------------

/// Provider head script for the configured client, or empty when the
/// client id is missing/not an AdSense id.
pub fn adsense_head_script(client_id: &str) -> String {
    if client_id.is_empty() || !client_id.starts_with(ADSENSE_CLIENT_PREFIX) {
        return String::new();
    }
    format!(
        "<script async src=\"https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js?client={client_id}\" crossorigin=\"anonymous\"></script>"
    )
}

/// Ad slot markup for one banner position.
pub fn adsense_slot_snippet(client_id: &str, slot_id: &str) -> String {
    if client_id.is_empty() || slot_id.is_empty() {
        return String::new();
    }
    format!(
        "<ins class=\"adsbygoogle\"\n  style=\"display:block\"\n  data-ad-client=\"{client_id}\"\n  data-ad-slot=\"{slot_id}\"\n  data-ad-format=\"auto\"\n  data-full-width-responsive=\"true\"></ins>\n<script>\n  (adsbygoogle = window.adsbygoogle || []).push({{}});\n</script>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    #[test]
    fn defaults_are_disabled_and_empty() {
        let db = test_db();
        let settings = load_settings(&db).unwrap();
        assert_eq!(settings, AdsSettings::default());
        assert!(!settings.enabled);
    }

    #[test]
    fn save_then_load_roundtrip_with_notification_worthy_change() {
        let db = test_db();
        let saved = save_settings(
            &db,
            AdsSettings {
                enabled: true,
                adsense_client_id: "ca-pub-1234567890".into(),
                top_banner_slot_id: "1111".into(),
                bottom_banner_slot_id: "2222".into(),
                enable_on_capacitor: false,
            },
        )
        .unwrap();
        let loaded = load_settings(&db).unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.top_banner_slot_id, "1111");
    }

    #[test]
    fn enabling_requires_client_id_and_top_slot() {
        let invalid = AdsSettings {
            enabled: true,
            ..AdsSettings::default()
        };
        let errors = validate_settings(&invalid);
        assert_eq!(errors.len(), 2);

        let wrong_prefix = AdsSettings {
            enabled: true,
            adsense_client_id: "pub-123".into(),
            top_banner_slot_id: "1111".into(),
            ..AdsSettings::default()
        };
        assert_eq!(validate_settings(&wrong_prefix).len(), 1);

        // Disabled settings may be empty
        assert!(validate_settings(&AdsSettings::default()).is_empty());
    }

    #[test]
    fn partial_stored_document_merges_over_defaults() {
        let db = test_db();
        db::set_json_setting(
            &db,
            SETTINGS_CATEGORY,
            SETTINGS_KEY,
            &serde_json::json!({ "enabled": false, "adsenseClientId": "ca-pub-9" }),
        )
        .unwrap();
        let loaded = load_settings(&db).unwrap();
        assert_eq!(loaded.adsense_client_id, "ca-pub-9");
        assert_eq!(loaded.top_banner_slot_id, "");
    }

    #[test]
    fn head_script_requires_adsense_prefix() {
        assert_eq!(adsense_head_script(""), "");
        assert_eq!(adsense_head_script("pub-123"), "");
        let script = adsense_head_script("ca-pub-123");
        assert!(script.contains("client=ca-pub-123"));
        assert!(script.starts_with("<script async"));
    }

    #[test]
    fn slot_snippet_requires_both_ids() {
        assert_eq!(adsense_slot_snippet("ca-pub-123", ""), "");
        assert_eq!(adsense_slot_snippet("", "1111"), "");
        let snippet = adsense_slot_snippet("ca-pub-123", "1111");
        assert!(snippet.contains("data-ad-client=\"ca-pub-123\""));
        assert!(snippet.contains("data-ad-slot=\"1111\""));
    }
}
