//! Client-local settings commands: ads configuration, the one-session
//! promo popup flag, and the build/deploy status pass-through record.

use serde_json::Value;
use tauri::Emitter;
use tracing::info;

use crate::{ads, db, SessionState};

const OPS_CATEGORY: &str = "ops";
const BUILD_STATUS_KEY: &str = "last_build_status";

#[tauri::command]
pub async fn ads_get_settings(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let settings = ads::load_settings(&db)?;
    serde_json::to_value(settings).map_err(|e| format!("serialize ads settings: {e}"))
}

/// Validate and persist the owner's ad configuration, then broadcast
/// `ads_config_changed` so open views re-render without a reload.
#[tauri::command]
pub async fn ads_set_settings(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing ads settings payload")?;
    let settings: ads::AdsSettings =
        serde_json::from_value(payload).map_err(|e| format!("Invalid ads settings: {e}"))?;
    let saved = ads::save_settings(&db, settings)?;
    let doc = serde_json::to_value(&saved).map_err(|e| format!("serialize ads settings: {e}"))?;
    let _ = app.emit("ads_config_changed", doc.clone());
    Ok(doc)
}

/// Head script + slot markup for the current configuration; empty
/// strings when ads are disabled or misconfigured.
#[tauri::command]
pub async fn ads_get_snippets(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let settings = ads::load_settings(&db)?;
    if !settings.enabled {
        return Ok(serde_json::json!({
            "headScript": "",
            "topBanner": "",
            "bottomBanner": "",
        }));
    }
    Ok(serde_json::json!({
        "headScript": ads::adsense_head_script(&settings.adsense_client_id),
        "topBanner": ads::adsense_slot_snippet(
            &settings.adsense_client_id,
            &settings.top_banner_slot_id,
        ),
        "bottomBanner": ads::adsense_slot_snippet(
            &settings.adsense_client_id,
            &settings.bottom_banner_slot_id,
        ),
    }))
}

// ---------------------------------------------------------------------------
// Promo popup (session-scoped, never persisted)
// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn promo_popup_get_state(
    session: tauri::State<'_, SessionState>,
) -> Result<Value, String> {
    Ok(serde_json::json!({ "dismissed": session.promo_dismissed() }))
}

#[tauri::command]
pub async fn promo_popup_dismiss(session: tauri::State<'_, SessionState>) -> Result<Value, String> {
    session.dismiss_promo();
    info!("Promo popup dismissed for this session");
    Ok(serde_json::json!({ "dismissed": true }))
}

// ---------------------------------------------------------------------------
// Build/deploy status pass-through
// ---------------------------------------------------------------------------

/// Stored verbatim; the shape belongs to the deploy tooling, not to us.
#[tauri::command]
pub async fn build_status_update(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let record = arg0.ok_or("Missing build status payload")?;
    db::set_json_setting(&db, OPS_CATEGORY, BUILD_STATUS_KEY, &record)?;
    Ok(record)
}

#[tauri::command]
pub async fn build_status_get(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    db::get_json_setting(&db, OPS_CATEGORY, BUILD_STATUS_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_db() -> db::DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        db::DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    #[test]
    fn build_status_roundtrips_untouched() {
        let db = test_db();
        let record = serde_json::json!({
            "deployedAt": "2025-05-01T10:00:00Z",
            "commit": "abc123",
            "extraFieldWeKnowNothingAbout": [1, 2, 3],
        });
        db::set_json_setting(&db, OPS_CATEGORY, BUILD_STATUS_KEY, &record).unwrap();
        let loaded = db::get_json_setting(&db, OPS_CATEGORY, BUILD_STATUS_KEY).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn build_status_defaults_to_null() {
        let db = test_db();
        let loaded = db::get_json_setting(&db, OPS_CATEGORY, BUILD_STATUS_KEY).unwrap();
        assert!(loaded.is_null());
    }

    #[test]
    fn session_promo_flag_flips_once() {
        let session = SessionState::default();
        assert!(!session.promo_dismissed());
        session.dismiss_promo();
        assert!(session.promo_dismissed());
        session.dismiss_promo();
        assert!(session.promo_dismissed());
    }
}
