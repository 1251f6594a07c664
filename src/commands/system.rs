//! System commands: APK download probes and runtime info.

use serde_json::Value;

use crate::{db, probe, APP_START_EPOCH};

fn parse_kind_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(s)) => s,
        Some(Value::Object(obj)) => obj
            .get("kind")
            .or_else(|| obj.get("apk"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Probe the APK host. The frontend only renders the download button
/// when `available` is true; otherwise it shows `unavailableMessage`.
#[tauri::command]
pub async fn apk_check_availability(arg0: Option<Value>) -> Result<Value, String> {
    let kind = parse_kind_payload(arg0);
    let apk = probe::apk_by_kind(&kind)?;
    let available = probe::check_availability(apk.url).await;
    Ok(serde_json::json!({
        "available": available,
        "url": apk.url,
        "version": apk.version,
        "label": apk.label,
        "filename": apk.filename,
        "unavailableMessage": apk.unavailable_message,
    }))
}

#[tauri::command]
pub async fn apk_get_size(arg0: Option<Value>) -> Result<Value, String> {
    let kind = parse_kind_payload(arg0);
    let apk = probe::apk_by_kind(&kind)?;
    let size = probe::content_size(apk.url).await;
    Ok(serde_json::json!({ "size": size }))
}

#[tauri::command]
pub async fn system_get_info(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    let db_size = std::fs::metadata(&db.db_path).map(|m| m.len()).unwrap_or(0);
    let start = APP_START_EPOCH.load(std::sync::atomic::Ordering::Relaxed);
    let uptime = if start > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now.saturating_sub(start)
    } else {
        0
    };

    Ok(serde_json::json!({
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": env!("BUILD_TIMESTAMP"),
        "db_path": db.db_path.to_string_lossy(),
        "db_size_bytes": db_size,
        "uptime_seconds": uptime,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_payload_accepts_string_and_object() {
        assert_eq!(parse_kind_payload(Some(serde_json::json!("admin"))), "admin");
        assert_eq!(
            parse_kind_payload(Some(serde_json::json!({ "kind": "customer" }))),
            "customer"
        );
        assert_eq!(parse_kind_payload(None), "");
    }
}
