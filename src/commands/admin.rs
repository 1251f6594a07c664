//! Admin commands: the fragment-token gate and the management view.
//!
//! Every command here re-derives authorization from the last reported
//! fragment; there is no session to expire. Two admins updating the same
//! order race as last-write-wins — each update is one atomic store call
//! with no version check, which is acceptable at this shop's scale.

use serde_json::Value;
use tauri::Emitter;
use tracing::info;

use crate::commands::orders::parse_order_id_payload;
use crate::{admin, db, orders};

fn parse_fragment_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(s)) => s,
        Some(Value::Object(obj)) => obj
            .get("fragment")
            .or_else(|| obj.get("hash"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn require_authorized(state: &admin::AdminState) -> Result<(), String> {
    if state.authorized() {
        Ok(())
    } else {
        Err("Admin token missing or invalid".into())
    }
}

fn authorization_json(state: &admin::AdminState) -> Value {
    serde_json::json!({
        "authorized": state.authorized(),
        "hasToken": state.token_present(),
    })
}

/// The webview forwards every hashchange/popstate here. Emits
/// `admin_authorization_changed` only when the gate actually flips, so
/// the admin view re-evaluates without a reload.
#[tauri::command]
pub async fn admin_fragment_changed(
    arg0: Option<Value>,
    state: tauri::State<'_, admin::AdminState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let fragment = parse_fragment_payload(arg0);
    let (authorized, changed) = state.update_fragment(&fragment);
    if changed {
        info!(authorized, "Admin authorization changed");
        let _ = app.emit(
            "admin_authorization_changed",
            serde_json::json!({ "authorized": authorized }),
        );
    }
    Ok(authorization_json(&state))
}

#[tauri::command]
pub async fn admin_get_authorization(
    state: tauri::State<'_, admin::AdminState>,
) -> Result<Value, String> {
    Ok(authorization_json(&state))
}

/// Orders for the admin table, both filters applied, newest first.
#[tauri::command]
pub async fn admin_list_orders(
    arg0: Option<Value>,
    state: tauri::State<'_, admin::AdminState>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    require_authorized(&state)?;

    let (payment_raw, status_raw) = match &arg0 {
        Some(Value::Object(obj)) => (
            obj.get("paymentFilter")
                .and_then(|v| v.as_str())
                .unwrap_or("all")
                .to_string(),
            obj.get("statusFilter")
                .and_then(|v| v.as_str())
                .unwrap_or("all")
                .to_string(),
        ),
        _ => ("all".to_string(), "all".to_string()),
    };
    let payment_filter = admin::PaymentFilter::parse(&payment_raw)?;
    let status_filter = admin::StatusFilter::parse(&status_raw)?;

    // Always a fresh fetch; the admin view never caches a mutable copy
    let all = orders::get_all_orders(&db)?;
    let filtered = admin::filter_orders(all, payment_filter, status_filter);
    serde_json::to_value(filtered).map_err(|e| format!("serialize orders: {e}"))
}

#[tauri::command]
pub async fn admin_get_order(
    arg0: Option<Value>,
    state: tauri::State<'_, admin::AdminState>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    require_authorized(&state)?;
    let order_id = parse_order_id_payload(arg0)?;
    match orders::get_order(&db, order_id)? {
        Some(order) => serde_json::to_value(order).map_err(|e| format!("serialize order: {e}")),
        None => Ok(Value::Null),
    }
}

/// Set an order's status. Any target status from the enumerated set is
/// accepted (staff use this to correct mistakes); unknown ids resolve to
/// null so the detail view shows "no such order" instead of crashing.
#[tauri::command]
pub async fn admin_update_order_status(
    arg0: Option<Value>,
    state: tauri::State<'_, admin::AdminState>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    require_authorized(&state)?;

    let Some(Value::Object(obj)) = &arg0 else {
        return Err("Invalid status update payload".into());
    };
    let order_id = parse_order_id_payload(arg0.clone())?;
    let status_raw = obj
        .get("status")
        .or_else(|| obj.get("newStatus"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("Missing status")?;
    let new_status = orders::OrderStatus::parse(status_raw)?;
    let changed_by = obj
        .get("changedBy")
        .or_else(|| obj.get("changed_by"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("admin");

    match orders::update_order_status(&db, order_id, new_status, changed_by)? {
        Some(order) => {
            let _ = app.emit(
                "order_status_changed",
                serde_json::json!({
                    "orderId": order.id,
                    "status": new_status.as_str(),
                }),
            );
            serde_json::to_value(order).map_err(|e| format!("serialize order: {e}"))
        }
        None => Ok(Value::Null),
    }
}
