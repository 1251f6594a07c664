//! Payment commands: the UPI hand-off, the UTR submission form, and the
//! WhatsApp payment-confirmation chain.

use serde_json::Value;
use tracing::info;

use crate::commands::orders::parse_order_id_payload;
use crate::{db, deeplink, handoff, orders, payments, rules};

#[derive(Debug, PartialEq)]
struct PaymentConfirmationPayload {
    order_id: i64,
    utr: String,
    paid_via: String,
    payment_method_id: i64,
    paid_at: Option<String>,
}

fn parse_payment_confirmation_payload(
    arg0: Option<Value>,
) -> Result<PaymentConfirmationPayload, String> {
    let Some(Value::Object(obj)) = arg0 else {
        return Err("Invalid payment confirmation payload".into());
    };

    let order_id = parse_order_id_payload(Some(Value::Object(obj.clone())))?;
    let utr = obj
        .get("utr")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if utr.is_empty() {
        return Err("UTR is required".into());
    }

    let paid_via = obj
        .get("paidVia")
        .or_else(|| obj.get("paid_via"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| payments::DEFAULT_PAYMENT_RAIL.to_string());
    let payment_method_id = obj
        .get("paymentMethodId")
        .or_else(|| obj.get("payment_method_id"))
        .and_then(|v| v.as_i64())
        .unwrap_or(payments::DEFAULT_PAYMENT_METHOD_ID);
    let paid_at = obj
        .get("paidAt")
        .or_else(|| obj.get("paid_at"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(PaymentConfirmationPayload {
        order_id,
        utr,
        paid_via,
        payment_method_id,
        paid_at,
    })
}

/// Attach the self-reported UTR to the order, then chain into the
/// WhatsApp payment-confirmation hand-off. Attaching never advances the
/// order's status; staff reconcile the claim manually.
#[tauri::command]
pub async fn payment_submit_confirmation(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = parse_payment_confirmation_payload(arg0)?;

    let order = payments::attach_payment_confirmation(
        &db,
        payload.order_id,
        &payload.utr,
        &payload.paid_via,
        payload.payment_method_id,
        payload.paid_at,
    )?
    .ok_or_else(|| format!("Order not found: {}", payload.order_id))?;

    let link = deeplink::build_payment_confirmation_link(
        order.id,
        rules::grand_total(order.total_amount),
        &payload.utr,
        &payload.paid_via,
    );
    let handoff_result = handoff::open_with_fallback(&link);

    Ok(serde_json::json!({
        "order": order,
        "handoff": handoff_result,
    }))
}

#[tauri::command]
pub async fn payment_get_confirmation(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let order_id = parse_order_id_payload(arg0)?;
    match payments::get_payment_confirmation(&db, order_id)? {
        Some(pc) => serde_json::to_value(pc).map_err(|e| format!("serialize confirmation: {e}")),
        None => Ok(Value::Null),
    }
}

/// Which payment rail the user tapped. One attempt per tap, no chaining
/// between rails; the generic `upi` rail is the tap-anywhere QR path.
fn rail_link(rail: &str, amount: i64) -> Result<String, String> {
    match rail {
        "" | "upi" => Ok(deeplink::build_upi_link(
            rules::BUSINESS_VPA,
            amount,
            rules::BUSINESS_NAME,
            "Order Payment",
        )),
        "paytm" => Ok(deeplink::build_paytm_link(
            rules::BUSINESS_VPA,
            amount,
            rules::BUSINESS_NAME,
        )),
        "gpay" => Ok(deeplink::build_gpay_link(
            rules::BUSINESS_VPA,
            amount,
            rules::BUSINESS_NAME,
        )),
        other => Err(format!("Unknown payment rail: {other}")),
    }
}

#[tauri::command]
pub async fn payment_open_upi(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let (order_id, rail) = match &arg0 {
        Some(Value::Object(obj)) => {
            let rail = obj
                .get("rail")
                .and_then(|v| v.as_str())
                .unwrap_or("upi")
                .trim()
                .to_string();
            (parse_order_id_payload(arg0.clone())?, rail)
        }
        _ => (parse_order_id_payload(arg0)?, "upi".to_string()),
    };

    // An unconfigured/placeholder VPA disables payment links entirely;
    // the customer is pointed at the printed QR code instead.
    if !rules::is_valid_vpa(rules::BUSINESS_VPA) {
        return Err(rules::vpa_error_message().to_string());
    }

    let order = orders::get_order(&db, order_id)?
        .ok_or_else(|| format!("Order not found: {order_id}"))?;
    let amount = rules::grand_total(order.total_amount);
    let link = rail_link(&rail, amount)?;

    info!(order_id, rail = %rail, amount, "UPI hand-off requested");
    Ok(handoff::open_with_fallback(&link))
}

/// WhatsApp "payment done, screenshot coming" hand-off, offered right
/// after the UPI attempt and before the customer has a UTR to paste.
#[tauri::command]
pub async fn payment_request_screenshot_link(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let order_id = parse_order_id_payload(arg0)?;
    let order = orders::get_order(&db, order_id)?
        .ok_or_else(|| format!("Order not found: {order_id}"))?;

    let link = deeplink::build_screenshot_request_link(
        order.id,
        rules::grand_total(order.total_amount),
    );
    Ok(handoff::open_with_fallback(&link))
}

/// Rails offered in the UTR form, with the pre-selected default.
#[tauri::command]
pub async fn payment_get_rails() -> Result<Value, String> {
    Ok(serde_json::json!({
        "rails": payments::PAYMENT_RAILS,
        "default": payments::DEFAULT_PAYMENT_RAIL,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_payload_defaults() {
        let parsed = parse_payment_confirmation_payload(Some(serde_json::json!({
            "orderId": 9,
            "utr": " UTR123 ",
        })))
        .unwrap();
        assert_eq!(parsed.order_id, 9);
        assert_eq!(parsed.utr, "UTR123");
        assert_eq!(parsed.paid_via, "Google Pay");
        assert_eq!(parsed.payment_method_id, 1);
        assert!(parsed.paid_at.is_none());
    }

    #[test]
    fn confirmation_payload_rejects_empty_utr() {
        let err = parse_payment_confirmation_payload(Some(serde_json::json!({
            "orderId": 9,
            "utr": "   ",
        })))
        .unwrap_err();
        assert_eq!(err, "UTR is required");

        assert!(parse_payment_confirmation_payload(Some(serde_json::json!({
            "orderId": 9,
        })))
        .is_err());
    }

    #[test]
    fn confirmation_payload_full_shape() {
        let parsed = parse_payment_confirmation_payload(Some(serde_json::json!({
            "order_id": "12",
            "utr": "UTR777",
            "paid_via": "PhonePe",
            "paymentMethodId": 3,
            "paidAt": "2026-08-01T10:00:00+00:00",
        })))
        .unwrap();
        assert_eq!(parsed.order_id, 12);
        assert_eq!(parsed.paid_via, "PhonePe");
        assert_eq!(parsed.payment_method_id, 3);
        assert_eq!(parsed.paid_at.as_deref(), Some("2026-08-01T10:00:00+00:00"));
    }

    #[test]
    fn rail_links_cover_all_rails() {
        assert!(rail_link("upi", 260).unwrap().starts_with("upi://pay?"));
        assert!(rail_link("", 260).unwrap().starts_with("upi://pay?"));
        assert!(rail_link("paytm", 260).unwrap().starts_with("paytmmp://pay?"));
        assert!(rail_link("gpay", 260).unwrap().starts_with("tez://upi/pay?"));
        assert!(rail_link("venmo", 260).is_err());
    }
}
