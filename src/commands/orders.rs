//! Customer-facing order commands: placement and the WhatsApp hand-off.

use serde_json::Value;

use crate::{db, deeplink, handoff, orders, rules};

/// Pull an order id out of a payload that may be a bare number, a
/// numeric string, or an object with the usual key spellings.
pub(crate) fn parse_order_id_payload(arg0: Option<Value>) -> Result<i64, String> {
    let raw = match arg0 {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Object(obj)) => ["orderId", "order_id", "id"]
            .iter()
            .find_map(|key| obj.get(*key))
            .and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }),
        _ => None,
    };
    raw.ok_or_else(|| "Missing orderId".to_string())
}

#[derive(Debug, PartialEq)]
struct OrderCreatePayload {
    plate_type_id: Option<i64>,
    plate_slug: Option<String>,
    quantity: i64,
}

fn parse_order_create_payload(arg0: Option<Value>) -> Result<OrderCreatePayload, String> {
    let Some(Value::Object(obj)) = arg0 else {
        return Err("Invalid order payload".into());
    };

    let plate_type_id = obj
        .get("plateTypeId")
        .or_else(|| obj.get("plate_type_id"))
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        });
    let plate_slug = obj
        .get("plateType")
        .or_else(|| obj.get("plate_type"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let quantity = obj
        .get("quantity")
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .ok_or("Missing quantity")?;

    if plate_type_id.is_none() && plate_slug.is_none() {
        return Err("Missing plateTypeId".into());
    }
    Ok(OrderCreatePayload {
        plate_type_id,
        plate_slug,
        quantity,
    })
}

/// Place an order. Validation failures (unknown plate, below-minimum
/// quantity) are resolved here and never reach the order store.
#[tauri::command]
pub async fn order_create(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = parse_order_create_payload(arg0)?;

    let plate = rules::find_plate(payload.plate_type_id, payload.plate_slug.as_deref())
        .ok_or("Unknown plate type")?;
    if payload.quantity < 1 {
        return Err("Quantity must be at least 1".into());
    }
    if !rules::meets_minimum_order(payload.quantity) {
        return Err(rules::minimum_order_error(payload.quantity));
    }
    if !rules::within_maximum_order(payload.quantity) {
        return Err(rules::maximum_order_error());
    }

    let order = orders::create_order(
        &db,
        plate.id,
        plate.name,
        plate.price,
        payload.quantity,
        "customer",
    )?;
    serde_json::to_value(order).map_err(|e| format!("serialize order: {e}"))
}

#[tauri::command]
pub async fn order_get(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let order_id = parse_order_id_payload(arg0)?;
    match orders::get_order(&db, order_id)? {
        Some(order) => serde_json::to_value(order).map_err(|e| format!("serialize order: {e}")),
        None => Ok(Value::Null),
    }
}

#[tauri::command]
pub async fn order_get_timeline(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let order_id = parse_order_id_payload(arg0)?;
    match orders::get_status_timeline(&db, order_id)? {
        Some(events) => {
            serde_json::to_value(events).map_err(|e| format!("serialize timeline: {e}"))
        }
        None => Ok(Value::Null),
    }
}

/// Hand the freshly placed order off to WhatsApp. The outcome always
/// carries the link so a blocked popup degrades to a visible link and
/// a copy button instead of failing silently.
#[tauri::command]
pub async fn order_notify_whatsapp(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let order_id = parse_order_id_payload(arg0)?;
    let order = orders::get_order(&db, order_id)?
        .ok_or_else(|| format!("Order not found: {order_id}"))?;

    let link = deeplink::build_order_notification_link(
        order.id,
        &order.plate_type_name,
        order.quantity,
        order.total_amount,
    );
    Ok(handoff::open_with_fallback(&link))
}

/// Static order-form data: the plate catalog and the minimum-order rule.
#[tauri::command]
pub async fn order_get_form_config() -> Result<Value, String> {
    Ok(serde_json::json!({
        "plateTypes": rules::PLATE_TYPES,
        "minimumQuantity": rules::MIN_PLATES_FOR_DELIVERY,
        "minimumOrderMessage": rules::minimum_order_message(),
        "deliveryCharge": rules::DELIVERY_CHARGE,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_payload_accepts_common_shapes() {
        assert_eq!(parse_order_id_payload(Some(serde_json::json!(42))).unwrap(), 42);
        assert_eq!(
            parse_order_id_payload(Some(serde_json::json!("42"))).unwrap(),
            42
        );
        assert_eq!(
            parse_order_id_payload(Some(serde_json::json!({ "orderId": 42 }))).unwrap(),
            42
        );
        assert_eq!(
            parse_order_id_payload(Some(serde_json::json!({ "order_id": "7" }))).unwrap(),
            7
        );
        assert!(parse_order_id_payload(None).is_err());
        assert!(parse_order_id_payload(Some(serde_json::json!({ "name": "x" }))).is_err());
    }

    #[test]
    fn order_create_payload_by_id_or_slug() {
        let by_id =
            parse_order_create_payload(Some(serde_json::json!({ "plateTypeId": 2, "quantity": 3 })))
                .unwrap();
        assert_eq!(by_id.plate_type_id, Some(2));
        assert_eq!(by_id.quantity, 3);

        let by_slug = parse_order_create_payload(Some(
            serde_json::json!({ "plateType": "half", "quantity": "2" }),
        ))
        .unwrap();
        assert_eq!(by_slug.plate_slug.as_deref(), Some("half"));
        assert_eq!(by_slug.quantity, 2);

        assert!(parse_order_create_payload(Some(serde_json::json!({ "quantity": 2 }))).is_err());
        assert!(
            parse_order_create_payload(Some(serde_json::json!({ "plateTypeId": 1 }))).is_err()
        );
        assert!(parse_order_create_payload(None).is_err());
    }
}
