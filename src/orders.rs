//! Order lifecycle for the Bro Bro Foods storefront.
//!
//! An order is created once with status `pending` and a single seed event,
//! and is mutated only by status updates (admin) and payment-confirmation
//! attachment (customer, see `payments`). Every status change appends to
//! the `order_status_events` log; events are never removed or rewritten,
//! and the last event's status always equals the order's current status.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::DbState;
use crate::payments::PaymentConfirmation;

/// Closed set of lifecycle states. `delivered` and `cancelled` are the
/// terminal states in the intended flow; the update operation does not
/// enforce the graph (see [`transition_allowed`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    ReadyToDeliver,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::ReadyToDeliver,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyToDeliver => "readyToDeliver",
            OrderStatus::OutForDelivery => "outForDelivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Strict parse of the wire string. Unknown statuses are a validation
    /// error at the command boundary and never reach the store.
    pub fn parse(raw: &str) -> Result<OrderStatus, String> {
        OrderStatus::ALL
            .iter()
            .find(|s| s.as_str() == raw)
            .copied()
            .ok_or_else(|| format!("Unknown order status: {raw}"))
    }
}

/// Whether staff may move an order from `_from` to `_to`.
///
/// Currently every transition is legal: staff correct mistakes by setting
/// any status, including re-setting the current one (which still appends
/// an event). Tightening the graph later is a change to this one function.
pub fn transition_allowed(_from: OrderStatus, _to: OrderStatus) -> bool {
    true
}

/// One entry in an order's append-only status timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeEvent {
    pub status: OrderStatus,
    pub changed_at: String,
    pub changed_by: String,
}

/// The central order entity, in the JSON shape the webview expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    pub plate_type_id: i64,
    pub plate_type_name: String,
    pub price: i64,
    pub quantity: i64,
    pub total_amount: i64,
    pub created_at: String,
    pub status_events: Vec<StatusChangeEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_confirmation: Option<PaymentConfirmation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status_raw: String = row.get("status")?;
    let pc_utr: Option<String> = row.get("pc_utr")?;
    let payment_confirmation = match pc_utr {
        Some(utr) => Some(PaymentConfirmation {
            utr,
            paid_via: row.get::<_, Option<String>>("pc_paid_via")?.unwrap_or_default(),
            paid_at: row.get::<_, Option<String>>("pc_paid_at")?.unwrap_or_default(),
            payment_method_id: row
                .get::<_, Option<i64>>("pc_payment_method_id")?
                .unwrap_or(crate::payments::DEFAULT_PAYMENT_METHOD_ID),
        }),
        None => None,
    };

    Ok(Order {
        id: row.get("id")?,
        // Stored statuses are always written through OrderStatus::as_str,
        // so a parse failure here means a corrupted row.
        status: OrderStatus::parse(&status_raw).unwrap_or(OrderStatus::Pending),
        plate_type_id: row.get("plate_type_id")?,
        plate_type_name: row.get("plate_type_name")?,
        price: row.get("price")?,
        quantity: row.get("quantity")?,
        total_amount: row.get("total_amount")?,
        created_at: row.get("created_at")?,
        status_events: Vec::new(),
        payment_confirmation,
        payment_method_id: row.get("payment_method_id")?,
    })
}

const ORDER_COLUMNS: &str = "id, plate_type_id, plate_type_name, price, quantity, total_amount,
     status, created_at, pc_utr, pc_paid_via, pc_paid_at, pc_payment_method_id, payment_method_id";

fn load_events(conn: &Connection, order_id: i64) -> Result<Vec<StatusChangeEvent>, String> {
    let mut stmt = conn
        .prepare(
            "SELECT status, changed_at, changed_by FROM order_status_events
             WHERE order_id = ?1 ORDER BY id",
        )
        .map_err(|e| format!("prepare timeline: {e}"))?;
    let events = stmt
        .query_map(params![order_id], |row| {
            let status_raw: String = row.get(0)?;
            Ok(StatusChangeEvent {
                status: OrderStatus::parse(&status_raw).unwrap_or(OrderStatus::Pending),
                changed_at: row.get(1)?,
                changed_by: row.get(2)?,
            })
        })
        .map_err(|e| format!("query timeline: {e}"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("read timeline row: {e}"))?;
    Ok(events)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create a new order with status `pending` and its seed status event.
///
/// `total_amount` is computed here, once, and never recomputed afterwards.
/// The row insert and the seed event are a single transaction.
pub fn create_order(
    db: &DbState,
    plate_type_id: i64,
    plate_type_name: &str,
    price: i64,
    quantity: i64,
    changed_by: &str,
) -> Result<Order, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let now = Utc::now().to_rfc3339();
    // The command layer caps quantity, but an out-of-range total must
    // never be stored regardless of who calls in.
    let total_amount = price
        .checked_mul(quantity)
        .ok_or_else(|| "Order total is out of range".to_string())?;

    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| format!("begin transaction: {e}"))?;

    let result = (|| -> Result<i64, String> {
        conn.execute(
            "INSERT INTO orders (plate_type_id, plate_type_name, price, quantity, total_amount, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![plate_type_id, plate_type_name, price, quantity, total_amount, now],
        )
        .map_err(|e| format!("insert order: {e}"))?;
        let order_id = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO order_status_events (order_id, status, changed_at, changed_by)
             VALUES (?1, 'pending', ?2, ?3)",
            params![order_id, now, changed_by],
        )
        .map_err(|e| format!("insert seed event: {e}"))?;

        Ok(order_id)
    })();

    let order_id = match result {
        Ok(id) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| format!("commit: {e}"))?;
            id
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    info!(
        order_id,
        plate = %plate_type_name,
        quantity,
        total_amount,
        "Order created"
    );

    load_order(&conn, order_id)?.ok_or_else(|| format!("Order {order_id} vanished after insert"))
}

fn load_order(conn: &Connection, order_id: i64) -> Result<Option<Order>, String> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
            params![order_id],
            order_from_row,
        )
        .optional()
        .map_err(|e| format!("load order: {e}"))?;

    match order {
        Some(mut order) => {
            order.status_events = load_events(conn, order_id)?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

/// Fetch a single order, timeline included. Unknown id is `Ok(None)`.
pub fn get_order(db: &DbState, order_id: i64) -> Result<Option<Order>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    load_order(&conn, order_id)
}

/// Fetch every order, timelines included. No ordering guarantee here;
/// the admin view sorts its own aggregate (newest first).
pub fn get_all_orders(db: &DbState) -> Result<Vec<Order>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let mut stmt = conn
        .prepare(&format!("SELECT {ORDER_COLUMNS} FROM orders"))
        .map_err(|e| format!("prepare orders: {e}"))?;
    let mut orders = stmt
        .query_map([], order_from_row)
        .map_err(|e| format!("query orders: {e}"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("read order row: {e}"))?;
    for order in &mut orders {
        order.status_events = load_events(&conn, order.id)?;
    }
    Ok(orders)
}

/// Fetch an order's status timeline in append order. Unknown id is `Ok(None)`.
pub fn get_status_timeline(
    db: &DbState,
    order_id: i64,
) -> Result<Option<Vec<StatusChangeEvent>>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM orders WHERE id = ?1",
            params![order_id],
            |_| Ok(true),
        )
        .optional()
        .map_err(|e| format!("check order: {e}"))?
        .unwrap_or(false);
    if !exists {
        return Ok(None);
    }
    Ok(Some(load_events(&conn, order_id)?))
}

/// Append a status event and set the order's status, atomically.
///
/// The event log and the status column must never be observed out of
/// sync, so both writes share one transaction. Unknown id is `Ok(None)`.
pub fn update_order_status(
    db: &DbState,
    order_id: i64,
    new_status: OrderStatus,
    changed_by: &str,
) -> Result<Option<Order>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let current: Option<String> = conn
        .query_row(
            "SELECT status FROM orders WHERE id = ?1",
            params![order_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("read current status: {e}"))?;

    let Some(current_raw) = current else {
        return Ok(None);
    };
    let current_status = OrderStatus::parse(&current_raw).unwrap_or(OrderStatus::Pending);
    if !transition_allowed(current_status, new_status) {
        return Err(format!(
            "Transition {} -> {} is not allowed",
            current_status.as_str(),
            new_status.as_str()
        ));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| format!("begin transaction: {e}"))?;

    let result = (|| -> Result<(), String> {
        conn.execute(
            "INSERT INTO order_status_events (order_id, status, changed_at, changed_by)
             VALUES (?1, ?2, ?3, ?4)",
            params![order_id, new_status.as_str(), now, changed_by],
        )
        .map_err(|e| format!("insert status event: {e}"))?;
        conn.execute(
            "UPDATE orders SET status = ?1 WHERE id = ?2",
            params![new_status.as_str(), order_id],
        )
        .map_err(|e| format!("update order status: {e}"))?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| format!("commit: {e}"))?;
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    }

    info!(
        order_id,
        from = current_status.as_str(),
        to = new_status.as_str(),
        changed_by,
        "Order status updated"
    );

    load_order(&conn, order_id)
}
