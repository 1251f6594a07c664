//! Payment-confirmation reconciliation.
//!
//! There is no payment gateway: customers pay through an external UPI app
//! and self-report the bank's UTR here. Attaching a confirmation is
//! independent of the order lifecycle and never advances `status`; staff
//! reconcile the claim manually over WhatsApp. Unlike the status log, a
//! confirmation is last-write-wins: a second submission replaces the
//! first entirely. That asymmetry is deliberate (it mirrors how the shop
//! actually operates) and is isolated behind this module so switching to
//! an append history later stays local.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::DbState;
use crate::orders::Order;

/// Placeholder payment-method id the frontend always sends today.
pub const DEFAULT_PAYMENT_METHOD_ID: i64 = 1;

/// Payment rails offered in the UTR form. Display-only; the UTR is never
/// validated against the rail.
pub const PAYMENT_RAILS: [&str; 4] = ["Google Pay", "PhonePe", "Paytm", "Other"];

/// Default rail pre-selected in the UTR form.
pub const DEFAULT_PAYMENT_RAIL: &str = "Google Pay";

/// A customer-asserted payment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub utr: String,
    pub paid_via: String,
    pub paid_at: String,
    pub payment_method_id: i64,
}

/// Attach a payment confirmation to an order.
///
/// Re-validates the UTR (non-empty after trimming) even though the form
/// already does; an empty claim must never reach the store. Replaces any
/// prior confirmation wholesale. Unknown order id is `Ok(None)`.
pub fn attach_payment_confirmation(
    db: &DbState,
    order_id: i64,
    utr: &str,
    paid_via: &str,
    payment_method_id: i64,
    paid_at: Option<String>,
) -> Result<Option<Order>, String> {
    let utr = utr.trim();
    if utr.is_empty() {
        return Err("UTR is required".into());
    }

    let paid_at = paid_at
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let had_previous: Option<Option<String>> = conn
        .query_row(
            "SELECT pc_utr FROM orders WHERE id = ?1",
            params![order_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("check order: {e}"))?;

    let Some(previous_utr) = had_previous else {
        return Ok(None);
    };

    conn.execute(
        "UPDATE orders SET
            pc_utr = ?1,
            pc_paid_via = ?2,
            pc_paid_at = ?3,
            pc_payment_method_id = ?4,
            payment_method_id = ?4
         WHERE id = ?5",
        params![utr, paid_via, paid_at, payment_method_id, order_id],
    )
    .map_err(|e| format!("attach payment confirmation: {e}"))?;

    info!(
        order_id,
        paid_via,
        replaced = previous_utr.is_some(),
        "Payment confirmation attached"
    );
    drop(conn);

    crate::orders::get_order(db, order_id)
}

/// Read an order's current payment confirmation. Unknown order id or an
/// order without a confirmation both come back as `Ok(None)`.
pub fn get_payment_confirmation(
    db: &DbState,
    order_id: i64,
) -> Result<Option<PaymentConfirmation>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let row = conn
        .query_row(
            "SELECT pc_utr, pc_paid_via, pc_paid_at, pc_payment_method_id
             FROM orders WHERE id = ?1",
            params![order_id],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )
        .optional()
        .map_err(|e| format!("read payment confirmation: {e}"))?;

    Ok(row.and_then(|(utr, paid_via, paid_at, method_id)| {
        utr.map(|utr| PaymentConfirmation {
            utr,
            paid_via: paid_via.unwrap_or_default(),
            paid_at: paid_at.unwrap_or_default(),
            payment_method_id: method_id.unwrap_or(DEFAULT_PAYMENT_METHOD_ID),
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::orders::{create_order, get_order};
    use rusqlite::Connection;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .expect("pragma setup");
        db::run_migrations_for_test(&conn);
        DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    #[test]
    fn attach_sets_confirmation_without_touching_status() {
        let db = test_db();
        let order = create_order(&db, 1, "Half Plate", 50, 2, "customer").unwrap();

        let updated =
            attach_payment_confirmation(&db, order.id, "UTR001122", "PhonePe", 1, None)
                .unwrap()
                .unwrap();

        let pc = updated.payment_confirmation.expect("confirmation set");
        assert_eq!(pc.utr, "UTR001122");
        assert_eq!(pc.paid_via, "PhonePe");
        assert_eq!(updated.status, crate::orders::OrderStatus::Pending);
        // No status event was appended by the payment path
        assert_eq!(updated.status_events.len(), 1);
    }

    #[test]
    fn second_submission_overwrites_first() {
        let db = test_db();
        let order = create_order(&db, 2, "Full Plate", 80, 2, "customer").unwrap();

        attach_payment_confirmation(&db, order.id, "UTR-FIRST", "Paytm", 1, None).unwrap();
        let before = get_payment_confirmation(&db, order.id).unwrap().unwrap();
        assert_eq!(before.utr, "UTR-FIRST");

        attach_payment_confirmation(&db, order.id, "UTR-SECOND", "Google Pay", 1, None).unwrap();
        let after = get_payment_confirmation(&db, order.id).unwrap().unwrap();
        assert_eq!(after.utr, "UTR-SECOND");
        assert_eq!(after.paid_via, "Google Pay");
    }

    #[test]
    fn utr_must_be_non_empty_after_trimming() {
        let db = test_db();
        let order = create_order(&db, 1, "Half Plate", 50, 2, "customer").unwrap();

        assert!(attach_payment_confirmation(&db, order.id, "", "Paytm", 1, None).is_err());
        assert!(attach_payment_confirmation(&db, order.id, "   ", "Paytm", 1, None).is_err());
        assert!(get_payment_confirmation(&db, order.id).unwrap().is_none());

        // Surrounding whitespace is stripped before storage
        attach_payment_confirmation(&db, order.id, "  UTR42  ", "Paytm", 1, None).unwrap();
        let pc = get_payment_confirmation(&db, order.id).unwrap().unwrap();
        assert_eq!(pc.utr, "UTR42");
    }

    #[test]
    fn unknown_order_id_is_none_not_error() {
        let db = test_db();
        assert!(
            attach_payment_confirmation(&db, 999, "UTR9", "Other", 1, None)
                .unwrap()
                .is_none()
        );
        assert!(get_payment_confirmation(&db, 999).unwrap().is_none());
    }

    #[test]
    fn client_supplied_paid_at_is_preserved() {
        let db = test_db();
        let order = create_order(&db, 1, "Half Plate", 50, 2, "customer").unwrap();
        attach_payment_confirmation(
            &db,
            order.id,
            "UTR77",
            "Google Pay",
            1,
            Some("2026-08-01T10:00:00+00:00".into()),
        )
        .unwrap();
        let pc = get_payment_confirmation(&db, order.id).unwrap().unwrap();
        assert_eq!(pc.paid_at, "2026-08-01T10:00:00+00:00");

        let reloaded = get_order(&db, order.id).unwrap().unwrap();
        assert_eq!(
            reloaded.payment_confirmation.unwrap().paid_at,
            "2026-08-01T10:00:00+00:00"
        );
    }
}
