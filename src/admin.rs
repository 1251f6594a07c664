//! Admin gate and order filtering.
//!
//! Access to the management view is a capability carried in the URL
//! fragment: `#caffeineAdminToken=<pin>`. There is no session. The
//! webview reports every fragment change (hashchange and history
//! traversal both) through `admin_fragment_changed`, the stored fragment
//! is the only state, and authorization is re-derived from it on every
//! check, so removing the token revokes access immediately and
//! re-adding it restores it.

use std::sync::Mutex;

use crate::orders::{Order, OrderStatus};

/// Fragment parameter carrying the admin token.
pub const ADMIN_TOKEN_PARAM: &str = "caffeineAdminToken";

/// Static shared secret. Exact, case-sensitive comparison.
const ADMIN_PIN: &str = "7973";

/// Decode one `application/x-www-form-urlencoded` value: `+` is space,
/// `%XX` is a byte escape, anything malformed passes through untouched.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match u8::from_str_radix(
                    std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""),
                    16,
                ) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse the admin token out of a URL fragment. Accepts the fragment
/// with or without its leading `#`, as query-style pairs.
pub fn token_from_fragment(fragment: &str) -> Option<String> {
    let fragment = fragment.trim().trim_start_matches('#');
    if fragment.is_empty() {
        return None;
    }
    for pair in fragment.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(key) == ADMIN_TOKEN_PARAM {
            return Some(decode_component(value));
        }
    }
    None
}

/// Pure derivation: does this fragment authorize the admin view?
pub fn is_authorized(fragment: &str) -> bool {
    token_from_fragment(fragment).as_deref() == Some(ADMIN_PIN)
}

/// Whether a token is present at all, valid or not (drives the login
/// prompt vs. access-denied distinction in the UI).
pub fn has_token(fragment: &str) -> bool {
    token_from_fragment(fragment).is_some()
}

/// Managed state holding the last fragment the webview reported.
pub struct AdminState {
    fragment: Mutex<String>,
}

impl AdminState {
    pub fn new() -> Self {
        Self {
            fragment: Mutex::new(String::new()),
        }
    }

    /// Record a fragment change. Returns `(authorized, changed)` so the
    /// command layer can emit a change event only on actual flips.
    pub fn update_fragment(&self, fragment: &str) -> (bool, bool) {
        let mut guard = self.fragment.lock().unwrap_or_else(|e| e.into_inner());
        let was_authorized = is_authorized(&guard);
        *guard = fragment.to_string();
        let now_authorized = is_authorized(&guard);
        (now_authorized, now_authorized != was_authorized)
    }

    /// Re-derive authorization from the stored fragment. Stateless by
    /// construction: nothing is cached besides the fragment itself.
    pub fn authorized(&self) -> bool {
        let guard = self.fragment.lock().unwrap_or_else(|e| e.into_inner());
        is_authorized(&guard)
    }

    pub fn token_present(&self) -> bool {
        let guard = self.fragment.lock().unwrap_or_else(|e| e.into_inner());
        has_token(&guard)
    }
}

impl Default for AdminState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFilter {
    All,
    Paid,
    Unpaid,
}

impl PaymentFilter {
    pub fn parse(raw: &str) -> Result<PaymentFilter, String> {
        match raw.trim() {
            "" | "all" => Ok(PaymentFilter::All),
            "paid" => Ok(PaymentFilter::Paid),
            "unpaid" => Ok(PaymentFilter::Unpaid),
            other => Err(format!("Unknown payment filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Result<StatusFilter, String> {
        match raw.trim() {
            "" | "all" => Ok(StatusFilter::All),
            other => Ok(StatusFilter::Only(OrderStatus::parse(other)?)),
        }
    }
}

/// Apply both filters and sort newest first for the admin table.
/// "Paid" means a payment confirmation is present, regardless of status.
pub fn filter_orders(
    mut orders: Vec<Order>,
    payment: PaymentFilter,
    status: StatusFilter,
) -> Vec<Order> {
    orders.retain(|order| {
        let payment_ok = match payment {
            PaymentFilter::All => true,
            PaymentFilter::Paid => order.payment_confirmation.is_some(),
            PaymentFilter::Unpaid => order.payment_confirmation.is_none(),
        };
        let status_ok = match status {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => order.status == wanted,
        };
        payment_ok && status_ok
    });
    // RFC 3339 UTC timestamps sort correctly as strings
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}
