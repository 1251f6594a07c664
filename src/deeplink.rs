//! Deep-link construction for external hand-offs.
//!
//! Pure string builders, no I/O: WhatsApp links with pre-filled messages
//! for the order/payment hand-offs, and UPI payment-intent URIs for the
//! generic rail plus the Paytm and Google Pay app schemes. Opening these
//! links is the `handoff` module's job; whether the payee VPA is worth
//! linking to at all is decided by `rules::is_valid_vpa`.

use crate::rules::{BUSINESS_NAME, BUSINESS_WHATSAPP};

/// RFC 3986 percent-encoding; everything outside the unreserved set is
/// escaped so the message survives any webview or app URL parser.
fn percent_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for b in input.bytes() {
        let is_unreserved =
            b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.' || b == b'~';
        if is_unreserved {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }
    encoded
}

fn wa_link(message: &str) -> String {
    format!(
        "https://wa.me/{BUSINESS_WHATSAPP}?text={}",
        percent_encode(message)
    )
}

fn plates_word(quantity: i64) -> &'static str {
    if quantity > 1 {
        "plates"
    } else {
        "plate"
    }
}

/// WhatsApp link announcing a freshly placed order to the shop.
pub fn build_order_notification_link(
    order_id: i64,
    plate_type_name: &str,
    quantity: i64,
    total_amount: i64,
) -> String {
    let message = format!(
        "Hello! I just placed an order on {BUSINESS_NAME}.\n\n\
         Order ID: #{order_id}\n\
         Item: {plate_type_name}\n\
         Quantity: {quantity} {}\n\
         Total Amount: \u{20b9}{total_amount}\n\n\
         Please confirm my order. Thank you!",
        plates_word(quantity)
    );
    wa_link(&message)
}

/// WhatsApp link reporting a completed payment, UTR included.
pub fn build_payment_confirmation_link(
    order_id: i64,
    grand_total: i64,
    utr: &str,
    paid_via: &str,
) -> String {
    let message = format!(
        "Hello! I have completed the payment for my order on {BUSINESS_NAME}.\n\n\
         Order ID: #{order_id}\n\
         Amount Paid: \u{20b9}{grand_total}\n\
         Paid via: {paid_via}\n\
         UTR: {utr}\n\n\
         Please confirm my payment. Thank you!"
    );
    wa_link(&message)
}

/// WhatsApp link asking the customer to send a payment screenshot
/// (used right after the UPI hand-off, before a UTR exists).
pub fn build_screenshot_request_link(order_id: i64, grand_total: i64) -> String {
    let message = format!(
        "Hello! I am sending the payment screenshot for my order on {BUSINESS_NAME}.\n\n\
         Order ID: #{order_id}\n\
         Amount: \u{20b9}{grand_total}\n\n\
         Please find the screenshot attached. Thank you!"
    );
    wa_link(&message)
}

// ---------------------------------------------------------------------------
// UPI payment intents
// ---------------------------------------------------------------------------

fn upi_query(vpa: &str, amount: i64, name: &str, note: Option<&str>) -> String {
    let mut query = format!(
        "pa={}&pn={}&am={}&cu=INR",
        percent_encode(vpa),
        percent_encode(name),
        amount
    );
    if let Some(note) = note {
        query.push_str("&tn=");
        query.push_str(&percent_encode(note));
    }
    query
}

/// Generic UPI payment intent, handled by whichever UPI app the device
/// has registered for the `upi:` scheme.
pub fn build_upi_link(vpa: &str, amount: i64, name: &str, note: &str) -> String {
    format!("upi://pay?{}", upi_query(vpa, amount, name, Some(note)))
}

/// Paytm-specific payment intent.
pub fn build_paytm_link(vpa: &str, amount: i64, name: &str) -> String {
    format!("paytmmp://pay?{}", upi_query(vpa, amount, name, None))
}

/// Google Pay-specific payment intent.
pub fn build_gpay_link(vpa: &str, amount: i64, name: &str) -> String {
    format!("tez://upi/pay?{}", upi_query(vpa, amount, name, None))
}
