//! Order rules, the plate catalog, and payment configuration.
//!
//! Single source of truth for the two-item menu, the delivery minimum,
//! and the business UPI settings. Monetary values are integer rupees
//! throughout the app; nothing here (or anywhere else) handles paise.

use serde::Serialize;

/// Minimum number of plates required for delivery.
pub const MIN_PLATES_FOR_DELIVERY: i64 = 2;

/// Delivery charge in rupees, added on top of the items total.
pub const DELIVERY_CHARGE: i64 = 20;

/// Business UPI VPA. A placeholder value here disables payment deep
/// links; customers fall back to scanning the printed QR code.
pub const BUSINESS_VPA: &str = "brobromomos@ptyes";

/// Payee name shown in UPI apps.
pub const BUSINESS_NAME: &str = "Bro Bro Foods";

/// WhatsApp number all order/payment hand-offs go to.
pub const BUSINESS_WHATSAPP: &str = "7973782618";

/// One entry of the two-item menu.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateType {
    pub id: i64,
    pub slug: &'static str,
    pub name: &'static str,
    pub price: i64,
    pub pieces: i64,
}

pub const PLATE_TYPES: [PlateType; 2] = [
    PlateType {
        id: 1,
        slug: "half",
        name: "Half Plate",
        price: 50,
        pieces: 12,
    },
    PlateType {
        id: 2,
        slug: "full",
        name: "Full Plate",
        price: 80,
        pieces: 24,
    },
];

/// Resolve a plate either by numeric id or by slug ("half"/"full").
pub fn find_plate(id: Option<i64>, slug: Option<&str>) -> Option<&'static PlateType> {
    PLATE_TYPES.iter().find(|p| {
        id.map(|id| p.id == id).unwrap_or(false)
            || slug.map(|s| p.slug == s.trim()).unwrap_or(false)
    })
}

/// Upper bound on plates in a single order. Anything above this is a
/// typo or a hostile payload, not a momo order.
pub const MAX_PLATES_PER_ORDER: i64 = 100;

/// Check if an order meets the minimum delivery requirement.
pub fn meets_minimum_order(quantity: i64) -> bool {
    quantity >= MIN_PLATES_FOR_DELIVERY
}

/// Check if an order stays within the per-order plate cap.
pub fn within_maximum_order(quantity: i64) -> bool {
    quantity <= MAX_PLATES_PER_ORDER
}

/// Inline error when a submission exceeds the cap.
pub fn maximum_order_error() -> String {
    format!("Orders are limited to {MAX_PLATES_PER_ORDER} plates. Please contact us on WhatsApp for bulk orders.")
}

/// Minimum-order notice shown on the order form.
pub fn minimum_order_message() -> String {
    format!("Minimum order for delivery: {MIN_PLATES_FOR_DELIVERY} plates")
}

/// Inline error when a submission is below the minimum.
pub fn minimum_order_error(current_quantity: i64) -> String {
    let remaining = MIN_PLATES_FOR_DELIVERY - current_quantity;
    format!(
        "Please add {remaining} more plate{} to meet the minimum order requirement.",
        if remaining > 1 { "s" } else { "" }
    )
}

/// Items total plus the flat delivery charge.
pub fn grand_total(items_total: i64) -> i64 {
    items_total + DELIVERY_CHARGE
}

// ---------------------------------------------------------------------------
// VPA validation
// ---------------------------------------------------------------------------

/// Prefixes that indicate an unconfigured, template-shipped VPA.
const PLACEHOLDER_PREFIXES: [&str; 8] = [
    "paytmuser123@",
    "test@",
    "demo@",
    "example@",
    "placeholder@",
    "dummy@",
    "sample@",
    "user123@",
];

/// Validate a UPI VPA: exactly one `@` splitting two non-empty segments,
/// and not one of the known placeholder patterns. This only gates whether
/// payment deep links are generated at all; it says nothing about whether
/// the address actually exists.
pub fn is_valid_vpa(vpa: &str) -> bool {
    let vpa = vpa.trim();
    if vpa.is_empty() {
        return false;
    }

    let mut parts = vpa.split('@');
    let (Some(username), Some(bank), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if username.is_empty() || bank.is_empty() {
        return false;
    }

    let lowered = vpa.to_ascii_lowercase();
    !PLACEHOLDER_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// User-facing message when the payment link cannot be offered.
pub fn vpa_error_message() -> &'static str {
    "Payment link is not available right now. Please scan the QR code to pay."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_order_boundary() {
        assert!(!meets_minimum_order(0));
        assert!(!meets_minimum_order(1));
        assert!(meets_minimum_order(2));
        assert!(meets_minimum_order(10));
    }

    #[test]
    fn maximum_order_boundary() {
        assert!(within_maximum_order(2));
        assert!(within_maximum_order(MAX_PLATES_PER_ORDER));
        assert!(!within_maximum_order(MAX_PLATES_PER_ORDER + 1));
        assert!(!within_maximum_order(4_000_000_000_000_000_000));
    }

    #[test]
    fn minimum_order_error_pluralizes() {
        assert_eq!(
            minimum_order_error(1),
            "Please add 1 more plate to meet the minimum order requirement."
        );
        assert_eq!(
            minimum_order_error(0),
            "Please add 2 more plates to meet the minimum order requirement."
        );
    }

    #[test]
    fn plate_lookup_by_id_and_slug() {
        let half = find_plate(Some(1), None).unwrap();
        assert_eq!(half.name, "Half Plate");
        assert_eq!(half.price, 50);

        let full = find_plate(None, Some("full")).unwrap();
        assert_eq!(full.id, 2);
        assert_eq!(full.pieces, 24);

        assert!(find_plate(Some(9), None).is_none());
        assert!(find_plate(None, Some("mega")).is_none());
    }

    #[test]
    fn grand_total_adds_flat_delivery_charge() {
        assert_eq!(grand_total(240), 260);
        assert_eq!(grand_total(0), DELIVERY_CHARGE);
    }

    #[test]
    fn vpa_validation() {
        assert!(is_valid_vpa("brobromomos@ptyes"));
        assert!(is_valid_vpa("john@paytm"));

        // Placeholders are rejected even though structurally valid
        assert!(!is_valid_vpa("paytmuser123@ptyes"));
        assert!(!is_valid_vpa("Demo@ybl"));

        // Structural failures
        assert!(!is_valid_vpa(""));
        assert!(!is_valid_vpa("   "));
        assert!(!is_valid_vpa("noatsign"));
        assert!(!is_valid_vpa("@bank"));
        assert!(!is_valid_vpa("name@"));
        assert!(!is_valid_vpa("a@b@c"));
    }

    #[test]
    fn business_vpa_is_configured() {
        // The shipped VPA must pass its own gate, otherwise every payment
        // button silently degrades to the QR fallback.
        assert!(is_valid_vpa(BUSINESS_VPA));
    }
}
