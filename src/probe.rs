//! APK availability probes.
//!
//! The download buttons only render when a HEAD probe says the APK is
//! actually there. Every failure mode — timeout, transport error,
//! non-2xx — collapses to "unavailable"; the user message deliberately
//! does not distinguish a 404 from a flaky network.

use std::time::Duration;
use tracing::info;

/// Probe budget. After this the result is "unavailable", never a hang.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One downloadable app build.
#[derive(Debug, Clone, Copy)]
pub struct ApkConfig {
    pub url: &'static str,
    pub version: &'static str,
    pub label: &'static str,
    pub filename: &'static str,
    pub unavailable_message: &'static str,
}

pub const CUSTOMER_APK: ApkConfig = ApkConfig {
    url: "https://brobrofoods.app/downloads/bro-bro-foods.apk",
    version: "1.0.0",
    label: "Bro Bro Foods",
    filename: "bro-bro-foods.apk",
    unavailable_message: "The app is being prepared. Please check back in a few minutes.",
};

pub const ADMIN_APK: ApkConfig = ApkConfig {
    url: "https://brobrofoods.app/downloads/bro-bro-foods-admin.apk",
    version: "1.0.0",
    label: "Bro Bro Foods Admin",
    filename: "bro-bro-foods-admin.apk",
    unavailable_message: "Admin app is being prepared. Please check back later.",
};

/// Resolve a probe target by kind ("customer" or "admin").
pub fn apk_by_kind(kind: &str) -> Result<&'static ApkConfig, String> {
    match kind.trim() {
        "" | "customer" => Ok(&CUSTOMER_APK),
        "admin" => Ok(&ADMIN_APK),
        other => Err(format!("Unknown APK kind: {other}")),
    }
}

fn probe_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| format!("probe client: {e}"))
}

/// HEAD the APK URL. `false` on timeout, transport failure, or any
/// non-success status; this never returns an error to the caller.
pub async fn check_availability(url: &str) -> bool {
    let client = match probe_client() {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.head(url).send().await {
        Ok(resp) => {
            let available = resp.status().is_success();
            info!(url, available, "APK availability probe");
            available
        }
        Err(e) => {
            info!(url, error = %e, "APK availability probe failed");
            false
        }
    }
}

/// Content-Length of the APK formatted for display, or `None` when the
/// probe fails or the server does not report a usable length.
pub async fn content_size(url: &str) -> Option<String> {
    let client = probe_client().ok()?;
    let resp = client.head(url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let bytes = resp.content_length()?;
    Some(format_size_mb(bytes))
}

/// Render a byte count as megabytes with one decimal, e.g. "12.4 MB".
fn format_size_mb(bytes: u64) -> String {
    let megabytes = bytes as f64 / (1024.0 * 1024.0);
    format!("{megabytes:.1} MB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_formatting() {
        assert_eq!(format_size_mb(13_002_342), "12.4 MB");
        assert_eq!(format_size_mb(1024 * 1024), "1.0 MB");
        assert_eq!(format_size_mb(0), "0.0 MB");
    }

    #[test]
    fn apk_kinds_resolve() {
        assert_eq!(apk_by_kind("customer").unwrap().filename, "bro-bro-foods.apk");
        assert_eq!(apk_by_kind("").unwrap().filename, "bro-bro-foods.apk");
        assert_eq!(
            apk_by_kind("admin").unwrap().filename,
            "bro-bro-foods-admin.apk"
        );
        assert!(apk_by_kind("kiosk").is_err());
    }

    #[tokio::test]
    async fn unreachable_host_collapses_to_unavailable() {
        // Reserved TLD guarantees resolution failure without network access
        assert!(!check_availability("https://apk.probe.invalid/app.apk").await);
        assert!(content_size("https://apk.probe.invalid/app.apk")
            .await
            .is_none());
    }
}
