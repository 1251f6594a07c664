//! Bro Bro Foods storefront backend.
//!
//! Tauri v2 shell for the momo storefront webview: owns the SQLite order
//! store, the order lifecycle, payment-confirmation reconciliation,
//! WhatsApp/UPI deep links, the external hand-off protocol, the admin
//! gate, and client-local configuration.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub(crate) static APP_START_EPOCH: AtomicU64 = AtomicU64::new(0);

mod admin;
mod ads;
mod commands;
mod db;
mod deeplink;
mod handoff;
mod orders;
mod payments;
mod probe;
mod rules;

/// State that lives exactly as long as the app process. The promo popup
/// is shown at most once per session and the dismissal is never
/// persisted, so a restart shows it again.
#[derive(Default)]
pub struct SessionState {
    promo_dismissed: AtomicBool,
}

impl SessionState {
    pub fn promo_dismissed(&self) -> bool {
        self.promo_dismissed.load(Ordering::Relaxed)
    }

    pub fn dismiss_promo(&self) {
        self.promo_dismissed.store(true, Ordering::Relaxed);
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Maximum number of log files to retain.
const MAX_LOG_FILES: usize = 10;

fn log_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("app.brobrofoods.storefront").join("logs")
}

/// Prune old log files, keeping only the most recent `MAX_LOG_FILES`.
fn prune_old_logs(log_dir: &PathBuf) {
    if !log_dir.exists() {
        return;
    }
    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = std::fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if name.starts_with("storefront.") {
                        let modified = entry
                            .metadata()
                            .ok()
                            .and_then(|m| m.modified().ok())
                            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                        log_files.push((path, modified));
                    }
                }
            }
        }
    }
    if log_files.len() <= MAX_LOG_FILES {
        return;
    }
    log_files.sort_by(|a, b| b.1.cmp(&a.1));
    for (path, _) in log_files.into_iter().skip(MAX_LOG_FILES) {
        let _ = std::fs::remove_file(path);
    }
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() {
    // Record start time for uptime tracking
    let epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    APP_START_EPOCH.store(epoch, Ordering::Relaxed);

    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bro_bro_foods_lib=debug"));

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    prune_old_logs(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "storefront");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the app — dropping it flushes logs.
    // We leak it intentionally since the app runs until process exit.
    std::mem::forget(_guard);

    info!("Starting Bro Bro Foods v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use tauri::Manager;

            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");

            let db_state = db::init(&app_data_dir).expect("Failed to initialize database");
            app.manage(db_state);

            app.manage(admin::AdminState::new());
            app.manage(SessionState::default());

            info!("Bro Bro Foods backend initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Orders
            commands::orders::order_create,
            commands::orders::order_get,
            commands::orders::order_get_timeline,
            commands::orders::order_notify_whatsapp,
            commands::orders::order_get_form_config,
            // Payments
            commands::payments::payment_submit_confirmation,
            commands::payments::payment_get_confirmation,
            commands::payments::payment_open_upi,
            commands::payments::payment_request_screenshot_link,
            commands::payments::payment_get_rails,
            // Admin
            commands::admin::admin_fragment_changed,
            commands::admin::admin_get_authorization,
            commands::admin::admin_list_orders,
            commands::admin::admin_get_order,
            commands::admin::admin_update_order_status,
            // Settings
            commands::settings::ads_get_settings,
            commands::settings::ads_set_settings,
            commands::settings::ads_get_snippets,
            commands::settings::promo_popup_get_state,
            commands::settings::promo_popup_dismiss,
            commands::settings::build_status_get,
            commands::settings::build_status_update,
            // System
            commands::system::apk_check_availability,
            commands::system::apk_get_size,
            commands::system::system_get_info,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
