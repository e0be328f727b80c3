//! Servo engine preferences and options derived from [`Config`].
//!
//! - Thread pools sized to available CPU cores (clamped), or to
//!   `servo.layout_threads` when set
//! - User agent shared with the reachability probe
//! - Local storage (IndexedDB) follows the startup Privacy Mode
//! - Certificate errors ignored when `network.ignore_certificate_errors` is set

use servo::{Opts, PrefValue, Preferences};
use tracing::{info, warn};

use crate::config::Config;
use crate::privacy::PrivacyMode;

/// Preference toggled at runtime by Privacy Mode.
pub const LOCAL_STORAGE_PREF: &str = "dom_indexeddb_enabled";

#[allow(clippy::field_reassign_with_default)]
pub fn build_servo_preferences(config: &Config) -> Preferences {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as i64)
        .unwrap_or(4);

    let mut prefs = Preferences::default();

    // ── Performance ──────────────────────────────────────────────────────
    prefs.layout_threads = if config.servo.layout_threads > 0 {
        config.servo.layout_threads
    } else {
        cpus.min(8)
    };
    prefs.threadpools_async_runtime_workers_max = (cpus * 2).min(16);
    prefs.threadpools_image_cache_workers_max = cpus.min(8);
    prefs.threadpools_webrender_workers_max = (cpus / 2).clamp(2, 8);
    prefs.threadpools_resource_workers_max = cpus.min(8);
    prefs.network_http_cache_size = config.servo.cache_size;
    prefs.gfx_precache_shaders = config.servo.precache_shaders;

    // ── Identité ─────────────────────────────────────────────────────────
    prefs.user_agent = config.servo.effective_user_agent(&config.probe).to_string();

    // Pages sans https:// doivent rester accessibles (page d'accueil en http).
    prefs.network_enforce_tls_enabled = false;

    // ── Privacy Mode au démarrage ────────────────────────────────────────
    let capabilities = PrivacyMode::from_enabled(config.privacy.start_enabled).capabilities();
    prefs.dom_indexeddb_enabled = capabilities.local_storage;

    info!(
        cpus,
        layout_threads = prefs.layout_threads,
        cache_size = prefs.network_http_cache_size,
        local_storage = prefs.dom_indexeddb_enabled,
        "Servo preferences configured"
    );

    prefs
}

pub fn build_servo_opts(config: &Config) -> Opts {
    let mut opts = Opts::default();
    opts.ignore_certificate_errors = config.network.ignore_certificate_errors;
    if opts.ignore_certificate_errors {
        warn!("Certificate errors are ignored for every page");
    }
    opts
}

/// Valeur de préférence pour le stockage local.
pub fn local_storage_value(enabled: bool) -> PrefValue {
    PrefValue::Bool(enabled)
}
