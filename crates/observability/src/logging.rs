//! Structured Logging Setup via tracing-subscriber
//!
//! Level und Format kommen aus der Konfiguration (`[logging]`) und lassen
//! sich per Umgebungsvariable ueberschreiben:
//! - `TRESOR_LOG_LEVEL`: beliebige `EnvFilter`-Direktive, z.B.
//!   `tresor_teams=debug,info`. Die Konfiguration selbst akzeptiert nur die
//!   fuenf Level `trace`, `debug`, `info`, `warn`, `error`.
//! - `TRESOR_LOG_FORMAT`: `text` oder `json`
//!
//! Schluesselmaterial wird nie geloggt; Team- und Nutzer-IDs erscheinen als
//! strukturierte Felder (`team_id`, `user_id`, `chat_id`).

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "TRESOR_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "TRESOR_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor den uebergebenen Werten. Ein
/// zweiter Aufruf (z.B. aus mehreren Tests) ist wirkungslos.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());

    let ergebnis = match format_env.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

/// Gueltiger Level fuer `[logging].level` (nur die fuenf Level, keine Direktiven)
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
