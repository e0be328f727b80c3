//! Point d'entrée de B2B.
//!
//! Usage :
//!   b2b [SAISIE]
//!
//! La saisie est traitée comme du texte tapé dans la barre d'adresse :
//!   b2b                      → page d'accueil
//!   b2b https://servo.org    → sondée puis ouverte
//!   b2b "rust borrow"        → recherche

use std::env;
use std::error::Error;

use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

use b2b::browser::App;
use b2b::config::Config;
use b2b::servo_glue::BrowserEvent;

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── 2. Provider crypto TLS (Servo et la sonde passent par rustls) ──
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("A rustls crypto provider was already installed");
    }

    #[cfg(debug_assertions)]
    tracing::warn!("Running in DEBUG mode, pages will load very slowly. Use `cargo run --release`.");

    // ── 3. Configuration et ressources ────────────────────────────────
    let config = Config::load();
    b2b::resources::init()?;

    // ── 4. Boucle d'événements Winit ──────────────────────────────────
    let initial_input = env::args().nth(1);
    let event_loop = EventLoop::<BrowserEvent>::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, initial_input)?;

    Ok(event_loop.run_app(&mut app)?)
}
