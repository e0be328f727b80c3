//! Couche d'intégration entre Servo et B2B.
//!
//! 1. **[`Waker`] / [`BrowserEvent`]** : pont `Send + Sync` entre les threads
//!    de Servo (et ceux de la sonde) et le thread principal Winit.
//!
//! 2. **[`ServoView`]** : implémentation de [`BrowserView`] sur une `WebView`.
//!
//! 3. **[`WebViewDelegate`] pour [`AppState`]** : callbacks Servo traduits en
//!    [`ViewEvent`] pour le [`crate::navigation::Navigator`], et filtrage des
//!    requêtes dans `load_web_resource()`.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};

use servo::{LoadStatus, Servo, WebResourceLoad, WebResourceResponse, WebView, WebViewDelegate};
use tracing::{debug, error, warn};
use url::Url;
use winit::event_loop::{EventLoop, EventLoopProxy};

use crate::browser::AppState;
use crate::pages;
use crate::preferences;
use crate::privacy::AdblockEngine;
use crate::probe::ProbeReport;
use crate::view::{BrowserView, Capabilities, ViewEvent};

// ─────────────────────────────────────────────────────────────────────────────
// Waker : pont threads → Winit
// ─────────────────────────────────────────────────────────────────────────────

/// Événement utilisateur de la boucle Winit.
#[derive(Debug)]
pub enum BrowserEvent {
    /// Servo a du travail pour le thread principal : `spin_event_loop()`.
    Wake,
    /// Une sonde d'accessibilité a terminé.
    ProbeFinished(ProbeReport),
}

/// `Clone + Send + Sync` car `EventLoopProxy` l'est, ce qu'exige
/// `EventLoopWaker: 'static + Send + Sync`.
#[derive(Clone)]
pub struct Waker(EventLoopProxy<BrowserEvent>);

impl Waker {
    pub fn new(event_loop: &EventLoop<BrowserEvent>) -> Self {
        Self(event_loop.create_proxy())
    }
}

impl embedder_traits::EventLoopWaker for Waker {
    fn clone_box(&self) -> Box<dyn embedder_traits::EventLoopWaker> {
        Box::new(Self(self.0.clone()))
    }

    fn wake(&self) {
        if let Err(error) = self.0.send_event(BrowserEvent::Wake) {
            warn!(?error, "Échec du réveil de la boucle d'événements Winit");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ServoView : BrowserView sur une WebView
// ─────────────────────────────────────────────────────────────────────────────

/// Vue empruntée le temps d'une opération de navigation.
pub struct ServoView<'a> {
    pub servo: &'a Servo,
    pub webview: &'a WebView,
    /// Capacités courantes, lues par `load_web_resource()`.
    pub capabilities: &'a Cell<Capabilities>,
}

impl BrowserView for ServoView<'_> {
    fn load(&self, url: Url) {
        self.webview.load(url);
    }

    fn go_back(&self) {
        self.webview.go_back(1);
    }

    fn go_forward(&self) {
        self.webview.go_forward(1);
    }

    fn reload(&self) {
        self.webview.reload();
    }

    fn load_html(&self, markup: &str) {
        match Url::parse(&pages::data_url(markup)) {
            Ok(url) => self.webview.load(url),
            Err(e) => error!(error = %e, "Cannot build data: URL"),
        }
    }

    fn set_capabilities(&self, capabilities: Capabilities) {
        self.capabilities.set(capabilities);
        // Servo n'a pas d'interrupteur JS à chaud : les scripts sont coupés
        // dans load_web_resource(). Le stockage passe par une préférence.
        self.servo.set_preference(
            preferences::LOCAL_STORAGE_PREF,
            preferences::local_storage_value(capabilities.local_storage),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Décision par requête
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDecision {
    Allow,
    /// Annuler la requête (raison pour les logs).
    Block(&'static str),
    /// Navigation vers `http://b2b.settings/save?...`.
    SaveSettings,
}

/// Script externe (`.js`, `.mjs`) d'après le chemin de l'URL.
pub fn is_script_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.ends_with(".js") || path.ends_with(".mjs")
}

/// Décide du sort d'une requête réseau.
///
/// `adblock` n'est passé que si le mode privé est actif.
pub fn decide_resource(
    url: &Url,
    is_main_frame: bool,
    source_url: &str,
    capabilities: Capabilities,
    adblock: Option<&AdblockEngine>,
) -> ResourceDecision {
    if pages::is_settings_save_url(url.as_str()) {
        return ResourceDecision::SaveSettings;
    }

    let script = !is_main_frame && is_script_url(url);
    if script && !capabilities.scripting {
        return ResourceDecision::Block("scripting disabled");
    }

    if let Some(engine) = adblock {
        let request_type = if is_main_frame {
            "document"
        } else if script {
            "script"
        } else {
            "other"
        };
        if engine.should_block(url.as_str(), source_url, request_type) {
            return ResourceDecision::Block("filter list");
        }
    }

    ResourceDecision::Allow
}

// ─────────────────────────────────────────────────────────────────────────────
// Échecs de chargement et titre de fenêtre
// ─────────────────────────────────────────────────────────────────────────────

/// Servo ne signale pas les erreurs réseau : il sert `NetErrorHTML` (notre
/// page d'erreur, voir `resources`) à l'URL qui a échoué puis annonce un
/// chargement complet. Le titre de la page à une adresse non `data:` trahit
/// l'échec.
pub fn failure_from_title(title: &str, location: Option<&Url>) -> Option<ViewEvent> {
    let at_failed_url = location.is_some_and(|url| url.scheme() != "data");
    (title == pages::ERROR_PAGE_TITLE && at_failed_url)
        .then_some(ViewEvent::LoadFinished { success: false })
}

/// Texte de titre pour un changement d'emplacement ; les pages internes en
/// `data:` gardent le titre de leur document.
pub fn location_title(url: &Url) -> Option<&str> {
    (url.scheme() != "data").then_some(url.as_str())
}

// ─────────────────────────────────────────────────────────────────────────────
// WebViewDelegate : callbacks Servo → embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Exécute un callback sans laisser une panique traverser Servo.
fn guarded(name: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(callback = name, "Panic in WebViewDelegate callback");
    }
}

impl WebViewDelegate for AppState {
    fn notify_new_frame_ready(&self, _webview: WebView) {
        guarded("notify_new_frame_ready", || self.window.request_redraw());
    }

    fn notify_url_changed(&self, webview: WebView, url: Url) {
        guarded("notify_url_changed", || {
            if let Some(title) = location_title(&url) {
                self.set_window_title(title);
            }
            *self.current_url.borrow_mut() = Some(url.clone());
            if let Some(ref engine) = self.adblock_engine {
                engine.clear_cache();
            }
            self.dispatch_view_event(&webview, ViewEvent::LocationChanged(url));
            self.window.request_redraw();
        });
    }

    fn notify_page_title_changed(&self, webview: WebView, title: Option<String>) {
        guarded("notify_page_title_changed", || {
            let Some(title) = title else { return };
            self.set_window_title(&title);
            let failure = failure_from_title(&title, self.current_url.borrow().as_ref());
            if let Some(event) = failure {
                self.dispatch_view_event(&webview, event);
                self.window.request_redraw();
            }
        });
    }

    fn notify_load_status_changed(&self, webview: WebView, status: LoadStatus) {
        guarded("notify_load_status_changed", || {
            if status == LoadStatus::Complete {
                self.dispatch_view_event(&webview, ViewEvent::LoadFinished { success: true });
            }
        });
    }

    /// Seul signal d'échec de chargement exposé par Servo.
    fn notify_crashed(&self, webview: WebView, reason: String, _backtrace: Option<String>) {
        guarded("notify_crashed", || {
            warn!(%reason, "WebView content crashed");
            self.dispatch_view_event(&webview, ViewEvent::LoadFinished { success: false });
            self.window.request_redraw();
        });
    }

    fn load_web_resource(&self, webview: WebView, load: WebResourceLoad) {
        guarded("load_web_resource", || {
            let request = load.request();
            let url = request.url.clone();
            let is_main_frame = request.is_for_main_frame;

            let source_url = self
                .current_url
                .borrow()
                .as_ref()
                .map(|u| u.to_string())
                .unwrap_or_default();
            let adblock = self
                .adblock_engine
                .as_ref()
                .filter(|_| self.navigator.borrow().privacy().is_enabled());

            match decide_resource(&url, is_main_frame, &source_url, self.capabilities.get(), adblock) {
                ResourceDecision::Allow => {}
                ResourceDecision::Block(reason) => {
                    debug!(url = %url, reason, "Request blocked");
                    load.intercept(WebResourceResponse::new(url)).cancel();
                }
                ResourceDecision::SaveSettings => {
                    load.intercept(WebResourceResponse::new(url.clone())).cancel();
                    self.apply_settings(&webview, url.as_str());
                }
            }
        });
    }
}
