//! Navigation controller.
//!
//! Owns everything the toolbar and the view callbacks mutate: the address
//! bar, the Privacy Mode state and the (at most one) pending reachability
//! probe. It never owns the view; each operation borrows a
//! [`BrowserView`] so the same logic runs against Servo and against the
//! recording fake used in tests.
//!
//! ```text
//! submit() ─► navigate_to_url(raw)
//!               ├─ Address::Search ─────────────────────► view.load(search)
//!               └─ Address::Url ─► launcher.launch(ticket)
//!                                     ⋮ (worker thread)
//!               on_probe_finished(report)
//!               ├─ stale ticket ─► ignored
//!               ├─ Reachable(url) ──────────────────────► view.load(url)
//!               └─ Unreachable ─────────────────────────► view.load(search(raw))
//! ```

use tracing::{debug, info, warn};
use url::Url;

use crate::address::{Address, Classifier};
use crate::config::Config;
use crate::error::Result;
use crate::pages;
use crate::privacy::PrivacyMode;
use crate::probe::{CancelToken, ProbeLauncher, ProbeOutcome, ProbeReport, ProbeTicket};
use crate::urlbar::UrlBar;
use crate::view::{BrowserView, ViewEvent};

struct PendingProbe {
    ticket: ProbeTicket,
    token: CancelToken,
}

pub struct Navigator {
    home: Url,
    classifier: Classifier,
    urlbar: UrlBar,
    privacy: PrivacyMode,
    launcher: Box<dyn ProbeLauncher>,
    next_ticket: u64,
    pending: Option<PendingProbe>,
    /// The error page is on its way; its `data:` location must not refill the bar.
    error_page_pending: bool,
    /// Last non-`data:` location, i.e. the page behind an internal page.
    page_location: Option<Url>,
}

impl Navigator {
    pub fn new(config: &Config, launcher: Box<dyn ProbeLauncher>) -> Result<Self> {
        Ok(Self {
            home: Url::parse(&config.general.home_url)?,
            classifier: config.search.classifier(),
            urlbar: UrlBar::new(),
            privacy: PrivacyMode::from_enabled(config.privacy.start_enabled),
            launcher,
            next_ticket: 0,
            pending: None,
            error_page_pending: false,
            page_location: None,
        })
    }

    pub fn urlbar(&self) -> &UrlBar {
        &self.urlbar
    }

    pub fn urlbar_mut(&mut self) -> &mut UrlBar {
        &mut self.urlbar
    }

    pub fn privacy(&self) -> PrivacyMode {
        self.privacy
    }

    pub fn pending_ticket(&self) -> Option<ProbeTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    /// Pushes the current Privacy Mode capabilities to the view without
    /// reloading. Used once the view exists.
    pub fn apply_privacy(&self, view: &dyn BrowserView) {
        view.set_capabilities(self.privacy.capabilities());
    }

    // ── Toolbar actions ──────────────────────────────────────────────────

    pub fn navigate_home(&mut self, view: &dyn BrowserView) {
        self.cancel_pending_probe();
        self.error_page_pending = false;
        info!(url = %self.home, "Navigating home");
        view.load(self.home.clone());
    }

    pub fn back(&mut self, view: &dyn BrowserView) {
        self.cancel_pending_probe();
        view.go_back();
    }

    pub fn forward(&mut self, view: &dyn BrowserView) {
        self.cancel_pending_probe();
        view.go_forward();
    }

    pub fn reload(&self, view: &dyn BrowserView) {
        view.reload();
    }

    /// Submits the address bar text as typed, empty included.
    pub fn submit(&mut self, view: &dyn BrowserView) {
        let raw = self.urlbar.submit();
        self.navigate_to_url(view, &raw);
    }

    /// Classifies `raw` and either searches right away or starts a probe.
    pub fn navigate_to_url(&mut self, view: &dyn BrowserView, raw: &str) {
        self.cancel_pending_probe();
        self.error_page_pending = false;

        match self.classifier.classify(raw) {
            Address::Search(query) => {
                debug!(input = %query, "Input classified as search");
                self.load_search(view, &query);
            }
            Address::Url(candidate) => {
                self.next_ticket += 1;
                let ticket = ProbeTicket(self.next_ticket);
                debug!(input = %candidate, ticket = ticket.0, "Input classified as URL, probing");
                match self.launcher.launch(ticket, candidate.clone()) {
                    Ok(token) => self.pending = Some(PendingProbe { ticket, token }),
                    Err(e) => {
                        warn!(error = %e, "Probe could not start, searching instead");
                        self.load_search(view, &candidate);
                    }
                }
            }
        }
    }

    pub fn on_probe_finished(&mut self, view: &dyn BrowserView, report: ProbeReport) {
        if self.pending_ticket() != Some(report.ticket) {
            debug!(ticket = report.ticket.0, "Stale probe report ignored");
            return;
        }
        self.pending = None;

        match report.outcome {
            ProbeOutcome::Reachable(url) => {
                info!(url = %url, "Probe succeeded");
                view.load(url);
            }
            ProbeOutcome::Unreachable(reason) => {
                debug!(input = %report.raw, %reason, "Probe failed, falling back to search");
                self.load_search(view, &report.raw);
            }
        }
    }

    /// Flips Privacy Mode, applies the capabilities and reloads the page.
    pub fn toggle_privacy(&mut self, view: &dyn BrowserView) -> PrivacyMode {
        let mode = self.privacy.toggle();
        info!(enabled = mode.is_enabled(), "Privacy Mode toggled");
        view.set_capabilities(mode.capabilities());
        view.reload();
        mode
    }

    /// Sets Privacy Mode from the settings page. On a change the
    /// capabilities are applied and the page shown before the settings is
    /// loaded again under them. Returns `true` if that page was loaded.
    pub fn set_privacy(&mut self, view: &dyn BrowserView, enabled: bool) -> bool {
        if self.privacy.is_enabled() == enabled {
            return false;
        }
        self.privacy = PrivacyMode::from_enabled(enabled);
        info!(enabled, "Privacy Mode set");
        view.set_capabilities(self.privacy.capabilities());

        let Some(url) = self.page_location.clone() else {
            return false;
        };
        self.cancel_pending_probe();
        self.error_page_pending = false;
        view.load(url);
        true
    }

    /// Shows an internal page (settings, confirmation).
    pub fn show_page(&mut self, view: &dyn BrowserView, markup: &str) {
        self.cancel_pending_probe();
        self.error_page_pending = false;
        view.load_html(markup);
    }

    // ── View events ──────────────────────────────────────────────────────

    pub fn handle_view_event(&mut self, view: &dyn BrowserView, event: ViewEvent) {
        match event {
            ViewEvent::LocationChanged(url) => self.on_location_changed(&url),
            ViewEvent::LoadFinished { success } => self.on_load_finished(view, success),
        }
    }

    pub fn on_location_changed(&mut self, url: &Url) {
        if url.scheme() != "data" {
            self.page_location = Some(url.clone());
        }
        if self.error_page_pending && url.scheme() == "data" {
            self.error_page_pending = false;
            return;
        }
        self.error_page_pending = false;
        self.urlbar.set_location(url);
    }

    pub fn on_load_finished(&mut self, view: &dyn BrowserView, success: bool) {
        if success {
            return;
        }
        warn!("Page failed to load, showing error page");
        self.urlbar.clear();
        self.error_page_pending = true;
        view.load_html(pages::ERROR_PAGE);
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn load_search(&self, view: &dyn BrowserView, query: &str) {
        match self.classifier.search_target(query) {
            Ok(url) => view.load(url),
            Err(e) => warn!(error = %e, "Cannot build search URL"),
        }
    }

    fn cancel_pending_probe(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(ticket = pending.ticket.0, "Pending probe cancelled");
            pending.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::error::BrowserError;
    use crate::probe::ProbeError;
    use crate::view::Capabilities;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Back,
        Forward,
        Reload,
        Html(String),
        Caps(Capabilities),
    }

    #[derive(Default)]
    struct RecordingView {
        calls: RefCell<Vec<Call>>,
    }

    impl RecordingView {
        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn last(&self) -> Option<Call> {
            self.calls.borrow().last().cloned()
        }

        fn reloads(&self) -> usize {
            self.calls.borrow().iter().filter(|c| **c == Call::Reload).count()
        }
    }

    impl BrowserView for RecordingView {
        fn load(&self, url: Url) {
            self.calls.borrow_mut().push(Call::Load(url.to_string()));
        }
        fn go_back(&self) {
            self.calls.borrow_mut().push(Call::Back);
        }
        fn go_forward(&self) {
            self.calls.borrow_mut().push(Call::Forward);
        }
        fn reload(&self) {
            self.calls.borrow_mut().push(Call::Reload);
        }
        fn load_html(&self, markup: &str) {
            self.calls.borrow_mut().push(Call::Html(markup.to_string()));
        }
        fn set_capabilities(&self, capabilities: Capabilities) {
            self.calls.borrow_mut().push(Call::Caps(capabilities));
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        launched: RefCell<Vec<(ProbeTicket, String, CancelToken)>>,
    }

    impl ProbeLauncher for Rc<RecordingLauncher> {
        fn launch(&self, ticket: ProbeTicket, raw: String) -> Result<CancelToken> {
            let token = CancelToken::new();
            self.launched.borrow_mut().push((ticket, raw, token.clone()));
            Ok(token)
        }
    }

    struct FailingLauncher;

    impl ProbeLauncher for FailingLauncher {
        fn launch(&self, _ticket: ProbeTicket, _raw: String) -> Result<CancelToken> {
            Err(BrowserError::ProbeSpawn(std::io::Error::other("no threads")))
        }
    }

    fn navigator() -> (Navigator, Rc<RecordingLauncher>) {
        let launcher = Rc::new(RecordingLauncher::default());
        let nav = Navigator::new(&Config::default(), Box::new(launcher.clone())).unwrap();
        (nav, launcher)
    }

    fn report(ticket: ProbeTicket, raw: &str, outcome: ProbeOutcome) -> ProbeReport {
        ProbeReport {
            ticket,
            raw: raw.to_string(),
            outcome,
        }
    }

    #[test]
    fn test_navigate_home_loads_home_url() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.navigate_home(&view);
        assert_eq!(view.calls(), vec![Call::Load("http://duckduckgo.com/".into())]);
    }

    #[test]
    fn test_search_input_loads_search_without_probe() {
        let (mut nav, launcher) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "hello world");
        assert_eq!(
            view.calls(),
            vec![Call::Load("https://www.duckduckgo.com/?q=hello+world".into())]
        );
        assert!(launcher.launched.borrow().is_empty());
        assert_eq!(nav.pending_ticket(), None);
    }

    #[test]
    fn test_url_input_starts_probe_and_waits() {
        let (mut nav, launcher) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "https://example.com");

        assert!(view.calls().is_empty());
        let launched = launcher.launched.borrow();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].1, "https://example.com");
        assert_eq!(nav.pending_ticket(), Some(launched[0].0));
    }

    #[test]
    fn test_reachable_probe_loads_url() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "https://example.com");
        let ticket = nav.pending_ticket().unwrap();

        let url = Url::parse("https://example.com").unwrap();
        nav.on_probe_finished(&view, report(ticket, "https://example.com", ProbeOutcome::Reachable(url)));

        assert_eq!(view.calls(), vec![Call::Load("https://example.com/".into())]);
        assert_eq!(nav.pending_ticket(), None);
    }

    #[test]
    fn test_non_200_falls_back_to_search_with_raw_text() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "openai.com");
        let ticket = nav.pending_ticket().unwrap();

        nav.on_probe_finished(
            &view,
            report(ticket, "openai.com", ProbeOutcome::Unreachable(ProbeError::Status(404))),
        );
        assert_eq!(
            view.calls(),
            vec![Call::Load("https://www.duckduckgo.com/?q=openai.com".into())]
        );
    }

    #[test]
    fn test_network_error_falls_back_to_search() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "helloworld");
        let ticket = nav.pending_ticket().unwrap();

        nav.on_probe_finished(
            &view,
            report(
                ticket,
                "helloworld",
                ProbeOutcome::Unreachable(ProbeError::Network("dns".into())),
            ),
        );
        assert_eq!(
            view.last(),
            Some(Call::Load("https://www.duckduckgo.com/?q=helloworld".into()))
        );
    }

    #[test]
    fn test_stale_probe_report_is_ignored() {
        let (mut nav, launcher) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "https://first.example");
        nav.navigate_to_url(&view, "https://second.example");

        let launched = launcher.launched.borrow();
        let (first_ticket, _, first_token) = &launched[0];
        assert!(first_token.is_cancelled());

        let url = Url::parse("https://first.example").unwrap();
        nav.on_probe_finished(&view, report(*first_ticket, "https://first.example", ProbeOutcome::Reachable(url)));
        assert!(view.calls().is_empty());
        assert_eq!(nav.pending_ticket(), Some(launched[1].0));
    }

    #[test]
    fn test_home_cancels_pending_probe() {
        let (mut nav, launcher) = navigator();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "https://slow.example");
        nav.navigate_home(&view);

        assert!(launcher.launched.borrow()[0].2.is_cancelled());
        assert_eq!(nav.pending_ticket(), None);
    }

    #[test]
    fn test_launch_failure_searches_immediately() {
        let mut nav = Navigator::new(&Config::default(), Box::new(FailingLauncher)).unwrap();
        let view = RecordingView::default();
        nav.navigate_to_url(&view, "helloworld");
        assert_eq!(
            view.calls(),
            vec![Call::Load("https://www.duckduckgo.com/?q=helloworld".into())]
        );
    }

    #[test]
    fn test_location_change_overwrites_bar() {
        let (mut nav, _) = navigator();
        nav.urlbar_mut().focus();
        nav.urlbar_mut().insert_char('x');
        nav.on_location_changed(&Url::parse("https://duckduckgo.com/?q=rust").unwrap());
        assert_eq!(nav.urlbar().display_text(), "https://duckduckgo.com/?q=rust");
    }

    #[test]
    fn test_toggle_privacy_twice_restores_and_reloads_twice() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        let before = nav.privacy().capabilities();

        nav.toggle_privacy(&view);
        nav.toggle_privacy(&view);

        assert_eq!(nav.privacy(), PrivacyMode::Enabled);
        assert_eq!(view.reloads(), 2);
        assert_eq!(
            view.calls(),
            vec![
                Call::Caps(Capabilities { scripting: false, local_storage: true }),
                Call::Reload,
                Call::Caps(before),
                Call::Reload,
            ]
        );
    }

    #[test]
    fn test_set_privacy_applies_only_on_change() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        assert!(!nav.set_privacy(&view, true));
        assert!(view.calls().is_empty());
        // Nothing shown yet: capabilities change, nothing to reload.
        assert!(!nav.set_privacy(&view, false));
        assert_eq!(
            view.calls(),
            vec![Call::Caps(Capabilities { scripting: false, local_storage: true })]
        );
        assert_eq!(nav.privacy(), PrivacyMode::Disabled);
    }

    #[test]
    fn test_set_privacy_reloads_page_behind_settings() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.on_location_changed(&Url::parse("https://example.com/article").unwrap());
        nav.show_page(&view, "<h1>Settings</h1>");
        let settings = Url::parse(&pages::data_url("<h1>Settings</h1>")).unwrap();
        nav.on_location_changed(&settings);

        assert!(nav.set_privacy(&view, false));
        assert_eq!(
            view.calls()[1..],
            [
                Call::Caps(Capabilities { scripting: false, local_storage: true }),
                Call::Load("https://example.com/article".into()),
            ]
        );
    }

    #[test]
    fn test_load_failure_shows_error_page_and_clears_bar() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.navigate_home(&view);
        nav.on_location_changed(&Url::parse("https://duckduckgo.com/").unwrap());
        nav.on_location_changed(&Url::parse("https://example.com/page").unwrap());

        nav.handle_view_event(&view, ViewEvent::LoadFinished { success: false });

        assert_eq!(nav.urlbar().display_text(), "");
        assert_eq!(view.last(), Some(Call::Html(pages::ERROR_PAGE.to_string())));

        // Displaying the error page must not refill the bar.
        let data = Url::parse(&pages::data_url(pages::ERROR_PAGE)).unwrap();
        nav.handle_view_event(&view, ViewEvent::LocationChanged(data));
        assert_eq!(nav.urlbar().display_text(), "");
    }

    #[test]
    fn test_load_success_is_no_op() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.on_location_changed(&Url::parse("https://example.com/").unwrap());
        nav.on_load_finished(&view, true);
        assert!(view.calls().is_empty());
        assert_eq!(nav.urlbar().display_text(), "https://example.com/");
    }

    #[test]
    fn test_empty_submit_is_a_url_that_falls_back_to_search() {
        let (mut nav, launcher) = navigator();
        let view = RecordingView::default();

        nav.submit(&view);
        assert!(view.calls().is_empty());
        let (ticket, raw) = {
            let launched = launcher.launched.borrow();
            assert_eq!(launched.len(), 1);
            (launched[0].0, launched[0].1.clone())
        };
        assert_eq!(raw, "");

        nav.on_probe_finished(
            &view,
            report(ticket, "", ProbeOutcome::Unreachable(ProbeError::InvalidUrl(String::new()))),
        );
        assert_eq!(
            view.calls(),
            vec![Call::Load("https://www.duckduckgo.com/?q=".into())]
        );
    }

    #[test]
    fn test_submit_uses_bar_text() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();

        nav.urlbar_mut().focus();
        for c in "rust lang".chars() {
            nav.urlbar_mut().insert_char(c);
        }
        nav.submit(&view);
        assert_eq!(
            view.calls(),
            vec![Call::Load("https://www.duckduckgo.com/?q=rust+lang".into())]
        );
    }

    #[test]
    fn test_back_forward_reload_forwarded() {
        let (mut nav, _) = navigator();
        let view = RecordingView::default();
        nav.back(&view);
        nav.forward(&view);
        nav.reload(&view);
        assert_eq!(view.calls(), vec![Call::Back, Call::Forward, Call::Reload]);
    }

    #[test]
    fn test_start_disabled_from_config() {
        let mut config = Config::default();
        config.privacy.start_enabled = false;
        let nav = Navigator::new(&config, Box::new(FailingLauncher)).unwrap();
        let view = RecordingView::default();
        nav.apply_privacy(&view);
        assert_eq!(
            view.calls(),
            vec![Call::Caps(Capabilities { scripting: false, local_storage: true })]
        );
        assert_eq!(view.reloads(), 0);
    }

    #[test]
    fn test_invalid_home_url_is_error() {
        let mut config = Config::default();
        config.general.home_url = "not a url".into();
        assert!(Navigator::new(&config, Box::new(FailingLauncher)).is_err());
    }
}
