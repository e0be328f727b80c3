//! Reachability probe: one HEAD request decides whether a URL-looking input
//! is navigated to directly or sent to the search engine.
//!
//! ## Threading
//!
//! ```text
//! Navigator::navigate_to_url()
//!         │ launch(ticket, raw)
//!         ▼
//!   BackgroundProber ── thread "probe-N" ── HttpProber::probe() (HEAD, timeout)
//!         │
//!         │ sink(ProbeReport)   ← skipped if the CancelToken was cancelled
//!         ▼
//!   EventLoopProxy::send_event(BrowserEvent::ProbeFinished)
//!         ▼
//!   Navigator::on_probe_finished()  (main thread)
//! ```
//!
//! The probe never runs on the event-loop thread, so a slow or dead host
//! cannot freeze the window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::{BrowserError, Result};

/// Why a candidate was judged unreachable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("not an http(s) URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered 200; navigate to this URL.
    Reachable(Url),
    Unreachable(ProbeError),
}

/// Blocking reachability check.
pub trait Prober: Send + Sync {
    fn probe(&self, candidate: &str) -> ProbeOutcome;
}

impl<F> Prober for F
where
    F: Fn(&str) -> ProbeOutcome + Send + Sync,
{
    fn probe(&self, candidate: &str) -> ProbeOutcome {
        self(candidate)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpProber
// ─────────────────────────────────────────────────────────────────────────────

/// HEAD-request prober backed by a blocking `reqwest` client.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// `timeout: None` waits indefinitely. Redirects are not followed unless
    /// asked for, so a 301 counts as "not 200".
    pub fn new(user_agent: &str, timeout: Option<Duration>, follow_redirects: bool) -> Result<Self> {
        let redirect = if follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect)
            .build()?;
        Ok(Self { client })
    }
}

impl Prober for HttpProber {
    fn probe(&self, candidate: &str) -> ProbeOutcome {
        let url = match Url::parse(candidate) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return ProbeOutcome::Unreachable(ProbeError::InvalidUrl(candidate.to_string())),
        };

        match self.client.head(url.clone()).send() {
            Ok(response) if response.status() == StatusCode::OK => ProbeOutcome::Reachable(url),
            Ok(response) => {
                ProbeOutcome::Unreachable(ProbeError::Status(response.status().as_u16()))
            }
            Err(e) => ProbeOutcome::Unreachable(ProbeError::Network(e.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Background dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies one probe launch. Later launches get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeTicket(pub u64);

/// Result of a probe, delivered back to the event loop.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub ticket: ProbeTicket,
    /// Address-bar text exactly as submitted.
    pub raw: String,
    pub outcome: ProbeOutcome,
}

/// Shared flag; once cancelled, the worker drops its report.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Starts probes without blocking the caller.
pub trait ProbeLauncher {
    fn launch(&self, ticket: ProbeTicket, raw: String) -> Result<CancelToken>;
}

type ReportSink = Arc<dyn Fn(ProbeReport) + Send + Sync>;

/// Runs each probe on its own short-lived worker thread.
pub struct BackgroundProber {
    prober: Arc<dyn Prober>,
    sink: ReportSink,
}

impl BackgroundProber {
    pub fn new<S>(prober: Arc<dyn Prober>, sink: S) -> Self
    where
        S: Fn(ProbeReport) + Send + Sync + 'static,
    {
        Self {
            prober,
            sink: Arc::new(sink),
        }
    }
}

impl ProbeLauncher for BackgroundProber {
    fn launch(&self, ticket: ProbeTicket, raw: String) -> Result<CancelToken> {
        let token = CancelToken::new();
        let worker_token = token.clone();
        let prober = Arc::clone(&self.prober);
        let sink = Arc::clone(&self.sink);

        thread::Builder::new()
            .name(format!("probe-{}", ticket.0))
            .spawn(move || {
                let outcome = prober.probe(&raw);
                if worker_token.is_cancelled() {
                    debug!(ticket = ticket.0, "Probe cancelled, report dropped");
                    return;
                }
                sink(ProbeReport {
                    ticket,
                    raw,
                    outcome,
                });
            })
            .map_err(BrowserError::ProbeSpawn)?;

        Ok(token)
    }
}
