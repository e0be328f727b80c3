//! Privacy Mode : bascule de capacités et filtrage réseau.
//!
//! ## Bascule
//!
//! Deux états, `Enabled` au démarrage. Le couplage avec les capacités de la
//! vue est conservé tel quel, même s'il ressemble à une inversion :
//!
//! | Privacy Mode | JavaScript | Stockage local |
//! |--------------|------------|----------------|
//! | Enabled      | autorisé   | refusé         |
//! | Disabled     | refusé     | autorisé       |
//!
//! ## Filtrage
//!
//! Quand des listes au format Adblock Plus (`*.txt`) sont présentes dans
//! `resources/filters/`, [`AdblockEngine`] (moteur `adblock` de Brave) bloque
//! les requêtes correspondantes tant que le mode est actif.
//!
//! - EasyList : <https://easylist.to/easylist/easylist.txt>
//! - EasyPrivacy : <https://easylist.to/easylist/easyprivacy.txt>

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use adblock::Engine;
use adblock::lists::{FilterSet, ParseOptions};
use tracing::{info, warn};

use crate::view::Capabilities;

// ─────────────────────────────────────────────────────────────────────────────
// PrivacyMode
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivacyMode {
    #[default]
    Enabled,
    Disabled,
}

impl PrivacyMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    /// Bascule l'état et retourne le nouvel état.
    pub fn toggle(&mut self) -> Self {
        *self = match self {
            Self::Enabled => Self::Disabled,
            Self::Disabled => Self::Enabled,
        };
        *self
    }

    /// Capacités appliquées à la vue pour cet état.
    pub fn capabilities(self) -> Capabilities {
        let enabled = self.is_enabled();
        Capabilities {
            scripting: enabled,
            local_storage: !enabled,
        }
    }

    /// Libellé court pour le bouton de la barre d'outils.
    pub fn label(self) -> &'static str {
        match self {
            Self::Enabled => "P:on",
            Self::Disabled => "P:off",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdblockEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Wrapper autour de `adblock::Engine` avec un cache de décisions.
pub struct AdblockEngine {
    engine: Engine,
    /// (url, source_url) → bloquée ? Vidé à chaque navigation.
    cache: RefCell<HashMap<(String, String), bool>>,
}

impl AdblockEngine {
    /// Charge toutes les listes `*.txt` de `filters_dir`.
    ///
    /// Retourne `None` si le dossier est absent ou ne contient aucune liste :
    /// le mode privé se limite alors à la bascule de capacités.
    pub fn load(filters_dir: &Path) -> Option<Self> {
        let entries: Vec<_> = fs::read_dir(filters_dir)
            .ok()?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
            .collect();

        if entries.is_empty() {
            warn!(dir = %filters_dir.display(), "No filter lists found, request filtering disabled");
            return None;
        }

        let mut filter_set = FilterSet::new(false);
        let mut loaded = 0usize;
        for entry in &entries {
            let path = entry.path();
            match fs::read_to_string(&path) {
                Ok(content) => {
                    filter_set.add_filter_list(&content, ParseOptions::default());
                    loaded += 1;
                    info!(path = %path.display(), lines = content.lines().count(), "Filter list loaded");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Cannot read filter list"),
            }
        }

        if loaded == 0 {
            return None;
        }
        info!(lists = loaded, "Adblock engine ready");
        Some(Self::from_filter_set(filter_set))
    }

    /// Construit le moteur depuis des règles en mémoire.
    pub fn from_rules(rules: &[&str]) -> Self {
        let mut filter_set = FilterSet::new(false);
        filter_set.add_filter_list(&rules.join("\n"), ParseOptions::default());
        Self::from_filter_set(filter_set)
    }

    fn from_filter_set(filter_set: FilterSet) -> Self {
        Self {
            engine: Engine::from_filter_set(filter_set, true),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// `request_type` : "document", "script", "image", "stylesheet", "other".
    pub fn should_block(&self, url: &str, source_url: &str, request_type: &str) -> bool {
        let key = (url.to_owned(), source_url.to_owned());
        if let Some(&cached) = self.cache.borrow().get(&key) {
            return cached;
        }

        let blocked = match adblock::request::Request::new(url, source_url, request_type)
            .or_else(|_| adblock::request::Request::new(url, "", "other"))
        {
            Ok(request) => self.engine.check_network_request(&request).matched,
            // data:, blob: etc. : laissées passer
            Err(_) => false,
        };
        self.cache.borrow_mut().insert(key, blocked);
        blocked
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn cached_decisions(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_enabled() {
        assert_eq!(PrivacyMode::default(), PrivacyMode::Enabled);
    }

    #[test]
    fn test_enabled_allows_scripts_and_denies_storage() {
        let caps = PrivacyMode::Enabled.capabilities();
        assert!(caps.scripting);
        assert!(!caps.local_storage);

        let caps = PrivacyMode::Disabled.capabilities();
        assert!(!caps.scripting);
        assert!(caps.local_storage);
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut mode = PrivacyMode::Enabled;
        assert_eq!(mode.toggle(), PrivacyMode::Disabled);
        assert_eq!(mode.toggle(), PrivacyMode::Enabled);
        assert_eq!(mode.capabilities(), PrivacyMode::Enabled.capabilities());
    }

    #[test]
    fn test_from_enabled() {
        assert_eq!(PrivacyMode::from_enabled(false), PrivacyMode::Disabled);
        assert!(PrivacyMode::from_enabled(true).is_enabled());
    }

    #[test]
    fn test_adblock_blocks_listed_domain() {
        let engine = AdblockEngine::from_rules(&["||ads.example.com^"]);
        assert!(engine.should_block(
            "https://ads.example.com/banner.js",
            "https://news.example.org/",
            "script"
        ));
        assert!(!engine.should_block(
            "https://news.example.org/app.js",
            "https://news.example.org/",
            "script"
        ));
    }

    #[test]
    fn test_adblock_cache_cleared() {
        let engine = AdblockEngine::from_rules(&["||tracker.test^"]);
        engine.should_block("https://tracker.test/p.gif", "https://site.test/", "image");
        engine.should_block("https://site.test/x.css", "https://site.test/", "stylesheet");
        assert_eq!(engine.cached_decisions(), 2);
        engine.clear_cache();
        assert_eq!(engine.cached_decisions(), 0);
    }

    #[test]
    fn test_load_missing_or_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AdblockEngine::load(dir.path()).is_none());
        assert!(AdblockEngine::load(&dir.path().join("nope")).is_none());
    }

    #[test]
    fn test_load_reads_txt_lists() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("list.txt"), "||blocked.test^\n").unwrap();
        fs::write(dir.path().join("readme.md"), "not a list").unwrap();

        let engine = AdblockEngine::load(dir.path()).unwrap();
        assert!(engine.should_block("https://blocked.test/pixel.gif", "https://a.test/", "image"));
    }
}
