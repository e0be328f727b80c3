//! Address classifier: decides whether address-bar text is a URL or a search.
//!
//! The heuristic is intentionally loose and kept that way:
//!
//! 1. `http://` or `https://` prefix → URL
//! 2. contains an allow-listed TLD substring (`.com`, `.org`, ...) → URL
//! 3. contains neither a space nor a newline → URL (`helloworld` is a URL)
//! 4. anything else → search
//!
//! No trimming, no scheme inference. A scheme-less candidate such as
//! `openai.com` is classified as a URL and then fails the reachability probe,
//! which sends it down the search path.

use thiserror::Error;
use url::Url;

/// Top-level-domain substrings that mark text as a URL.
pub const DEFAULT_TLDS: [&str; 5] = [".com", ".org", ".net", ".gov", ".edu"];

/// Search template; the `+`-joined query is appended.
pub const DEFAULT_SEARCH_TEMPLATE: &str = "https://www.duckduckgo.com/?q=";

/// Outcome of classifying raw address-bar text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Navigate (after probing) to the text as typed.
    Url(String),
    /// Send the text to the search engine.
    Search(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("search template '{template}' produced an invalid URL: {source}")]
    InvalidTemplate {
        template: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct Classifier {
    tlds: Vec<String>,
    search_template: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_TLDS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_SEARCH_TEMPLATE.to_string(),
        )
    }
}

impl Classifier {
    pub fn new(tlds: Vec<String>, search_template: String) -> Self {
        Self {
            tlds,
            search_template,
        }
    }

    pub fn classify(&self, raw: &str) -> Address {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Address::Url(raw.to_string());
        }

        if self.tlds.iter().any(|tld| raw.contains(tld.as_str())) {
            return Address::Url(raw.to_string());
        }

        // Only ' ' and '\n' count here; a tab does not make text a search.
        if !raw.contains(' ') && !raw.contains('\n') {
            return Address::Url(raw.to_string());
        }

        Address::Search(raw.to_string())
    }

    /// Builds the search URL for `query`: whitespace-separated tokens joined
    /// with `+`, appended to the template without further encoding.
    pub fn search_target(&self, query: &str) -> Result<Url, AddressError> {
        let joined = query.split_whitespace().collect::<Vec<_>>().join("+");
        let target = format!("{}{joined}", self.search_template);
        Url::parse(&target).map_err(|source| AddressError::InvalidTemplate {
            template: self.search_template.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_prefix_is_url_unchanged() {
        let c = Classifier::default();
        for input in [
            "http://example",
            "https://example.com/path?x=1",
            "https://has spaces in it",
        ] {
            assert_eq!(c.classify(input), Address::Url(input.to_string()));
        }
    }

    #[test]
    fn test_known_tld_is_url() {
        let c = Classifier::default();
        assert_eq!(c.classify("openai.com"), Address::Url("openai.com".into()));
        // Substring match, even with spaces around it
        assert_eq!(
            c.classify("best sites .org"),
            Address::Url("best sites .org".into())
        );
    }

    #[test]
    fn test_words_with_space_are_search() {
        let c = Classifier::default();
        assert_eq!(
            c.classify("hello world"),
            Address::Search("hello world".into())
        );
        let target = c.search_target("hello world").unwrap();
        assert_eq!(target.as_str(), "https://www.duckduckgo.com/?q=hello+world");
    }

    #[test]
    fn test_single_word_falls_back_to_url() {
        // Loose fallback: a plain word without whitespace is treated as a URL.
        let c = Classifier::default();
        assert_eq!(c.classify("helloworld"), Address::Url("helloworld".into()));
    }

    #[test]
    fn test_newline_makes_search() {
        let c = Classifier::default();
        assert_eq!(c.classify("foo\nbar"), Address::Search("foo\nbar".into()));
    }

    #[test]
    fn test_tab_is_not_a_separator_for_classification() {
        let c = Classifier::default();
        assert_eq!(c.classify("foo\tbar"), Address::Url("foo\tbar".into()));
    }

    #[test]
    fn test_no_trimming() {
        let c = Classifier::default();
        assert_eq!(
            c.classify(" helloworld"),
            Address::Search(" helloworld".into())
        );
    }

    #[test]
    fn test_search_target_collapses_whitespace() {
        let c = Classifier::default();
        let target = c.search_target("  rust   borrow\nchecker ").unwrap();
        assert_eq!(
            target.as_str(),
            "https://www.duckduckgo.com/?q=rust+borrow+checker"
        );
    }

    #[test]
    fn test_custom_tld_list() {
        let c = Classifier::new(vec![".io".into()], DEFAULT_SEARCH_TEMPLATE.into());
        assert_eq!(c.classify("crates.io"), Address::Url("crates.io".into()));
        assert_eq!(
            c.classify("go to example.com"),
            Address::Search("go to example.com".into())
        );
    }

    #[test]
    fn test_invalid_template_is_reported() {
        let c = Classifier::new(vec![], "not a url ".into());
        assert!(matches!(
            c.search_target("x y"),
            Err(AddressError::InvalidTemplate { .. })
        ));
    }
}
