//! Static documents shown in the view: the load-error page and the settings
//! page.
//!
//! Both are rendered through `data:` URLs. The settings form saves by
//! navigating to `http://b2b.settings/save?...`, which is intercepted in
//! [`crate::servo_glue`] before any network access happens.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::Config;

/// Everything outside the RFC 3986 unreserved set is escaped.
const DATA_URL_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Title of [`ERROR_PAGE`]. Servo also serves the page for network errors,
/// so seeing this title at a non-`data:` location means a failed load.
pub const ERROR_PAGE_TITLE: &str = "B2B: Error Loading Page";

/// Shown in place of any page that fails to load.
pub const ERROR_PAGE: &str = "<html>
<head><title>B2B: Error Loading Page</title></head>
<body>
<h1>Error Loading Page</h1>
<p>The requested URL could not be loaded. Please check your internet connection.</p>
</body>
</html>";

/// Domain used for the settings save action.
const SAVE_DOMAIN: &str = "b2b.settings";

pub fn is_settings_save_url(url: &str) -> bool {
    url.starts_with(&format!("http://{SAVE_DOMAIN}/save"))
        || url.starts_with(&format!("https://{SAVE_DOMAIN}/save"))
}

/// Applies the query of a save URL on top of `current`.
pub fn parse_settings_url(url: &str, current: &Config) -> Option<Config> {
    let (_, query) = url.split_once('?')?;
    Some(current.clone().with_query_params(query))
}

/// Wraps markup in a `data:` URL.
pub fn data_url(markup: &str) -> String {
    format!(
        "data:text/html;charset=utf-8,{}",
        utf8_percent_encode(markup, DATA_URL_SET)
    )
}

/// Settings page with current values and the live Privacy Mode state.
pub fn generate_settings_html(config: &Config, privacy_enabled: bool) -> String {
    let c = config;
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>B2B Settings</title>
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #1a1a1a; color: #e0e0e0;
    max-width: 700px; margin: 0 auto; padding: 24px;
}}
h1 {{ font-size: 22px; margin-bottom: 20px; color: #fff; }}
h2 {{
    font-size: 14px; text-transform: uppercase; letter-spacing: 1px;
    color: #888; margin: 24px 0 12px; padding-bottom: 6px;
    border-bottom: 1px solid #333;
}}
label, .toggle {{
    display: flex; justify-content: space-between; align-items: center;
    margin-bottom: 10px; font-size: 14px;
}}
label span {{ flex: 0 0 200px; }}
input[type="text"], input[type="number"] {{
    flex: 1; background: #2a2a2a; border: 1px solid #444;
    color: #e0e0e0; padding: 6px 10px; border-radius: 4px;
    font-size: 13px; font-family: monospace;
}}
.toggle input[type="checkbox"] {{ width: 18px; height: 18px; accent-color: #6a9eff; }}
button {{
    margin-top: 24px; padding: 8px 24px; border: none; border-radius: 4px;
    background: #6a9eff; color: #000; font-weight: 600; cursor: pointer;
}}
.note {{ font-size: 12px; color: #666; margin-top: 4px; }}
</style>
</head>
<body>
<h1>Settings</h1>

<h2>Privacy Mode</h2>
<div class="toggle"><span>Enable Privacy Mode</span>
<input type="checkbox" id="privacy_enabled" {privacy_checked}></div>
<p class="note">Enabled: scripts allowed, local storage denied, filter lists applied.</p>

<h2>General</h2>
<label><span>Home URL</span>
<input type="text" id="home_url" value="{home_url}"></label>
<label><span>Window Title</span>
<input type="text" id="window_title" value="{window_title}"></label>
<label><span>Width</span>
<input type="number" id="window_width" value="{window_width}" min="320"></label>
<label><span>Height</span>
<input type="number" id="window_height" value="{window_height}" min="240"></label>

<h2>Search</h2>
<label><span>Search Engine URL</span>
<input type="text" id="search_engine_url" value="{search_engine_url}"></label>
<label><span>URL suffixes</span>
<input type="text" id="url_tlds" value="{url_tlds}"></label>
<p class="note">Comma-separated. Input containing one of these is opened as a URL.</p>

<h2>Reachability Probe</h2>
<label><span>Timeout (s)</span>
<input type="number" id="probe_timeout_secs" value="{probe_timeout}" min="0"></label>
<div class="toggle"><span>Follow Redirects</span>
<input type="checkbox" id="probe_follow_redirects" {follow_checked}></div>
<label><span>User Agent</span>
<input type="text" id="user_agent" value="{user_agent}"></label>

<h2>Network</h2>
<div class="toggle"><span>Ignore Certificate Errors</span>
<input type="checkbox" id="ignore_certificate_errors" {ignore_cert_checked}></div>

<button onclick="save()">Save Settings</button>

<script>
function enc(s) {{ return encodeURIComponent(s); }}
function val(id) {{ return document.getElementById(id).value; }}
function chk(id) {{ return document.getElementById(id).checked; }}
function save() {{
    var q = "privacy_enabled=" + chk("privacy_enabled")
        + "&home_url=" + enc(val("home_url"))
        + "&window_title=" + enc(val("window_title"))
        + "&window_width=" + val("window_width")
        + "&window_height=" + val("window_height")
        + "&search_engine_url=" + enc(val("search_engine_url"))
        + "&url_tlds=" + enc(val("url_tlds"))
        + "&probe_timeout_secs=" + val("probe_timeout_secs")
        + "&probe_follow_redirects=" + chk("probe_follow_redirects")
        + "&user_agent=" + enc(val("user_agent"))
        + "&ignore_certificate_errors=" + chk("ignore_certificate_errors");
    window.location.href = "http://{save_domain}/save?" + q;
}}
</script>
</body>
</html>"#,
        privacy_checked = checked(privacy_enabled),
        home_url = html_escape(&c.general.home_url),
        window_title = html_escape(&c.general.window_title),
        window_width = c.window.width,
        window_height = c.window.height,
        search_engine_url = html_escape(&c.search.engine_url),
        url_tlds = html_escape(&c.search.url_tlds.join(", ")),
        probe_timeout = c.probe.timeout_secs,
        follow_checked = checked(c.probe.follow_redirects),
        user_agent = html_escape(&c.probe.user_agent),
        ignore_cert_checked = checked(c.network.ignore_certificate_errors),
        save_domain = SAVE_DOMAIN,
    )
}

pub fn generate_saved_html() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Settings Saved</title>
<style>
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #1a1a1a; color: #e0e0e0;
    display: flex; justify-content: center; align-items: center;
    height: 100vh; flex-direction: column;
}
h1 { font-size: 24px; color: #6a9eff; margin-bottom: 12px; }
p { font-size: 16px; color: #888; }
</style>
</head>
<body>
<h1>Settings saved!</h1>
<p>Privacy Mode applies now. Other changes apply after a restart.</p>
</body>
</html>"#
        .to_string()
}

fn checked(on: bool) -> &'static str {
    if on { "checked" } else { "" }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_page_content() {
        assert!(ERROR_PAGE.contains("<h1>Error Loading Page</h1>"));
        assert!(ERROR_PAGE.contains("check your internet connection"));
        assert!(ERROR_PAGE.contains(&format!("<title>{ERROR_PAGE_TITLE}</title>")));
    }

    #[test]
    fn test_is_settings_save_url() {
        assert!(is_settings_save_url("http://b2b.settings/save?privacy_enabled=true"));
        assert!(is_settings_save_url("https://b2b.settings/save?x=1"));
        assert!(!is_settings_save_url("https://example.com"));
        assert!(!is_settings_save_url("http://b2b.settings/other"));
    }

    #[test]
    fn test_parse_settings_url_keeps_current_values() {
        let mut current = Config::default();
        current.general.home_url = "https://start.example".into();
        let url = "http://b2b.settings/save?window_width=1600&privacy_enabled=false";
        let config = parse_settings_url(url, &current).unwrap();
        assert_eq!(config.window.width, 1600);
        assert!(!config.privacy.start_enabled);
        assert_eq!(config.general.home_url, "https://start.example");
    }

    #[test]
    fn test_parse_settings_url_no_query() {
        assert!(parse_settings_url("http://b2b.settings/save", &Config::default()).is_none());
    }

    #[test]
    fn test_settings_html_reflects_privacy_state() {
        let on = generate_settings_html(&Config::default(), true);
        assert!(on.contains(r#"id="privacy_enabled" checked"#));
        let off = generate_settings_html(&Config::default(), false);
        assert!(!off.contains(r#"id="privacy_enabled" checked"#));
        assert!(off.contains("http://duckduckgo.com"));
        assert!(off.contains(".com, .org, .net, .gov, .edu"));
    }

    #[test]
    fn test_settings_html_escapes_values() {
        let mut config = Config::default();
        config.general.window_title = r#"<b>"x"</b>"#.into();
        let html = generate_settings_html(&config, true);
        assert!(html.contains("&lt;b&gt;&quot;x&quot;&lt;/b&gt;"));
    }

    #[test]
    fn test_data_url_encoding() {
        assert_eq!(data_url("a b"), "data:text/html;charset=utf-8,a%20b");
        assert!(data_url(ERROR_PAGE).starts_with("data:text/html;charset=utf-8,%3Chtml%3E"));
        assert!(!data_url(ERROR_PAGE).contains('\n'));
    }

    #[test]
    fn test_data_url_keeps_unreserved_and_encodes_utf8() {
        assert_eq!(data_url("a-b_c.d~é"), "data:text/html;charset=utf-8,a-b_c.d~%C3%A9");
        assert_eq!(data_url("#?%"), "data:text/html;charset=utf-8,%23%3F%25");
    }

    #[test]
    fn test_saved_page() {
        assert!(generate_saved_html().contains("Settings saved"));
    }
}
