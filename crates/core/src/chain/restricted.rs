use url::Url;

/// Schemes of browser-internal pages; nothing may run inside them.
const RESTRICTED_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "devtools",
    "edge",
    "brave",
    "opera",
    "vivaldi",
    "moz-extension",
    "view-source",
    "data",
    "javascript",
];

/// Extension store pages as (host, path prefix).
const STORE_PAGES: &[(&str, &str)] = &[
    ("chromewebstore.google.com", "/"),
    ("chrome.google.com", "/webstore"),
    ("addons.mozilla.org", "/"),
    ("microsoftedge.microsoft.com", "/addons"),
];

/// Whether `url` names a privileged page that forbids script injection.
pub fn is_restricted_url(url: &str) -> bool {
    let url = url.trim();
    let Ok(parsed) = Url::parse(url) else {
        let lower = url.to_ascii_lowercase();
        return RESTRICTED_SCHEMES
            .iter()
            .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| rest.starts_with(':')));
    };

    if RESTRICTED_SCHEMES.contains(&parsed.scheme()) {
        return true;
    }
    parsed.host_str().is_some_and(|host| {
        STORE_PAGES.iter().any(|(store, prefix)| host.eq_ignore_ascii_case(store) && parsed.path().starts_with(prefix))
    })
}
