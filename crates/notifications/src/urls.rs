use super::{is_private_key, Kv};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Characters left as-is within an escaped query component.
// All others are percent-encoded, with space written as '+'.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("invalid control character at byte offset {0}")]
    ControlCharacter(usize),
    #[error(transparent)]
    Parse(#[from] url::ParseError),
}

// Relative external URLs are resolved against this base, which is then
// dropped again when derived URLs are rendered.
const RELATIVE_BASE: &str = "http://external.invalid/";

/// The configured external URL, which may be absolute (`https://host/grafana/`)
/// or a relative reference (`/grafana/`).
#[derive(Debug, Clone)]
pub struct ExternalUrl {
    url: url::Url,
    relative: bool,
}

impl ExternalUrl {
    pub fn parse(external_url: &str) -> Result<Self, UrlError> {
        // The URL parser silently strips tabs and newlines, and trims other
        // control characters. We'd rather reject a mangled configuration.
        if let Some(offset) = external_url
            .bytes()
            .position(|b| b < 0x20 || b == 0x7f)
        {
            return Err(UrlError::ControlCharacter(offset));
        }

        match url::Url::parse(external_url) {
            Ok(url) => Ok(Self {
                url,
                relative: false,
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self {
                url: url::Url::parse(RELATIVE_BASE)?.join(external_url)?,
                relative: true,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Render `url`, which was derived from this external URL.
    /// Derivations of a relative reference are rendered as path, query, and fragment.
    pub fn render(&self, url: &url::Url) -> String {
        if self.relative {
            url[url::Position::BeforePath..].to_string()
        } else {
            url.to_string()
        }
    }

    /// URL of the dashboard having `dashboard_uid`.
    /// The scheme, host, and query of the external URL are retained.
    pub fn dashboard_url(&self, dashboard_uid: &str) -> url::Url {
        let mut url = self.url.clone();
        url.set_path(&join_path(&[self.url.path(), "/d/", dashboard_uid]));
        url
    }

    /// URL of the page which creates a new silence for an alert having `labels`.
    pub fn silence_url(&self, labels: &Kv) -> url::Url {
        let matchers = silence_matchers(labels).join(",");

        let mut url = self.url.clone();
        url.set_path(&join_path(&[self.url.path(), "/alerting/silence/new"]));
        url.set_query(Some(&format!(
            "alertmanager=grafana&matchers={}",
            query_escape(&matchers)
        )));
        url
    }
}

/// Join slash-separated path components, returning a cleaned path.
/// Empty and `.` segments are dropped, and `..` removes its preceding segment.
/// The result is rooted if the first non-empty component is.
pub fn join_path(parts: &[&str]) -> String {
    let Some(first) = parts.iter().find(|p| !p.is_empty()) else {
        return String::new();
    };
    let rooted = first.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in parts.iter().flat_map(|p| p.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last().copied() {
                Some(last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {} // Cannot go above the root.
                _ => segments.push(".."),
            },
            segment => segments.push(segment),
        }
    }

    match (rooted, segments.is_empty()) {
        (true, _) => format!("/{}", segments.join("/")),
        (false, true) => ".".to_string(),
        (false, false) => segments.join("/"),
    }
}

/// Escape `s` for use as a single query parameter value.
pub fn query_escape(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

/// URL which views `panel_id` of the dashboard at `dashboard`.
pub fn panel_url(dashboard: &url::Url, panel_id: &str) -> url::Url {
    let mut url = dashboard.clone();
    url.set_query(Some(&format!("viewPanel={panel_id}")));
    url
}

/// Label matchers which select an alert having `labels`, as `key=value`
/// strings in lexicographic order. Private labels are not matched upon.
pub fn silence_matchers(labels: &Kv) -> Vec<String> {
    let mut matchers: Vec<String> = labels
        .iter()
        .filter(|(key, _)| !is_private_key(key))
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    // `labels` is ordered by key, but the matcher strings themselves must be
    // ordered: "a.b=1" sorts before "a=1", while key "a" sorts before "a.b".
    matchers.sort();
    matchers
}
