//! Template data for alert notifications.
//!
//! Alert groups arrive from the notification pipeline as a [`RawAlertGroup`].
//! Before they're handed to a template, each group is _extended_:
//!
//! - Private labels and annotations (`__name__`) are stripped, so they never
//!   show up in a rendered notification.
//! - Each alert gains a `silenceURL`, and a `dashboardURL` / `panelURL` when
//!   its private `__dashboardUid__` / `__panelId__` metadata names one. URLs
//!   are built relative to the group's `externalURL`, and are all empty if no
//!   external URL is configured.
//!
//! [`resolve_text`] ties this together with a [`TemplateEngine`], returning a
//! [`TextRenderer`] that renders any number of named templates and reports
//! the first rendering error once, at the end.
mod alert;
mod defaults;
mod extend;
mod render;
mod templates;
mod urls;

pub use alert::{
    fingerprint, group_data, Alert, AlertStatus, GroupContext, Kv, RawAlert, RawAlertGroup,
};
pub use defaults::{DEFAULT_MESSAGE, DEFAULT_TITLE};
pub use extend::{
    extend_alert, extend_group, firing, resolved, EnrichedAlert, EnrichedAlertGroup,
    EnrichedAlerts,
};
pub use render::{resolve_text, TemplateEngine, TextRenderer};
pub use templates::Templates;
pub use urls::UrlError;

/// Annotation (or label) holding the uid of the dashboard an alert belongs to.
pub const DASHBOARD_UID: &str = "__dashboardUid__";
/// Annotation (or label) holding the id of the dashboard panel an alert belongs to.
pub const PANEL_ID: &str = "__panelId__";

/// Error that describes a failure to prepare or render notification text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse external URL {url:?}")]
    InvalidConfigUrl {
        url: String,
        #[source]
        source: UrlError,
    },
    #[error("failed to execute template {name:?}")]
    TemplateExecution {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Returns true if `key` is private: it both begins and ends with `__`.
/// Private keys carry metadata for URL synthesis, and are never exposed to templates.
pub fn is_private_key(key: &str) -> bool {
    key.starts_with("__") && key.ends_with("__")
}

/// Remove all private keys from `kv`.
pub fn remove_private_keys(mut kv: Kv) -> Kv {
    kv.retain(|key, _| !is_private_key(key));
    kv
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn private_key_cases() {
        for (key, expect) in [
            ("__dashboardUid__", true),
            ("__panelId__", true),
            ("__alert_rule_uid__", true),
            ("____", true),
            ("__", true), // Both a prefix and a suffix of itself.
            ("__prefix", false),
            ("suffix__", false),
            ("_single_", false),
            ("alertname", false),
            ("", false),
        ] {
            assert_eq!(is_private_key(key), expect, "key {key:?}");
        }
    }

    #[test]
    fn removes_only_private_keys() {
        let kv: Kv = [
            ("alertname", "Test"),
            ("__dashboardUid__", "abc"),
            ("severity", "high"),
            ("__other__", "x"),
            ("__half", "y"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let kv = remove_private_keys(kv);
        assert_eq!(
            kv.into_iter().collect::<Vec<_>>(),
            vec![
                ("__half".to_string(), "y".to_string()),
                ("alertname".to_string(), "Test".to_string()),
                ("severity".to_string(), "high".to_string()),
            ]
        );
    }
}
