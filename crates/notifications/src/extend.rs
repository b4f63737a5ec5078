use super::{
    remove_private_keys, urls, AlertStatus, Error, Kv, RawAlert, RawAlertGroup, DASHBOARD_UID,
    PANEL_ID,
};
use chrono::{DateTime, Utc};

/// RawAlert extended with URLs, and with private labels and annotations removed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnrichedAlert {
    pub status: AlertStatus,
    pub labels: Kv,
    pub annotations: Kv,
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    /// Serialized as `null` when the alert has no end time,
    /// rather than as a zero timestamp.
    #[serde(rename = "endsAt")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
    #[serde(rename = "silenceURL")]
    pub silence_url: String,
    #[serde(rename = "dashboardURL")]
    pub dashboard_url: String,
    /// Set only if `dashboard_url` is also set.
    #[serde(rename = "panelURL")]
    pub panel_url: String,
}

/// Ordered alerts of an EnrichedAlertGroup.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EnrichedAlerts(pub Vec<EnrichedAlert>);

impl EnrichedAlerts {
    /// Alerts which are firing, in order.
    pub fn firing(&self) -> Vec<&EnrichedAlert> {
        firing(&self.0)
    }
    /// Alerts which are resolved, in order.
    pub fn resolved(&self) -> Vec<&EnrichedAlert> {
        resolved(&self.0)
    }
}

impl std::ops::Deref for EnrichedAlerts {
    type Target = [EnrichedAlert];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// RawAlertGroup extended for rendering by a template.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnrichedAlertGroup {
    pub receiver: String,
    pub status: AlertStatus,
    pub alerts: EnrichedAlerts,
    #[serde(rename = "groupLabels")]
    pub group_labels: Kv,
    #[serde(rename = "commonLabels")]
    pub common_labels: Kv,
    #[serde(rename = "commonAnnotations")]
    pub common_annotations: Kv,
    #[serde(rename = "externalURL")]
    pub external_url: String,
}

/// Return the alerts of `alerts` which are firing, in their original order.
pub fn firing(alerts: &[EnrichedAlert]) -> Vec<&EnrichedAlert> {
    with_status(alerts, AlertStatus::Firing)
}

/// Return the alerts of `alerts` which are resolved, in their original order.
pub fn resolved(alerts: &[EnrichedAlert]) -> Vec<&EnrichedAlert> {
    with_status(alerts, AlertStatus::Resolved)
}

fn with_status(alerts: &[EnrichedAlert], status: AlertStatus) -> Vec<&EnrichedAlert> {
    alerts.iter().filter(|a| a.status == status).collect()
}

/// Extend a RawAlert with URLs derived from `external_url`, and remove its
/// private labels and annotations. If `external_url` is empty, all URLs are empty.
pub fn extend_alert(alert: RawAlert, external_url: &str) -> Result<EnrichedAlert, Error> {
    let RawAlert {
        status,
        labels,
        annotations,
        starts_at,
        ends_at,
        generator_url,
        fingerprint,
    } = alert;

    let mut silence_url = String::new();
    let mut dashboard_url = String::new();
    let mut panel_url = String::new();

    // Private metadata is read here, and must not be removed until after.
    if !external_url.is_empty() {
        let base =
            urls::ExternalUrl::parse(external_url).map_err(|source| Error::InvalidConfigUrl {
                url: external_url.to_string(),
                source,
            })?;

        if let Some(uid) = private_value(&annotations, &labels, DASHBOARD_UID) {
            let dashboard = base.dashboard_url(uid);

            if let Some(panel_id) = private_value(&annotations, &labels, PANEL_ID) {
                panel_url = base.render(&urls::panel_url(&dashboard, panel_id));
            }
            dashboard_url = base.render(&dashboard);
        }
        silence_url = base.render(&base.silence_url(&labels));
    }

    Ok(EnrichedAlert {
        status,
        labels: remove_private_keys(labels),
        annotations: remove_private_keys(annotations),
        starts_at,
        ends_at,
        generator_url,
        fingerprint,
        silence_url,
        dashboard_url,
        panel_url,
    })
}

// Look up non-empty private metadata `key`, preferring annotations over labels.
fn private_value<'a>(annotations: &'a Kv, labels: &'a Kv, key: &str) -> Option<&'a str> {
    [annotations, labels]
        .into_iter()
        .filter_map(|kv| kv.get(key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Extend each alert of `group`, and remove private common labels and annotations.
/// Fails on the first alert which cannot be extended.
pub fn extend_group(group: RawAlertGroup) -> Result<EnrichedAlertGroup, Error> {
    let RawAlertGroup {
        receiver,
        status,
        alerts,
        group_labels,
        common_labels,
        common_annotations,
        external_url,
    } = group;

    let alerts = alerts
        .into_iter()
        .map(|alert| extend_alert(alert, &external_url))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EnrichedAlertGroup {
        receiver,
        status,
        alerts: EnrichedAlerts(alerts),
        group_labels,
        common_labels: remove_private_keys(common_labels),
        common_annotations: remove_private_keys(common_annotations),
        external_url,
    })
}
