use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Labels or annotations of an alert, ordered by key.
pub type Kv = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Firing => "firing",
            AlertStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alert of a [`RawAlertGroup`], as produced by the notification pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawAlert {
    pub status: AlertStatus,
    #[serde(default)]
    pub labels: Kv,
    #[serde(default)]
    pub annotations: Kv,
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "endsAt", default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL", default)]
    pub generator_url: String,
    #[serde(default)]
    pub fingerprint: String,
}

/// A group of alerts which are notified together.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawAlertGroup {
    pub receiver: String,
    pub status: AlertStatus,
    #[serde(default)]
    pub alerts: Vec<RawAlert>,
    #[serde(rename = "groupLabels", default)]
    pub group_labels: Kv,
    #[serde(rename = "commonLabels", default)]
    pub common_labels: Kv,
    #[serde(rename = "commonAnnotations", default)]
    pub common_annotations: Kv,
    /// Base URL from which dashboard, panel, and silence URLs are derived.
    /// May be empty, in which case no URLs are derived.
    #[serde(rename = "externalURL", default)]
    pub external_url: String,
}

/// An alert instance as tracked by the notification pipeline, prior to grouping.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub labels: Kv,
    #[serde(default)]
    pub annotations: Kv,
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "endsAt", default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL", default)]
    pub generator_url: String,
}

impl Alert {
    /// An alert is resolved at `now` if it has an end time which isn't after `now`.
    pub fn is_resolved_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends_at| ends_at <= now)
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> AlertStatus {
        if self.is_resolved_at(now) {
            AlertStatus::Resolved
        } else {
            AlertStatus::Firing
        }
    }
}

/// Context of a single notification: who it's for, and how its alerts were grouped.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupContext {
    #[serde(default)]
    pub receiver: String,
    #[serde(rename = "groupLabels", default)]
    pub group_labels: Kv,
}

/// Compute the fingerprint of a label set: a 64-bit FNV-1a hash over
/// label names and values, ordered by name, each followed by a 0xff separator.
pub fn fingerprint(labels: &Kv) -> String {
    const OFFSET: u64 = 14695981039346656037;
    const PRIME: u64 = 1099511628211;
    const SEPARATOR: u8 = 0xff;

    let mut hash = OFFSET;
    let mut add = |bytes: &[u8]| {
        for b in bytes.iter().chain(std::iter::once(&SEPARATOR)) {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    };
    for (name, value) in labels {
        add(name.as_bytes());
        add(value.as_bytes());
    }
    format!("{hash:016x}")
}

/// Materialize a RawAlertGroup from alert instances.
/// The status of each alert is evaluated as of `now`, and the group is firing
/// if any of its alerts are. Common labels and annotations are those which
/// every alert has, with equal values.
pub fn group_data(
    external_url: &str,
    GroupContext {
        receiver,
        group_labels,
    }: &GroupContext,
    alerts: &[Alert],
    now: DateTime<Utc>,
) -> RawAlertGroup {
    let alerts: Vec<RawAlert> = alerts
        .iter()
        .map(|alert| RawAlert {
            status: alert.status_at(now),
            labels: alert.labels.clone(),
            annotations: alert.annotations.clone(),
            starts_at: alert.starts_at,
            ends_at: alert.ends_at,
            generator_url: alert.generator_url.clone(),
            fingerprint: fingerprint(&alert.labels),
        })
        .collect();

    let status = if alerts.iter().any(|a| a.status == AlertStatus::Firing) {
        AlertStatus::Firing
    } else {
        AlertStatus::Resolved
    };

    RawAlertGroup {
        receiver: receiver.clone(),
        status,
        common_labels: intersect(alerts.iter().map(|a| &a.labels)),
        common_annotations: intersect(alerts.iter().map(|a| &a.annotations)),
        alerts,
        group_labels: group_labels.clone(),
        external_url: external_url.to_string(),
    }
}

// Intersect key/value pairs across all `it` maps.
fn intersect<'a>(mut it: impl Iterator<Item = &'a Kv>) -> Kv {
    let Some(first) = it.next() else {
        return Kv::new();
    };
    let mut common = first.clone();

    for kv in it {
        common.retain(|key, value| kv.get(key) == Some(value));
    }
    common
}
