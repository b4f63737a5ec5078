use super::{group_data, Alert, EnrichedAlertGroup, GroupContext, RawAlertGroup, TemplateEngine};
use anyhow::Context;
use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value as Json;

fn with_status(alerts: &[Json], status: &str) -> Vec<Json> {
    alerts
        .iter()
        .filter(|alert| alert.get("status").and_then(Json::as_str) == Some(status))
        .cloned()
        .collect()
}

// Alerts of an array having the given status.
handlebars_helper!(firing: |alerts: array| with_status(alerts, "firing"));
handlebars_helper!(resolved: |alerts: array| with_status(alerts, "resolved"));

// Accessors over the entries of a labels or annotations object.
handlebars_helper!(sorted_pairs: |kv: object| kv
    .iter()
    .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
    .collect::<Vec<_>>());
handlebars_helper!(names: |kv: object| kv
    .keys()
    .map(|name| Json::String(name.clone()))
    .collect::<Vec<_>>());
handlebars_helper!(values: |kv: object| kv.values().cloned().collect::<Vec<_>>());

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(join: |items: array, sep: str| items
    .iter()
    .map(|item| match item {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    })
    .collect::<Vec<_>>()
    .join(sep));

/// Templates is a TemplateEngine of named handlebars text templates.
///
/// Templates are rendered without HTML escaping. Besides the handlebars
/// built-ins, templates may use helpers:
///
/// - `firing` / `resolved`: the alerts of an array having that status,
///   as in `{{#each (firing alerts)}}`.
/// - `sorted_pairs`, `names`, `values`: the entries, keys, or values of a
///   labels or annotations object, ordered by key.
/// - `upper` and `join`.
///
/// Templates `default.title` and `default.message` are always registered.
pub struct Templates {
    registry: Handlebars<'static>,
    external_url: String,
}

impl Templates {
    pub fn new(external_url: impl Into<String>) -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        registry.register_helper("firing", Box::new(firing));
        registry.register_helper("resolved", Box::new(resolved));
        registry.register_helper("sorted_pairs", Box::new(sorted_pairs));
        registry.register_helper("names", Box::new(names));
        registry.register_helper("values", Box::new(values));
        registry.register_helper("upper", Box::new(upper));
        registry.register_helper("join", Box::new(join));

        super::defaults::register_templates(&mut registry)?;

        Ok(Self {
            registry,
            external_url: external_url.into(),
        })
    }

    /// External URL from which alert URLs are derived.
    pub fn external_url(&self) -> &str {
        &self.external_url
    }

    /// Register `template` as `name`, replacing any existing template of that name.
    pub fn register(&mut self, name: &str, template: &str) -> anyhow::Result<()> {
        self.registry
            .register_template_string(name, template)
            .with_context(|| format!("registering template {name:?}"))
    }

    /// Register the contents of the file at `path` as template `name`.
    pub fn register_file(&mut self, name: &str, path: &std::path::Path) -> anyhow::Result<()> {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("reading template file {}", path.display()))?;
        self.register(name, &template)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}

impl TemplateEngine for Templates {
    type Error = handlebars::RenderError;

    fn group_data(&self, context: &GroupContext, alerts: &[Alert]) -> RawAlertGroup {
        group_data(&self.external_url, context, alerts, chrono::Utc::now())
    }

    fn execute(&self, name: &str, data: &EnrichedAlertGroup) -> Result<String, Self::Error> {
        self.registry.render(name, data)
    }
}
