use anyhow::Context;

pub const DEFAULT_TITLE: &str = "default.title";
pub const DEFAULT_MESSAGE: &str = "default.message";

// Partial which renders a single alert of `default.message`.
const ALERT: &str = "default_alert";

/// Register the default notification templates, which may be overridden by
/// registering a template of the same name.
pub fn register_templates<'a>(registry: &mut handlebars::Handlebars<'a>) -> anyhow::Result<()> {
    registry
        .register_template_string(
            DEFAULT_TITLE,
            r#"[{{upper status}}{{#if (eq status "firing")}}:{{len (firing alerts)}}{{/if}}] {{join (values groupLabels) " "}}"#,
        )
        .context("registering default title template")?;

    registry
        .register_template_string(
            ALERT,
            r#"Labels:
{{#each labels}}
 - {{@key}} = {{this}}
{{/each}}
{{#if annotations}}
Annotations:
{{#each annotations}}
 - {{@key}} = {{this}}
{{/each}}
{{/if}}
{{#if generatorURL}}
Source: {{generatorURL}}
{{/if}}
{{#if silenceURL}}
Silence: {{silenceURL}}
{{/if}}
{{#if dashboardURL}}
Dashboard: {{dashboardURL}}
{{/if}}
{{#if panelURL}}
Panel: {{panelURL}}
{{/if}}
"#,
        )
        .context("registering default alert template")?;

    registry
        .register_template_string(
            DEFAULT_MESSAGE,
            r#"{{#if (firing alerts)}}
**Firing**

{{#each (firing alerts)}}
{{> default_alert}}

{{/each}}
{{/if}}
{{#if (resolved alerts)}}
**Resolved**

{{#each (resolved alerts)}}
{{> default_alert}}

{{/each}}
{{/if}}"#,
        )
        .context("registering default message template")?;

    Ok(())
}

