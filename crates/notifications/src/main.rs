use anyhow::Context;
use clap::Parser;
use std::{collections::BTreeMap, io::Read, path::PathBuf};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Prepare alert notification data, and render it with handlebars templates.
#[derive(Debug, clap::Parser)]
#[clap(author, name = "alert-render", version)]
pub struct Args {
    /// Base URL from which dashboard, panel, and silence URLs are derived.
    #[clap(long, env, global = true)]
    pub external_url: Option<String>,
    #[clap(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Extend an alert group read as JSON from stdin, writing the extended group to stdout.
    /// --external-url, if set, replaces the group's externalURL.
    Extend,
    /// Render templates over a batch of alerts read as JSON from stdin,
    /// writing a JSON object of rendered texts to stdout.
    Render(RenderArgs),
}

#[derive(Debug, clap::Args)]
pub struct RenderArgs {
    /// Template to register, as NAME=PATH. May be repeated.
    #[clap(long = "template", value_parser = parse_template)]
    pub templates: Vec<(String, PathBuf)>,
    /// Name of a template to render. May be repeated.
    /// Defaults to the default title and message templates.
    #[clap(long = "render")]
    pub names: Vec<String>,
}

/// Batch of alerts to render, with the context of their notification.
#[derive(Debug, serde::Deserialize)]
struct Batch {
    #[serde(flatten)]
    context: notifications::GroupContext,
    alerts: Vec<notifications::Alert>,
}

fn parse_template(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, not {s:?}")),
    }
}

fn read_stdin<T: serde::de::DeserializeOwned>() -> anyhow::Result<T> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
    serde_json::from_str(&buf).context("parsing stdin as JSON")
}

fn extend(external_url: Option<String>) -> anyhow::Result<()> {
    let mut group: notifications::RawAlertGroup = read_stdin()?;
    if let Some(external_url) = external_url {
        group.external_url = external_url;
    }
    tracing::debug!(alerts = group.alerts.len(), receiver = %group.receiver, "extending alert group");

    let extended = notifications::extend_group(group).context("extending alert group")?;
    println!("{}", serde_json::to_string_pretty(&extended)?);
    Ok(())
}

fn render(external_url: Option<String>, args: RenderArgs) -> anyhow::Result<()> {
    let RenderArgs { templates, names } = args;

    let mut engine = notifications::Templates::new(external_url.unwrap_or_default())?;
    for (name, path) in &templates {
        engine.register_file(name, path)?;
    }
    let names = if names.is_empty() {
        vec![
            notifications::DEFAULT_TITLE.to_string(),
            notifications::DEFAULT_MESSAGE.to_string(),
        ]
    } else {
        names
    };
    if let Some(name) = names.iter().find(|name| !engine.has_template(name)) {
        anyhow::bail!("no template named {name:?} is registered");
    }

    let Batch { context, alerts } = read_stdin()?;
    tracing::debug!(alerts = alerts.len(), receiver = %context.receiver, "rendering alert batch");

    let mut renderer = notifications::resolve_text(&engine, &context, &alerts)
        .context("preparing alert template data")?;

    let texts: BTreeMap<&str, String> = names
        .iter()
        .map(|name| (name.as_str(), renderer.text(name)))
        .collect();

    renderer.finish().context("rendering templates")?;
    println!("{}", serde_json::to_string_pretty(&texts)?);

    tracing::info!(count = texts.len(), "rendered templates");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let Args {
        external_url,
        subcommand,
    } = Args::parse();

    match subcommand {
        Subcommand::Extend => extend(external_url),
        Subcommand::Render(args) => render(external_url, args),
    }
}
