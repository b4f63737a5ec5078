use super::{extend_group, Alert, EnrichedAlertGroup, Error, GroupContext, RawAlertGroup};

/// TemplateEngine groups alerts into template data, and executes named templates.
pub trait TemplateEngine {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Materialize the RawAlertGroup of a notification of `alerts`.
    fn group_data(&self, context: &GroupContext, alerts: &[Alert]) -> RawAlertGroup;

    /// Render template `name` with `data`.
    fn execute(&self, name: &str, data: &EnrichedAlertGroup) -> Result<String, Self::Error>;
}

/// TextRenderer renders named templates of an engine with a single
/// EnrichedAlertGroup. The first rendering error is latched: all
/// subsequent renders are skipped, and the error is returned by
/// `TextRenderer::finish`.
pub struct TextRenderer<'e, E: TemplateEngine + ?Sized> {
    engine: &'e E,
    data: EnrichedAlertGroup,
    error: Option<Error>,
}

/// Group `alerts` into an EnrichedAlertGroup using `engine`, and return a
/// TextRenderer of the group.
pub fn resolve_text<'e, E: TemplateEngine + ?Sized>(
    engine: &'e E,
    context: &GroupContext,
    alerts: &[Alert],
) -> Result<TextRenderer<'e, E>, Error> {
    let data = extend_group(engine.group_data(context, alerts))?;

    Ok(TextRenderer {
        engine,
        data,
        error: None,
    })
}

impl<'e, E: TemplateEngine + ?Sized> TextRenderer<'e, E> {
    /// Render template `name`, returning its text. If this or a prior render
    /// failed, an empty string is returned instead.
    pub fn text(&mut self, name: &str) -> String {
        if self.error.is_some() {
            tracing::debug!(%name, "skipping template after a prior error");
            return String::new();
        }

        match self.engine.execute(name, &self.data) {
            Ok(text) => text,
            Err(err) => {
                let err = Error::TemplateExecution {
                    name: name.to_string(),
                    source: Box::new(err),
                };
                tracing::debug!(error = ?err, "template execution failed");
                self.error = Some(err);
                String::new()
            }
        }
    }

    pub fn data(&self) -> &EnrichedAlertGroup {
        &self.data
    }

    /// The first error encountered by `TextRenderer::text`, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Consume the TextRenderer, returning its data if all renders succeeded,
    /// or the first rendering error otherwise.
    pub fn finish(self) -> Result<EnrichedAlertGroup, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

impl<'e, E: TemplateEngine + ?Sized> std::fmt::Debug for TextRenderer<'e, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("data", &self.data)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{group_data, AlertStatus, Kv};
    use std::cell::RefCell;

    #[derive(Debug, thiserror::Error)]
    #[error("no template named {0:?}")]
    struct Missing(String);

    // Engine which renders templates from fixed functions, and records
    // the names of templates it has executed.
    struct FakeEngine {
        external_url: &'static str,
        executed: RefCell<Vec<String>>,
    }

    impl TemplateEngine for FakeEngine {
        type Error = Missing;

        fn group_data(&self, context: &GroupContext, alerts: &[Alert]) -> RawAlertGroup {
            group_data(
                self.external_url,
                context,
                alerts,
                "2024-03-01T12:00:00Z".parse().unwrap(),
            )
        }

        fn execute(&self, name: &str, data: &EnrichedAlertGroup) -> Result<String, Missing> {
            self.executed.borrow_mut().push(name.to_string());

            match name {
                "status" => Ok(format!("[{}] {}", data.status, data.receiver)),
                "count" => Ok(format!(
                    "{} firing, {} resolved",
                    data.alerts.firing().len(),
                    data.alerts.resolved().len()
                )),
                "silence" => Ok(data.alerts[0].silence_url.clone()),
                _ => Err(Missing(name.to_string())),
            }
        }
    }

    fn engine(external_url: &'static str) -> FakeEngine {
        FakeEngine {
            external_url,
            executed: RefCell::new(Vec::new()),
        }
    }

    fn alerts() -> Vec<Alert> {
        let labels = |name: &str| -> Kv {
            [("alertname", name), ("__alert_rule_uid__", "r1")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        vec![
            Alert {
                labels: labels("Cpu"),
                annotations: Kv::new(),
                starts_at: "2024-03-01T11:00:00Z".parse().unwrap(),
                ends_at: None,
                generator_url: String::new(),
            },
            Alert {
                labels: labels("Disk"),
                annotations: Kv::new(),
                starts_at: "2024-03-01T10:00:00Z".parse().unwrap(),
                ends_at: Some("2024-03-01T11:00:00Z".parse().unwrap()),
                generator_url: String::new(),
            },
        ]
    }

    fn context() -> GroupContext {
        GroupContext {
            receiver: "ops".to_string(),
            group_labels: Kv::new(),
        }
    }

    #[test]
    fn renders_named_templates() {
        let engine = engine("https://example.com/");
        let mut renderer = resolve_text(&engine, &context(), &alerts()).unwrap();

        assert_eq!(renderer.text("status"), "[firing] ops");
        assert_eq!(renderer.text("count"), "1 firing, 1 resolved");
        assert_eq!(
            renderer.text("silence"),
            "https://example.com/alerting/silence/new?alertmanager=grafana&matchers=alertname%3DCpu"
        );
        assert!(renderer.error().is_none());

        let data = renderer.finish().unwrap();
        assert_eq!(data.alerts.len(), 2);
        assert_eq!(data.alerts[1].status, AlertStatus::Resolved);
        assert!(data.common_labels.is_empty());
    }

    #[test]
    fn first_render_error_is_latched() {
        let engine = engine("https://example.com/");
        let mut renderer = resolve_text(&engine, &context(), &alerts()).unwrap();

        assert_eq!(renderer.text("status"), "[firing] ops");
        assert_eq!(renderer.text("missing"), "");
        assert_eq!(renderer.text("also-missing"), "");
        assert_eq!(renderer.text("status"), "");

        // Renders after the first failure were skipped.
        assert_eq!(*engine.executed.borrow(), vec!["status", "missing"]);

        let err = renderer.finish().unwrap_err();
        assert!(matches!(
            &err,
            Error::TemplateExecution { name, .. } if name == "missing"
        ));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), r#"no template named "missing""#);
    }

    #[test]
    fn group_errors_are_returned_without_a_renderer() {
        let engine = engine("https://\x7f");
        let err = resolve_text(&engine, &context(), &alerts()).unwrap_err();

        assert!(matches!(err, Error::InvalidConfigUrl { .. }));
        assert!(engine.executed.borrow().is_empty());
    }
}
