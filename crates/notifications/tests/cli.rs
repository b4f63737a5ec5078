use assert_cmd::Command;

fn alert_render() -> Command {
    let mut cmd = Command::cargo_bin("alert-render").unwrap();
    cmd.env_remove("EXTERNAL_URL").env("RUST_LOG", "off");
    cmd
}

const GROUP: &str = r#"{
    "receiver": "webhook",
    "status": "firing",
    "alerts": [{
        "status": "firing",
        "labels": {"alertname": "Test", "severity": "high"},
        "annotations": {"__dashboardUid__": "abc", "__panelId__": "7"},
        "startsAt": "2024-03-01T11:00:00Z",
        "generatorURL": "",
        "fingerprint": "0123456789abcdef"
    }],
    "groupLabels": {},
    "commonLabels": {"alertname": "Test", "severity": "high"},
    "commonAnnotations": {"__panelId__": "7"},
    "externalURL": ""
}"#;

#[test]
fn test_extend_group() {
    let output = alert_render()
        .args(["extend", "--external-url", "https://example.com/"])
        .write_stdin(GROUP)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let extended: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let alert = &extended["alerts"][0];

    assert_eq!(alert["dashboardURL"], "https://example.com/d/abc");
    assert_eq!(alert["panelURL"], "https://example.com/d/abc?viewPanel=7");
    assert_eq!(
        alert["silenceURL"],
        "https://example.com/alerting/silence/new?alertmanager=grafana&matchers=alertname%3DTest%2Cseverity%3Dhigh"
    );
    assert_eq!(alert["annotations"], serde_json::json!({}));
    assert_eq!(extended["commonAnnotations"], serde_json::json!({}));
    assert_eq!(extended["externalURL"], "https://example.com/");
}

#[test]
fn test_extend_group_invalid_url() {
    let output = alert_render()
        .args(["extend", "--external-url", "https://example.com/\u{1}"])
        .write_stdin(GROUP)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse external URL"), "{stderr}");
}

#[test]
fn test_render_templates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.hbs");
    std::fs::write(
        &path,
        "{{receiver}}: {{#each (firing alerts)}}{{labels.alertname}} {{/each}}",
    )
    .unwrap();

    let batch = r#"{
        "receiver": "team-email",
        "groupLabels": {"alertname": "Cpu"},
        "alerts": [
            {"labels": {"alertname": "Cpu"}, "startsAt": "2024-03-01T11:00:00Z"},
            {"labels": {"alertname": "Disk"}, "startsAt": "2024-03-01T11:00:00Z", "endsAt": "2024-03-01T11:30:00Z"}
        ]
    }"#;

    let output = alert_render()
        .arg("render")
        .arg(format!("--template=summary={}", path.display()))
        .args(["--render", "summary", "--render", "default.title"])
        .write_stdin(batch)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let texts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        texts,
        serde_json::json!({
            "default.title": "[FIRING:1] Cpu",
            "summary": "team-email: Cpu ",
        })
    );
}

#[test]
fn test_render_missing_template() {
    let output = alert_render()
        .args(["render", "--render", "nope"])
        .write_stdin(r#"{"alerts": []}"#)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(r#"no template named "nope" is registered"#),
        "{stderr}"
    );
}
