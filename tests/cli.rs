use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_to_string, write};
use std::path::Path;
use tempfile::tempdir;

const SNAPSHOT: &str = r#"
locator_kinds: [NXS, GIT]
groups:
  - { code: DISTRIB, name: Distributives }
  - { code: EMPTY, name: Nothing here yet }
members:
  - { code: APPS, name: Applications, is_standard: "Y", is_deliverable: true }
  - { code: DOCS, name: Documentation, is_standard: "N", is_deliverable: false }
  - { code: DUMPS, name: Database dumps, is_standard: "N", is_deliverable: true }
inclusions:
  - { group: DISTRIB, member: APPS }
pattern_rules:
  - { member_code: APPS, locator_kind: NXS, pattern: "^org\\.example\\.apps:.*$" }
  - { member_code: APPS, locator_kind: GIT, pattern: "ssh://git/apps/.*" }
  - { member_code: DOCS, locator_kind: NXS, pattern: "" }
"#;

/// Writes a snapshot and a config referring to it (relative path) into `dir`.
fn write_config(dir: &Path, extra: &str) -> std::path::PathBuf {
    write(dir.join("snapshot.yaml"), SNAPSHOT).expect("Writing snapshot failed");
    let config = dir.join("sync.yaml");
    write(
        &config,
        format!("mvn_prefix: org.example\nsource:\n  type: snapshot\n  path: snapshot.yaml\n{extra}"),
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn sync_with_out_renders_snapshot_to_file() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let out = dir.path().join("page.xhtml");

    let mut cmd = Command::cargo_bin("ci-type-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .env_remove("WIKI_USER");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Synchronise complete: 2 groups, 3 CI types (2 ungrouped)"));

    let page = read_to_string(&out).expect("rendered page should exist");
    assert!(page.contains("<code>org.example</code>"));
    assert!(page.contains(r#"<td rowspan="1">DISTRIB</td>"#));
    assert!(page.contains(r#"<td rowspan="2"></td>"#), "ungrouped bucket spans its two types");
    assert!(page.contains(r"^org\.example\.apps:.*$"));
    assert!(!page.contains("ssh://git/apps"), "other locator kinds are not published");
}

#[test]
fn out_in_config_file_and_custom_template_are_honoured() {
    let dir = tempdir().unwrap();
    write(
        dir.path().join("page.hbs"),
        "{{#each groups}}[{{code}}:{{rowspan}}]{{/each}}",
    )
    .unwrap();
    let config = write_config(dir.path(), "template: page.hbs\nout: rendered.txt\n");

    Command::cargo_bin("ci-type-sync")
        .expect("Binary exists")
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert_eq!(
        read_to_string(dir.path().join("rendered.txt")).unwrap(),
        "[DISTRIB:1][EMPTY:1][:2]"
    );
}

#[test]
fn unknown_locator_kind_fails_the_run() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "locator_kind: MAVEN\n");
    let out = dir.path().join("page.xhtml");

    Command::cargo_bin("ci-type-sync")
        .expect("Binary exists")
        .args(["sync", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MAVEN"));

    assert!(!out.exists(), "nothing is written when the report cannot be built");
}

#[test]
fn missing_config_file_fails() {
    Command::cargo_bin("ci-type-sync")
        .expect("Binary exists")
        .args(["sync", "--config", "/nonexistent/sync.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use ci_type_sync::cli::{run, Cli, Commands};

    // A config path that does not exist: run fails, but only after tracing started.
    let cli = Cli {
        log_level: tracing::Level::INFO,
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
            out: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
