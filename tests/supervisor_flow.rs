use std::sync::Arc;
use std::time::{Duration, Instant};

use action_flow::FlowState;
use action_primitives::{ScriptFixture, ScriptedLauncher};
use rto_probe::recipe::vahan_mobile_lookup;
use rto_probe::{RunRequest, RunSupervisor};

fn request() -> RunRequest {
    RunRequest::new("DL1ABC1234", "MA3ERLF1S00123456")
        .with_rto_value("53")
        .with_timeout_sec(120)
}

fn supervisor(launcher: Arc<ScriptedLauncher>, root: &std::path::Path) -> RunSupervisor {
    RunSupervisor::new(launcher, Arc::new(vahan_mobile_lookup().without_pacing()))
        .with_workspace_root(Some(root.to_path_buf()))
}

fn assert_workspaces_removed(launcher: &ScriptedLauncher, root: &std::path::Path) {
    let launches = launcher.launches();
    assert!(!launches.is_empty());
    for (path, existed) in launches {
        assert!(existed, "workspace missing at launch: {}", path.display());
        assert!(!path.exists(), "workspace leaked: {}", path.display());
    }
    assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
}

#[tokio::test]
async fn every_step_succeeding_extracts_the_number() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default().reply("tf_mobile", "SUCCESS: 9876543210"),
    ));

    let report = supervisor(launcher.clone(), root.path()).run_report(&request()).await;

    assert_eq!(report.state, FlowState::Done);
    let result = report.result;
    assert!(result.success);
    assert_eq!(result.extracted.as_deref(), Some("9876543210"));
    assert_eq!(result.messages().len(), 11);
    assert_eq!(result.messages()[0], "Close modal: SUCCESS: clicked .btn-close");
    assert_eq!(result.messages()[10], "Get mobile: SUCCESS: 9876543210");
    assert!(result.is_consistent());

    let driver = launcher.last_driver().unwrap();
    let calls = driver.calls();
    assert!(calls.evaluated(r#"reg.value = "DL1ABC1234";"#));
    assert!(calls.evaluated(r#"ch.value = "MA3ERLF1S00123456";"#));
    assert_eq!(calls.closed, 1);
    assert_eq!(calls.shutdowns, 1);
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn fill_form_failure_short_circuits() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default()
            .reply("tf_reg_no", "ERROR: inputs not found")
            .reply("tf_mobile", "SUCCESS: 9876543210"),
    ));

    let result = supervisor(launcher.clone(), root.path()).run(&request()).await;

    assert!(!result.success);
    assert_eq!(result.extracted, None);
    let messages = result.messages();
    assert_eq!(messages.last().unwrap(), "Fill form: ERROR: inputs not found");
    assert!(messages
        .iter()
        .all(|m| !m.starts_with("Validate") && !m.starts_with("Get mobile")));

    let calls = launcher.last_driver().unwrap().calls();
    assert!(!calls.evaluated("validate_dtls"));
    assert!(!calls.evaluated("tf_mobile"));
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn soft_failures_do_not_prevent_success() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default()
            .missing(".btn-close")
            .reply("fit_c_office_to_input", "ERROR: Elements not found")
            .reply("ui-chkbox", "ERROR: not found")
            .reply("proccedHomeButtonId", "ERROR")
            .reply("j_idt444", "ERROR")
            .reply("navbarDropdownMenuLink", "ERROR")
            .reply("dropdown-item", "ERROR")
            .fail("fitbalcTest", "mojarra is not defined")
            .reply("tf_mobile", "SUCCESS:  9876543210 "),
    ));

    let result = supervisor(launcher.clone(), root.path()).run(&request()).await;

    assert!(result.success, "{:?}", result.messages());
    assert_eq!(result.extracted.as_deref(), Some("9876543210"));
    assert_eq!(result.messages().len(), 11);
    assert_eq!(result.messages()[0], "Close modal: ERROR: .btn-close not found");
    assert_eq!(
        result.messages()[7],
        "Open Re-Schedule link: ERROR: JavaScript execution error: mojarra is not defined"
    );
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn extraction_without_marker_fails() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default().reply("tf_mobile", "9876543210"),
    ));

    let result = supervisor(launcher.clone(), root.path()).run(&request()).await;

    assert!(!result.success);
    assert_eq!(result.extracted, None);
    assert_eq!(result.messages().last().unwrap(), "Get mobile: 9876543210");
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn inner_timeout_keeps_partial_log_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default().stall("validate_dtls"),
    ));

    let started = Instant::now();
    let report = supervisor(launcher.clone(), root.path())
        .run_report(&request().with_timeout_sec(1))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.state, FlowState::TimedOut);
    let result = report.result;
    assert!(!result.success);
    let messages = result.messages();
    assert_eq!(messages.len(), 10);
    assert_eq!(messages[8], "Fill form: SUCCESS");
    assert_eq!(messages[9], "Flow: ERROR: timed out after 1s");
    assert_eq!(
        messages.iter().filter(|m| m.contains("timed out")).count(),
        1
    );

    assert_eq!(launcher.last_driver().unwrap().calls().shutdowns, 1);
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn launch_failure_is_reported_as_data() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::failing("no Chrome/Chromium executable found"));

    let report = supervisor(launcher.clone(), root.path()).run_report(&request()).await;

    assert_eq!(report.state, FlowState::Failed);
    let result = report.result;
    assert!(!result.success);
    assert_eq!(
        result.messages(),
        ["launch_error: browser launch failed: no Chrome/Chromium executable found"]
    );
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn navigation_failure_ends_the_run() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default().open_error("net::ERR_CONNECTION_RESET"),
    ));

    let result = supervisor(launcher.clone(), root.path()).run(&request()).await;

    assert!(!result.success);
    assert_eq!(
        result.messages(),
        ["Load website: ERROR: navigation failed: net::ERR_CONNECTION_RESET"]
    );
    assert_eq!(launcher.last_driver().unwrap().calls().shutdowns, 1);
    assert_workspaces_removed(&launcher, root.path());
}

#[tokio::test]
async fn concurrent_runs_use_distinct_workspaces() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Arc::new(ScriptedLauncher::new(
        ScriptFixture::default().reply("tf_mobile", "SUCCESS: 1"),
    ));
    let supervisor = supervisor(launcher.clone(), root.path());

    let (req_a, req_b) = (request(), request());
    let (a, b) = tokio::join!(supervisor.run(&req_a), supervisor.run(&req_b));
    assert!(a.success && b.success);

    let launches = launcher.launches();
    assert_eq!(launches.len(), 2);
    assert_ne!(launches[0].0, launches[1].0);
    assert_workspaces_removed(&launcher, root.path());
}
