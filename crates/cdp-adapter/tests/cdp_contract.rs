//! Contract tests against a real Chromium binary. Ignored by default because they
//! require Chrome/Chromium on the host machine.

use std::env;

use action_primitives::{InteractionPrimitives, SessionLauncher};
use cdp_adapter::{CdpConfig, ChromiumLauncher};

fn contract_enabled() -> bool {
    env::var("RTO_PROBE_CDP_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

const PAGE: &str = "<html><body><button id='go' onclick=\"document.title='clicked'\">Go</button></body></html>";

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set RTO_PROBE_CDP_CONTRACT=1"]
async fn contract_open_evaluate_click() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (RTO_PROBE_CDP_CONTRACT not enabled)");
        return;
    }

    let profile = tempfile::tempdir().unwrap();
    let launcher = ChromiumLauncher::new(CdpConfig::default());
    let driver = launcher.launch(profile.path(), true).await.unwrap();

    let file = profile.path().join("page.html");
    std::fs::write(&file, PAGE).unwrap();
    let url = format!("file://{}", file.display());

    let session = driver.open(&url).await.unwrap();
    assert_eq!(driver.evaluate(session, "1 + 1").await.unwrap(), "2");
    assert_eq!(
        driver.evaluate(session, "(function(){ return 'SUCCESS: ok'; })()").await.unwrap(),
        "SUCCESS: ok"
    );

    assert!(driver.find(session, "#missing").await.unwrap().is_none());
    let button = driver.find(session, "#go").await.unwrap().unwrap();
    driver.click(&button).await.unwrap();
    assert_eq!(driver.evaluate(session, "document.title").await.unwrap(), "clicked");

    let text = driver.evaluate_text(session, "throw new Error('boom')").await;
    assert!(text.starts_with("ERROR"));

    driver.close(session).await.unwrap();
    driver.shutdown().await.unwrap();
    driver.shutdown().await.unwrap();
}
