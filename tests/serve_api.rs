use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn find_free_port() -> u16 {
    TcpListener::bind(("127.0.0.1", 0))
        .expect("bind free port")
        .local_addr()
        .expect("local addr")
        .port()
}

fn fixture(name: &str) -> String {
    PathBuf::from("tests/fixtures")
        .join(name)
        .canonicalize()
        .expect("fixture exists")
        .to_string_lossy()
        .into_owned()
}

fn wait_for_health(client: &Client, port: u16) -> Value {
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send() {
            if resp.status().is_success() {
                return resp.json().expect("health json");
            }
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("server did not become ready on port {}", port);
}

#[test]
fn serve_runs_isolated_lookups() {
    let port = find_free_port();
    let bin = assert_cmd::cargo::cargo_bin!("rto-probe");
    let child = Command::new(bin)
        .args([
            "--config",
            &fixture("config.yaml"),
            "--log-level",
            "warn",
            "serve",
            "--port",
            &port.to_string(),
            "--driver",
            "scripted",
            "--fixture",
            &fixture("scripted_success.yaml"),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn serve");
    let _server = Server(child);

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("client");

    let health = wait_for_health(&client, port);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["completed"], 0);

    let response = client
        .post(format!(
            "http://127.0.0.1:{}/run?reg_no=DL1ABC1234&chassis_no=MA3ERLF1S00123456&timeout_sec=30",
            port
        ))
        .send()
        .expect("query request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().expect("json body");
    assert_eq!(body["success"], true);
    assert_eq!(body["mobile_number"], "9876543210");
    assert_eq!(body["details"]["messages"].as_array().unwrap().len(), 11);

    let response = client
        .post(format!("http://127.0.0.1:{}/run", port))
        .json(&json!({"reg_no": "DL1ABC1234", "chassis_no": "MA3ERLF1S00123456", "headless": "yes"}))
        .send()
        .expect("json request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().unwrap()["success"], true);

    let response = client
        .post(format!("http://127.0.0.1:{}/run", port))
        .json(&json!({"reg_no": "DL1ABC1234"}))
        .send()
        .expect("invalid request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>().unwrap()["detail"],
        "reg_no and chassis_no are required"
    );

    let health = wait_for_health(&client, port);
    assert_eq!(health["completed"], 2);
    assert_eq!(health["in_flight"], 0);
}
