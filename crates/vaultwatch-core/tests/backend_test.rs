#![allow(clippy::unwrap_used)]
// End-to-end tests of the configured adapters against a wiremock backend.

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultwatch_core::{
    BackendConfig, Command, CommandConfig, ConfiguredMonitor, CoreError, DoorState, EnvPanel,
    EnvSource, FirebaseBackend, LedState, LogSource, MonitorConfig, RefreshConfig, Stream,
    TlsVerification, fetch_snapshot,
};

fn gateway_config(base: &Url) -> MonitorConfig {
    MonitorConfig {
        backend: BackendConfig::Gateway {
            base_url: base.clone(),
            log_path: "logs".into(),
            env_path: "env".into(),
        },
        commands: CommandConfig::Gateway {
            base_url: base.clone(),
            command_path: "command".into(),
        },
        refresh: RefreshConfig {
            interval: Duration::ZERO,
            fetch_retries: 0,
            ..RefreshConfig::default()
        },
        timeout: Duration::from_secs(5),
        tls: TlsVerification::SystemDefaults,
        env_history_limit: 2,
    }
}

async fn gateway() -> (MockServer, MonitorConfig) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let config = gateway_config(&base);
    (server, config)
}

#[tokio::test]
async fn gateway_cycle_builds_dashboard() {
    let (server, config) = gateway().await;

    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "timestamp": "2025-05-01 08:00:00", "uid": "04A1", "porte": "OUVERTE", "led": "VERTE" },
            { "timestamp": "2025-05-01 08:00:09", "uid": "04B2", "porte": "FERMEE",  "led": "ROUGE" },
            { "timestamp": "garbage",             "uid": "04B2", "porte": "FERMEE",  "led": "ROUGE" },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamp": 1_746_086_400_000_i64,
            "temp": 22.1, "hum": 48.0, "lum": 512, "mq": 95, "fire": 0
        })))
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    let snapshot = monitor.refresh_now().await.unwrap();

    assert_eq!(snapshot.logs.len(), 2);
    assert_eq!(snapshot.skipped_records, 1);
    assert_eq!(snapshot.current.door, DoorState::Fermee);
    assert_eq!(snapshot.current.led, LedState::Rouge);
    assert_eq!(snapshot.stats.open_count, 1);
    match &snapshot.env {
        EnvPanel::Available { latest, history } => {
            assert!((latest.temperature - 22.1).abs() < f64::EPSILON);
            assert_eq!(history.len(), 1);
        }
        other => panic!("expected env data, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_env_history_is_bounded() {
    let (server, config) = gateway().await;

    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "timestamp": "2025-05-01T08:00:00Z", "temp": 20, "hum": 40, "lum": 1, "mq": 1, "fire": false },
            { "timestamp": "2025-05-01T08:00:20Z", "temp": 22, "hum": 40, "lum": 1, "mq": 1, "fire": false },
            { "timestamp": "2025-05-01T08:00:10Z", "temp": 21, "hum": 40, "lum": 1, "mq": 1, "fire": false },
        ])))
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    let (_, env) = monitor.sources();
    let batch = env.fetch_env().await.unwrap();

    let temps: Vec<f64> = batch.readings.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![21.0, 22.0]);
}

#[tokio::test]
async fn gateway_server_error_is_transient_fetch_error() {
    let (server, config) = gateway().await;

    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    let (logs, _) = monitor.sources();
    let err = logs.fetch_logs().await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.stream(), Some(Stream::AccessLogs));
}

#[tokio::test]
async fn gateway_error_document_is_fetch_error_not_no_data() {
    let (server, config) = gateway().await;

    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "database offline" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    let (logs, env) = monitor.sources();

    let err = logs.fetch_logs().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Fetch {
            stream: Stream::AccessLogs,
            transient: false,
            ..
        }
    ));

    let err = fetch_snapshot(logs, env, &config.refresh).await.unwrap_err();
    assert!(matches!(err, CoreError::Fetch { .. }), "got {err:?}");
}

#[tokio::test]
async fn gateway_scalar_env_body_is_fetch_error() {
    let (server, config) = gateway().await;

    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("maintenance")))
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    let (_, env) = monitor.sources();
    let err = env.fetch_env().await.unwrap_err();

    assert_eq!(err.stream(), Some(Stream::Environment));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn gateway_command_is_posted() {
    let (server, config) = gateway().await;

    Mock::given(method("POST"))
        .and(path("/api/command"))
        .and(body_json(json!({ "cmd": "OPEN" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    monitor.start().await;
    monitor.dispatch(Command::Open).await.unwrap();
    monitor.stop().await;
}

#[tokio::test]
async fn gateway_command_rejection_is_dispatch_error() {
    let (server, config) = gateway().await;

    Mock::given(method("POST"))
        .and(path("/api/command"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unknown command"))
        .mount(&server)
        .await;

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    monitor.start().await;
    let err = monitor.dispatch(Command::Reset).await.unwrap_err();
    monitor.stop().await;

    assert!(matches!(
        err,
        CoreError::CommandDispatch {
            command: Command::Reset,
            ..
        }
    ));
}

#[tokio::test]
async fn firebase_backend_reads_keyed_collections() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/access_logs.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "-Nx1": { "timestamp": "2025-05-01T08:00:00Z", "uid": "04A1", "porte": "OUVERTE", "led": "VERTE" },
            "-Nx2": { "timestamp": "2025-05-01T08:00:05Z", "uid": "04A1", "porte": "FERMEE",  "led": "ROUGE" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data_logs.json"))
        .and(query_param("limitToLast", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    let client = vaultwatch_api::RtdbClient::new(
        Url::parse(&server.uri()).unwrap(),
        None,
        &vaultwatch_api::TransportConfig::default(),
    )
    .unwrap();
    let backend = FirebaseBackend::new(client, "access_logs".into(), "data_logs".into(), 2);

    let logs = backend.fetch_logs().await.unwrap();
    assert_eq!(logs.entries.len(), 2);
    assert!(
        logs.entries
            .iter()
            .all(|e| e.record_id.as_deref().is_some_and(|id| id.starts_with("-Nx")))
    );

    let env = backend.fetch_env().await.unwrap();
    assert!(env.readings.is_empty());
}

#[tokio::test]
async fn firebase_scalar_payload_is_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/access_logs.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("maintenance")))
        .mount(&server)
        .await;

    let client = vaultwatch_api::RtdbClient::new(
        Url::parse(&server.uri()).unwrap(),
        None,
        &vaultwatch_api::TransportConfig::default(),
    )
    .unwrap();
    let backend = FirebaseBackend::new(client, "access_logs".into(), "data_logs".into(), 0);

    let err = backend.fetch_logs().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Fetch {
            stream: Stream::AccessLogs,
            ..
        }
    ));
}

// ── MQTT ────────────────────────────────────────────────────────────

/// Minimal MQTT 3.1.1 broker: acknowledges CONNECT, QoS 1 PUBLISH and
/// PINGREQ, and reports every published payload.
async fn fake_broker() -> (u16, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = serve_session(&mut socket, &tx).await;
            });
        }
    });
    (port, rx)
}

async fn serve_session(
    socket: &mut TcpStream,
    published: &mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    loop {
        let header = socket.read_u8().await?;
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let byte = socket.read_u8().await?;
            len |= usize::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut body = vec![0; len];
        socket.read_exact(&mut body).await?;

        match header >> 4 {
            // CONNECT
            1 => socket.write_all(&[0x20, 0x02, 0x00, 0x00]).await?,
            // PUBLISH: topic, packet id when QoS > 0, payload
            3 => {
                let topic_len = usize::from(u16::from_be_bytes([body[0], body[1]]));
                let mut offset = 2 + topic_len;
                if header & 0x06 != 0 {
                    socket
                        .write_all(&[0x40, 0x02, body[offset], body[offset + 1]])
                        .await?;
                    offset += 2;
                }
                let _ = published.send(String::from_utf8_lossy(&body[offset..]).into_owned());
            }
            // PINGREQ
            12 => socket.write_all(&[0xD0, 0x00]).await?,
            // DISCONNECT
            14 => return Ok(()),
            _ => {}
        }
    }
}

#[tokio::test]
async fn mqtt_dispatch_survives_stop_and_restart() {
    let (port, mut published) = fake_broker().await;
    let mut config = gateway_config(&Url::parse("http://127.0.0.1:9/api").unwrap());
    config.commands = CommandConfig::Mqtt {
        host: "127.0.0.1".into(),
        port,
        topic: "salle_forte/commande".into(),
        client_id: "vaultwatch-restart".into(),
        keep_alive: Duration::from_secs(30),
    };

    let monitor = ConfiguredMonitor::from_config(&config).unwrap();
    monitor.start().await;
    monitor.dispatch(Command::Open).await.unwrap();
    monitor.stop().await;

    monitor.start().await;
    monitor.dispatch(Command::Close).await.unwrap();
    monitor.shutdown().await;

    for expected in ["OPEN", "CLOSE"] {
        let payload = tokio::time::timeout(Duration::from_secs(5), published.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, expected);
    }
}
