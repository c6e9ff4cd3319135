use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    routing::get,
    Router,
};
use control_client::{
    poller::poll_once, CommandTransmitter, ControlEndpoint, HttpControlTransport,
    HttpSensorSource, LatestReading, SensorPoller, Settings, SHUTDOWN_DRAIN_TIMEOUT,
};
use shared::{
    domain::{Command, Vocabulary},
    protocol::{EncodedCommand, EndpointMode},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct VehicleState {
    queries: Arc<Mutex<Vec<String>>>,
    sensor_body: Arc<Mutex<String>>,
    sensor_reads: Arc<AtomicUsize>,
}

async fn control(State(state): State<VehicleState>, RawQuery(query): RawQuery) -> StatusCode {
    state
        .queries
        .lock()
        .await
        .push(query.unwrap_or_default());
    StatusCode::OK
}

async fn sensor_data(State(state): State<VehicleState>) -> String {
    state.sensor_reads.fetch_add(1, Ordering::SeqCst);
    state.sensor_body.lock().await.clone()
}

async fn spawn_vehicle() -> anyhow::Result<(String, VehicleState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = VehicleState::default();
    let app = Router::new()
        .route("/", get(control))
        .route("/sensordata.txt", get(sensor_data))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/"), state))
}

async fn wait_for<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test]
async fn commands_reach_control_endpoint_with_set_prefix() {
    let (server_url, vehicle) = spawn_vehicle().await.expect("spawn vehicle");
    let transport = Arc::new(HttpControlTransport::new().expect("transport"));
    let endpoint =
        ControlEndpoint::parse(&server_url, EndpointMode::SetPrefixed).expect("endpoint");
    let mut transmitter =
        CommandTransmitter::new(endpoint, Vocabulary::Extended, transport.clone());

    transmitter
        .set_command(Command::Left, true)
        .expect("set left");
    transport.drain().await;
    transmitter.stop_all();
    transport.drain().await;

    let queries = vehicle.queries.lock().await.clone();
    assert_eq!(queries, vec!["set0010000000", "set0000000000"]);
    for query in &queries {
        let bits = EndpointMode::SetPrefixed
            .bits_from_query(query)
            .expect("prefixed");
        EncodedCommand::parse(Vocabulary::Extended, bits).expect("valid pattern");
    }
}

#[tokio::test]
async fn bare_mode_sends_only_bits() {
    let (server_url, vehicle) = spawn_vehicle().await.expect("spawn vehicle");
    let transport = Arc::new(HttpControlTransport::new().expect("transport"));
    let endpoint = ControlEndpoint::parse(&server_url, EndpointMode::Bare).expect("endpoint");
    let mut transmitter = CommandTransmitter::new(endpoint, Vocabulary::Base, transport.clone());

    transmitter
        .set_command(Command::Right, true)
        .expect("set right");
    assert!(transport.drain_within(SHUTDOWN_DRAIN_TIMEOUT).await);

    assert_eq!(*vehicle.queries.lock().await, vec!["00010000"]);
}

#[tokio::test]
async fn unreachable_vehicle_is_not_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let transport = Arc::new(HttpControlTransport::new().expect("transport"));
    let endpoint =
        ControlEndpoint::parse(&format!("http://{addr}/"), EndpointMode::Bare).expect("endpoint");
    let mut transmitter = CommandTransmitter::new(endpoint, Vocabulary::Base, transport.clone());

    assert_eq!(transmitter.set_command(Command::Fire, true), Ok(true));
    transport.drain().await;
}

/// Accepts connections and holds them open without ever answering.
async fn spawn_silent_vehicle() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    Ok(format!("http://{addr}/"))
}

#[tokio::test]
async fn bounded_drain_gives_up_on_silent_vehicle() {
    let server_url = spawn_silent_vehicle().await.expect("spawn vehicle");
    let transport = Arc::new(HttpControlTransport::new().expect("transport"));
    let endpoint =
        ControlEndpoint::parse(&server_url, EndpointMode::SetPrefixed).expect("endpoint");
    let mut transmitter = CommandTransmitter::new(endpoint, Vocabulary::Base, transport.clone());

    transmitter
        .set_command(Command::Forward, true)
        .expect("set forward");
    transmitter.stop_all();

    let started = Instant::now();
    let finished = tokio::time::timeout(
        Duration::from_secs(10),
        transport.drain_within(Duration::from_millis(200)),
    )
    .await
    .expect("bounded drain returns");
    assert!(!finished);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn transport_requires_runtime() {
    assert!(HttpControlTransport::new().is_err());
}

#[tokio::test]
async fn sensor_source_reads_sensordata_file() {
    let (server_url, vehicle) = spawn_vehicle().await.expect("spawn vehicle");
    *vehicle.sensor_body.lock().await = "12.3V".to_string();

    let settings = Settings {
        sensor_base_url: Some(server_url),
        ..Settings::default()
    };
    let source = HttpSensorSource::new(settings.sensor_url().expect("sensor url"));
    let display = LatestReading::new();

    poll_once(&source, &display).await;
    assert_eq!(display.latest().as_deref(), Some("12.3V"));

    *vehicle.sensor_body.lock().await = String::new();
    poll_once(&source, &display).await;
    assert_eq!(display.latest().as_deref(), Some("12.3V"));
}

#[tokio::test]
async fn poller_keeps_last_reading_across_empty_responses() {
    let (server_url, vehicle) = spawn_vehicle().await.expect("spawn vehicle");
    *vehicle.sensor_body.lock().await = "bearing 271".to_string();

    let settings = Settings {
        sensor_base_url: Some(server_url),
        ..Settings::default()
    };
    let source = Arc::new(HttpSensorSource::new(
        settings.sensor_url().expect("sensor url"),
    ));
    let display = Arc::new(LatestReading::new());
    let handle = SensorPoller::start(source, display.clone(), Duration::from_millis(20))
        .expect("start poller");

    let shown = display.clone();
    wait_for(move || shown.latest().is_some()).await;
    assert_eq!(display.latest().as_deref(), Some("bearing 271"));

    *vehicle.sensor_body.lock().await = String::new();
    let reads_at_clear = vehicle.sensor_reads.load(Ordering::SeqCst);
    let reads = vehicle.sensor_reads.clone();
    wait_for(move || reads.load(Ordering::SeqCst) >= reads_at_clear + 3).await;
    assert_eq!(display.latest().as_deref(), Some("bearing 271"));

    handle.stop();
}
