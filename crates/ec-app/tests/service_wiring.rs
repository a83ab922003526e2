use std::path::PathBuf;

use ec_app::{
    AppConfig, AppError, DeviceKind, Dispatch, InboundMessage, TopicKind, Topics,
    build_control_loop, build_registry, control_setup, publish_to_device,
};
use ec_core::{DeviceId, PayloadShape};
use ec_devices::RelayState;

fn workspace_file(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").join(rel)
}

fn mock_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.device_id = Some("bench".to_string());
    config.control.capacity_table = workspace_file("data/waterdampspanning.csv");
    config
}

#[test]
fn example_config_is_valid() {
    let config = AppConfig::load(&workspace_file("config.example.yaml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config.payload_shape, PayloadShape::Paired);
}

#[test]
fn missing_config_file_reports_path() {
    let path = std::env::temp_dir().join("ec_app_missing_config.yaml");
    let _ = std::fs::remove_file(&path);
    match AppConfig::load(&path) {
        Err(AppError::ConfigFileRead { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected ConfigFileRead, got {other:?}"),
    }
}

#[test]
fn config_file_round_trip_through_temp_dir() {
    let dir = std::env::temp_dir().join("ec_app_config_test");
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join("config.yaml");
    std::fs::write(
        &path,
        "device_id: shed\nsensors:\n  publish_interval_s: 10\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.device_id().as_str(), "shed");
    assert_eq!(config.sensors.publish_interval_s, 10);
    assert_eq!(config.sensors.internal_driver, "mock");
}

#[test]
fn registry_holds_configured_devices() {
    let mut registry = build_registry(&mock_config()).unwrap();
    let names: Vec<(String, DeviceKind)> = registry.list();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&("steamer".to_string(), DeviceKind::Relay)));

    let reading = registry.read_sensor("external").unwrap();
    assert!(reading.temperature() > 15.0 && reading.temperature() < 25.0);
    assert_eq!(registry.switch_relay("steamer", true).unwrap(), RelayState::Closed);
}

#[test]
fn unsupported_relay_driver_stops_wiring() {
    let mut config = mock_config();
    config.relays.driver = "arduino".to_string();
    assert!(matches!(build_registry(&config), Err(AppError::Config(_))));
}

#[test]
fn control_loop_from_config() {
    let config = mock_config();
    let setup = control_setup(&config).unwrap();
    assert_eq!(setup.heater.kp(), 0.3);

    let topics = Topics::for_device(&DeviceId::new("bench"));
    let mut control = build_control_loop(&config, topics.clone()).unwrap();
    let payload = serde_json::json!({
        "internal_sensor_data": { "temperature": 18.0, "humidity": 40.0, "pressure": 1013.0 },
        "external_sensor_data": { "temperature": 20.0, "humidity": 60.0, "pressure": 1013.0 },
    });
    let dispatch = control.handle(&InboundMessage::new(topics.sensor_data, payload.to_string()));
    assert!(matches!(dispatch, Dispatch::Sensor { heater: Some(true), .. }));
}

#[test]
fn missing_capacity_table_stops_wiring() {
    let mut config = mock_config();
    config.control.capacity_table = std::env::temp_dir().join("ec_app_no_such_table.csv");
    let topics = Topics::for_device(&DeviceId::new("bench"));
    assert!(matches!(
        build_control_loop(&config, topics),
        Err(AppError::Config(_))
    ));
}

#[test]
fn publish_to_unreachable_broker_is_transport_error() {
    let mut config = mock_config();
    config.broker.address = "127.0.0.1".to_string();
    config.broker.port = 1;

    let result = publish_to_device(&config, &DeviceId::new("box"), TopicKind::SensorData, "{}");
    match result {
        Err(AppError::Transport(msg)) => assert!(msg.contains("1 of 1"), "{msg}"),
        other => panic!("Expected Transport error, got {other:?}"),
    }
}
