use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ec_devices::{
    DeviceError, GpioRelay, IioChannels, IioSensor, Relay, RelaySettings, RelayState, RelayTiming,
    Sensor, SensorDriver, create_sensor,
};

fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn bench_settings(root: PathBuf, active_low: bool) -> RelaySettings {
    RelaySettings {
        gpio_root: root,
        active_low,
        timing: RelayTiming::immediate(),
    }
}

#[test]
fn active_low_relay_writes_inverted_levels() {
    let root = fresh_dir("ec_devices_gpio_active_low");
    fs::create_dir_all(root.join("gpio17")).unwrap();

    let mut relay = GpioRelay::new("heater", 17, &bench_settings(root.clone(), true));
    assert!(relay.is_attached());
    assert_eq!(
        fs::read_to_string(root.join("gpio17/direction")).unwrap(),
        "out"
    );

    relay.close();
    assert_eq!(fs::read_to_string(root.join("gpio17/value")).unwrap(), "0");
    assert_eq!(relay.state(), RelayState::Closed);

    relay.open();
    assert_eq!(fs::read_to_string(root.join("gpio17/value")).unwrap(), "1");
    assert_eq!(relay.state(), RelayState::Open);
}

#[test]
fn active_high_relay_writes_plain_levels() {
    let root = fresh_dir("ec_devices_gpio_active_high");
    fs::create_dir_all(root.join("gpio27")).unwrap();

    let mut relay = GpioRelay::new("steamer", 27, &bench_settings(root.clone(), false));
    relay.set(true);
    assert_eq!(fs::read_to_string(root.join("gpio27/value")).unwrap(), "1");
    relay.set(false);
    assert_eq!(fs::read_to_string(root.join("gpio27/value")).unwrap(), "0");
}

#[test]
fn relay_settles_longer_after_close_than_after_open() {
    let root = fresh_dir("ec_devices_gpio_settle");
    fs::create_dir_all(root.join("gpio22")).unwrap();
    let timing = RelayTiming {
        energize: Duration::from_millis(200),
        deenergize: Duration::from_millis(20),
    };
    let settings = RelaySettings {
        gpio_root: root,
        active_low: true,
        timing,
    };
    let mut relay = GpioRelay::new("heater", 22, &settings);
    assert!(relay.is_attached());

    let started = Instant::now();
    relay.close();
    let close_took = started.elapsed();

    let started = Instant::now();
    relay.open();
    let open_took = started.elapsed();

    assert!(close_took >= timing.energize, "close took {close_took:?}");
    assert!(open_took >= timing.deenergize, "open took {open_took:?}");
    assert!(close_took > open_took);
}

#[test]
fn unexportable_line_degrades_to_noop() {
    // `export` is accepted but the kernel never creates the line directory.
    let root = fresh_dir("ec_devices_gpio_no_line");

    let mut relay = GpioRelay::new("heater", 5, &bench_settings(root.clone(), true));
    assert!(!relay.is_attached());
    assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "5");

    relay.close();
    assert_eq!(relay.state(), RelayState::Closed);
    assert!(!root.join("gpio5/value").exists());
}

#[test]
fn bme280_reads_processed_attributes() {
    let root = fresh_dir("ec_devices_iio_bme280");
    let dev = root.join("iio:device0");
    fs::create_dir_all(&dev).unwrap();
    fs::write(dev.join("in_temp_input"), "21450\n").unwrap();
    fs::write(dev.join("in_humidityrelative_input"), "48250\n").unwrap();
    fs::write(dev.join("in_pressure_input"), "101.325000\n").unwrap();

    let mut sensor = create_sensor(SensorDriver::Bme280, "internal", 0, &root);
    let reading = sensor.read().unwrap();
    assert!((reading.temperature() - 21.45).abs() < 1e-9);
    assert!((reading.humidity() - 48.25).abs() < 1e-9);
    assert!((reading.pressure() - 1013.25).abs() < 1e-9);
}

#[test]
fn dht22_reads_without_pressure_channel() {
    let root = fresh_dir("ec_devices_iio_dht22");
    let dev = root.join("iio:device1");
    fs::create_dir_all(&dev).unwrap();
    fs::write(dev.join("in_temp_input"), "12300").unwrap();
    fs::write(dev.join("in_humidityrelative_input"), "81000").unwrap();

    let mut sensor = IioSensor::new("external", &dev, IioChannels::NoPressure);
    let reading = sensor.read().unwrap();
    assert!((reading.temperature() - 12.3).abs() < 1e-9);
    assert!((reading.humidity() - 81.0).abs() < 1e-9);
    assert_eq!(reading.pressure(), ec_core::STANDARD_PRESSURE_HPA);
}

#[test]
fn garbage_attribute_is_parse_error() {
    let root = fresh_dir("ec_devices_iio_garbage");
    let dev = root.join("iio:device0");
    fs::create_dir_all(&dev).unwrap();
    fs::write(dev.join("in_temp_input"), "busy").unwrap();

    let mut sensor = IioSensor::new("internal", &dev, IioChannels::Full);
    match sensor.temperature() {
        Err(DeviceError::Parse { what, value }) => {
            assert_eq!(what, "in_temp_input");
            assert_eq!(value, "busy");
        }
        other => panic!("Expected Parse error, got {other:?}"),
    }
}

#[test]
fn out_of_range_sample_is_rejected() {
    let root = fresh_dir("ec_devices_iio_out_of_range");
    let dev = root.join("iio:device0");
    fs::create_dir_all(&dev).unwrap();
    fs::write(dev.join("in_temp_input"), "85000").unwrap();
    fs::write(dev.join("in_humidityrelative_input"), "50000").unwrap();
    fs::write(dev.join("in_pressure_input"), "100.0").unwrap();

    let mut sensor = IioSensor::new("internal", &dev, IioChannels::Full);
    assert!(matches!(sensor.read(), Err(DeviceError::Core(_))));
}
