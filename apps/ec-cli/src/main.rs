use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use ec_app::{
    AppConfig, AppError, AppResult, DeviceKind, LoopExit, Shutdown, TopicKind, build_registry,
    publish_parameters, publish_to_device, run_control, run_sense, sensor_payload,
};
use ec_controls::CapacityTable;
use ec_core::{ControlParameters, DEFAULT_THRESHOLD, DeviceId, Reading, STANDARD_PRESSURE_HPA};

#[derive(Parser)]
#[command(name = "envirocontrol")]
#[command(about = "Enclosure climate control over MQTT", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides logging.level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the resolved topics
    Validate,
    /// Run the control loop
    Control,
    /// Publish sensor data on an interval
    Sense,
    /// Read sensors or click relays without the control loop
    #[command(subcommand)]
    Check(CheckCommands),
    /// Show the capacity row used for a temperature
    Lookup {
        /// Temperature in °C
        #[arg(allow_hyphen_values = true)]
        temperature: f64,
        /// Capacity table CSV (defaults to control.capacity_table)
        #[arg(long)]
        table: Option<PathBuf>,
    },
    /// Publish one sensor-data payload to a device
    SendReading {
        /// Target device (defaults to device_id)
        #[arg(long)]
        device_id: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        temperature: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long, default_value_t = STANDARD_PRESSURE_HPA)]
        pressure: f64,
        /// External temperature, required for paired payloads
        #[arg(long, allow_hyphen_values = true)]
        external_temperature: Option<f64>,
        #[arg(long)]
        external_humidity: Option<f64>,
        #[arg(long)]
        external_pressure: Option<f64>,
    },
    /// Publish new controller gains to a device
    SetParams {
        controller: Controller,
        /// Target device (defaults to device_id)
        #[arg(long)]
        device_id: Option<String>,
        #[arg(long)]
        kp: f64,
        #[arg(long)]
        kd: f64,
        #[arg(long, default_value_t = 0.0)]
        ki: f64,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
        /// Heater set-point in °C
        #[arg(long, allow_hyphen_values = true)]
        temperature: Option<f64>,
    },
}

#[derive(Subcommand)]
enum CheckCommands {
    /// List configured devices
    List,
    /// Take one reading from a sensor
    Read {
        /// Sensor name (internal, external)
        name: String,
    },
    /// Open or close a relay
    Relay {
        /// Relay name (heater, steamer)
        name: String,
        action: RelayAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Controller {
    Heater,
    Steamer,
}

#[derive(Clone, Copy, ValueEnum)]
enum RelayAction {
    Open,
    Close,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    match cli.command {
        Commands::Validate => cmd_validate(&config),
        Commands::Control => cmd_control(&config),
        Commands::Sense => cmd_sense(&config),
        Commands::Check(check) => match check {
            CheckCommands::List => cmd_check_list(&config),
            CheckCommands::Read { name } => cmd_check_read(&config, &name),
            CheckCommands::Relay { name, action } => cmd_check_relay(&config, &name, action),
        },
        Commands::Lookup { temperature, table } => {
            cmd_lookup(table.as_deref().unwrap_or(&config.control.capacity_table), temperature)
        }
        Commands::SendReading {
            device_id,
            temperature,
            humidity,
            pressure,
            external_temperature,
            external_humidity,
            external_pressure,
        } => {
            let internal = Reading::new(temperature, humidity, pressure)?;
            let external = match external_temperature {
                Some(t) => Some(Reading::new(
                    t,
                    external_humidity.unwrap_or(humidity),
                    external_pressure.unwrap_or(pressure),
                )?),
                None => None,
            };
            cmd_send_reading(&config, device_id.as_deref(), internal, external)
        }
        Commands::SetParams {
            controller,
            device_id,
            kp,
            kd,
            ki,
            threshold,
            temperature,
        } => {
            let mut params = ControlParameters::new(kp, kd, threshold)?.with_integral(ki)?;
            if let Some(t) = temperature {
                params = params.with_setpoint(t)?;
            }
            cmd_set_params(&config, device_id.as_deref(), controller, &params)
        }
    }
}

fn load_config(path: Option<&Path>) -> AppResult<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

fn cmd_validate(config: &AppConfig) -> AppResult<()> {
    config.validate()?;
    let device_id = config.device_id();
    let topics = ec_app::Topics::for_device(&device_id);
    println!("✓ Configuration is valid");
    println!("  Device: {}", device_id);
    for topic in topics.all() {
        println!("  Topic: {}", topic);
    }
    Ok(())
}

fn cmd_control(config: &AppConfig) -> AppResult<()> {
    let shutdown = Shutdown::new();
    shutdown.register_signals()?;
    match run_control(config, &shutdown)? {
        LoopExit::Stopped => println!("Control loop stopped"),
        LoopExit::TransportClosed => println!("Control loop ended: transport closed"),
    }
    Ok(())
}

fn cmd_sense(config: &AppConfig) -> AppResult<()> {
    let shutdown = Shutdown::new();
    shutdown.register_signals()?;
    let published = run_sense(config, &shutdown)?;
    println!("Sensing stopped after {} payloads", published);
    Ok(())
}

fn cmd_check_list(config: &AppConfig) -> AppResult<()> {
    let registry = build_registry(config)?;
    println!("Devices:");
    for (name, kind) in registry.list() {
        let kind = match kind {
            DeviceKind::Sensor => "sensor",
            DeviceKind::Relay => "relay",
        };
        println!("  {} ({})", name, kind);
    }
    Ok(())
}

fn cmd_check_read(config: &AppConfig, name: &str) -> AppResult<()> {
    let mut registry = build_registry(config)?;
    let reading = registry.read_sensor(name)?;
    println!("{}: {}", name, reading);
    Ok(())
}

fn cmd_check_relay(config: &AppConfig, name: &str, action: RelayAction) -> AppResult<()> {
    let mut registry = build_registry(config)?;
    let state = registry.switch_relay(name, matches!(action, RelayAction::Close))?;
    println!("{}: {:?}", name, state);
    Ok(())
}

fn cmd_lookup(table_path: &Path, temperature: f64) -> AppResult<()> {
    let table = CapacityTable::from_path(table_path)?;
    match table.closest_at_or_below(temperature) {
        Some((t, gm3)) => println!("Below {} °C: {} °C holds {:.2} g/m³", temperature, t, gm3),
        None => println!("No table row below {} °C", temperature),
    }
    Ok(())
}

fn target_device(config: &AppConfig, device_id: Option<&str>) -> AppResult<DeviceId> {
    match device_id.or(config.device_id.as_deref()) {
        Some(id) if !id.trim().is_empty() => Ok(DeviceId::new(id.trim())),
        _ => Err(AppError::InvalidInput(
            "no target device: pass --device-id or set device_id".to_string(),
        )),
    }
}

fn cmd_send_reading(
    config: &AppConfig,
    device_id: Option<&str>,
    internal: Reading,
    external: Option<Reading>,
) -> AppResult<()> {
    let device_id = target_device(config, device_id)?;
    let payload = sensor_payload(config.payload_shape, internal, external)?;
    publish_to_device(config, &device_id, TopicKind::SensorData, &payload)?;
    println!("✓ Sent sensor data to {}", device_id);
    Ok(())
}

fn cmd_set_params(
    config: &AppConfig,
    device_id: Option<&str>,
    controller: Controller,
    params: &ControlParameters,
) -> AppResult<()> {
    let device_id = target_device(config, device_id)?;
    let kind = match controller {
        Controller::Heater => TopicKind::HeaterParameters,
        Controller::Steamer => TopicKind::SteamerParameters,
    };
    publish_parameters(config, &device_id, kind, params)?;
    println!(
        "✓ Sent kp={} kd={} ki={} threshold={} to {}",
        params.kp(),
        params.kd(),
        params.ki(),
        params.threshold(),
        device_id
    );
    Ok(())
}
