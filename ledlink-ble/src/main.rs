//! BLE LED control tool for ledlink boards
//!
//! Scans for ESP32-class boards advertising the LED service and toggles
//! their LED by writing "ON"/"OFF" to the LED characteristic.

use btleplug::platform::Adapter;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use ledlink_controller::ble::{self, Error as BleError, LedSession, Status};
use ledlink_proto::LedCommand;
use tokio::io::AsyncBufReadExt;

#[derive(Parser)]
#[command(name = "ledlink-ble")]
#[command(about = "BLE LED control tool for ledlink boards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for ledlink boards
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Turn the LED on
    On {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Turn the LED off
    Off {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Hold a connection and toggle the LED interactively
    Control {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let adapter = ble::get_adapter().await?;

    match cli.command {
        Commands::Scan { duration } => {
            scan_devices(&adapter, duration).await?;
        }
        Commands::On { device } => {
            set_led(&adapter, device.as_deref(), LedCommand::On).await?;
        }
        Commands::Off { device } => {
            set_led(&adapter, device.as_deref(), LedCommand::Off).await?;
        }
        Commands::Control { device } => {
            control(&adapter, device.as_deref()).await?;
        }
    }

    Ok(())
}

async fn scan_devices(adapter: &Adapter, duration: u64) -> Result<(), BleError> {
    println!("Scanning for ledlink boards ({} seconds)...", duration);

    let devices = ble::scan(adapter, duration).await?;

    println!("\nFound {} devices:", devices.len());
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        let marker = if device.has_led_service { " [LED]" } else { "" };

        println!("  {} ({}) RSSI: {}{}", device.name, device.address, rssi, marker);
    }

    Ok(())
}

/// Connect to one board and resolve its LED characteristic
async fn open_session(adapter: &Adapter, target: Option<&str>) -> Result<LedSession, BleError> {
    println!("{}", Status::Scanning);
    let peripheral = ble::find_device(adapter, target).await?;

    println!("{}", Status::Connecting);
    let session = LedSession::connect(adapter, peripheral).await?;
    println!("{}", Status::Connected(session.device_name().to_string()));

    Ok(session)
}

/// One-shot: find the board, write the command, disconnect
async fn set_led(
    adapter: &Adapter,
    target: Option<&str>,
    cmd: LedCommand,
) -> Result<(), BleError> {
    let session = open_session(adapter, target).await?;

    session.write(cmd).await?;
    println!("LED {}", cmd);

    session.disconnect().await;
    println!("{}", Status::Disconnected);
    Ok(())
}

/// Hold the connection and toggle the LED from stdin until "quit" or the
/// board drops the link
async fn control(
    adapter: &Adapter,
    target: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(adapter, target).await?;

    let disconnects = session.disconnect_events().await?;
    tokio::pin!(disconnects);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    println!("Commands: on, off, quit");

    loop {
        tokio::select! {
            _ = disconnects.next() => {
                // The board dropped the link; nothing left to tear down.
                println!("{}", Status::Disconnected);
                return Ok(());
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("quit") {
                    break;
                }
                match line.parse::<LedCommand>() {
                    Ok(cmd) => {
                        session.write(cmd).await?;
                        println!("LED {}", cmd);
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    session.disconnect().await;
    println!("{}", Status::Disconnected);
    Ok(())
}
