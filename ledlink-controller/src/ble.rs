//! BLE client for ledlink LED boards
//!
//! Scans for boards advertising the LED service, connects, and writes
//! `ON`/`OFF` to the LED characteristic. One session holds one connection
//! and one writable endpoint; callers that lose the link start over.

use std::fmt;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{Stream, StreamExt};
use tracing::debug;
use uuid::Uuid;

use ledlink_proto::{DEVICE_NAME_PREFIX, LED_CHAR_UUID, LedCommand, SERVICE_UUID};

/// Errors from BLE operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("no ledlink device found")]
    DeviceNotFound,
    #[error("LED characteristic not found on {0}")]
    CharacteristicNotFound(String),
    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}

/// Connection status, rendered for the user as a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Scanning,
    Connecting,
    Connected(String),
    Disconnected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Scanning => write!(f, "Scanning..."),
            Status::Connecting => write!(f, "Connecting..."),
            Status::Connected(name) => write!(f, "Connected to {name}"),
            Status::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// A discovered BLE device
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub has_led_service: bool,
}

/// Parse UUID string into uuid::Uuid
fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("invalid UUID in ledlink_proto")
}

/// True when `name` or `address` contains the target pattern, or, with no
/// target, when the device looks like a ledlink board.
fn matches_target(name: &str, address: &str, services: &[Uuid], target: Option<&str>) -> bool {
    match target {
        Some(t) => name.contains(t) || address.contains(t),
        None => advertises_led_service(name, services),
    }
}

/// True when the advertisement carries the LED service, or the local name
/// carries the board prefix (some platforms drop service UUIDs from the
/// advertisement they report).
fn advertises_led_service(name: &str, services: &[Uuid]) -> bool {
    services.contains(&parse_uuid(SERVICE_UUID)) || name.starts_with(DEVICE_NAME_PREFIX)
}

/// Scan filter for the LED service
fn led_scan_filter() -> ScanFilter {
    ScanFilter {
        services: vec![parse_uuid(SERVICE_UUID)],
    }
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, Error> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(Error::NoAdapter)
}

/// Scan for BLE devices
///
/// Returns a list of discovered devices. Ledlink boards have
/// `has_led_service = true`.
pub async fn scan(adapter: &Adapter, duration_secs: u64) -> Result<Vec<DiscoveredDevice>, Error> {
    debug!(duration_secs, "starting scan");
    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    // Stop the scan whether collection succeeded or not.
    let result = collect_devices(adapter).await;
    let _ = adapter.stop_scan().await;

    if let Ok(devices) = &result {
        debug!(count = devices.len(), "scan finished");
    }
    result
}

async fn collect_devices(adapter: &Adapter) -> Result<Vec<DiscoveredDevice>, Error> {
    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let address = peripheral.address().to_string();
            let rssi = props.rssi;
            let has_led_service = advertises_led_service(&name, &props.services);

            devices.push(DiscoveredDevice { name, address, rssi, has_led_service });
        }
    }

    Ok(devices)
}

/// Find a ledlink board by name/address pattern, or find any ledlink board
pub async fn find_device(adapter: &Adapter, target: Option<&str>) -> Result<Peripheral, Error> {
    adapter.start_scan(led_scan_filter()).await?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Stop the scan whether a board was found or not.
    let result = first_match(adapter, target).await;
    let _ = adapter.stop_scan().await;
    result
}

async fn first_match(adapter: &Adapter, target: Option<&str>) -> Result<Peripheral, Error> {
    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_default();
            let addr = peripheral.address().to_string();

            if matches_target(&name, &addr, &props.services, target) {
                debug!(%name, %addr, "found device");
                return Ok(peripheral);
            }
        }
    }

    Err(Error::DeviceNotFound)
}

/// One open connection to a board, with the LED characteristic resolved
pub struct LedSession {
    adapter: Adapter,
    peripheral: Peripheral,
    led_char: Characteristic,
    name: String,
}

impl LedSession {
    /// Connect to a peripheral and resolve the LED characteristic.
    ///
    /// The connection is torn down before returning an error if the device
    /// turns out not to expose the LED characteristic.
    pub async fn connect(adapter: &Adapter, peripheral: Peripheral) -> Result<Self, Error> {
        let name = peripheral
            .properties()
            .await?
            .and_then(|p| p.local_name)
            .unwrap_or_else(|| peripheral.address().to_string());

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let led_uuid = parse_uuid(LED_CHAR_UUID);
        let led_char = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == led_uuid);

        let Some(led_char) = led_char else {
            let _ = peripheral.disconnect().await;
            return Err(Error::CharacteristicNotFound(name));
        };

        debug!(%name, "connected");
        Ok(Self {
            adapter: adapter.clone(),
            peripheral,
            led_char,
            name,
        })
    }

    /// Advertised name of the connected board
    pub fn device_name(&self) -> &str {
        &self.name
    }

    /// Write one command to the LED characteristic as raw UTF-8.
    ///
    /// A single write, no retry: a failure is reported to the caller and the
    /// session is left as-is.
    pub async fn write(&self, cmd: LedCommand) -> Result<(), Error> {
        debug!(%cmd, "writing LED command");
        self.peripheral
            .write(&self.led_char, cmd.as_bytes(), WriteType::WithResponse)
            .await?;
        Ok(())
    }

    /// Stream that yields once per unexpected disconnect of this board.
    ///
    /// Callers treat a yield as the end of the session. The stream owns its
    /// data (`use<>`), so it can outlive the session that produced it.
    pub async fn disconnect_events(&self) -> Result<impl Stream<Item = ()> + Send + use<>, Error> {
        let id = self.peripheral.id();
        let events = self.adapter.events().await?;
        Ok(events.filter_map(move |event| {
            let gone = matches!(&event, CentralEvent::DeviceDisconnected(pid) if pid == &id);
            futures::future::ready(gone.then_some(()))
        }))
    }

    /// Disconnect from the board. Best effort: the link may already be gone.
    pub async fn disconnect(self) {
        let _ = self.peripheral.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led_service() -> Vec<Uuid> {
        vec![parse_uuid(SERVICE_UUID)]
    }

    #[test]
    fn target_matches_name_or_address() {
        assert!(matches_target("ESP32-LED", "aa:bb:cc:dd:ee:ff", &[], Some("LED")));
        assert!(matches_target("ESP32-LED", "aa:bb:cc:dd:ee:ff", &[], Some("bb:cc")));
        assert!(!matches_target("ESP32-LED", "aa:bb:cc:dd:ee:ff", &[], Some("nope")));
    }

    #[test]
    fn no_target_requires_led_board() {
        assert!(matches_target("ESP32", "", &[], None));
        assert!(matches_target("mystery", "", &led_service(), None));
        assert!(!matches_target("mystery", "", &[], None));
    }

    #[test]
    fn advertised_service_beats_name() {
        assert!(advertises_led_service("whatever", &led_service()));
        assert!(advertises_led_service("ESP32-LED", &[]));
        assert!(!advertises_led_service("GAN-i3", &[]));
    }

    #[test]
    fn disconnect_stream_does_not_borrow_session() {
        // Compile-time check: the stream must stay usable after the session
        // it came from has been torn down.
        fn check(session: LedSession) {
            let _fut = async move {
                let events = session.disconnect_events().await;
                session.disconnect().await;
                events
            };
        }
        let _ = check;
    }

    #[test]
    fn status_lines() {
        assert_eq!(Status::Scanning.to_string(), "Scanning...");
        assert_eq!(Status::Connected("ESP32".into()).to_string(), "Connected to ESP32");
        assert_eq!(Status::Disconnected.to_string(), "Disconnected");
    }
}
