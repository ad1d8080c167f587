//! Ledlink BLE Controller
//!
//! BLE client for discovering ledlink LED boards and toggling their LED.
//!
//! # Example
//!
//! ```ignore
//! use ledlink_controller::ble;
//! use ledlink_proto::LedCommand;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ble::Error> {
//!     // Scan for boards
//!     let adapter = ble::get_adapter().await?;
//!     for device in ble::scan(&adapter, 5).await? {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     // Connect and toggle the LED
//!     let peripheral = ble::find_device(&adapter, None).await?;
//!     let session = ble::LedSession::connect(&adapter, peripheral).await?;
//!     session.write(LedCommand::On).await?;
//!     session.disconnect().await;
//!
//!     Ok(())
//! }
//! ```

pub mod ble;

pub use ble::{DiscoveredDevice, Error, LedSession, Status};
