//! Userspace driver for USB HID boot protocol mice, based on
//! [`rusb`](<https://crates.io/crates/rusb>).
//!
//! Binds to the interrupt IN endpoint of a boot protocol mouse interface,
//! decodes the fixed format boot reports into button, motion and wheel
//! events, and publishes the most recent raw button mask through a `mymouse`
//! device node (a Unix socket) for other processes to poll.
//!
//! Two binaries build on the library:
//!
//! * `usbmoused` - claims the mouse and runs the interrupt pipeline
//! * `clickdim` - polls the device node and lowers the screen backlight on
//!   left click
//!
//! ```no_run
//! use usb_boot_mouse::driver::UsbMouseBuilder;
//!
//! fn main() -> Result<(), usb_boot_mouse::UsbMouseError> {
//!     let context = rusb::Context::new()?;
//!     let (mut mouse, events) = UsbMouseBuilder::new().open(&context)?;
//!
//!     std::thread::spawn(move || {
//!         for event in events {
//!             println!("{:?}", event);
//!         }
//!     });
//!
//!     mouse.run()
//! }
//! ```

use thiserror::Error;

pub mod backlight;
pub mod descriptor;
pub mod driver;
pub mod node;
pub mod probe;
pub mod report;
pub mod state;

#[derive(Debug, Error)]
pub enum UsbMouseError {
    /// No connected device exposes a boot protocol mouse interface
    #[error("no boot protocol mouse found")]
    NoDevice,
    /// Report payload shorter than the 3 byte boot report
    #[error("report too short, got {0} bytes, expected at least 3")]
    ReportTooShort(usize),
    /// Report bytes that do not unpack as a boot report
    #[error("malformed boot report")]
    MalformedReport,
    /// Brightness file held something other than an integer
    #[error("malformed brightness value {0:?}")]
    MalformedBrightness(String),
    #[error("usb transfer failed - {0}")]
    Usb(#[from] rusb::Error),
    #[error("i/o error - {0}")]
    Io(#[from] std::io::Error),
}
