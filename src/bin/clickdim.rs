//! Poll the mymouse node and lower the backlight on left click

use clap::Parser;
use log::{error, info, warn};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;
use usb_boot_mouse::backlight::{Backlight, DEFAULT_BRIGHTNESS_PATH};
use usb_boot_mouse::node::{DEFAULT_NODE_PATH, READ_REQUEST};
use usb_boot_mouse::report::MouseButtons;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path of the mymouse node
    #[arg(long, default_value = DEFAULT_NODE_PATH)]
    node: std::path::PathBuf,

    /// Sysfs brightness file
    #[arg(long, default_value = DEFAULT_BRIGHTNESS_PATH)]
    brightness: std::path::PathBuf,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 10)]
    interval_ms: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), usb_boot_mouse::UsbMouseError> {
    let mut node = UnixStream::connect(&args.node)?;
    info!("opened {}", args.node.display());
    info!("left click to decrease brightness");

    let backlight = Backlight::new(&args.brightness);
    let interval = Duration::from_millis(args.interval_ms);
    let mut mask = [0u8; 1];

    loop {
        node.write_all(&[READ_REQUEST])?;
        node.read_exact(&mut mask)?;

        if MouseButtons::from(mask[0]).left() {
            // Brightness errors do not stop the poll loop
            if let Err(e) = backlight.step_down() {
                warn!("brightness update failed - {}", e);
            }
        }

        std::thread::sleep(interval);
    }
}
