//! Boot mouse driver daemon
//!
//! Claims the first boot protocol mouse, runs the interrupt pipeline and
//! serves the last button mask on the `mymouse` node until the device
//! disconnects.

use clap::Parser;
use log::{error, trace, warn};
use std::time::Duration;
use usb_boot_mouse::driver::UsbMouseBuilder;
use usb_boot_mouse::node::{MouseNode, DEFAULT_NODE_PATH};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Only match this device, as vid:pid in hex
    #[arg(long, value_parser = parse_vid_pid)]
    device: Option<(u16, u16)>,

    /// Path of the mymouse node
    #[arg(long, default_value = DEFAULT_NODE_PATH)]
    node: std::path::PathBuf,

    /// Interrupt read timeout in milliseconds
    #[arg(long, default_value_t = 250)]
    read_timeout_ms: u64,
}

fn parse_vid_pid(raw: &str) -> Result<(u16, u16), String> {
    let (vid, pid) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected vid:pid, got {:?}", raw))?;
    Ok((
        u16::from_str_radix(vid, 16).map_err(|e| e.to_string())?,
        u16::from_str_radix(pid, 16).map_err(|e| e.to_string())?,
    ))
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), usb_boot_mouse::UsbMouseError> {
    let context = rusb::Context::new()?;

    let mut builder =
        UsbMouseBuilder::new().read_timeout(Duration::from_millis(args.read_timeout_ms));
    if let Some((vendor, product)) = args.device {
        builder = builder.vid_pid(vendor, product);
    }

    let (mut mouse, events) = builder.open(&context)?;

    // Node registration failure only logs, the input path keeps working.
    // The guard unregisters the node when the pipeline ends.
    let _node = match MouseNode::bind(&args.node, mouse.latch()) {
        Ok(node) => Some(node.spawn()),
        Err(e) => {
            warn!("mymouse node registration failed - {}", e);
            None
        }
    };

    std::thread::spawn(move || {
        for event in events {
            trace!("{:?}", event);
        }
    });

    mouse.run()
}
