//! The interrupt pipeline: open, configure and poll a boot mouse

use crate::descriptor::{HidProtocol, HidRequest};
use crate::probe::{find_boot_mouse, BootMouseEndpoint, MAX_TRANSFER_SIZE};
use crate::report::{MouseButtons, MouseEvent, MouseReport};
use crate::state::ButtonLatch;
use crate::UsbMouseError;
use delegate::delegate;
use log::{debug, error, info, trace, warn};
use rusb::{DeviceDescriptor, DeviceHandle, Direction, Recipient, RequestType, UsbContext};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Outcome of one interrupt transfer
#[derive(Debug)]
pub enum PipeError {
    /// Nothing arrived within the timeout, resubmit
    Timeout,
    /// The device is gone, the pipeline should end
    Shutdown,
    /// Transfer failed but the device may recover
    Failed(rusb::Error),
}

impl From<rusb::Error> for PipeError {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::Timeout => PipeError::Timeout,
            rusb::Error::NoDevice | rusb::Error::NotFound | rusb::Error::Io => PipeError::Shutdown,
            other => PipeError::Failed(other),
        }
    }
}

/// Source of interrupt IN payloads
pub trait InterruptPipe {
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize, PipeError>;
}

/// Interrupt pipe over a claimed `rusb` interface
pub struct RusbPipe<T: UsbContext> {
    handle: DeviceHandle<T>,
    endpoint: BootMouseEndpoint,
    read_timeout: Duration,
}

impl<T: UsbContext> InterruptPipe for RusbPipe<T> {
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize, PipeError> {
        let size = self.endpoint.transfer_size.min(buf.len());
        Ok(self
            .handle
            .read_interrupt(self.endpoint.address, &mut buf[..size], self.read_timeout)?)
    }
}

impl<T: UsbContext> Drop for RusbPipe<T> {
    fn drop(&mut self) {
        // Kernel driver reattaches via auto-detach once released
        if let Err(e) = self.handle.release_interface(self.endpoint.interface) {
            debug!("failed to release interface - {:?}", e);
        }
    }
}

/// A claimed boot mouse and its decode state
pub struct UsbMouse<P> {
    pipe: P,
    name: String,
    latch: Arc<ButtonLatch>,
    events: Sender<MouseEvent>,
    previous: MouseButtons,
}

impl<P: InterruptPipe> UsbMouse<P> {
    pub fn new(pipe: P, name: String) -> (Self, Receiver<MouseEvent>) {
        let (events, receiver) = channel();
        (
            Self {
                pipe,
                name,
                latch: Arc::new(ButtonLatch::new()),
                events,
                previous: MouseButtons::default(),
            },
            receiver,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle on the last button mask, for the device node server
    pub fn latch(&self) -> Arc<ButtonLatch> {
        Arc::clone(&self.latch)
    }

    delegate! {
        to self.latch {
            /// Read and clear the last button mask
            #[call(take)]
            pub fn take_buttons(&self) -> u8;
            /// Read the last button mask without clearing it
            #[call(peek)]
            pub fn peek_buttons(&self) -> u8;
        }
    }

    /// Poll the interrupt endpoint until the device goes away
    ///
    /// A failed transfer is logged and resubmitted, never escalated. Only
    /// the disconnect and shutdown class of errors ends the loop.
    pub fn run(&mut self) -> Result<(), UsbMouseError> {
        info!("starting interrupt pipeline for {}", self.name);
        let mut buf = [0u8; MAX_TRANSFER_SIZE];
        loop {
            match self.pipe.read_report(&mut buf) {
                Ok(n) => self.deliver(&buf[..n]),
                Err(PipeError::Timeout) => trace!("no report this interval"),
                Err(PipeError::Shutdown) => {
                    info!("{} disconnected, stopping pipeline", self.name);
                    return Ok(());
                }
                Err(PipeError::Failed(e)) => {
                    error!("can't resubmit interrupt transfer for {} - {:?}", self.name, e);
                }
            }
        }
    }

    fn deliver(&mut self, payload: &[u8]) {
        let report = match MouseReport::parse(payload) {
            Ok(report) => report,
            Err(e) => {
                warn!("dropping report from {} - {}", self.name, e);
                return;
            }
        };

        self.latch.store(report.buttons.raw());

        if report.buttons.left() {
            info!("left button pressed on {}", self.name);
        } else if report.buttons.right() {
            info!("right button pressed on {}", self.name);
        } else {
            debug!("no button pressed on {}", self.name);
        }

        for event in report.events(self.previous) {
            if self.events.send(event).is_err() {
                trace!("no event subscriber, dropping {:?}", event);
            }
        }
        self.previous = report.buttons;
    }
}

#[must_use = "this `UsbMouseBuilder` must be consumed by `::open()`"]
#[derive(Clone, Copy, Debug)]
pub struct UsbMouseBuilder {
    vid_pid: Option<(u16, u16)>,
    read_timeout: Duration,
}

impl UsbMouseBuilder {
    pub fn new() -> Self {
        Self {
            vid_pid: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Only match a specific vendor and product id
    pub fn vid_pid(mut self, vendor: u16, product: u16) -> Self {
        self.vid_pid = Some((vendor, product));
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Claim the first matching boot mouse on the bus
    ///
    /// The kernel driver is detached while the interface is claimed and
    /// reattached when the [`UsbMouse`] is dropped.
    pub fn open<T: UsbContext>(
        self,
        context: &T,
    ) -> Result<(UsbMouse<RusbPipe<T>>, Receiver<MouseEvent>), UsbMouseError> {
        for device in context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("skipping device with unreadable descriptor - {:?}", e);
                    continue;
                }
            };

            if let Some((vendor, product)) = self.vid_pid {
                if descriptor.vendor_id() != vendor || descriptor.product_id() != product {
                    continue;
                }
            }

            let endpoint = match find_boot_mouse(&device) {
                Ok(Some(endpoint)) => endpoint,
                Ok(None) => continue,
                Err(e) => {
                    warn!("skipping device with unreadable configuration - {:?}", e);
                    continue;
                }
            };

            info!(
                "found boot mouse {:04x}:{:04x} on bus {} address {}",
                descriptor.vendor_id(),
                descriptor.product_id(),
                device.bus_number(),
                device.address()
            );

            let handle = device.open()?;
            handle.set_auto_detach_kernel_driver(true)?;
            handle.claim_interface(endpoint.interface)?;

            let name = device_name(&handle, &descriptor);
            configure_boot_protocol(&handle, endpoint.interface);

            let pipe = RusbPipe {
                handle,
                endpoint,
                read_timeout: self.read_timeout,
            };
            return Ok(UsbMouse::new(pipe, name));
        }

        Err(UsbMouseError::NoDevice)
    }
}

impl Default for UsbMouseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Manufacturer and product strings, or a generic vid:pid fallback
fn device_name<T: UsbContext>(handle: &DeviceHandle<T>, descriptor: &DeviceDescriptor) -> String {
    let manufacturer = handle.read_manufacturer_string_ascii(descriptor).ok();
    let product = handle.read_product_string_ascii(descriptor).ok();

    match (manufacturer, product) {
        (Some(manufacturer), Some(product)) => format!("{} {}", manufacturer, product),
        (Some(manufacturer), None) => manufacturer,
        (None, Some(product)) => product,
        (None, None) => format!(
            "USB HIDBP Mouse {:04x}:{:04x}",
            descriptor.vendor_id(),
            descriptor.product_id()
        ),
    }
}

/// Request the boot report format and reports on change only
///
/// Failure is logged, not fatal. Devices already in boot protocol commonly
/// stall these.
fn configure_boot_protocol<T: UsbContext>(handle: &DeviceHandle<T>, interface: u8) {
    let request_type = rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface);

    if let Err(e) = handle.write_control(
        request_type,
        HidRequest::SetProtocol.into(),
        u16::from(u8::from(HidProtocol::Boot)),
        u16::from(interface),
        &[],
        CONTROL_TIMEOUT,
    ) {
        warn!("SetProtocol(Boot) failed - {:?}", e);
    }

    if let Err(e) = handle.write_control(
        request_type,
        HidRequest::SetIdle.into(),
        0,
        u16::from(interface),
        &[],
        CONTROL_TIMEOUT,
    ) {
        warn!("SetIdle(0) failed - {:?}", e);
    }
}
