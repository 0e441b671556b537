//! Boot mouse interface and endpoint discovery
//!
//! Matching runs over plain descriptor values so it can be exercised without
//! hardware; [`find_boot_mouse`] feeds it from a live `rusb` device.

use crate::descriptor::{InterfaceProtocol, InterfaceSubClass, USB_CLASS_HID};
use log::{debug, trace};
use rusb::{Direction, TransferType, UsbContext};

/// Boot reports are at most 8 bytes, longer packets carry vendor data
pub const MAX_TRANSFER_SIZE: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EndpointValues {
    pub address: u8,
    pub interrupt: bool,
    pub input: bool,
    pub max_packet_size: u16,
    pub interval: u8,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfaceValues {
    pub number: u8,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    pub endpoints: Vec<EndpointValues>,
}

/// Everything needed to drive the interrupt pipeline of a matched mouse
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BootMouseEndpoint {
    pub interface: u8,
    pub address: u8,
    pub transfer_size: usize,
    pub interval: u8,
}

/// Find the first boot protocol mouse interface
///
/// An interface only matches when it carries exactly one endpoint and that
/// endpoint is interrupt IN, the shape the boot mouse descriptor mandates.
pub fn match_boot_mouse(interfaces: &[InterfaceValues]) -> Option<BootMouseEndpoint> {
    for interface in interfaces {
        if interface.class != USB_CLASS_HID
            || interface.sub_class != u8::from(InterfaceSubClass::Boot)
            || interface.protocol != u8::from(InterfaceProtocol::Mouse)
        {
            trace!(
                "skipping interface {}, class {:02X}/{:02X}/{:02X}",
                interface.number,
                interface.class,
                interface.sub_class,
                interface.protocol
            );
            continue;
        }

        if interface.endpoints.len() != 1 {
            debug!(
                "boot mouse interface {} has {} endpoints, expected 1",
                interface.number,
                interface.endpoints.len()
            );
            continue;
        }

        let endpoint = &interface.endpoints[0];
        if !endpoint.interrupt || !endpoint.input {
            debug!(
                "boot mouse interface {} endpoint {:02X} is not interrupt IN",
                interface.number, endpoint.address
            );
            continue;
        }

        return Some(BootMouseEndpoint {
            interface: interface.number,
            address: endpoint.address,
            transfer_size: usize::from(endpoint.max_packet_size).min(MAX_TRANSFER_SIZE),
            interval: endpoint.interval,
        });
    }

    None
}

/// Read the active configuration of `device` and match it as a boot mouse
pub fn find_boot_mouse<T: UsbContext>(
    device: &rusb::Device<T>,
) -> rusb::Result<Option<BootMouseEndpoint>> {
    let config = device.active_config_descriptor()?;

    let mut interfaces = Vec::new();
    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            interfaces.push(InterfaceValues {
                number: descriptor.interface_number(),
                class: descriptor.class_code(),
                sub_class: descriptor.sub_class_code(),
                protocol: descriptor.protocol_code(),
                endpoints: descriptor
                    .endpoint_descriptors()
                    .map(|endpoint| EndpointValues {
                        address: endpoint.address(),
                        interrupt: endpoint.transfer_type() == TransferType::Interrupt,
                        input: endpoint.direction() == Direction::In,
                        max_packet_size: endpoint.max_packet_size(),
                        interval: endpoint.interval(),
                    })
                    .collect(),
            });
        }
    }

    Ok(match_boot_mouse(&interfaces))
}
