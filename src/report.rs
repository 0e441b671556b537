//! Boot protocol mouse reports and the events decoded from them

use crate::UsbMouseError;
use packed_struct::prelude::*;

/// Fixed format mouse report guaranteed by the Boot specification
///
/// This is defined in Appendix B.2 of [Device Class Definition for Human
/// Interface Devices (Hid) Version 1.11](<https://www.usb.org/sites/default/files/hid1_11.pdf>)
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default, PackedStruct)]
#[packed_struct(endian = "lsb", size_bytes = "3")]
pub struct BootMouseReport {
    #[packed_field]
    pub buttons: u8,
    #[packed_field]
    pub x: i8,
    #[packed_field]
    pub y: i8,
}

/// Raw button mask of a boot report
///
/// Bits 3..7 are device specific and pass through unchanged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MouseButtons(u8);

impl MouseButtons {
    const LEFT: u8 = 0x01;
    const RIGHT: u8 = 0x02;
    const MIDDLE: u8 = 0x04;

    pub fn left(self) -> bool {
        self.0 & Self::LEFT != 0
    }

    pub fn right(self) -> bool {
        self.0 & Self::RIGHT != 0
    }

    pub fn middle(self) -> bool {
        self.0 & Self::MIDDLE != 0
    }

    pub fn any(self) -> bool {
        self.0 != 0
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

impl From<u8> for MouseButtons {
    fn from(mask: u8) -> Self {
        Self(mask)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Button {
    Left,
    Right,
    Middle,
}

/// Input event decoded from one interrupt transfer
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MouseEvent {
    Button { button: Button, pressed: bool },
    Motion { x: i8, y: i8 },
    Wheel(i8),
}

/// One decoded interrupt payload
///
/// Boot mice are only required to send the 3 byte boot report, but most
/// append a wheel delta in byte 3. Anything past byte 3 is vendor data and
/// ignored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MouseReport {
    pub buttons: MouseButtons,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub fn parse(payload: &[u8]) -> Result<Self, UsbMouseError> {
        if payload.len() < 3 {
            return Err(UsbMouseError::ReportTooShort(payload.len()));
        }

        let bytes: [u8; 3] = payload[..3]
            .try_into()
            .map_err(|_| UsbMouseError::MalformedReport)?;
        let boot =
            BootMouseReport::unpack(&bytes).map_err(|_| UsbMouseError::MalformedReport)?;

        Ok(Self {
            buttons: MouseButtons::from(boot.buttons),
            x: boot.x,
            y: boot.y,
            wheel: payload.get(3).map(|&b| b as i8).unwrap_or(0),
        })
    }

    /// Expand this report into events, given the previous button mask
    ///
    /// Button events are emitted in left, right, middle order and only on
    /// state change. Motion and wheel events are dropped when zero.
    pub fn events(&self, previous: MouseButtons) -> Vec<MouseEvent> {
        let mut events = Vec::new();

        for (button, now, before) in [
            (Button::Left, self.buttons.left(), previous.left()),
            (Button::Right, self.buttons.right(), previous.right()),
            (Button::Middle, self.buttons.middle(), previous.middle()),
        ] {
            if now != before {
                events.push(MouseEvent::Button {
                    button,
                    pressed: now,
                });
            }
        }

        if self.x != 0 || self.y != 0 {
            events.push(MouseEvent::Motion {
                x: self.x,
                y: self.y,
            });
        }

        if self.wheel != 0 {
            events.push(MouseEvent::Wheel(self.wheel));
        }

        events
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn button_mask_bits() {
        for mask in 0..=u8::MAX {
            let buttons = MouseButtons::from(mask);
            assert_eq!(buttons.left(), mask & 0x01 != 0);
            assert_eq!(buttons.right(), mask & 0x02 != 0);
            assert_eq!(buttons.middle(), mask & 0x04 != 0);
            assert_eq!(buttons.raw(), mask);
        }
    }

    #[test]
    fn parse_boot_report() {
        let report = MouseReport::parse(&[0x01, 0x05, 0xFB]).unwrap();
        assert!(report.buttons.left());
        assert!(!report.buttons.right());
        assert_eq!(report.x, 5);
        assert_eq!(report.y, -5);
        assert_eq!(report.wheel, 0);
    }

    #[test]
    fn parse_wheel_report() {
        let report = MouseReport::parse(&[0x04, 0x00, 0x00, 0xFF]).unwrap();
        assert!(report.buttons.middle());
        assert_eq!(report.wheel, -1);
    }

    #[test]
    fn parse_ignores_vendor_bytes() {
        let report = MouseReport::parse(&[0x02, 0x7F, 0x81, 0x01, 0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert!(report.buttons.right());
        assert_eq!(report.x, 127);
        assert_eq!(report.y, -127);
        assert_eq!(report.wheel, 1);
    }

    #[test]
    fn parse_rejects_short_payload() {
        assert!(matches!(
            MouseReport::parse(&[0x01, 0x00]),
            Err(UsbMouseError::ReportTooShort(2))
        ));
        assert!(matches!(
            MouseReport::parse(&[]),
            Err(UsbMouseError::ReportTooShort(0))
        ));
    }

    #[test]
    fn events_press_and_release() {
        let press = MouseReport::parse(&[0x01, 0x00, 0x00]).unwrap();
        assert_eq!(
            press.events(MouseButtons::default()),
            vec![MouseEvent::Button {
                button: Button::Left,
                pressed: true
            }]
        );

        let release = MouseReport::parse(&[0x00, 0x00, 0x00]).unwrap();
        assert_eq!(
            release.events(press.buttons),
            vec![MouseEvent::Button {
                button: Button::Left,
                pressed: false
            }]
        );
    }

    #[test]
    fn events_unchanged_buttons_not_repeated() {
        let report = MouseReport::parse(&[0x01, 0x02, 0x00]).unwrap();
        assert_eq!(
            report.events(MouseButtons::from(0x01)),
            vec![MouseEvent::Motion { x: 2, y: 0 }]
        );
    }

    #[test]
    fn events_ordering() {
        let report = MouseReport::parse(&[0x07, 0x01, 0x01, 0x01]).unwrap();
        assert_eq!(
            report.events(MouseButtons::default()),
            vec![
                MouseEvent::Button {
                    button: Button::Left,
                    pressed: true
                },
                MouseEvent::Button {
                    button: Button::Right,
                    pressed: true
                },
                MouseEvent::Button {
                    button: Button::Middle,
                    pressed: true
                },
                MouseEvent::Motion { x: 1, y: 1 },
                MouseEvent::Wheel(1),
            ]
        );
    }

    #[test]
    fn stationary_report_is_eventless() {
        let report = MouseReport::parse(&[0x00, 0x00, 0x00, 0x00]).unwrap();
        assert!(report.events(MouseButtons::default()).is_empty());
    }
}
