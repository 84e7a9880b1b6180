//! Clocked shift-register protocol for chainable RGB LED drivers (P9813).
//!
//! A frame is 32 zero bits, a control byte `1 1 /B7 /B6 /G7 /G6 /R7 /R6`, the
//! blue, green and red bytes, then 32 zero bits. Bytes go out MSB first; each
//! bit is latched by setting the data line and pulsing the clock low-high.

use super::DigitalOutput;
use crate::error::HardwareError;

const FRAME_MARKER: [u8; 4] = [0x00; 4];

/// Encoded frame, kept as bytes and iterated as bits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitStream {
    bytes: Vec<u8>,
}

impl BitStream {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len_bits(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Bits in transmission order (MSB of the first byte first).
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1 == 1))
    }
}

/// Control byte: two flag bits, then the inverted top two bits of B, G, R.
pub fn control_byte(red: u8, green: u8, blue: u8) -> u8 {
    let mut prefix = 0xC0;
    if blue & 0x80 == 0 {
        prefix |= 0x20;
    }
    if blue & 0x40 == 0 {
        prefix |= 0x10;
    }
    if green & 0x80 == 0 {
        prefix |= 0x08;
    }
    if green & 0x40 == 0 {
        prefix |= 0x04;
    }
    if red & 0x80 == 0 {
        prefix |= 0x02;
    }
    if red & 0x40 == 0 {
        prefix |= 0x01;
    }
    prefix
}

pub fn encode_frame(red: u8, green: u8, blue: u8) -> BitStream {
    let mut bytes = Vec::with_capacity(12);
    bytes.extend_from_slice(&FRAME_MARKER);
    bytes.push(control_byte(red, green, blue));
    bytes.extend_from_slice(&[blue, green, red]);
    bytes.extend_from_slice(&FRAME_MARKER);
    BitStream { bytes }
}

/// A single chainable LED on a clock and a data line.
pub struct ChainableLed {
    clock: Box<dyn DigitalOutput>,
    data: Box<dyn DigitalOutput>,
}

impl ChainableLed {
    pub fn new(clock: Box<dyn DigitalOutput>, data: Box<dyn DigitalOutput>) -> Self {
        Self { clock, data }
    }

    /// Shift a full frame out. Always drives the chip, even for a repeated colour.
    pub fn set_color(&mut self, red: u8, green: u8, blue: u8) -> Result<(), HardwareError> {
        for bit in encode_frame(red, green, blue).bits() {
            self.data.write(bit)?;
            self.clock.write(false)?;
            self.clock.write(true)?;
        }
        Ok(())
    }
}
