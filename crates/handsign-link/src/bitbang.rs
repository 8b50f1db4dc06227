//! Software-clocked SPI over four GPIO lines.
//!
//! Mode 0, MSB first. Each byte is framed by its own slave-select pulse:
//! SS low, then per bit SCK low → MOSI ← bit → SCK high → sample MISO, and
//! finally the lines return to idle (MOSI low, SCK low, SS high).

use std::io;
use std::thread;
use std::time::Duration;

use crate::transport::Transport;

/// Output lines driven by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Sck,
    Mosi,
    /// Slave select, active low.
    Ss,
}

/// Raw access to the four bus pins (memory-mapped registers, GPIO chips, ...).
pub trait PinBus {
    fn write(&mut self, line: Line, high: bool) -> io::Result<()>;

    fn read_miso(&mut self) -> io::Result<bool>;
}

pub struct BitBangTransport<P: PinBus> {
    pins: P,
    half_period: Duration,
}

impl<P: PinBus> BitBangTransport<P> {
    /// Wrap `pins` and drive the lines to idle.
    pub fn new(mut pins: P, half_period: Duration) -> io::Result<Self> {
        idle(&mut pins)?;
        Ok(Self { pins, half_period })
    }

    pub fn into_inner(self) -> P {
        self.pins
    }

    fn pause(&self) {
        if !self.half_period.is_zero() {
            thread::sleep(self.half_period);
        }
    }

    /// Shift one byte out on MOSI while shifting one in from MISO.
    pub fn exchange(&mut self, out: u8) -> io::Result<u8> {
        let mut received = 0u8;
        self.pins.write(Line::Ss, false)?;
        for bit in (0..8).rev() {
            self.pins.write(Line::Sck, false)?;
            self.pause();
            self.pins.write(Line::Mosi, (out >> bit) & 1 == 1)?;
            self.pins.write(Line::Sck, true)?;
            if self.pins.read_miso()? {
                received |= 1 << bit;
            }
            self.pause();
        }
        idle(&mut self.pins)?;
        Ok(received)
    }
}

fn idle<P: PinBus>(pins: &mut P) -> io::Result<()> {
    pins.write(Line::Mosi, false)?;
    pins.write(Line::Sck, false)?;
    pins.write(Line::Ss, true)
}

impl<P: PinBus> Transport for BitBangTransport<P> {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.exchange(b)?;
        }
        Ok(())
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        for slot in buf {
            *slot = self.exchange(0x00)?;
        }
        Ok(())
    }
}
