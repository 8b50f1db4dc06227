//! Accelerator bus wire format.
//!
//! Every frame starts with a null sync byte followed by a command byte laid
//! out as `[7:6] status | [5:2] operation | [1:0] channel`, and is closed by
//! another null byte. Multi-byte integers are big-endian.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Frame delimiter, sent before the command byte and after the payload.
pub const SYNC: u8 = 0x00;

pub const OP_SEND_PLANE: u8 = 0b0000_0100;
pub const OP_RECEIVE_PLANE: u8 = 0b0000_1000;
pub const OP_RUN_PIPELINE: u8 = 0b0000_1100;
pub const OP_READ_RESULT: u8 = 0b0001_0000;

/// Status bits the accelerator returns on polls while the pipeline runs.
pub const BUSY_FLAG: u8 = 0b0100_0000;

/// Color plane selector in the low two bits of a plane command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub const fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = LinkError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::Red),
            2 => Ok(Self::Green),
            3 => Ok(Self::Blue),
            other => Err(LinkError::InvalidChannel(other)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "R",
            Self::Green => "G",
            Self::Blue => "B",
        })
    }
}

/// 32-bit result registers exposed after a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultSlot {
    Area = 0,
    Perimeter = 1,
    PeakCount = 2,
    Classification = 3,
}

impl ResultSlot {
    pub const ALL: [ResultSlot; 4] = [
        ResultSlot::Area,
        ResultSlot::Perimeter,
        ResultSlot::PeakCount,
        ResultSlot::Classification,
    ];

    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ResultSlot {
    type Error = LinkError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::Area),
            1 => Ok(Self::Perimeter),
            2 => Ok(Self::PeakCount),
            3 => Ok(Self::Classification),
            other => Err(LinkError::InvalidSlot(other)),
        }
    }
}

/// A decoded command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SendPlane(Channel),
    ReceivePlane(Channel),
    RunPipeline,
    ReadResult(ResultSlot),
}

impl Command {
    pub fn encode(self) -> u8 {
        match self {
            Self::SendPlane(ch) => OP_SEND_PLANE | ch.bits(),
            Self::ReceivePlane(ch) => OP_RECEIVE_PLANE | ch.bits(),
            Self::RunPipeline => OP_RUN_PIPELINE,
            Self::ReadResult(slot) => OP_READ_RESULT | (slot.index() << 2),
        }
    }

    /// Decode a command byte. Status bits and unknown operations yield `None`.
    pub fn decode(byte: u8) -> Option<Self> {
        match byte {
            0x05..=0x07 => Channel::try_from(byte & 0b11).ok().map(Self::SendPlane),
            0x09..=0x0B => Channel::try_from(byte & 0b11).ok().map(Self::ReceivePlane),
            OP_RUN_PIPELINE => Some(Self::RunPipeline),
            b if b & 0b1111_0011 == OP_READ_RESULT => {
                ResultSlot::try_from((b >> 2) & 0b11).ok().map(Self::ReadResult)
            }
            _ => None,
        }
    }

    /// Bytes that follow the command byte before any payload.
    pub const fn argument_len(self) -> usize {
        match self {
            Self::SendPlane(_) => 4,
            Self::ReceivePlane(_) | Self::RunPipeline => 2,
            Self::ReadResult(_) => 1,
        }
    }
}

/// `[SYNC, 0x04 | ch, hH, hL, wH, wL]`
pub fn send_plane_header(channel: Channel, height: u16, width: u16) -> [u8; 6] {
    let [h_hi, h_lo] = height.to_be_bytes();
    let [w_hi, w_lo] = width.to_be_bytes();
    [SYNC, Command::SendPlane(channel).encode(), h_hi, h_lo, w_hi, w_lo]
}

/// `[SYNC, 0x08 | ch, 0, 0]`
pub fn receive_plane_header(channel: Channel) -> [u8; 4] {
    [SYNC, Command::ReceivePlane(channel).encode(), 0x00, 0x00]
}

/// `[SYNC, 0x0C, 0, 0]`
pub fn run_pipeline_header() -> [u8; 4] {
    [SYNC, Command::RunPipeline.encode(), 0x00, 0x00]
}

/// `[SYNC, 0x10 | slot << 2, 0]`
pub fn read_result_header(slot: ResultSlot) -> [u8; 3] {
    [SYNC, Command::ReadResult(slot).encode(), 0x00]
}

/// Split a send-plane header's dimension bytes into `(height, width)`.
pub fn decode_dimensions(args: [u8; 4]) -> (u16, u16) {
    (
        u16::from_be_bytes([args[0], args[1]]),
        u16::from_be_bytes([args[2], args[3]]),
    )
}
