use std::io;

use crate::link::{LinkState, PollPhase};

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("bus error: {0}")]
    Bus(#[from] io::Error),
    #[error("accelerator did not {phase} within {polls} polls")]
    ProtocolTimeout { phase: PollPhase, polls: u32 },
    #[error("plane of {len} bytes exceeds the {max}-byte frame budget")]
    FrameTooLarge { len: usize, max: usize },
    #[error("plane dimensions {width}x{height} cannot be encoded")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("invalid channel selector {0}")]
    InvalidChannel(u8),
    #[error("invalid result slot {0}")]
    InvalidSlot(u8),
    #[error("{operation} is not valid in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: LinkState,
    },
    #[error("session faulted by an earlier bus error")]
    SessionFaulted,
    #[error("link is closed")]
    Closed,
    #[error("aborted")]
    Aborted,
}
