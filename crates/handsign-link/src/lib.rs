//! Handsign Link — bus protocol to the gesture accelerator.
//!
//! Byte-level command codec, the [`AcceleratorLink`] session state
//! machine, and the transports it can run over: a Linux spidev node, a
//! bit-banged GPIO bus, or an in-process simulator.

pub mod bitbang;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod simulator;
pub mod transport;

pub use bitbang::{BitBangTransport, PinBus};
pub use config::{LinkConfig, PollPolicy};
pub use error::LinkError;
pub use link::{AcceleratorLink, LinkState, PollPhase};
pub use protocol::{Channel, ResultSlot};
pub use simulator::{SimulatedAccelerator, SimulatorSettings, Stall};
pub use transport::{SpidevTransport, Transport};
