//! In-process stand-in for the accelerator.
//!
//! Decodes the host's byte stream, stores uploaded planes, runs the local
//! pipeline on `RunPipeline` and serves planes and result registers back.
//! After a run the red channel holds the final hand mask, as on the
//! hardware; green and blue keep what was uploaded.
//!
//! Clones share one device, so a test can keep a handle for inspection
//! while the link owns another.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use handsign_core::{FRAME_HEIGHT, FRAME_WIDTH, FrameReport, PipelineParams, Plane, RgbImage, analyze_with_mask};
use parking_lot::Mutex;

use crate::protocol::{self, BUSY_FLAG, Channel, Command, SYNC};
use crate::transport::Transport;

/// Misbehavior injected into the busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stall {
    #[default]
    None,
    /// The busy flag never rises.
    NeverStarts,
    /// The busy flag never clears.
    NeverFinishes,
}

#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Polls answered with `0` before the busy flag rises.
    pub idle_polls: u32,
    /// Polls answered with the busy flag before it clears.
    pub busy_polls: u32,
    pub stall: Stall,
    pub params: PipelineParams,
    /// Plane geometry served on `ReceivePlane`; stored planes are padded
    /// with zeros or cut to this size.
    pub frame_width: u32,
    pub frame_height: u32,
}

impl SimulatorSettings {
    fn frame_len(&self) -> usize {
        (self.frame_width as usize) * (self.frame_height as usize)
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            idle_polls: 1,
            busy_polls: 3,
            stall: Stall::None,
            params: PipelineParams::default(),
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
        }
    }
}

/// Observable device state.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    /// Planes by channel (R, G, B).
    pub planes: [Option<Plane>; 3],
    /// Area, perimeter, peak count, classification code.
    pub registers: [u32; 4],
    pub last_report: Option<FrameReport>,
    /// Every decoded command, in order.
    pub commands: Vec<Command>,
    pub runs: u32,
}

enum Parser {
    Command,
    Arguments { command: Command, args: Vec<u8> },
    Payload { channel: Channel, width: u32, height: u32, samples: Vec<u8> },
}

#[derive(Clone, Copy)]
enum Busy {
    Off,
    Running { idle_left: u32, busy_left: u32 },
}

struct Device {
    state: DeviceState,
    settings: SimulatorSettings,
    parser: Parser,
    outbox: VecDeque<u8>,
    busy: Busy,
}

#[derive(Clone)]
pub struct SimulatedAccelerator {
    device: Arc<Mutex<Device>>,
}

impl SimulatedAccelerator {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            device: Arc::new(Mutex::new(Device {
                state: DeviceState::default(),
                settings,
                parser: Parser::Command,
                outbox: VecDeque::new(),
                busy: Busy::Off,
            })),
        }
    }

    /// Copy of the current device state.
    pub fn snapshot(&self) -> DeviceState {
        self.device.lock().state.clone()
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.device.lock().state.last_report.clone()
    }

    pub fn set_stall(&self, stall: Stall) {
        self.device.lock().settings.stall = stall;
    }
}

impl Default for SimulatedAccelerator {
    fn default() -> Self {
        Self::new(SimulatorSettings::default())
    }
}

impl Transport for SimulatedAccelerator {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut device = self.device.lock();
        for &b in bytes {
            device.feed(b);
        }
        Ok(())
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut device = self.device.lock();
        for slot in buf {
            *slot = device.next_out();
        }
        Ok(())
    }
}

impl Device {
    fn feed(&mut self, byte: u8) {
        self.parser = match std::mem::replace(&mut self.parser, Parser::Command) {
            Parser::Command if byte == SYNC => Parser::Command,
            Parser::Command => match Command::decode(byte) {
                Some(command) => Parser::Arguments {
                    command,
                    args: Vec::with_capacity(command.argument_len()),
                },
                None => {
                    tracing::warn!("simulator ignoring unknown command byte {byte:#04x}");
                    Parser::Command
                }
            },
            Parser::Arguments { command, mut args } => {
                args.push(byte);
                if args.len() < command.argument_len() {
                    Parser::Arguments { command, args }
                } else {
                    self.execute(command, &args)
                }
            }
            Parser::Payload {
                channel,
                width,
                height,
                mut samples,
            } => {
                samples.push(byte);
                if samples.len() < (width as usize) * (height as usize) {
                    Parser::Payload {
                        channel,
                        width,
                        height,
                        samples,
                    }
                } else {
                    self.store(channel, width, height, samples);
                    Parser::Command
                }
            }
        };
    }

    fn execute(&mut self, command: Command, args: &[u8]) -> Parser {
        self.state.commands.push(command);
        match command {
            Command::SendPlane(channel) => {
                let (height, width) = protocol::decode_dimensions([args[0], args[1], args[2], args[3]]);
                let (width, height) = (width as u32, height as u32);
                if width == 0 || height == 0 {
                    return Parser::Command;
                }
                Parser::Payload {
                    channel,
                    width,
                    height,
                    samples: Vec::with_capacity((width as usize) * (height as usize)),
                }
            }
            Command::ReceivePlane(channel) => {
                let frame_len = self.settings.frame_len();
                let mut bytes = match &self.state.planes[channel_index(channel)] {
                    Some(plane) => plane.samples.clone(),
                    None => Vec::new(),
                };
                if bytes.len() != frame_len {
                    tracing::debug!("simulator resizing {} B plane to {frame_len} B", bytes.len());
                    bytes.resize(frame_len, 0);
                }
                self.outbox.extend(bytes);
                Parser::Command
            }
            Command::RunPipeline => {
                self.run();
                Parser::Command
            }
            Command::ReadResult(slot) => {
                let word = self.state.registers[slot.index() as usize];
                self.outbox.extend(word.to_be_bytes());
                Parser::Command
            }
        }
    }

    fn store(&mut self, channel: Channel, width: u32, height: u32, samples: Vec<u8>) {
        match Plane::from_samples(width, height, samples) {
            Ok(plane) => self.state.planes[channel_index(channel)] = Some(plane),
            Err(e) => tracing::warn!("simulator dropped plane on channel {channel}: {e}"),
        }
    }

    fn run(&mut self) {
        self.state.runs += 1;
        self.busy = Busy::Running {
            idle_left: self.settings.idle_polls,
            busy_left: self.settings.busy_polls,
        };

        let Some(image) = self.frame() else {
            tracing::warn!("simulator run without a complete RGB frame");
            self.state.registers = [0; 4];
            self.state.last_report = None;
            return;
        };

        let (report, mask) = analyze_with_mask(&image, &self.settings.params);
        self.state.planes[channel_index(Channel::Red)] = Some(mask.into_plane());
        self.state.registers = [
            report.area,
            report.perimeter,
            report.peak_count,
            report.label.code(),
        ];
        tracing::debug!("simulator classified frame as {}", report.label);
        self.state.last_report = Some(report);
    }

    fn frame(&self) -> Option<RgbImage> {
        let [red, green, blue] = &self.state.planes;
        let (red, green, blue) = (red.as_ref()?, green.as_ref()?, blue.as_ref()?);
        let dims = (red.width, red.height);
        if (green.width, green.height) != dims || (blue.width, blue.height) != dims {
            return None;
        }
        Some(RgbImage {
            red: red.clone(),
            green: green.clone(),
            blue: blue.clone(),
        })
    }

    fn next_out(&mut self) -> u8 {
        if let Some(b) = self.outbox.pop_front() {
            return b;
        }
        let Busy::Running {
            idle_left,
            busy_left,
        } = self.busy
        else {
            return 0;
        };
        match self.settings.stall {
            Stall::NeverStarts => 0,
            _ if idle_left > 0 => {
                self.busy = Busy::Running {
                    idle_left: idle_left - 1,
                    busy_left,
                };
                0
            }
            Stall::NeverFinishes => BUSY_FLAG,
            Stall::None if busy_left > 0 => {
                self.busy = Busy::Running {
                    idle_left,
                    busy_left: busy_left - 1,
                };
                BUSY_FLAG
            }
            Stall::None => {
                self.busy = Busy::Off;
                0
            }
        }
    }
}

fn channel_index(channel: Channel) -> usize {
    channel.bits() as usize - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResultSlot;

    #[test]
    fn test_upload_is_stored_per_channel() {
        let mut sim = SimulatedAccelerator::default();
        let mut bytes = protocol::send_plane_header(Channel::Green, 2, 3).to_vec();
        bytes.extend([1, 2, 3, 4, 5, 6, SYNC]);
        sim.send_bytes(&bytes).unwrap();

        let state = sim.snapshot();
        let plane = state.planes[1].as_ref().unwrap();
        assert_eq!((plane.width, plane.height), (3, 2));
        assert_eq!(plane.samples, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(state.commands, vec![Command::SendPlane(Channel::Green)]);
    }

    #[test]
    fn test_download_matches_frame_geometry() {
        let mut sim = SimulatedAccelerator::new(SimulatorSettings {
            frame_width: 2,
            frame_height: 2,
            ..Default::default()
        });
        let mut bytes = protocol::send_plane_header(Channel::Red, 2, 3).to_vec();
        bytes.extend([1, 2, 3, 4, 5, 6, SYNC]);
        bytes.extend(protocol::receive_plane_header(Channel::Red));
        sim.send_bytes(&bytes).unwrap();

        let mut plane = [0u8; 4];
        sim.receive_bytes(&mut plane).unwrap();
        assert_eq!(plane, [1, 2, 3, 4]);

        // Nothing of the larger upload is left queued ahead of the result.
        sim.send_bytes(&[SYNC]).unwrap();
        sim.send_bytes(&protocol::read_result_header(ResultSlot::Area))
            .unwrap();
        let mut word = [0xFFu8; 4];
        sim.receive_bytes(&mut word).unwrap();
        assert_eq!(word, [0, 0, 0, 0]);
    }

    #[test]
    fn test_short_upload_is_padded_on_download() {
        let mut sim = SimulatedAccelerator::new(SimulatorSettings {
            frame_width: 4,
            frame_height: 2,
            ..Default::default()
        });
        let mut bytes = protocol::send_plane_header(Channel::Blue, 1, 3).to_vec();
        bytes.extend([9, 8, 7, SYNC]);
        bytes.extend(protocol::receive_plane_header(Channel::Blue));
        sim.send_bytes(&bytes).unwrap();

        let mut plane = [0xFFu8; 8];
        sim.receive_bytes(&mut plane).unwrap();
        assert_eq!(plane, [9, 8, 7, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_busy_sequence() {
        let mut sim = SimulatedAccelerator::new(SimulatorSettings {
            idle_polls: 2,
            busy_polls: 2,
            ..Default::default()
        });
        sim.send_bytes(&protocol::run_pipeline_header()).unwrap();
        let mut polls = [0u8; 6];
        sim.receive_bytes(&mut polls).unwrap();
        assert_eq!(polls, [0, 0, BUSY_FLAG, BUSY_FLAG, 0, 0]);
    }

    #[test]
    fn test_incomplete_frame_zeroes_registers() {
        let mut sim = SimulatedAccelerator::default();
        sim.send_bytes(&protocol::run_pipeline_header()).unwrap();
        sim.send_bytes(&[SYNC]).unwrap();
        sim.send_bytes(&protocol::read_result_header(ResultSlot::Classification))
            .unwrap();
        // Queued result bytes are served ahead of busy polls.
        let mut word = [0xFFu8; 4];
        sim.receive_bytes(&mut word).unwrap();
        assert_eq!(word, [0, 0, 0, 0]);
        assert_eq!(sim.snapshot().runs, 1);
        assert!(sim.last_report().is_none());
    }
}
