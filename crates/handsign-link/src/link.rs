//! Command/response session with the accelerator.
//!
//! # State machine
//! ```text
//! Idle ─send_plane─▶ HeaderSent ─▶ PayloadSent ─▶ Idle
//! Idle ─run_pipeline─▶ Polling ─▶ ResultsReady ─read_result32─▶ ResultsReady
//! any ─bus error / timeout / abort mid-frame─▶ Faulted
//! any ─close─▶ Closed
//! ```
//! `ResultsReady` accepts the same commands as `Idle`, so a new frame can
//! be sent once results have been read.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use handsign_core::{FrameReport, Plane, RgbImage};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::protocol::{self, Channel, ResultSlot, SYNC};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    HeaderSent,
    PayloadSent,
    Polling,
    ResultsReady,
    Faulted,
    Closed,
}

/// Which edge of the busy flag `run_pipeline` was waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Waiting for the busy flag to rise.
    Start,
    /// Waiting for it to clear.
    Finish,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start running",
            Self::Finish => "finish",
        })
    }
}

/// Exclusive session over one transport. Dropping the link closes it.
pub struct AcceleratorLink<T: Transport> {
    transport: Option<T>,
    config: LinkConfig,
    state: LinkState,
    abort: Arc<AtomicBool>,
}

impl<T: Transport> AcceleratorLink<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            transport: Some(transport),
            config,
            state: LinkState::Idle,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned abort flag, e.g. one raised by a signal
    /// handler.
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = flag;
        self
    }

    /// Flag that, once set, makes the in-flight operation fail with
    /// [`LinkError::Aborted`] at its next poll or payload chunk.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Upload one plane on `channel`.
    pub fn send_plane(&mut self, plane: &Plane, channel: Channel) -> Result<(), LinkError> {
        self.ensure_ready("send_plane")?;
        let (height, width) = encodable_dimensions(plane)?;
        let max = self.config.frame_budget();
        if plane.len() > max {
            return Err(LinkError::FrameTooLarge {
                len: plane.len(),
                max,
            });
        }
        self.check_abort()?;

        let header = protocol::send_plane_header(channel, height, width);
        self.bus(|t| t.send_bytes(&header))?;
        self.state = LinkState::HeaderSent;

        let chunk = self.config.max_transfer.max(1);
        for part in plane.samples.chunks(chunk) {
            self.check_abort()?;
            self.bus(|t| t.send_bytes(part))?;
        }
        self.state = LinkState::PayloadSent;

        self.bus(|t| t.send_bytes(&[SYNC]))?;
        self.state = LinkState::Idle;
        tracing::debug!("sent {width}x{height} plane on channel {channel}");
        Ok(())
    }

    /// Upload the R, G and B planes on channels 1, 2 and 3.
    pub fn send_rgb(&mut self, image: &RgbImage) -> Result<(), LinkError> {
        let started = Instant::now();
        self.send_plane(&image.red, Channel::Red)?;
        self.send_plane(&image.green, Channel::Green)?;
        self.send_plane(&image.blue, Channel::Blue)?;
        tracing::info!("Sent RGB frame in {:.1?}", started.elapsed());
        Ok(())
    }

    /// Download the plane stored on `channel`, sized by the configured
    /// frame geometry.
    pub fn receive_plane(&mut self, channel: Channel) -> Result<Plane, LinkError> {
        self.ensure_ready("receive_plane")?;
        self.check_abort()?;
        let resume = self.state;

        let header = protocol::receive_plane_header(channel);
        self.bus(|t| t.send_bytes(&header))?;
        self.state = LinkState::HeaderSent;

        let mut samples = vec![0u8; self.config.frame_budget()];
        let chunk = self.config.max_transfer.max(1);
        for part in samples.chunks_mut(chunk) {
            self.check_abort()?;
            self.bus(|t| t.receive_bytes(part))?;
        }

        self.bus(|t| t.send_bytes(&[SYNC]))?;
        self.state = resume;
        let (width, height) = (self.config.frame_width, self.config.frame_height);
        tracing::debug!("received {width}x{height} plane from channel {channel}");
        // Length is frame_budget() by construction.
        Plane::from_samples(width, height, samples).map_err(|_| LinkError::InvalidDimensions { width, height })
    }

    /// Start the accelerator pipeline and block until it reports done.
    ///
    /// Polls single bytes until the busy flag rises, then until it clears,
    /// each phase bounded by the configured [`crate::config::PollPolicy`].
    pub fn run_pipeline(&mut self) -> Result<(), LinkError> {
        self.ensure_ready("run_pipeline")?;
        self.check_abort()?;

        let header = protocol::run_pipeline_header();
        self.bus(|t| t.send_bytes(&header))?;
        self.state = LinkState::Polling;

        let started = Instant::now();
        let start_polls = self.poll_until(PollPhase::Start, started)?;
        let finish_polls = self.poll_until(PollPhase::Finish, started)?;

        self.bus(|t| t.send_bytes(&[SYNC]))?;
        self.state = LinkState::ResultsReady;
        tracing::info!(
            start_polls,
            finish_polls,
            "Accelerator pipeline finished in {:.1?}",
            started.elapsed()
        );
        Ok(())
    }

    /// Read one 32-bit result register.
    pub fn read_result32(&mut self, slot: ResultSlot) -> Result<u32, LinkError> {
        match self.state {
            LinkState::ResultsReady => {}
            LinkState::Closed => return Err(LinkError::Closed),
            LinkState::Faulted => return Err(LinkError::SessionFaulted),
            state => {
                return Err(LinkError::InvalidState {
                    operation: "read_result32",
                    state,
                });
            }
        }
        self.check_abort()?;

        let header = protocol::read_result_header(slot);
        self.bus(|t| t.send_bytes(&header))?;
        let mut word = [0u8; 4];
        self.bus(|t| t.receive_bytes(&mut word))?;
        self.bus(|t| t.send_bytes(&[SYNC]))?;
        Ok(u32::from_be_bytes(word))
    }

    /// Read all four result registers into a report.
    pub fn read_report(&mut self) -> Result<FrameReport, LinkError> {
        let area = self.read_result32(ResultSlot::Area)?;
        let perimeter = self.read_result32(ResultSlot::Perimeter)?;
        let peak_count = self.read_result32(ResultSlot::PeakCount)?;
        let code = self.read_result32(ResultSlot::Classification)?;
        Ok(FrameReport::from_registers(area, perimeter, peak_count, code))
    }

    /// Send the closing sync byte and release the transport. Idempotent.
    pub fn close(&mut self) -> Result<(), LinkError> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        let faulted = self.state == LinkState::Faulted;
        self.state = LinkState::Closed;

        match transport.send_bytes(&[SYNC]) {
            Ok(()) => {
                tracing::debug!("link closed");
                Ok(())
            }
            // The bus already failed once; the session is being torn down anyway.
            Err(e) if faulted => {
                tracing::warn!("closing sync after fault failed: {e}");
                Ok(())
            }
            Err(e) => Err(LinkError::Bus(e)),
        }
    }

    fn ensure_ready(&self, operation: &'static str) -> Result<(), LinkError> {
        match self.state {
            LinkState::Idle | LinkState::ResultsReady => Ok(()),
            LinkState::Closed => Err(LinkError::Closed),
            LinkState::Faulted => Err(LinkError::SessionFaulted),
            state => Err(LinkError::InvalidState { operation, state }),
        }
    }

    /// Fails with `Aborted` once the flag is raised. Mid-frame the bus is
    /// left out of step with the device, so the session faults.
    fn check_abort(&mut self) -> Result<(), LinkError> {
        if !self.abort.load(Ordering::Relaxed) {
            return Ok(());
        }
        if !matches!(self.state, LinkState::Idle | LinkState::ResultsReady) {
            self.state = LinkState::Faulted;
        }
        tracing::warn!("link operation aborted");
        Err(LinkError::Aborted)
    }

    /// Run a transport call, faulting the session on I/O errors.
    fn bus<R>(&mut self, f: impl FnOnce(&mut T) -> io::Result<R>) -> Result<R, LinkError> {
        let transport = self.transport.as_mut().ok_or(LinkError::Closed)?;
        f(transport).map_err(|e| {
            tracing::error!("bus error in state {:?}: {e}", self.state);
            self.state = LinkState::Faulted;
            LinkError::Bus(e)
        })
    }

    fn poll_until(&mut self, phase: PollPhase, started: Instant) -> Result<u32, LinkError> {
        let policy = self.config.poll;
        let deadline = policy.deadline();
        let interval = policy.interval();

        for polls in 1..=policy.max_polls {
            self.check_abort()?;
            let status = self.bus(|t| t.receive_byte())?;
            let done = match phase {
                PollPhase::Start => status != 0,
                PollPhase::Finish => status == 0,
            };
            if done {
                return Ok(polls);
            }
            if deadline.is_some_and(|d| started.elapsed() >= d) {
                return Err(self.timeout(phase, polls));
            }
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        Err(self.timeout(phase, policy.max_polls))
    }

    fn timeout(&mut self, phase: PollPhase, polls: u32) -> LinkError {
        tracing::warn!("accelerator did not {phase} after {polls} polls");
        self.state = LinkState::Faulted;
        LinkError::ProtocolTimeout { phase, polls }
    }
}

impl<T: Transport> Drop for AcceleratorLink<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("failed to close accelerator link: {e}");
        }
    }
}

fn encodable_dimensions(plane: &Plane) -> Result<(u16, u16), LinkError> {
    let invalid = || LinkError::InvalidDimensions {
        width: plane.width,
        height: plane.height,
    };
    let height = u16::try_from(plane.height).map_err(|_| invalid())?;
    let width = u16::try_from(plane.width).map_err(|_| invalid())?;
    if height == 0 || width == 0 {
        return Err(invalid());
    }
    // The header announces width * height payload bytes.
    if plane.samples.len() != usize::from(height) * usize::from(width) {
        return Err(invalid());
    }
    Ok((height, width))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::config::PollPolicy;

    /// Records every written byte and replays a scripted read stream.
    #[derive(Default)]
    struct Script {
        written: Vec<u8>,
        reads: VecDeque<u8>,
        fail_writes: bool,
    }

    impl Transport for Script {
        fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn receive_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
            for b in buf {
                *b = self.reads.pop_front().unwrap_or(0);
            }
            Ok(())
        }
    }

    fn small_config() -> LinkConfig {
        LinkConfig {
            frame_width: 4,
            frame_height: 2,
            max_transfer: 3,
            poll: PollPolicy {
                max_polls: 16,
                interval_us: 0,
                deadline_ms: None,
            },
            ..LinkConfig::default()
        }
    }

    fn written(link: &AcceleratorLink<Script>) -> &[u8] {
        &link.transport.as_ref().unwrap().written
    }

    #[test]
    fn test_send_plane_frames_payload() {
        let mut link = AcceleratorLink::new(Script::default(), small_config());
        let plane = Plane::from_fn(4, 2, |r, c| (r * 4 + c + 1) as u8);
        link.send_plane(&plane, Channel::Blue).unwrap();
        assert_eq!(
            written(&link),
            &[0x00, 0x07, 0x00, 0x02, 0x00, 0x04, 1, 2, 3, 4, 5, 6, 7, 8, 0x00]
        );
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_oversized_and_degenerate_planes_send_nothing() {
        let mut link = AcceleratorLink::new(Script::default(), small_config());
        let big = Plane::filled(5, 2, 0);
        assert!(matches!(
            link.send_plane(&big, Channel::Red),
            Err(LinkError::FrameTooLarge { len: 10, max: 8 })
        ));
        let empty = Plane::filled(0, 2, 0);
        assert!(matches!(
            link.send_plane(&empty, Channel::Red),
            Err(LinkError::InvalidDimensions { width: 0, height: 2 })
        ));
        assert!(written(&link).is_empty());
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_short_sample_buffer_sends_nothing() {
        let mut link = AcceleratorLink::new(Script::default(), small_config());
        let short = Plane {
            width: 4,
            height: 2,
            samples: vec![7; 3],
        };
        assert!(matches!(
            link.send_plane(&short, Channel::Red),
            Err(LinkError::InvalidDimensions { width: 4, height: 2 })
        ));
        assert!(written(&link).is_empty());
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_run_then_read_result() {
        let script = Script {
            // two idle polls, busy, busy, done, then the result word
            reads: VecDeque::from(vec![0, 0, 0x40, 0x40, 0, 0x00, 0x00, 0x21, 0xCC]),
            ..Default::default()
        };
        let mut link = AcceleratorLink::new(script, small_config());
        assert!(matches!(
            link.read_result32(ResultSlot::Area),
            Err(LinkError::InvalidState { state: LinkState::Idle, .. })
        ));

        link.run_pipeline().unwrap();
        assert_eq!(link.state(), LinkState::ResultsReady);
        assert_eq!(link.read_result32(ResultSlot::Area).unwrap(), 8652);
        assert_eq!(
            written(&link),
            &[0x00, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00]
        );
    }

    #[test]
    fn test_stalled_start_times_out() {
        let mut link = AcceleratorLink::new(Script::default(), small_config());
        match link.run_pipeline() {
            Err(LinkError::ProtocolTimeout { phase, polls }) => {
                assert_eq!(phase, PollPhase::Start);
                assert_eq!(polls, 16);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(link.state(), LinkState::Faulted);
        assert!(matches!(
            link.send_plane(&Plane::filled(1, 1, 0), Channel::Red),
            Err(LinkError::SessionFaulted)
        ));
    }

    #[test]
    fn test_bus_error_faults_session() {
        let script = Script {
            fail_writes: true,
            ..Default::default()
        };
        let mut link = AcceleratorLink::new(script, small_config());
        assert!(matches!(link.run_pipeline(), Err(LinkError::Bus(_))));
        assert_eq!(link.state(), LinkState::Faulted);
        assert!(matches!(link.read_report(), Err(LinkError::SessionFaulted)));
        // Closing a faulted link swallows the failed sync.
        link.close().unwrap();
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn test_abort_before_payload() {
        let mut link = AcceleratorLink::new(Script::default(), small_config());
        link.abort_handle().store(true, Ordering::Relaxed);
        assert!(matches!(
            link.send_plane(&Plane::filled(4, 2, 9), Channel::Green),
            Err(LinkError::Aborted)
        ));
        assert!(written(&link).is_empty());
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut link = AcceleratorLink::new(Script::default(), small_config());
        link.close().unwrap();
        link.close().unwrap();
        assert!(matches!(link.run_pipeline(), Err(LinkError::Closed)));
    }

    #[test]
    fn test_receive_plane_uses_frame_geometry() {
        let script = Script {
            reads: (1..=8).collect(),
            ..Default::default()
        };
        let mut link = AcceleratorLink::new(script, small_config());
        let plane = link.receive_plane(Channel::Red).unwrap();
        assert_eq!((plane.width, plane.height), (4, 2));
        assert_eq!(plane.samples, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(written(&link), &[0x00, 0x09, 0x00, 0x00, 0x00]);
    }
}
