//! Capture session: exclusive owner of the accelerator link.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use handsign_core::{FrameReport, Plane, RgbImage};
use handsign_link::{
    AcceleratorLink, Channel, LinkError, SimulatedAccelerator, SimulatorSettings, SpidevTransport,
    Transport,
};

use crate::config::AppConfig;
use crate::error::CliError;

type BoxedTransport = Box<dyn Transport + Send>;

/// One open link to the accelerator. Dropping the session closes the link
/// on every exit path, including errors and interrupts.
pub struct CaptureSession {
    link: AcceleratorLink<BoxedTransport>,
}

impl CaptureSession {
    /// Open the configured spidev device, or an in-process simulator when
    /// `simulate` is set. `abort` is polled between payload chunks and
    /// completion polls.
    pub fn open(config: &AppConfig, simulate: bool, abort: Arc<AtomicBool>) -> Result<Self, CliError> {
        let transport: BoxedTransport = if simulate {
            tracing::info!("Using simulated accelerator");
            Box::new(SimulatedAccelerator::new(SimulatorSettings {
                params: config.params.clone(),
                frame_width: config.link.frame_width,
                frame_height: config.link.frame_height,
                ..SimulatorSettings::default()
            }))
        } else {
            Box::new(SpidevTransport::open(&config.link.device, config.link.max_transfer)?)
        };
        let link = AcceleratorLink::new(transport, config.link.clone()).with_abort_flag(abort);
        Ok(Self { link })
    }

    /// Upload a frame, run the accelerator pipeline and read its report.
    pub fn classify(&mut self, image: &RgbImage) -> Result<FrameReport, CliError> {
        self.link.send_rgb(image).map_err(interrupted)?;
        self.link.run_pipeline().map_err(interrupted)?;
        self.link.read_report().map_err(interrupted)
    }

    /// Download a plane for inspection.
    pub fn fetch_plane(&mut self, channel: Channel) -> Result<Plane, CliError> {
        self.link.receive_plane(channel).map_err(interrupted)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        tracing::debug!("Closing capture session");
        if let Err(e) = self.link.close() {
            tracing::warn!("failed to close accelerator link: {e}");
        }
    }
}

fn interrupted(e: LinkError) -> CliError {
    match e {
        LinkError::Aborted => CliError::Interrupted,
        other => CliError::Link(other),
    }
}
