//! Byte transports the link drives.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Default spidev transfer buffer size.
pub const DEFAULT_MAX_TRANSFER: usize = 4096;

/// A half-duplex byte pipe to the accelerator.
///
/// Reads clock out null bytes, so the device sees `0x00` on every receive.
pub trait Transport {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn receive_bytes(&mut self, buf: &mut [u8]) -> io::Result<()>;

    fn receive_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.receive_bytes(&mut byte)?;
        Ok(byte[0])
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send_bytes(bytes)
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).receive_bytes(buf)
    }
}

/// Linux `spidev` character device (`/dev/spidevB.C`).
///
/// Uses plain `read`/`write`, which the driver maps onto half-duplex
/// transfers using the bus mode and clock already configured on the device.
pub struct SpidevTransport {
    path: PathBuf,
    file: File,
    max_transfer: usize,
}

impl SpidevTransport {
    pub fn open(path: impl AsRef<Path>, max_transfer: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        tracing::info!("Opened SPI device {} (max transfer {max_transfer} B)", path.display());
        Ok(Self {
            path,
            file,
            max_transfer: max_transfer.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for SpidevTransport {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for chunk in bytes.chunks(self.max_transfer) {
            self.file.write_all(chunk)?;
        }
        Ok(())
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        for chunk in buf.chunks_mut(self.max_transfer) {
            self.file.read_exact(chunk)?;
        }
        Ok(())
    }
}
