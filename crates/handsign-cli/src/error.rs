use std::io;
use std::path::PathBuf;

use handsign_link::LinkError;

use crate::image_loader::ImageLoadError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Image(#[from] ImageLoadError),
    #[error("accelerator link: {0}")]
    Link(#[from] LinkError),
    #[error("invalid pipeline parameters in {}: {source}", path.display())]
    Params {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("interrupted")]
    Interrupted,
}
