//! Verbatim copy of a default volume (text) file next to a generated kit.
use std::fs;
use std::path::Path;

use log::{error, info};

use crate::error::{LadderError, Result};

/// Copy the bytes of `input` to a new file at `output`, whatever their encoding.
///
/// An unreadable source or an uncreatable destination is logged and returned; nothing is
/// written when the source cannot be read.
pub fn copy_volume_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<()> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let bytes = fs::read(input).map_err(|source| {
        error!("Could not read {} for default volume", input.display());
        LadderError::Unreadable { path: input.to_path_buf(), source }
    })?;
    fs::write(output, &bytes).map_err(|source| {
        error!("Could not create {}", output.display());
        LadderError::Unwritable { path: output.to_path_buf(), source }
    })?;
    info!("copied {} to {}", input.display(), output.display());
    Ok(())
}
