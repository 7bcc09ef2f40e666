//! Unpack, patch, extend, repack.

use log::debug;

use crate::error::{Error, Result};
use crate::page::{self, FrameWarning, PageFormat};
use crate::patch::{self, Layout};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patched {
    /// The repacked container.
    pub container: Vec<u8>,
    /// Problems found in the input container.
    pub warnings: Vec<FrameWarning>,
    /// Length of the original raw image.
    pub raw_len: usize,
    /// Length of the raw image after the alternate firmware was appended.
    pub extended_len: usize,
}

/// Runs the whole transformation on an in-memory container.
///
/// Warnings about the input container do not stop the run; they are handed
/// back in [`Patched::warnings`].
pub fn patch_container(
    container: &[u8],
    stub: &[u8],
    payload: &[u8],
    format: PageFormat,
    layout: &Layout,
) -> Result<Patched> {
    let unpacked = page::unpack(container, format)?;
    let raw_len = unpacked.data.len();
    debug!(
        "unpacked {} frames into {:#x} bytes ({} warnings)",
        unpacked.frames,
        raw_len,
        unpacked.warnings.len()
    );

    let patched = patch::patch(&unpacked.data, stub, layout)?;
    // patch() never resizes; invariant check only
    if patched.len() != raw_len {
        return Err(Error::LengthChanged {
            expected: raw_len,
            actual: patched.len(),
        });
    }
    debug!(
        "wrote {:#x} byte stub at {:#x}",
        stub.len(),
        layout.shellcode_location
    );

    let extended = patch::extend_with_fw(patched, payload, layout)?;
    if extended.len() <= layout.alt_fw_location {
        return Err(Error::BoundaryNotExceeded {
            boundary: layout.alt_fw_location,
            actual: extended.len(),
        });
    }
    debug!(
        "placed {:#x} byte payload at {:#x}, image now {:#x} bytes",
        payload.len(),
        layout.alt_fw_location,
        extended.len()
    );

    let container = page::pack(&extended, format);
    debug!("packed {:#x} bytes of container", container.len());

    Ok(Patched {
        container,
        warnings: unpacked.warnings,
        raw_len,
        extended_len: extended.len(),
    })
}
