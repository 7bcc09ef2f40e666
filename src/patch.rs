//! Fixed-offset shellcode injection and alternate firmware placement.

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub shellcode_location: usize,
    pub alt_fw_location: usize,
    pub fill_byte: u8,
}

impl Layout {
    /// TG165 stock firmware.
    pub const TG165: Layout = Layout {
        shellcode_location: 0x36b4,
        alt_fw_location: 0x4_0000,
        fill_byte: 0xff,
    };
}

impl Default for Layout {
    fn default() -> Self {
        Self::TG165
    }
}

pub fn patch(raw: &[u8], stub: &[u8], layout: &Layout) -> Result<Vec<u8>> {
    if stub.is_empty() {
        return Err(Error::EmptyStub);
    }

    let start = layout.shellcode_location;
    let end = start
        .checked_add(stub.len())
        .filter(|&end| end <= raw.len())
        .ok_or(Error::StubOutOfBounds {
            location: start,
            stub_len: stub.len(),
            image_len: raw.len(),
        })?;

    let mut patched = raw.to_vec();
    patched[start..end].copy_from_slice(stub);
    Ok(patched)
}

// Reaching past alt_fw_location is the caller's check.
pub fn extend_with_fw(mut patched: Vec<u8>, payload: &[u8], layout: &Layout) -> Result<Vec<u8>> {
    let boundary = layout.alt_fw_location;
    if patched.len() > boundary {
        return Err(Error::ImageTooLarge {
            boundary,
            image_len: patched.len(),
        });
    }

    patched.reserve(boundary - patched.len() + payload.len());
    patched.resize(boundary, layout.fill_byte);
    patched.extend_from_slice(payload);
    Ok(patched)
}
