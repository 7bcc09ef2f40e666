//! Tools for modifying FLIR TG165 firmware update images.
//!
//! Update images are split into checksummed pages (see [`page`]). To run an
//! alternate firmware, the image is unpacked, a short stub is written at a
//! fixed offset to jump into the alternate firmware, the alternate firmware
//! is appended past the end of the stock one, and the whole thing is packed
//! back up. [`pipeline::patch_container`] does all of that in one go.

pub mod error;
pub mod page;
pub mod patch;
pub mod pipeline;

pub use error::{Error, Result};
pub use page::{pack, unpack, FrameWarning, PageFormat, Unpacked};
pub use patch::{extend_with_fw, patch, Layout};
pub use pipeline::{patch_container, Patched};
