use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("page size must be nonzero")]
    ZeroPageSize,

    #[error("page size {page_size:#x} is too large")]
    PageSizeTooLarge { page_size: usize },

    #[error("truncated frame at offset {offset:#x}: {len} bytes, need at least a 4-byte header")]
    TruncatedFrame { offset: usize, len: usize },

    #[error("shellcode is empty")]
    EmptyStub,

    #[error(
        "shellcode of {stub_len:#x} bytes at {location:#x} runs past end of image ({image_len:#x} bytes)"
    )]
    StubOutOfBounds {
        location: usize,
        stub_len: usize,
        image_len: usize,
    },

    #[error("patched image length changed: expected {expected:#x}, got {actual:#x}")]
    LengthChanged { expected: usize, actual: usize },

    #[error("image of {image_len:#x} bytes already extends past the alternate firmware location {boundary:#x}")]
    ImageTooLarge { boundary: usize, image_len: usize },

    #[error("extended image of {actual:#x} bytes does not extend past the alternate firmware location {boundary:#x}")]
    BoundaryNotExceeded { boundary: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
