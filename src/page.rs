//! TG165 container frames: `crc16 (LE) | 00 00 | payload`. The last payload
//! may be short.

use std::fmt;

use crc_any::CRCu16;

use crate::error::{Error, Result};

pub const CRC_SIZE: usize = 2;
pub const PAD_SIZE: usize = 2;
pub const HEADER_SIZE: usize = CRC_SIZE + PAD_SIZE;

pub const DEFAULT_PAGE_SIZE: usize = 1024;

const PADDING: [u8; PAD_SIZE] = [0; PAD_SIZE];

/// CRC-16/XMODEM: poly 0x1021, init 0, unreflected, no final XOR.
pub fn checksum(data: &[u8]) -> u16 {
    let mut c = CRCu16::crc16xmodem();
    c.digest(data);
    c.get_crc()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageFormat {
    page_size: usize,
}

impl PageFormat {
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::ZeroPageSize);
        }
        // frame_size() must not overflow
        if page_size > usize::MAX - HEADER_SIZE {
            return Err(Error::PageSizeTooLarge { page_size });
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn frame_size(&self) -> usize {
        HEADER_SIZE + self.page_size
    }

    /// Container length `pack` produces for `raw_len` raw bytes.
    pub fn framed_len(&self, raw_len: usize) -> usize {
        raw_len + HEADER_SIZE * raw_len.div_ceil(self.page_size)
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    pub checksum: u16,
    pub padding: [u8; PAD_SIZE],
    pub data: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn parse(chunk: &'a [u8], offset: usize) -> Result<Self> {
        if chunk.len() < HEADER_SIZE {
            return Err(Error::TruncatedFrame {
                offset,
                len: chunk.len(),
            });
        }
        let (crc, rest) = chunk.split_at(CRC_SIZE);
        let (pad, data) = rest.split_at(PAD_SIZE);
        Ok(Self {
            checksum: u16::from_le_bytes([crc[0], crc[1]]),
            padding: [pad[0], pad[1]],
            data,
        })
    }

    pub fn padding_ok(&self) -> bool {
        self.padding == PADDING
    }

    pub fn computed_checksum(&self) -> u16 {
        checksum(self.data)
    }

    pub fn is_valid(&self) -> bool {
        self.padding_ok() && self.checksum == self.computed_checksum()
    }
}

/// Yields `(offset, frame)` pairs.
pub fn frames(
    container: &[u8],
    format: PageFormat,
) -> impl Iterator<Item = Result<(usize, Frame<'_>)>> {
    let frame_size = format.frame_size();
    container
        .chunks(frame_size)
        .enumerate()
        .map(move |(i, chunk)| {
            let offset = i * frame_size;
            Frame::parse(chunk, offset).map(|f| (offset, f))
        })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarningKind {
    BadPadding { found: [u8; PAD_SIZE] },
    ChecksumMismatch { stored: u16, computed: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameWarning {
    pub index: usize,
    pub offset: usize,
    pub kind: WarningKind,
}

impl fmt::Display for FrameWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {} (offset {:#x}): ", self.index, self.offset)?;
        match self.kind {
            WarningKind::BadPadding { found } => write!(
                f,
                "data format error, expected padding 0x0000, got 0x{:02x}{:02x}",
                found[0], found[1]
            ),
            WarningKind::ChecksumMismatch { stored, computed } => write!(
                f,
                "CRC mismatch, stored {:#06x}, computed {:#06x}",
                stored, computed
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unpacked {
    pub data: Vec<u8>,
    pub warnings: Vec<FrameWarning>,
    pub frames: usize,
}

impl Unpacked {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Bad padding and checksum mismatches become warnings, not errors; the
/// payload is kept either way.
pub fn unpack(container: &[u8], format: PageFormat) -> Result<Unpacked> {
    let mut out = Unpacked {
        data: Vec::with_capacity(container.len()),
        ..Unpacked::default()
    };

    for (index, frame) in frames(container, format).enumerate() {
        let (offset, frame) = frame?;

        if !frame.padding_ok() {
            out.warnings.push(FrameWarning {
                index,
                offset,
                kind: WarningKind::BadPadding {
                    found: frame.padding,
                },
            });
        }

        let computed = frame.computed_checksum();
        if frame.checksum != computed {
            out.warnings.push(FrameWarning {
                index,
                offset,
                kind: WarningKind::ChecksumMismatch {
                    stored: frame.checksum,
                    computed,
                },
            });
        }

        out.data.extend_from_slice(frame.data);
        out.frames += 1;
    }

    Ok(out)
}

pub fn pack(raw: &[u8], format: PageFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(format.framed_len(raw.len()));
    for data in raw.chunks(format.page_size()) {
        out.extend(checksum(data).to_le_bytes());
        out.extend(PADDING);
        out.extend_from_slice(data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn xmodem_check_value() {
        assert_eq!(checksum(b"123456789"), 0x31c3);
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn pack_layout() {
        let raw = pattern(1500);
        let packed = pack(&raw, PageFormat::default());
        assert_eq!(packed.len(), 1500 + 2 * HEADER_SIZE);

        let crc0 = checksum(&raw[..1024]).to_le_bytes();
        assert_eq!(&packed[0..2], &crc0);
        assert_eq!(&packed[2..4], &[0, 0]);
        assert_eq!(&packed[4..1028], &raw[..1024]);

        let crc1 = checksum(&raw[1024..]).to_le_bytes();
        assert_eq!(&packed[1028..1030], &crc1);
        assert_eq!(&packed[1030..1032], &[0, 0]);
        assert_eq!(&packed[1032..], &raw[1024..]);
    }

    #[test]
    fn pack_empty() {
        assert!(pack(&[], PageFormat::default()).is_empty());
        let unpacked = unpack(&[], PageFormat::default()).unwrap();
        assert!(unpacked.data.is_empty());
        assert_eq!(unpacked.frames, 0);
    }

    #[test]
    fn framed_len_counts_short_page() {
        let f = PageFormat::default();
        assert_eq!(f.framed_len(0), 0);
        assert_eq!(f.framed_len(1), 5);
        assert_eq!(f.framed_len(1024), 1028);
        assert_eq!(f.framed_len(1025), 1025 + 8);
    }

    #[test]
    fn repack_is_identity_for_valid_container() {
        let f = PageFormat::default();
        let container = pack(&pattern(3000), f);
        let unpacked = unpack(&container, f).unwrap();
        assert!(unpacked.is_clean());
        assert_eq!(unpacked.frames, 3);
        assert!(frames(&container, f).all(|r| r.unwrap().1.is_valid()));
        assert_eq!(pack(&unpacked.data, f), container);
    }

    #[test]
    fn bad_padding_is_reported_not_fatal() {
        let f = PageFormat::default();
        let raw = pattern(2048);
        let mut container = pack(&raw, f);
        container[1028 + 2] = 0x00;
        container[1028 + 3] = 0x01;

        let unpacked = unpack(&container, f).unwrap();
        assert_eq!(unpacked.data, raw);
        assert_eq!(
            unpacked.warnings,
            vec![FrameWarning {
                index: 1,
                offset: 1028,
                kind: WarningKind::BadPadding { found: [0x00, 0x01] },
            }]
        );
    }

    #[test]
    fn checksum_mismatch_is_reported_not_fatal() {
        let f = PageFormat::default();
        let raw = pattern(1024);
        let mut container = pack(&raw, f);
        let good = checksum(&raw);
        container[0] ^= 0xff;

        let unpacked = unpack(&container, f).unwrap();
        assert_eq!(unpacked.data, raw);
        assert_eq!(unpacked.warnings.len(), 1);
        assert_eq!(
            unpacked.warnings[0].kind,
            WarningKind::ChecksumMismatch {
                stored: good ^ 0x00ff,
                computed: good,
            }
        );
    }

    #[test]
    fn header_only_trailer_is_an_empty_frame() {
        let f = PageFormat::default();
        let mut container = pack(&pattern(1024), f);
        container.extend([0, 0, 0, 0]);

        let unpacked = unpack(&container, f).unwrap();
        assert!(unpacked.is_clean());
        assert_eq!(unpacked.frames, 2);
        assert_eq!(unpacked.data.len(), 1024);
    }

    #[test]
    fn truncated_header_is_fatal() {
        let f = PageFormat::default();
        let mut container = pack(&pattern(1024), f);
        container.extend([0x12, 0x34, 0x00]);

        assert_eq!(
            unpack(&container, f),
            Err(Error::TruncatedFrame {
                offset: 1028,
                len: 3
            })
        );
    }

    #[test]
    fn custom_page_size() {
        let f = PageFormat::new(16).unwrap();
        let raw = pattern(40);
        let container = pack(&raw, f);
        assert_eq!(container.len(), 40 + 3 * HEADER_SIZE);
        assert_eq!(unpack(&container, f).unwrap().data, raw);
        assert_eq!(PageFormat::new(0), Err(Error::ZeroPageSize));
    }

    #[test]
    fn oversized_page_size_is_rejected() {
        assert_eq!(
            PageFormat::new(usize::MAX),
            Err(Error::PageSizeTooLarge {
                page_size: usize::MAX
            })
        );
        let largest = PageFormat::new(usize::MAX - HEADER_SIZE).unwrap();
        assert_eq!(largest.frame_size(), usize::MAX);
        let unpacked = unpack(&[0, 0, 0, 0, 1], largest).unwrap();
        assert_eq!(unpacked.data, [1]);
    }

    #[test]
    fn warning_display() {
        let w = FrameWarning {
            index: 2,
            offset: 2056,
            kind: WarningKind::ChecksumMismatch {
                stored: 0x1234,
                computed: 0xabcd,
            },
        };
        assert_eq!(
            w.to_string(),
            "frame 2 (offset 0x808): CRC mismatch, stored 0x1234, computed 0xabcd"
        );
    }
}
