//! State snapshot sequencer.
//!
//! Binary format (little-endian):
//!   [0..4]   Magic: "M03S"
//!   [4..8]   Version: u32
//!   [8..12]  Segment count: u32 (1 + number of CPUs)
//!   [12..16] Data size: u32 (total bytes after header)
//!   [16..]   Segments, each: tag u32, length u32, then `length` bytes
//!
//! Segment 0 is the machine's global state. Segment `cpu + 1` is saved and
//! restored with CPU `cpu` as the active context and its banking re-resolved,
//! so restore order always matches save order.
//!
//! Restore is all-or-nothing: the whole stream is validated against the
//! running machine before anything is applied, and if the machine rejects a
//! segment midway the pre-restore state is put back.

use crate::machine::SnapshotTarget;
use log::{debug, error, warn};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"M03S";
const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 16;
const SEGMENT_HEADER_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("machine has no state to save")]
    Empty,
    #[error("no buffer supplied")]
    NoBuffer,
    #[error("buffer holds {available} bytes, snapshot needs {needed}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("not a save state")]
    BadMagic,
    #[error("unsupported save state version {0}")]
    Version(u32),
    #[error("save state has {found} segments, machine has {expected}")]
    SegmentCount { expected: u32, found: u32 },
    #[error("save state header is truncated")]
    TruncatedHeader,
    #[error("save state is truncated in segment {tag}")]
    Truncated { tag: u32 },
    #[error("save state declares {declared} data bytes, found {found}")]
    LengthMismatch { declared: u32, found: usize },
    #[error("expected segment {expected}, found {found}")]
    OutOfOrder { expected: u32, found: u32 },
    #[error("segment {tag} is {found} bytes, machine expects {expected}")]
    SegmentSize { tag: u32, expected: usize, found: usize },
    #[error("segment {tag} is too large to save ({size} bytes)")]
    TooLarge { tag: u32, size: usize },
    #[error("machine failed on segment {tag}: {reason}")]
    Machine { tag: u32, reason: anyhow::Error },
    #[error("restore failed on segment {tag} and the machine could not be rolled back, reset required: {reason}")]
    Inconsistent { tag: u32, reason: anyhow::Error },
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

// ─── Binary Writer ───────────────────────────────────────────

struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn patch_u32(&mut self, offset: usize, v: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ─── Binary Reader ───────────────────────────────────────────

struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

// ─── Sequencing ──────────────────────────────────────────────

fn segment_count<T: SnapshotTarget + ?Sized>(target: &T) -> u32 {
    target.cpu_count() as u32 + 1
}

/// CPU owning segment `tag`, `None` for the global segment.
fn cpu_of(tag: u32) -> Option<usize> {
    tag.checked_sub(1).map(|cpu| cpu as usize)
}

/// Run `f` with CPU `cpu` as the active context. The context is popped on every path.
fn with_cpu_context<T, R>(target: &mut T, cpu: usize, f: impl FnOnce(&mut T) -> R) -> R
where
    T: SnapshotTarget + ?Sized,
{
    target.push_context(cpu);
    let result = f(target);
    target.pop_context();
    result
}

fn payload_size<T: SnapshotTarget + ?Sized>(target: &T) -> usize {
    (0..segment_count(target))
        .map(|tag| target.segment_size(tag))
        .sum()
}

/// Exact length of the stream [`serialize`] would produce, 0 when the machine has no state.
pub fn snapshot_size<T: SnapshotTarget + ?Sized>(target: &T) -> usize {
    let payload = payload_size(target);
    if payload == 0 {
        return 0;
    }
    let segments = segment_count(target) as usize;
    HEADER_SIZE + segments * SEGMENT_HEADER_SIZE + payload
}

fn write_segment<T: SnapshotTarget + ?Sized>(target: &mut T, tag: u32, w: &mut StateWriter) -> Result<()> {
    let size = target.segment_size(tag);
    let len = u32::try_from(size).map_err(|_| SnapshotError::TooLarge { tag, size })?;
    w.write_u32(tag);
    w.write_u32(len);

    let start = w.len();
    target
        .save_segment(tag, &mut w.buf)
        .map_err(|reason| SnapshotError::Machine { tag, reason })?;
    let found = w.len() - start;
    if found != size {
        return Err(SnapshotError::SegmentSize {
            tag,
            expected: size,
            found,
        });
    }
    Ok(())
}

/// Capture the full machine state.
///
/// Any failure aborts the whole capture; no partial stream is returned.
pub fn serialize<T: SnapshotTarget + ?Sized>(target: &mut T) -> Result<Vec<u8>> {
    if payload_size(target) == 0 {
        return Err(SnapshotError::Empty);
    }
    let count = segment_count(target);
    let mut w = StateWriter::with_capacity(snapshot_size(target));

    w.write_bytes(MAGIC);
    w.write_u32(VERSION);
    w.write_u32(count);
    w.write_u32(0);

    write_segment(target, 0, &mut w)?;
    for tag in 1..count {
        let cpu = tag as usize - 1;
        with_cpu_context(target, cpu, |target| {
            target.reset_banking();
            write_segment(target, tag, &mut w)
        })?;
    }

    let data_len = w.len() - HEADER_SIZE;
    let data_len = u32::try_from(data_len).map_err(|_| SnapshotError::TooLarge {
        tag: 0,
        size: data_len,
    })?;
    w.patch_u32(12, data_len);

    debug!("state: saved {} segments, {} bytes", count, w.len());
    Ok(w.into_bytes())
}

/// Capture into a caller-provided buffer, returning the bytes written.
pub fn serialize_into<T: SnapshotTarget + ?Sized>(target: &mut T, out: &mut [u8]) -> Result<usize> {
    if out.is_empty() {
        return Err(SnapshotError::NoBuffer);
    }
    let bytes = serialize(target)?;
    let available = out.len();
    let dst = out
        .get_mut(..bytes.len())
        .ok_or(SnapshotError::BufferTooSmall {
            needed: bytes.len(),
            available,
        })?;
    dst.copy_from_slice(&bytes);
    Ok(bytes.len())
}

/// A validated segment borrowed from the input stream.
struct Segment<'a> {
    tag: u32,
    data: &'a [u8],
}

/// Check `data` against the running machine without touching it.
fn parse<'a, T: SnapshotTarget + ?Sized>(target: &T, data: &'a [u8]) -> Result<Vec<Segment<'a>>> {
    let mut r = StateReader::new(data);

    let magic = r.read_bytes(4).ok_or(SnapshotError::TruncatedHeader)?;
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let version = r.read_u32().ok_or(SnapshotError::TruncatedHeader)?;
    if version != VERSION {
        return Err(SnapshotError::Version(version));
    }
    let expected = segment_count(target);
    let found = r.read_u32().ok_or(SnapshotError::TruncatedHeader)?;
    if found != expected {
        return Err(SnapshotError::SegmentCount { expected, found });
    }
    let declared = r.read_u32().ok_or(SnapshotError::TruncatedHeader)?;

    let mut segments = Vec::with_capacity(expected as usize);
    for tag in 0..expected {
        let found = r.read_u32().ok_or(SnapshotError::Truncated { tag })?;
        if found != tag {
            return Err(SnapshotError::OutOfOrder { expected: tag, found });
        }
        let len = r.read_u32().ok_or(SnapshotError::Truncated { tag })? as usize;
        let size = target.segment_size(tag);
        if len != size {
            return Err(SnapshotError::SegmentSize {
                tag,
                expected: size,
                found: len,
            });
        }
        let data = r.read_bytes(len).ok_or(SnapshotError::Truncated { tag })?;
        segments.push(Segment { tag, data });
    }

    let data_len = data.len() - HEADER_SIZE;
    if r.remaining() != 0 || declared as usize != data_len {
        return Err(SnapshotError::LengthMismatch {
            declared,
            found: data_len,
        });
    }
    Ok(segments)
}

fn apply<T: SnapshotTarget + ?Sized>(
    target: &mut T,
    segments: &[Segment<'_>],
) -> std::result::Result<(), (u32, anyhow::Error)> {
    for segment in segments {
        let tag = segment.tag;
        let loaded = match cpu_of(tag) {
            None => target.load_segment(tag, segment.data),
            Some(cpu) => with_cpu_context(target, cpu, |target| {
                target.reset_banking();
                target.load_segment(tag, segment.data)
            }),
        };
        loaded.map_err(|reason| (tag, reason))?;
    }
    Ok(())
}

/// Restore the full machine state from `data`.
///
/// On any error the machine is left as it was, except for
/// [`SnapshotError::Inconsistent`], after which it must be reset.
pub fn deserialize<T: SnapshotTarget + ?Sized>(target: &mut T, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(SnapshotError::NoBuffer);
    }
    if payload_size(target) == 0 {
        return Err(SnapshotError::Empty);
    }
    let segments = parse(target, data)?;

    let backup = serialize(target)?;
    let Err((tag, reason)) = apply(target, &segments) else {
        debug!("state: restored {} segments", segments.len());
        return Ok(());
    };

    warn!("state: segment {tag} rejected ({reason}), rolling back");
    let rollback = parse(target, &backup)
        .map_err(anyhow::Error::from)
        .and_then(|segments| apply(target, &segments).map_err(|(_, e)| e));
    match rollback {
        Ok(()) => Err(SnapshotError::Machine { tag, reason }),
        Err(rollback) => {
            error!("state: rollback failed ({rollback}), machine needs a reset");
            Err(SnapshotError::Inconsistent { tag, reason })
        }
    }
}
