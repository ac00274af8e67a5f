//! Rewindable scratch memory for per-call intermediate buffers.
//!
//! One call does `rewind`, a single `grow` with the call's total, then carves
//! its regions in order. Carving splits the remaining tail of the buffer, so
//! regions of one call can never alias.

use crate::error::{KernelError, Result};
use log::trace;

const ELEM_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug, Default)]
pub struct ScratchArena {
    buf: Vec<f32>,
    cursor: usize,
}

impl ScratchArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.buf.len() * ELEM_BYTES
    }

    pub fn cursor_bytes(&self) -> usize {
        self.cursor
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Makes at least `total_bytes` available. Never shrinks.
    pub fn grow(&mut self, total_bytes: usize) -> Result<()> {
        check_aligned(total_bytes)?;
        if total_bytes > self.capacity_bytes() {
            trace!("scratch: growing {} -> {} bytes", self.capacity_bytes(), total_bytes);
            self.buf.resize(total_bytes / ELEM_BYTES, 0.0);
        }
        Ok(())
    }

    /// Starts handing out regions from the current cursor.
    pub fn carver(&mut self) -> Carver<'_> {
        let ScratchArena { buf, cursor } = self;
        let start = (*cursor / ELEM_BYTES).min(buf.len());
        Carver {
            rest: &mut buf[start..],
            cursor,
        }
    }
}

/// Hands out consecutive, non-overlapping regions of a [`ScratchArena`].
pub struct Carver<'a> {
    rest: &'a mut [f32],
    cursor: &'a mut usize,
}

impl<'a> Carver<'a> {
    /// Takes the next `byte_size` bytes. Zero bytes yields an empty slice.
    pub fn carve(&mut self, byte_size: usize) -> Result<&'a mut [f32]> {
        check_aligned(byte_size)?;
        let len = byte_size / ELEM_BYTES;
        if len > self.rest.len() {
            return Err(KernelError::invariant(format!(
                "scratch carve of {} bytes exceeds the {} bytes left",
                byte_size,
                self.rest.len() * ELEM_BYTES
            )));
        }
        let rest = std::mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(len);
        self.rest = tail;
        *self.cursor += byte_size;
        Ok(head)
    }

    pub fn remaining_bytes(&self) -> usize {
        self.rest.len() * ELEM_BYTES
    }
}

fn check_aligned(bytes: usize) -> Result<()> {
    if bytes % ELEM_BYTES != 0 {
        return Err(KernelError::invariant(format!(
            "scratch size {} is not a multiple of {} bytes",
            bytes, ELEM_BYTES
        )));
    }
    Ok(())
}
