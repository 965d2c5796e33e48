//! NDR pointer representation
//!
//! Unique (`[unique]`) and full (`[ptr]`) pointers occupy a 4-byte referent
//! ID at the point where they appear: 0 for null, any other value for a
//! present referent. Embedded pointers do not carry their referent inline;
//! the referent is written later, once the enclosing construct is complete.
//! See [`crate::deferred`] for the worklist that orders those referents.

use crate::{NdrContext, Result};
use bytes::{Buf, BufMut};
use std::fmt;

/// Referent ID of a null pointer
pub const NULL_REFERENT_ID: u32 = 0;

/// First referent ID handed out by [`ReferentIds`], matching what Windows
/// stubs emit.
pub const FIRST_REFERENT_ID: u32 = 0x0002_0000;

/// Index of a referent inside an [`NdrGraph`](crate::NdrGraph).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// Position of the referent in wire (worklist) order
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot#{}", self.0)
    }
}

/// Hands out referent IDs in encounter order.
///
/// IDs are never reused within one message: this layer does not alias
/// referents, every non-null pointer gets a fresh one.
#[derive(Debug, Clone)]
pub struct ReferentIds {
    next: u32,
}

impl ReferentIds {
    pub fn new() -> Self {
        Self {
            next: FIRST_REFERENT_ID,
        }
    }

    /// Next unused referent ID
    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(4);
        if self.next == NULL_REFERENT_ID {
            self.next = FIRST_REFERENT_ID;
        }
        id
    }
}

impl Default for ReferentIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a pointer's inline referent ID (4-aligned)
pub fn write_referent_id<B: BufMut>(buf: &mut B, ctx: &NdrContext, position: &mut usize, referent_id: u32) {
    ctx.write_u32(buf, position, referent_id);
}

/// Read a pointer's inline referent ID, `None` for a null pointer
pub fn read_referent_id<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Option<u32>> {
    let referent_id = ctx.read_u32(buf, position)?;
    if referent_id == NULL_REFERENT_ID {
        Ok(None)
    } else {
        Ok(Some(referent_id))
    }
}
