//! Deferred-pointer resolution
//!
//! NDR writes an embedded pointer as a referent ID where it occurs and the
//! referent itself only after the enclosing top-level construct. The
//! referent may carry pointers of its own; those referents follow later
//! still. Both directions here keep one worklist of pending pointers:
//!
//! 1. the top-level construct is processed, every non-null embedded pointer
//!    is appended to the worklist;
//! 2. the worklist is drained by index in FIFO order, each referent is
//!    processed at the current stream position and may append more entries.
//!
//! A pointer at the root of a [`DeferredDecoder::decode`] or
//! [`DeferredEncoder::encode`] call is a top-level pointer: its referent
//! follows its referent ID immediately.
//!
//! Every occurrence of a pointer gets its own slot. Two pointers carrying
//! the same referent ID are decoded as two independent referents.

use crate::pointers::{read_referent_id, write_referent_id, ReferentIds, NULL_REFERENT_ID};
use crate::shape::{NdrGraph, NdrShape, NdrValue, Referent};
use crate::{NdrContext, NdrDecode, NdrEncode, NdrError, Result, SlotId, MAX_NDR_ARRAY_ELEMENTS};
use bytes::{Buf, BufMut};
use tracing::trace;
use uuid::Uuid;

/// A pointer whose referent has not been processed yet
#[derive(Debug, Clone, Copy)]
struct PendingPointer<'s> {
    slot: SlotId,
    shape: &'s NdrShape,
}

/// Decodes a shape and every referent reachable from it
pub struct DeferredDecoder<'s> {
    ctx: NdrContext,
    pending: Vec<PendingPointer<'s>>,
    slots: Vec<(u32, Option<NdrValue>)>,
    referent_limit: Option<usize>,
}

impl<'s> DeferredDecoder<'s> {
    pub fn new(ctx: NdrContext) -> Self {
        Self {
            ctx,
            pending: Vec::new(),
            slots: Vec::new(),
            referent_limit: None,
        }
    }

    /// Fail with [`NdrError::AllocationLimitExceeded`] as soon as more than
    /// `limit` non-null pointers are read, before their referents are built.
    pub fn with_referent_limit(mut self, limit: usize) -> Self {
        self.referent_limit = Some(limit);
        self
    }

    /// Decode `shape` at the current position, then drain the worklist.
    pub fn decode<B: Buf>(mut self, buf: &mut B, position: &mut usize, shape: &'s NdrShape) -> Result<NdrGraph> {
        let root = match shape {
            NdrShape::Pointer(target) => match read_referent_id(buf, &self.ctx, position)? {
                None => NdrValue::Pointer(None),
                Some(referent_id) => {
                    let slot = self.allocate(referent_id)?;
                    let value = self.decode_inline(buf, position, target)?;
                    self.slots[slot.0].1 = Some(value);
                    NdrValue::Pointer(Some(slot))
                }
            },
            other => self.decode_inline(buf, position, other)?,
        };

        let mut next = 0;
        while next < self.pending.len() {
            let PendingPointer { slot, shape } = self.pending[next];
            trace!(slot = slot.0, referent_id = self.slots[slot.0].0, "resolving deferred referent");
            let value = self.decode_inline(buf, position, shape)?;
            self.slots[slot.0].1 = Some(value);
            next += 1;
        }

        let mut referents = Vec::with_capacity(self.slots.len());
        for (index, (referent_id, value)) in self.slots.into_iter().enumerate() {
            let value = value.ok_or_else(|| {
                NdrError::ShapeMismatch(format!("slot {} was never resolved", index))
            })?;
            referents.push(Referent { referent_id, value });
        }
        Ok(NdrGraph::from_parts(root, referents))
    }

    fn allocate(&mut self, referent_id: u32) -> Result<SlotId> {
        if let Some(limit) = self.referent_limit {
            if self.slots.len() >= limit {
                return Err(NdrError::AllocationLimitExceeded {
                    requested: self.slots.len() + 1,
                    limit,
                });
            }
        }
        self.slots.push((referent_id, None));
        Ok(SlotId(self.slots.len() - 1))
    }

    fn decode_inline<B: Buf>(&mut self, buf: &mut B, position: &mut usize, shape: &'s NdrShape) -> Result<NdrValue> {
        let ctx = self.ctx;
        Ok(match shape {
            NdrShape::U8 => NdrValue::U8(ctx.read_u8(buf, position)?),
            NdrShape::U16 => NdrValue::U16(ctx.read_u16(buf, position)?),
            NdrShape::U32 => NdrValue::U32(ctx.read_u32(buf, position)?),
            NdrShape::U64 => NdrValue::U64(ctx.read_u64(buf, position)?),
            NdrShape::Guid => NdrValue::Guid(Uuid::ndr_decode(buf, &ctx, position)?),
            NdrShape::Pointer(target) => match read_referent_id(buf, &ctx, position)? {
                None => NdrValue::Pointer(None),
                Some(referent_id) => {
                    let slot = self.allocate(referent_id)?;
                    self.pending.push(PendingPointer { slot, shape: &**target });
                    NdrValue::Pointer(Some(slot))
                }
            },
            NdrShape::ConformantArray(element) => {
                let count = self.read_conformance(buf, position)?;
                NdrValue::Array(self.decode_elements(buf, position, element, count)?)
            }
            NdrShape::Struct(members) => {
                let conformance = match NdrShape::conformant_tail(members) {
                    Some(_) => Some(self.read_conformance(buf, position)?),
                    None => None,
                };
                ctx.read_align(buf, position, shape.alignment())?;

                let mut values = Vec::with_capacity(members.len());
                for (index, member) in members.iter().enumerate() {
                    let is_tail = index + 1 == members.len();
                    match (member, conformance) {
                        (NdrShape::ConformantArray(element), Some(count)) if is_tail => {
                            values.push(NdrValue::Array(self.decode_elements(buf, position, element, count)?));
                        }
                        _ => values.push(self.decode_inline(buf, position, member)?),
                    }
                }
                NdrValue::Struct(values)
            }
        })
    }

    fn read_conformance<B: Buf>(&self, buf: &mut B, position: &mut usize) -> Result<usize> {
        let count = self.ctx.read_u32(buf, position)? as usize;
        if count > MAX_NDR_ARRAY_ELEMENTS {
            return Err(NdrError::AllocationLimitExceeded {
                requested: count,
                limit: MAX_NDR_ARRAY_ELEMENTS,
            });
        }
        Ok(count)
    }

    fn decode_elements<B: Buf>(
        &mut self,
        buf: &mut B,
        position: &mut usize,
        element: &'s NdrShape,
        count: usize,
    ) -> Result<Vec<NdrValue>> {
        // every element takes at least one byte
        if count > buf.remaining() {
            return Err(NdrError::BufferUnderflow {
                needed: count,
                have: buf.remaining(),
            });
        }
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(self.decode_inline(buf, position, element)?);
        }
        Ok(elements)
    }
}

/// What an encode pass wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Referent IDs in the order their referents were written
    pub referent_ids: Vec<u32>,
}

/// Encodes a value tree from an [`NdrGraph`], writing referents in worklist
/// order.
pub struct DeferredEncoder<'g, 's> {
    ctx: NdrContext,
    graph: &'g NdrGraph,
    ids: ReferentIds,
    pending: Vec<(SlotId, u32, &'s NdrShape)>,
}

impl<'g, 's> DeferredEncoder<'g, 's> {
    pub fn new(ctx: NdrContext, graph: &'g NdrGraph) -> Self {
        Self {
            ctx,
            graph,
            ids: ReferentIds::new(),
            pending: Vec::new(),
        }
    }

    /// Encode the graph root as `shape`, then every referent.
    pub fn encode<B: BufMut>(self, buf: &mut B, position: &mut usize, shape: &'s NdrShape) -> Result<EncodeSummary> {
        self.encode_with_ids(buf, position, shape, &mut ReferentIds::new())
    }

    /// Encode drawing referent IDs from `ids`, so several encoders writing
    /// into one message never hand out the same ID twice.
    pub fn encode_with_ids<B: BufMut>(
        mut self,
        buf: &mut B,
        position: &mut usize,
        shape: &'s NdrShape,
        ids: &mut ReferentIds,
    ) -> Result<EncodeSummary> {
        std::mem::swap(&mut self.ids, ids);
        let result = self.encode_all(buf, position, shape);
        std::mem::swap(&mut self.ids, ids);
        result
    }

    fn encode_all<B: BufMut>(&mut self, buf: &mut B, position: &mut usize, shape: &'s NdrShape) -> Result<EncodeSummary> {
        let mut written = Vec::new();
        let graph: &'g NdrGraph = self.graph;
        let root = graph.root();
        match (shape, root) {
            (NdrShape::Pointer(_), NdrValue::Pointer(None)) => {
                write_referent_id(buf, &self.ctx, position, NULL_REFERENT_ID);
            }
            (NdrShape::Pointer(target), NdrValue::Pointer(Some(slot))) => {
                let referent_id = self.ids.allocate();
                write_referent_id(buf, &self.ctx, position, referent_id);
                let value = self.referent(*slot)?;
                self.encode_inline(buf, position, target, value)?;
                written.push(referent_id);
            }
            _ => self.encode_inline(buf, position, shape, root)?,
        }

        let mut next = 0;
        while next < self.pending.len() {
            let (slot, referent_id, shape) = self.pending[next];
            let value = self.referent(slot)?;
            self.encode_inline(buf, position, shape, value)?;
            written.push(referent_id);
            next += 1;
        }

        Ok(EncodeSummary { referent_ids: written })
    }

    fn referent(&self, slot: SlotId) -> Result<&'g NdrValue> {
        let graph: &'g NdrGraph = self.graph;
        graph
            .referent(slot)
            .map(|r| &r.value)
            .ok_or_else(|| NdrError::ShapeMismatch(format!("{:?} is not in the graph", slot)))
    }

    fn encode_inline<B: BufMut>(
        &mut self,
        buf: &mut B,
        position: &mut usize,
        shape: &'s NdrShape,
        value: &'g NdrValue,
    ) -> Result<()> {
        let ctx = self.ctx;
        match (shape, value) {
            (NdrShape::U8, NdrValue::U8(v)) => ctx.write_u8(buf, position, *v),
            (NdrShape::U16, NdrValue::U16(v)) => ctx.write_u16(buf, position, *v),
            (NdrShape::U32, NdrValue::U32(v)) => ctx.write_u32(buf, position, *v),
            (NdrShape::U64, NdrValue::U64(v)) => ctx.write_u64(buf, position, *v),
            (NdrShape::Guid, NdrValue::Guid(v)) => v.ndr_encode(buf, &ctx, position)?,
            (NdrShape::Pointer(_), NdrValue::Pointer(None)) => {
                write_referent_id(buf, &ctx, position, NULL_REFERENT_ID);
            }
            (NdrShape::Pointer(target), NdrValue::Pointer(Some(slot))) => {
                let referent_id = self.ids.allocate();
                write_referent_id(buf, &ctx, position, referent_id);
                self.pending.push((*slot, referent_id, &**target));
            }
            (NdrShape::ConformantArray(element), NdrValue::Array(elements)) => {
                ctx.write_u32(buf, position, conformance(elements)?);
                for e in elements {
                    self.encode_inline(buf, position, element, e)?;
                }
            }
            (NdrShape::Struct(members), NdrValue::Struct(values)) if members.len() == values.len() => {
                let tail = NdrShape::conformant_tail(members).is_some();
                if tail {
                    let count = match values.last() {
                        Some(NdrValue::Array(elements)) => conformance(elements)?,
                        other => {
                            return Err(NdrError::ShapeMismatch(format!(
                                "conformant struct tail is not an array: {:?}",
                                other
                            )))
                        }
                    };
                    ctx.write_u32(buf, position, count);
                }
                ctx.write_align(buf, position, shape.alignment());

                for (index, (member, v)) in members.iter().zip(values).enumerate() {
                    match (member, v) {
                        (NdrShape::ConformantArray(element), NdrValue::Array(elements))
                            if tail && index + 1 == members.len() =>
                        {
                            for e in elements {
                                self.encode_inline(buf, position, element, e)?;
                            }
                        }
                        _ => self.encode_inline(buf, position, member, v)?,
                    }
                }
            }
            (shape, value) => {
                return Err(NdrError::ShapeMismatch(format!(
                    "cannot encode {:?} as {:?}",
                    value, shape
                )))
            }
        }
        Ok(())
    }
}

fn conformance(elements: &[NdrValue]) -> Result<u32> {
    u32::try_from(elements.len()).map_err(|_| NdrError::AllocationLimitExceeded {
        requested: elements.len(),
        limit: u32::MAX as usize,
    })
}
