//! Type descriptors and decoded values for the deferred-pointer engine
//!
//! [`NdrShape`] describes what is on the wire; [`NdrValue`] is what was read
//! (or what should be written). Pointer values do not own their referent:
//! they hold a [`SlotId`] into the [`NdrGraph`] that came out of the same
//! decode, so a referent discovered late in the stream never has to be
//! patched back into the tree that references it.

use crate::{NdrError, Result, SlotId};
use uuid::Uuid;

/// Wire shape of an NDR construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdrShape {
    U8,
    U16,
    U32,
    U64,
    Guid,
    /// Members in declaration order. A trailing [`NdrShape::ConformantArray`]
    /// makes this a conformant struct: its element count is hoisted in front
    /// of the struct.
    Struct(Vec<NdrShape>),
    /// `max_count: u32` followed by the elements
    ConformantArray(Box<NdrShape>),
    /// Unique/full pointer: a referent ID inline, the referent deferred
    Pointer(Box<NdrShape>),
}

impl NdrShape {
    pub fn pointer(target: NdrShape) -> Self {
        Self::Pointer(Box::new(target))
    }

    pub fn conformant_array(element: NdrShape) -> Self {
        Self::ConformantArray(Box::new(element))
    }

    pub fn structure(members: Vec<NdrShape>) -> Self {
        Self::Struct(members)
    }

    /// Byte array with a `size_is` conformance
    pub fn bytes() -> Self {
        Self::conformant_array(Self::U8)
    }

    /// NDR alignment of this construct
    pub fn alignment(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::Guid | Self::Pointer(_) => 4,
            Self::U64 => 8,
            Self::ConformantArray(element) => element.alignment().max(4),
            Self::Struct(members) => members
                .iter()
                .map(|m| match m {
                    // only the element alignment counts once the count is hoisted
                    Self::ConformantArray(element) => element.alignment(),
                    other => other.alignment(),
                })
                .max()
                .unwrap_or(1),
        }
    }

    /// Element shape of the trailing conformant array, if `members` form a
    /// conformant struct.
    pub(crate) fn conformant_tail(members: &[NdrShape]) -> Option<&NdrShape> {
        match members.last() {
            Some(Self::ConformantArray(element)) => Some(element),
            _ => None,
        }
    }
}

/// A value laid out according to an [`NdrShape`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdrValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Guid(Uuid),
    Struct(Vec<NdrValue>),
    Array(Vec<NdrValue>),
    /// `None` is a null pointer
    Pointer(Option<SlotId>),
}

impl NdrValue {
    /// Byte array value
    pub fn bytes(data: &[u8]) -> Self {
        Self::Array(data.iter().copied().map(Self::U8).collect())
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            Self::Guid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[NdrValue]> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[NdrValue]> {
        match self {
            Self::Array(elements) => Some(elements),
            _ => None,
        }
    }

    /// `Some(None)` for a null pointer, `None` if this is not a pointer
    pub fn as_pointer(&self) -> Option<Option<SlotId>> {
        match self {
            Self::Pointer(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Collect a byte array value, `None` if any element is not a `U8`
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.as_array()?
            .iter()
            .map(|e| match e {
                Self::U8(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

/// One resolved referent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referent {
    /// ID the referent was announced with (assigned on encode)
    pub referent_id: u32,
    pub value: NdrValue,
}

/// A top-level value plus every referent reachable from it, stored in wire
/// (worklist) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdrGraph {
    root: NdrValue,
    referents: Vec<Referent>,
}

impl NdrGraph {
    /// Empty graph whose root is a null pointer
    pub fn new() -> Self {
        Self {
            root: NdrValue::Pointer(None),
            referents: Vec::new(),
        }
    }

    pub(crate) fn from_parts(root: NdrValue, referents: Vec<Referent>) -> Self {
        Self { root, referents }
    }

    /// Add a referent and return the slot a pointer value can name.
    pub fn insert(&mut self, value: NdrValue) -> SlotId {
        self.referents.push(Referent {
            referent_id: 0,
            value,
        });
        SlotId(self.referents.len() - 1)
    }

    pub fn set_root(&mut self, root: NdrValue) {
        self.root = root;
    }

    pub fn root(&self) -> &NdrValue {
        &self.root
    }

    pub fn referent(&self, slot: SlotId) -> Option<&Referent> {
        self.referents.get(slot.0)
    }

    /// All referents in wire order
    pub fn referents(&self) -> &[Referent] {
        &self.referents
    }

    /// Follow a pointer value. `Ok(None)` for a null pointer.
    pub fn deref(&self, pointer: &NdrValue) -> Result<Option<&NdrValue>> {
        match pointer.as_pointer() {
            Some(None) => Ok(None),
            Some(Some(slot)) => self
                .referent(slot)
                .map(|r| Some(&r.value))
                .ok_or_else(|| NdrError::ShapeMismatch(format!("{:?} is not in this graph", slot))),
            None => Err(NdrError::ShapeMismatch(format!(
                "expected a pointer, found {:?}",
                pointer
            ))),
        }
    }

    /// Referents announced with `referent_id`. Without aliasing support a
    /// peer that repeats an ID yields one independent referent per slot.
    pub fn find_by_referent_id(&self, referent_id: u32) -> impl Iterator<Item = &Referent> {
        self.referents
            .iter()
            .filter(move |r| r.referent_id == referent_id)
    }
}

impl Default for NdrGraph {
    fn default() -> Self {
        Self::new()
    }
}
