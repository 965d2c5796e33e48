//! ORPC extensions (MS-DCOM 2.2.21.4, 2.2.21.5)
//!
//! On the wire an extension chain is the referent of a unique pointer:
//!
//! ```text
//! [unique] ORPC_EXTENT_ARRAY *extensions;
//!
//! ORPC_EXTENT_ARRAY {
//!     u32 size;
//!     u32 reserved;
//!     [size_is((size + 1) & ~1), unique] ORPC_EXTENT **extent;
//! }
//!
//! ORPC_EXTENT {
//!     GUID id;
//!     u32 size;
//!     [size_is((size + 7) & ~7)] u8 data[];
//! }
//! ```
//!
//! Every pointer in that shape is resolved by the deferred engine, so a
//! record arrives only after the whole array of record pointers.

use crate::types::{DcomError, Result};
use bytes::Bytes;
use midl_ndr::{NdrGraph, NdrShape, NdrValue};
use uuid::Uuid;

/// Well-known extension ids
pub mod extent_ids {
    use uuid::Uuid;

    /// Error information extension
    pub const ERROR_INFO: Uuid = Uuid::from_u128(0x0000_031c_0000_0000_c000_0000_0000_0046);
}

/// One vendor extension carried by ORPCTHIS or ORPCTHAT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionRecord {
    pub id: Uuid,
    pub data: Bytes,
}

impl ExtensionRecord {
    pub fn new(id: Uuid, data: impl Into<Bytes>) -> Self {
        Self { id, data: data.into() }
    }

    /// Declared size of the data
    pub fn size(&self) -> Result<u32> {
        u32::try_from(self.data.len())
            .map_err(|_| DcomError::InvalidData(format!("extension {} is too large", self.id)))
    }
}

/// Number of data octets carried for a record of `size` bytes
pub(crate) fn padded_data_len(size: usize) -> usize {
    (size + 7) & !7
}

/// Number of pointer slots carried for `count` records
pub(crate) fn padded_slot_count(count: usize) -> usize {
    count.saturating_add(1) & !1
}

/// Most non-null pointers a chain of `max_extensions` records can carry:
/// the header, the slot array and one per slot
pub(crate) fn chain_referent_limit(max_extensions: usize) -> usize {
    padded_slot_count(max_extensions).saturating_add(2)
}

/// `[unique] ORPC_EXTENT_ARRAY *`
pub fn extension_chain_shape() -> NdrShape {
    let extent = NdrShape::structure(vec![NdrShape::Guid, NdrShape::U32, NdrShape::bytes()]);
    NdrShape::pointer(NdrShape::structure(vec![
        NdrShape::U32,
        NdrShape::U32,
        NdrShape::pointer(NdrShape::conformant_array(NdrShape::pointer(extent))),
    ]))
}

/// Build the value graph for [`extension_chain_shape`]
pub(crate) fn chain_to_graph(chain: Option<&[ExtensionRecord]>) -> Result<NdrGraph> {
    let mut graph = NdrGraph::new();
    let records = match chain {
        None => return Ok(graph),
        Some(records) => records,
    };

    let mut slots = Vec::with_capacity(padded_slot_count(records.len()));
    for record in records {
        let size = record.size()?;
        let mut data = record.data.to_vec();
        data.resize(padded_data_len(data.len()), 0);
        let extent = graph.insert(NdrValue::Struct(vec![
            NdrValue::Guid(record.id),
            NdrValue::U32(size),
            NdrValue::bytes(&data),
        ]));
        slots.push(NdrValue::Pointer(Some(extent)));
    }
    slots.resize(padded_slot_count(records.len()), NdrValue::Pointer(None));

    let count = u32::try_from(records.len())
        .map_err(|_| DcomError::InvalidData("too many extensions".to_string()))?;
    let array = graph.insert(NdrValue::Array(slots));
    let header = graph.insert(NdrValue::Struct(vec![
        NdrValue::U32(count),
        NdrValue::U32(0),
        NdrValue::Pointer(Some(array)),
    ]));
    graph.set_root(NdrValue::Pointer(Some(header)));
    Ok(graph)
}

fn malformed(what: &str) -> DcomError {
    DcomError::InvalidData(format!("unexpected extension array shape: {}", what))
}

/// Flatten a decoded [`extension_chain_shape`] graph.
///
/// Null record slots are skipped, record data is trimmed to its declared
/// size.
pub(crate) fn graph_to_chain(graph: &NdrGraph, max_extensions: usize) -> Result<Option<Vec<ExtensionRecord>>> {
    let header = match graph.deref(graph.root())? {
        None => return Ok(None),
        Some(header) => header.as_struct().ok_or_else(|| malformed("header"))?,
    };
    let count = header
        .first()
        .and_then(NdrValue::as_u32)
        .ok_or_else(|| malformed("count"))? as usize;
    if count > max_extensions {
        return Err(DcomError::InvalidData(format!(
            "{} extensions exceed the limit of {}",
            count, max_extensions
        )));
    }

    let array_pointer = header.get(2).ok_or_else(|| malformed("array pointer"))?;
    let slots = match graph.deref(array_pointer)? {
        None if count == 0 => return Ok(Some(Vec::new())),
        None => return Err(malformed("array pointer is null")),
        Some(array) => array.as_array().ok_or_else(|| malformed("array"))?,
    };
    if slots.len() < count {
        return Err(malformed("fewer slots than extensions"));
    }

    let mut records = Vec::with_capacity(count);
    for slot in slots {
        let extent = match graph.deref(slot)? {
            None => continue,
            Some(extent) => extent.as_struct().ok_or_else(|| malformed("extent"))?,
        };
        let (id, size, data) = match extent {
            [NdrValue::Guid(id), NdrValue::U32(size), data] => (*id, *size as usize, data),
            _ => return Err(malformed("extent members")),
        };
        let mut data = data.to_bytes().ok_or_else(|| malformed("extent data"))?;
        if data.len() < size {
            return Err(malformed("extent data shorter than its size"));
        }
        data.truncate(size);
        records.push(ExtensionRecord::new(id, data));
    }
    Ok(Some(records))
}
