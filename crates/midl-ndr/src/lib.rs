//! NDR (Network Data Representation) runtime library
//!
//! Wire-level support for the DCE RPC transfer syntax as used by DCOM:
//! aligned primitives, unique pointers and the deferred-referent worklist
//! that orders embedded pointer data.
//!
//! # NDR Wire Format
//!
//! NDR is the standard encoding for DCE RPC data. Key characteristics:
//! - Primitives align to their natural size (1, 2, 4, or 8 bytes)
//! - Structures align to their largest member
//! - Conformant data (arrays with runtime-determined size) comes at the end,
//!   with its element count hoisted in front of the enclosing struct
//! - Embedded pointer referents follow the top-level construct, breadth-first

mod context;
mod decode;
pub mod deferred;
mod encode;
mod error;
pub mod pointers;
mod primitives;
mod shape;

pub use context::NdrContext;
pub use decode::NdrDecode;
pub use deferred::{DeferredDecoder, DeferredEncoder, EncodeSummary};
pub use encode::NdrEncode;
pub use error::{NdrError, Result, MAX_NDR_ARRAY_ELEMENTS};
pub use pointers::{ReferentIds, SlotId, FIRST_REFERENT_ID, NULL_REFERENT_ID};
pub use shape::{NdrGraph, NdrShape, NdrValue, Referent};

/// Re-export bytes for convenience
pub use bytes::{Buf, BufMut, Bytes, BytesMut};
