//! Core DCOM types (MS-DCOM 2.2)
//!
//! This module contains the data structures of the ORPC envelope:
//! - Identifiers: OXID, OID, IPID
//! - Object references: OBJREF_STANDARD and its STDOBJREF
//! - Resolver addresses: DUALSTRINGARRAY with string and security bindings
//! - ORPC headers: ORPCTHIS, ORPCTHAT and their extensions

mod error;
mod extension;
mod identifiers;
mod objref;
mod orpc;
mod security;
mod stdobjref;
mod stringbinding;

pub use error::*;
pub use extension::{extension_chain_shape, extent_ids, ExtensionRecord};
pub use identifiers::{generate_uuid, Ipid, Oid, Oxid};
pub use objref::*;
pub use orpc::*;
pub use security::*;
pub use stdobjref::*;
pub use stringbinding::*;

/// Well-known interface UUIDs
pub mod iid {
    use uuid::Uuid;

    /// IUnknown interface UUID
    pub const IUNKNOWN: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_c000_0000_0000_0046);
    /// IDispatch interface UUID
    pub const IDISPATCH: Uuid = Uuid::from_u128(0x0002_0400_0000_0000_c000_0000_0000_0046);
}
