//! DCOM object references and ORPC envelopes
//!
//! This crate encodes and decodes the parts of a DCOM call that sit between
//! the RPC PDU and the method's own arguments, following MS-DCOM:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              ORPC envelope layer (this crate)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ORPCTHIS / ORPCTHAT  │  OBJREF_STANDARD  │  Causality ids  │
//! │  - version, flags     │  - STDOBJREF      │  - per thread   │
//! │  - extension chains   │  - resolver addrs │  - scoped       │
//! ├─────────────────────────────────────────────────────────────┤
//! │     NDR runtime (midl-ndr): primitives, deferred pointers   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **OXID**: Object Exporter ID - identifies an apartment/process
//! - **OID**: Object ID - identifies an object within an exporter
//! - **IPID**: Interface Pointer ID - identifies an interface on an object
//! - **Causality id**: correlates the calls of one logical call chain,
//!   nested callbacks included
//!
//! Transport, activation and pinging are left to the caller. Every codec
//! here is a synchronous transform over a caller-supplied buffer.

pub mod causality;
pub mod config;
pub mod types;

pub use config::{ExtensionLayout, OrpcConfig};
pub use types::{
    DcomError, ErrorKind, Result,
    Oxid, Oid, Ipid,
    StdObjRef, InterfacePointer, ObjRefKind, marshal_flags,
    ResolverAddressList, StringBinding, SecurityBinding,
    OrpcThis, OrpcThat, ComVersion, ExtensionRecord,
};

/// DCOM version written by default
pub const DCOM_VERSION: ComVersion = ComVersion::DCOM_5_7;
