//! STDOBJREF structure (MS-DCOM 2.2.18.2)
//!
//! Standard Object Reference - the core structure that identifies
//! a marshaled interface pointer.

use super::identifiers::{Ipid, Oid, Oxid};
use bytes::{Buf, BufMut};
use midl_ndr::{NdrContext, NdrDecode, NdrEncode, Result};

/// STDOBJREF flags (SORF_*)
///
/// SORF_OXRES1..8 belong to the exporter. Importers ignore them and do not
/// enforce must-be-zero.
pub mod flags {
    /// Convenient for initializing flags
    pub const SORF_NULL: u32 = 0x00000000;
    /// Reserved for the exporter
    pub const SORF_OXRES1: u32 = 0x00000001;
    /// Reserved for the exporter
    pub const SORF_OXRES2: u32 = 0x00000020;
    /// Reserved for the exporter
    pub const SORF_OXRES3: u32 = 0x00000040;
    /// Reserved for the exporter
    pub const SORF_OXRES4: u32 = 0x00000080;
    /// Reserved for the exporter
    pub const SORF_OXRES5: u32 = 0x00000100;
    /// Reserved for the exporter
    pub const SORF_OXRES6: u32 = 0x00000200;
    /// Reserved for the exporter
    pub const SORF_OXRES7: u32 = 0x00000400;
    /// Reserved for the exporter
    pub const SORF_OXRES8: u32 = 0x00000800;
    /// Pinging is not required
    pub const SORF_NOPING: u32 = 0x00001000;
}

/// Standard Object Reference (40 bytes)
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StdObjRef {
    /// SORF_* flags
    pub flags: u32,
    /// Number of public references carried by this reference
    pub public_refs: i32,
    /// Object Exporter ID (identifies the apartment/process)
    pub oxid: Oxid,
    /// Object ID (identifies the object within the exporter)
    pub oid: Oid,
    /// Interface Pointer ID (identifies the interface on the object)
    pub ipid: Ipid,
}

impl StdObjRef {
    /// Size in bytes (4 + 4 + 8 + 8 + 16 = 40)
    pub const SIZE: usize = 40;

    pub fn new(oxid: Oxid, oid: Oid, ipid: Ipid, public_refs: i32) -> Self {
        Self {
            flags: flags::SORF_NULL,
            public_refs,
            oxid,
            oid,
            ipid,
        }
    }

    /// Create a STDOBJREF that doesn't require pinging
    pub fn new_noping(oxid: Oxid, oid: Oid, ipid: Ipid, public_refs: i32) -> Self {
        Self {
            flags: flags::SORF_NOPING,
            ..Self::new(oxid, oid, ipid, public_refs)
        }
    }

    /// Check if this reference requires pinging for GC
    pub fn requires_pinging(&self) -> bool {
        (self.flags & flags::SORF_NOPING) == 0
    }
}

impl NdrEncode for StdObjRef {
    fn ndr_encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        ctx.write_u32(buf, position, self.flags);
        ctx.write_i32(buf, position, self.public_refs);
        self.oxid.ndr_encode(buf, ctx, position)?;
        self.oid.ndr_encode(buf, ctx, position)?;
        self.ipid.ndr_encode(buf, ctx, position)
    }
}

impl NdrDecode for StdObjRef {
    fn ndr_decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
        Ok(Self {
            flags: ctx.read_u32(buf, position)?,
            public_refs: ctx.read_i32(buf, position)?,
            oxid: Oxid::ndr_decode(buf, ctx, position)?,
            oid: Oid::ndr_decode(buf, ctx, position)?,
            ipid: Ipid::ndr_decode(buf, ctx, position)?,
        })
    }
}
