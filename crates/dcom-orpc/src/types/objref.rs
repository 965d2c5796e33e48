//! OBJREF structure (MS-DCOM 2.2.18)
//!
//! A marshaled interface pointer travels as `MInterfacePointer`: a unique
//! pointer to `{ ulCntData, abData[ulCntData] }` where `abData` holds the
//! OBJREF itself.
//!
//! ```text
//! referent id: u32                 // 0 = no interface pointer
//! length: u32, length: u32         // ulCntData and its conformance
//! signature: "MEOW"
//! flags: u32                       // OBJREF_STANDARD
//! iid: GUID
//! std: STDOBJREF
//! saResAddr: DUALSTRINGARRAY
//! ```
//!
//! Only OBJREF_STANDARD is materialized. Handler and custom references are
//! reported as [`DcomError::UnsupportedObjRefKind`].

use super::identifiers::{Ipid, Oid, Oxid};
use super::stdobjref::StdObjRef;
use super::stringbinding::ResolverAddressList;
use crate::types::{iid, DcomError, Result};
use bytes::{Buf, BufMut};
use midl_ndr::{NdrContext, NdrDecode, NdrEncode, ReferentIds, NULL_REFERENT_ID};
use midl_ndr::pointers::{read_referent_id, write_referent_id};
use tracing::{debug, warn};
use uuid::Uuid;

/// OBJREF signature, "MEOW" in wire order
pub const OBJREF_SIGNATURE: [u8; 4] = *b"MEOW";

/// OBJREF flags indicating the variant type
pub mod objref_flags {
    /// Standard reference (STDOBJREF + DUALSTRINGARRAY)
    pub const OBJREF_STANDARD: u32 = 0x00000001;
    /// Handler reference (STDOBJREF + CLSID + DUALSTRINGARRAY)
    pub const OBJREF_HANDLER: u32 = 0x00000002;
    /// Custom marshaling (CLSID + extension + data)
    pub const OBJREF_CUSTOM: u32 = 0x00000004;
}

/// Flag words that select between the interface-pointer wire variants
pub mod marshal_flags {
    /// Default layout
    pub const FLAG_NULL: u32 = 0;
    /// Write the IUnknown IID instead of the reference's own
    pub const USE_IUNKNOWN_IID: u32 = 0x0000_0200;
    /// Write the IDispatch IID instead of the reference's own
    pub const USE_IDISPATCH_IID: u32 = 0x0000_0400;
    /// No referent id and no length pair in front of the signature
    pub const INTERFACEPTR_DECODE2: u32 = 0x0000_0800;
    /// Write a bare zero in place of the interface pointer
    pub const NULL_FOR_VARIANT: u32 = 0x0000_1000;
}

/// OBJREF variant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjRefKind {
    Standard,
    Handler,
    Custom,
}

impl ObjRefKind {
    pub fn from_wire(flags: u32) -> Option<Self> {
        match flags {
            objref_flags::OBJREF_STANDARD => Some(Self::Standard),
            objref_flags::OBJREF_HANDLER => Some(Self::Handler),
            objref_flags::OBJREF_CUSTOM => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            Self::Standard => objref_flags::OBJREF_STANDARD,
            Self::Handler => objref_flags::OBJREF_HANDLER,
            Self::Custom => objref_flags::OBJREF_CUSTOM,
        }
    }
}

/// Marshaled interface pointer carrying an OBJREF_STANDARD
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfacePointer {
    iid: Uuid,
    std: StdObjRef,
    resolver: ResolverAddressList,
    wire_length: u32,
}

impl InterfacePointer {
    /// Bytes of an OBJREF_STANDARD in front of the resolver address list:
    /// STDOBJREF, signature, flags and IID.
    pub const FIXED_LENGTH: usize = StdObjRef::SIZE + 4 + 4 + 16;

    pub fn new(iid: Uuid, std: StdObjRef, resolver: ResolverAddressList) -> Self {
        let wire_length = Self::compute_length(&resolver);
        Self {
            iid,
            std,
            resolver,
            wire_length,
        }
    }

    /// Reference exported through the local resolver on `port`
    pub fn with_tcp_port<S: AsRef<str>>(iid: Uuid, hosts: &[S], port: u16, std: StdObjRef) -> Self {
        Self::new(iid, std, ResolverAddressList::for_tcp_port(hosts, port))
    }

    /// Same object and bindings as `other`, viewed through interface `iid`
    pub fn requalified(iid: Uuid, other: &InterfacePointer) -> Self {
        Self::new(iid, other.std.clone(), other.resolver.clone())
    }

    fn compute_length(resolver: &ResolverAddressList) -> u32 {
        // a resolver list is at most 4 + 2 * u16::MAX bytes
        (Self::FIXED_LENGTH + resolver.length()) as u32
    }

    pub fn iid(&self) -> Uuid {
        self.iid
    }

    pub fn kind(&self) -> ObjRefKind {
        ObjRefKind::Standard
    }

    pub fn std_obj_ref(&self) -> &StdObjRef {
        &self.std
    }

    pub fn ipid(&self) -> Ipid {
        self.std.ipid
    }

    pub fn oid(&self) -> Oid {
        self.std.oid
    }

    pub fn oxid(&self) -> Oxid {
        self.std.oxid
    }

    pub fn resolver_addresses(&self) -> &ResolverAddressList {
        &self.resolver
    }

    /// OBJREF length as read from the wire, or as it will be written
    pub fn wire_length(&self) -> u32 {
        self.wire_length
    }

    /// Whether both references live in the same exporter
    pub fn is_oxid_equal(a: &InterfacePointer, b: &InterfacePointer) -> bool {
        a.std.oxid.as_bytes() == b.std.oxid.as_bytes()
    }

    /// Decode a marshaled interface pointer. `Ok(None)` for a null pointer.
    pub fn decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize, flags: u32) -> Result<Option<Self>> {
        if flags & marshal_flags::INTERFACEPTR_DECODE2 != 0 {
            return Self::decode_body(buf, ctx, position, None).map(Some);
        }

        if read_referent_id(buf, ctx, position)?.is_none() {
            return Ok(None);
        }
        let length = ctx.read_u32(buf, position)?;
        let max_count = ctx.read_u32(buf, position)?;
        if length != max_count {
            warn!(length, max_count, "OBJREF length pair disagrees");
        }
        Self::decode_body(buf, ctx, position, Some(length)).map(Some)
    }

    fn decode_body<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize, length: Option<u32>) -> Result<Self> {
        let signature: [u8; 4] = ctx.read_array(buf, position)?;
        if signature != OBJREF_SIGNATURE {
            warn!(?signature, "OBJREF signature mismatch");
            return Err(DcomError::InvalidObjRef(format!(
                "invalid signature: expected {:02x?}, got {:02x?}",
                OBJREF_SIGNATURE, signature
            )));
        }

        let flags = ctx.read_u32(buf, position)?;
        debug!(flags, kind = ?ObjRefKind::from_wire(flags), "decoding OBJREF");
        if ObjRefKind::from_wire(flags) != Some(ObjRefKind::Standard) {
            warn!(flags, "unsupported OBJREF kind");
            return Err(DcomError::UnsupportedObjRefKind(flags));
        }

        let iid = Uuid::ndr_decode(buf, ctx, position)?;
        let std = StdObjRef::ndr_decode(buf, ctx, position)?;
        let resolver = ResolverAddressList::decode(buf, ctx, position)?;
        let wire_length = length.unwrap_or_else(|| Self::compute_length(&resolver));

        Ok(Self {
            iid,
            std,
            resolver,
            wire_length,
        })
    }

    /// Encode as a marshaled interface pointer.
    ///
    /// The length pair is recomputed from the resolver address list. The
    /// outer pointer takes the first referent ID of a fresh message.
    pub fn encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize, flags: u32) -> Result<()> {
        self.encode_with_ids(buf, ctx, position, flags, &mut ReferentIds::new())
    }

    /// Encode with the outer pointer's referent ID taken from `ids`
    pub fn encode_with_ids<B: BufMut>(
        &self,
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
        flags: u32,
        ids: &mut ReferentIds,
    ) -> Result<()> {
        if flags & marshal_flags::NULL_FOR_VARIANT != 0 {
            ctx.write_u32(buf, position, 0);
            return Ok(());
        }

        if flags & marshal_flags::INTERFACEPTR_DECODE2 == 0 {
            let length = Self::compute_length(&self.resolver);
            write_referent_id(buf, ctx, position, ids.allocate());
            ctx.write_u32(buf, position, length);
            ctx.write_u32(buf, position, length);
        }

        let iid = if flags & marshal_flags::USE_IUNKNOWN_IID != 0 {
            iid::IUNKNOWN
        } else if flags & marshal_flags::USE_IDISPATCH_IID != 0 {
            iid::IDISPATCH
        } else {
            self.iid
        };

        ctx.write_bytes(buf, position, &OBJREF_SIGNATURE);
        ctx.write_u32(buf, position, objref_flags::OBJREF_STANDARD);
        iid.ndr_encode(buf, ctx, position)?;
        self.std.ndr_encode(buf, ctx, position)?;
        self.resolver.encode(buf, ctx, position)
    }

    /// Encode an optional interface pointer, a null referent id for `None`
    pub fn encode_optional<B: BufMut>(
        pointer: Option<&InterfacePointer>,
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
        flags: u32,
        ids: &mut ReferentIds,
    ) -> Result<()> {
        match pointer {
            Some(pointer) => pointer.encode_with_ids(buf, ctx, position, flags, ids),
            None => {
                write_referent_id(buf, ctx, position, NULL_REFERENT_ID);
                Ok(())
            }
        }
    }
}
