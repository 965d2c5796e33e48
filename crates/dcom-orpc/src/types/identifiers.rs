//! DCOM identifier types (MS-DCOM 2.2.18)
//!
//! These are the core identifiers carried by an object reference:
//! - OXID: Object Exporter Identifier
//! - OID: Object Identifier
//! - IPID: Interface Pointer Identifier
//!
//! OXIDs and OIDs are opaque octets assigned by the exporter. They are
//! copied to and from the wire verbatim and only ever compared by bytes.

use bytes::{Buf, BufMut};
use midl_ndr::{NdrContext, NdrDecode, NdrEncode, Result};
use std::fmt;
use uuid::Uuid;

/// Generate a new random v4 UUID
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

fn random_octets() -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&Uuid::new_v4().as_bytes()[..8]);
    out
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub [u8; 8]);

        impl $name {
            /// Size in bytes
            pub const SIZE: usize = 8;

            pub fn new(octets: [u8; 8]) -> Self {
                Self(octets)
            }

            /// Random identifier, for exporters that mint their own
            pub fn generate() -> Self {
                Self(random_octets())
            }

            pub fn as_bytes(&self) -> &[u8; 8] {
                &self.0
            }
        }

        impl NdrEncode for $name {
            fn ndr_encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
                ctx.write_bytes(buf, position, &self.0);
                Ok(())
            }
        }

        impl NdrDecode for $name {
            fn ndr_decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
                Ok(Self(ctx.read_array(buf, position)?))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "("))?;
                write_hex(f, &self.0)?;
                write!(f, ")")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_hex(f, &self.0)
            }
        }
    };
}

opaque_id!(
    /// Object Exporter Identifier (8 bytes)
    ///
    /// Names the exporting apartment. The importer hands it to the OXID
    /// resolver to obtain RPC bindings.
    Oxid,
    "OXID"
);

opaque_id!(
    /// Object Identifier (8 bytes)
    ///
    /// Names a COM object within an object exporter.
    Oid,
    "OID"
);

/// Interface Pointer Identifier (16 bytes / UUID)
///
/// Uniquely identifies an interface pointer on a specific object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ipid(pub Uuid);

impl Ipid {
    /// Size of IPID in bytes (16 bytes, same as UUID)
    pub const SIZE: usize = 16;

    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn generate() -> Self {
        Self(generate_uuid())
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn uuid(&self) -> &Uuid {
        &self.0
    }
}

impl NdrEncode for Ipid {
    fn ndr_encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        self.0.ndr_encode(buf, ctx, position)
    }
}

impl NdrDecode for Ipid {
    fn ndr_decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
        Uuid::ndr_decode(buf, ctx, position).map(Self)
    }
}

impl fmt::Debug for Ipid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPID({})", self.0)
    }
}

impl fmt::Display for Ipid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
