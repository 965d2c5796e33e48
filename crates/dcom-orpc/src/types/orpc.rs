//! ORPC (Object RPC) header types (MS-DCOM 2.2.13)
//!
//! These structures precede the arguments of every ORPC request and the
//! results of every response.

use super::extension::{chain_referent_limit, chain_to_graph, extension_chain_shape, graph_to_chain, ExtensionRecord};
use super::identifiers::generate_uuid;
use crate::causality;
use crate::config::{ExtensionLayout, OrpcConfig};
use crate::types::{DcomError, Result};
use bytes::{Buf, BufMut};
use midl_ndr::{DeferredDecoder, DeferredEncoder, NdrContext, NdrDecode, NdrEncode, ReferentIds};
use tracing::{debug, warn};
use uuid::Uuid;

/// ORPC flags (MS-DCOM 2.2.13.1)
pub mod orpc_flags {
    pub const ORPCF_NULL: u32 = 0x00;
    /// Call is local to this machine
    pub const ORPCF_LOCAL: u32 = 0x01;
    pub const ORPCF_RESERVED1: u32 = 0x02;
    pub const ORPCF_RESERVED2: u32 = 0x04;
    pub const ORPCF_RESERVED3: u32 = 0x08;
    pub const ORPCF_RESERVED4: u32 = 0x10;

    /// Values an ORPCTHAT may carry
    pub const ACCEPTED: [u32; 6] = [
        ORPCF_NULL,
        ORPCF_LOCAL,
        ORPCF_RESERVED1,
        ORPCF_RESERVED2,
        ORPCF_RESERVED3,
        ORPCF_RESERVED4,
    ];
}

/// COM version structure (MS-DCOM 2.2.11)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ComVersion {
    pub major: u16,
    pub minor: u16,
}

impl ComVersion {
    /// Size in bytes
    pub const SIZE: usize = 4;

    /// DCOM version 5.1 (Windows 2000)
    pub const DCOM_5_1: Self = Self { major: 5, minor: 1 };
    /// DCOM version 5.4 (Windows XP/2003)
    pub const DCOM_5_4: Self = Self { major: 5, minor: 4 };
    /// DCOM version 5.6 (Windows Vista)
    pub const DCOM_5_6: Self = Self { major: 5, minor: 6 };
    /// DCOM version 5.7 (Windows 7)
    pub const DCOM_5_7: Self = Self { major: 5, minor: 7 };

    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl NdrEncode for ComVersion {
    fn ndr_encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> midl_ndr::Result<()> {
        ctx.write_u16(buf, position, self.major);
        ctx.write_u16(buf, position, self.minor);
        Ok(())
    }
}

impl NdrDecode for ComVersion {
    fn ndr_decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> midl_ndr::Result<Self> {
        Ok(Self {
            major: ctx.read_u16(buf, position)?,
            minor: ctx.read_u16(buf, position)?,
        })
    }
}

fn encode_extensions<B: BufMut>(
    extensions: Option<&[ExtensionRecord]>,
    buf: &mut B,
    ctx: &NdrContext,
    position: &mut usize,
    ids: &mut ReferentIds,
) -> Result<()> {
    let graph = chain_to_graph(extensions)?;
    let shape = extension_chain_shape();
    DeferredEncoder::new(*ctx, &graph).encode_with_ids(buf, position, &shape, ids)?;
    Ok(())
}

fn encode_extensions_flat<B: BufMut>(
    extensions: Option<&[ExtensionRecord]>,
    buf: &mut B,
    ctx: &NdrContext,
    position: &mut usize,
) -> Result<()> {
    let records = match extensions {
        Some(records) if !records.is_empty() => records,
        _ => {
            ctx.write_u32(buf, position, 0);
            return Ok(());
        }
    };
    let count = u32::try_from(records.len()).map_err(|_| DcomError::InvalidData("too many extensions".to_string()))?;
    ctx.write_u32(buf, position, count);
    ctx.write_u32(buf, position, 0);
    for record in records {
        record.id.ndr_encode(buf, ctx, position)?;
        ctx.write_u32(buf, position, record.size()?);
        ctx.write_bytes(buf, position, &record.data);
    }
    Ok(())
}

fn decode_extensions<B: Buf>(
    buf: &mut B,
    ctx: &NdrContext,
    position: &mut usize,
    config: &OrpcConfig,
) -> Result<Option<Vec<ExtensionRecord>>> {
    let shape = extension_chain_shape();
    let graph = DeferredDecoder::new(*ctx)
        .with_referent_limit(chain_referent_limit(config.max_extensions))
        .decode(buf, position, &shape)?;
    let chain = graph_to_chain(&graph, config.max_extensions)?;
    if let Some(records) = &chain {
        debug!(count = records.len(), "decoded ORPC extensions");
    }
    Ok(chain)
}

/// ORPCTHIS structure (MS-DCOM 2.2.13.3)
///
/// Sent with every ORPC request from client to server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrpcThis {
    pub version: ComVersion,
    pub flags: u32,
    /// Reserved, written as 0
    pub reserved: u32,
    /// Causality ID (UUID identifying the call chain)
    pub causality_id: Uuid,
    /// `None` is a null pointer on the wire, distinct from an empty chain
    pub extensions: Option<Vec<ExtensionRecord>>,
}

impl OrpcThis {
    /// Size without extensions: version, flags, reserved, causality id
    pub const MIN_SIZE: usize = 4 + 4 + 4 + 16;

    /// Header for a new call chain
    pub fn new() -> Self {
        Self::with_causality(generate_uuid())
    }

    /// Header for a new call chain, stamped with the configured version
    pub fn with_config(config: &OrpcConfig) -> Self {
        Self {
            version: config.com_version,
            ..Self::new()
        }
    }

    pub fn with_causality(causality_id: Uuid) -> Self {
        Self {
            version: ComVersion::DCOM_5_7,
            flags: orpc_flags::ORPCF_NULL,
            reserved: 0,
            causality_id,
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<ExtensionRecord>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Causality id that [`OrpcThis::encode`] writes on this thread: the
    /// inbound call's id while one is being serviced, otherwise our own.
    pub fn effective_causality_id(&self) -> Uuid {
        causality::current_inbound().unwrap_or(self.causality_id)
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        self.encode_with(buf, ctx, position, &OrpcConfig::default())
    }

    /// Encode with the extension layout from `config`
    pub fn encode_with<B: BufMut>(
        &self,
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
        config: &OrpcConfig,
    ) -> Result<()> {
        self.encode_with_ids(buf, ctx, position, config, &mut ReferentIds::new())
    }

    /// Encode as the first part of a stub whose later pointers draw from the
    /// same `ids`, keeping referent IDs unique across the message
    pub fn encode_with_ids<B: BufMut>(
        &self,
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
        config: &OrpcConfig,
        ids: &mut ReferentIds,
    ) -> Result<()> {
        self.version.ndr_encode(buf, ctx, position)?;
        ctx.write_u32(buf, position, self.flags);
        ctx.write_u32(buf, position, 0);
        self.effective_causality_id().ndr_encode(buf, ctx, position)?;

        let extensions = self.extensions.as_deref();
        match config.extension_layout {
            ExtensionLayout::Deferred => encode_extensions(extensions, buf, ctx, position, ids),
            ExtensionLayout::Flat => encode_extensions_flat(extensions, buf, ctx, position),
        }
    }

    /// Decode and record the causality id as this thread's inbound call id
    pub fn decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
        Self::decode_with(buf, ctx, position, &OrpcConfig::default())
    }

    pub fn decode_with<B: Buf>(
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
        config: &OrpcConfig,
    ) -> Result<Self> {
        let version = ComVersion::ndr_decode(buf, ctx, position)?;
        let flags = ctx.read_u32(buf, position)?;
        let _reserved = ctx.read_u32(buf, position)?;
        let causality_id = Uuid::ndr_decode(buf, ctx, position)?;
        let extensions = decode_extensions(buf, ctx, position, config)?;

        causality::set_inbound(causality_id);
        Ok(Self {
            version,
            flags,
            reserved: 0,
            causality_id,
            extensions,
        })
    }
}

impl Default for OrpcThis {
    fn default() -> Self {
        Self::new()
    }
}

/// ORPCTHAT structure (MS-DCOM 2.2.13.4)
///
/// Sent with every ORPC response from server to client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrpcThat {
    flags: u32,
    /// Extensions sent by the server
    pub extensions: Option<Vec<ExtensionRecord>>,
}

impl OrpcThat {
    /// Size without extensions
    pub const MIN_SIZE: usize = 4 + 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Flags reduced to what callers may act on: `ORPCF_LOCAL` when bit 0
    /// is set, `ORPCF_NULL` otherwise. Reserved bits are never exposed.
    pub fn supported_flags(&self) -> u32 {
        if self.flags & orpc_flags::ORPCF_LOCAL != 0 {
            orpc_flags::ORPCF_LOCAL
        } else {
            orpc_flags::ORPCF_NULL
        }
    }

    /// Always `ORPCF_NULL` with no extensions
    pub fn encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        ctx.write_u32(buf, position, orpc_flags::ORPCF_NULL);
        ctx.write_u32(buf, position, 0);
        Ok(())
    }

    pub fn decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
        Self::decode_with(buf, ctx, position, &OrpcConfig::default())
    }

    pub fn decode_with<B: Buf>(
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
        config: &OrpcConfig,
    ) -> Result<Self> {
        let flags = ctx.read_u32(buf, position)?;
        if !orpc_flags::ACCEPTED.contains(&flags) {
            warn!(flags, "ORPCTHAT flags outside the accepted set");
            return Err(DcomError::InvalidOrpcFlags(flags));
        }
        let extensions = decode_extensions(buf, ctx, position, config)?;
        Ok(Self { flags, extensions })
    }
}
