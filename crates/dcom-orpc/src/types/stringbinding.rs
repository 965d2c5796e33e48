//! String bindings and the resolver address list (MS-DCOM 2.2.19)
//!
//! The resolver address list (DUALSTRINGARRAY) tells an importer how to
//! reach the OXID resolver of the exporting machine:
//!
//! ```text
//! wNumEntries: u16             // total u16 units in aStringArray
//! wSecurityOffset: u16         // unit index where security bindings start
//! aStringArray: u16[wNumEntries]
//!   string bindings   { wTowerId, aNetworkAddr\0 }* \0
//!   security bindings { wAuthnSvc, wAuthzSvc, aPrincName\0 }* \0
//! ```
//!
//! A section without entries is written as two zero units.

use super::security::{authn_svc, SecurityBinding, COM_C_AUTHZ_NONE};
use crate::types::{DcomError, Result};
use bytes::{Buf, BufMut, Bytes};
use midl_ndr::NdrContext;
use std::fmt;
use tracing::debug;

/// Protocol tower identifiers (from dcerpc EPM)
pub mod protocol_id {
    /// TCP/IP protocol
    pub const NCACN_IP_TCP: u16 = 0x07;
    /// Named pipes protocol
    pub const NCACN_NP: u16 = 0x0F;
    /// HTTP protocol
    pub const NCACN_HTTP: u16 = 0x1F;
    /// Local RPC
    pub const NCALRPC: u16 = 0x10;
}

/// String binding (MS-DCOM 2.2.19.3)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringBinding {
    /// Tower ID (protocol sequence)
    pub tower_id: u16,
    /// Network address, optionally followed by `[port]`
    pub network_addr: String,
}

impl StringBinding {
    pub fn new(tower_id: u16, network_addr: impl Into<String>) -> Self {
        Self {
            tower_id,
            network_addr: network_addr.into(),
        }
    }

    /// TCP/IP binding, `host[port]` when a port is given
    pub fn tcp(host: &str, port: Option<u16>) -> Self {
        let network_addr = match port {
            Some(port) => format!("{}[{}]", host, port),
            None => host.to_string(),
        };
        Self::new(protocol_id::NCACN_IP_TCP, network_addr)
    }

    /// Named pipe binding
    pub fn named_pipe(pipe_name: &str) -> Self {
        Self::new(protocol_id::NCACN_NP, pipe_name)
    }

    /// Host part of the network address
    pub fn host(&self) -> &str {
        match self.network_addr.find('[') {
            Some(i) => &self.network_addr[..i],
            None => &self.network_addr,
        }
    }

    /// Port in the `host[port]` form, if any
    pub fn port(&self) -> Option<u16> {
        let open = self.network_addr.find('[')?;
        let close = self.network_addr.rfind(']')?;
        self.network_addr.get(open + 1..close)?.parse().ok()
    }

    /// Encoded size in 16-bit units: tower id, address, terminator
    pub fn units(&self) -> usize {
        1 + self.network_addr.encode_utf16().count() + 1
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        if self.tower_id == 0 {
            return Err(DcomError::InvalidStringBinding(
                "tower id 0 is reserved for the section terminator".to_string(),
            ));
        }
        if self.network_addr.contains('\0') {
            return Err(DcomError::InvalidStringBinding(
                "network address contains a NUL".to_string(),
            ));
        }
        ctx.write_u16(buf, position, self.tower_id);
        for unit in self.network_addr.encode_utf16() {
            ctx.write_u16(buf, position, unit);
        }
        ctx.write_u16(buf, position, 0);
        Ok(())
    }

    /// Decode one binding. `Ok(None)` when the section terminator is read.
    pub fn decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Option<Self>> {
        let tower_id = ctx.read_u16(buf, position)?;
        if tower_id == 0 {
            return Ok(None);
        }

        let mut units = Vec::new();
        loop {
            let unit = ctx.read_u16(buf, position)?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        let network_addr = String::from_utf16(&units)
            .map_err(|_| DcomError::InvalidStringBinding("invalid UTF-16 string".to_string()))?;

        Ok(Some(Self {
            tower_id,
            network_addr,
        }))
    }
}

impl fmt::Display for StringBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = match self.tower_id {
            protocol_id::NCACN_IP_TCP => "ncacn_ip_tcp",
            protocol_id::NCACN_NP => "ncacn_np",
            protocol_id::NCACN_HTTP => "ncacn_http",
            protocol_id::NCALRPC => "ncalrpc",
            _ => "unknown",
        };
        write!(f, "{}:{}", proto, self.network_addr)
    }
}

/// Resolver address list (DUALSTRINGARRAY, MS-DCOM 2.2.19.1)
///
/// Entries are kept in wire order; the first usable one wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolverAddressList {
    pub string_bindings: Vec<StringBinding>,
    pub security_bindings: Vec<SecurityBinding>,
}

impl ResolverAddressList {
    /// Fixed header size
    pub const HEADER_SIZE: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// One TCP binding per host on `port`, with an NTLM binding that needs
    /// no authorization service.
    pub fn for_tcp_port<S: AsRef<str>>(hosts: &[S], port: u16) -> Self {
        Self {
            string_bindings: hosts
                .iter()
                .map(|h| StringBinding::tcp(h.as_ref(), Some(port)))
                .collect(),
            security_bindings: vec![SecurityBinding::new(authn_svc::WINNT, COM_C_AUTHZ_NONE, "")],
        }
    }

    pub fn add_string_binding(&mut self, binding: StringBinding) {
        self.string_bindings.push(binding);
    }

    pub fn add_security_binding(&mut self, binding: SecurityBinding) {
        self.security_bindings.push(binding);
    }

    fn string_units(&self) -> usize {
        match self.string_bindings.len() {
            0 => 2,
            _ => self.string_bindings.iter().map(StringBinding::units).sum::<usize>() + 1,
        }
    }

    fn security_units(&self) -> usize {
        match self.security_bindings.len() {
            0 => 2,
            _ => self.security_bindings.iter().map(SecurityBinding::units).sum::<usize>() + 1,
        }
    }

    /// Value of `wNumEntries`
    pub fn num_entries(&self) -> usize {
        self.string_units() + self.security_units()
    }

    /// Value of `wSecurityOffset`
    pub fn security_offset(&self) -> usize {
        self.string_units()
    }

    /// Encoded size in bytes, header included
    pub fn length(&self) -> usize {
        Self::HEADER_SIZE + 2 * self.num_entries()
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        let num_entries = u16::try_from(self.num_entries())
            .map_err(|_| DcomError::InvalidStringBinding("resolver address list too long".to_string()))?;
        // bounded by num_entries
        let security_offset = self.security_offset() as u16;

        ctx.write_u16(buf, position, num_entries);
        ctx.write_u16(buf, position, security_offset);

        for binding in &self.string_bindings {
            binding.encode(buf, ctx, position)?;
        }
        if self.string_bindings.is_empty() {
            ctx.write_u16(buf, position, 0);
        }
        ctx.write_u16(buf, position, 0);

        if self.security_bindings.is_empty() {
            ctx.write_u16(buf, position, 0);
            ctx.write_u16(buf, position, 0);
        } else {
            SecurityBinding::encode_chain(&self.security_bindings, buf, ctx, position)?;
        }
        Ok(())
    }

    pub fn decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
        let num_entries = ctx.read_u16(buf, position)? as usize;
        let security_offset = ctx.read_u16(buf, position)? as usize;
        if security_offset > num_entries {
            return Err(DcomError::InvalidStringBinding(format!(
                "security offset {} beyond {} entries",
                security_offset, num_entries
            )));
        }

        // aStringArray is consumed whole, then parsed section by section
        let array = ctx.read_bytes(buf, position, 2 * num_entries)?;
        let string_section = array.slice(..2 * security_offset);
        let security_section = array.slice(2 * security_offset..);

        let string_bindings = Self::decode_strings(string_section, ctx)?;
        let security_bindings = if security_section.is_empty() {
            Vec::new()
        } else {
            let mut section = security_section;
            let mut pos = 0;
            SecurityBinding::decode_chain(&mut section, ctx, &mut pos)?
        };

        debug!(
            strings = string_bindings.len(),
            security = security_bindings.len(),
            "decoded resolver address list"
        );
        Ok(Self {
            string_bindings,
            security_bindings,
        })
    }

    fn decode_strings(mut section: Bytes, ctx: &NdrContext) -> Result<Vec<StringBinding>> {
        let mut bindings = Vec::new();
        let mut pos = 0;
        while section.has_remaining() {
            match StringBinding::decode(&mut section, ctx, &mut pos)? {
                Some(binding) => bindings.push(binding),
                None => break,
            }
        }
        Ok(bindings)
    }
}
