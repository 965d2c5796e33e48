//! Security binding (MS-DCOM 2.2.19.4)
//!
//! ```text
//! wAuthnSvc: u16      // 0 ends the chain
//! wAuthzSvc: u16
//! aPrincName: u16[]   // null-terminated
//! ```

use crate::types::{DcomError, Result};
use bytes::{Buf, BufMut};
use midl_ndr::NdrContext;
use tracing::debug;

/// Authorization service placeholder meaning "no authorization"
pub const COM_C_AUTHZ_NONE: u16 = 0xffff;

/// Authentication services
pub mod authn_svc {
    /// No authentication, also the chain terminator
    pub const NONE: u16 = 0;
    /// DCE private key authentication
    pub const DCE_PRIVATE: u16 = 1;
    /// DCE public key authentication
    pub const DCE_PUBLIC: u16 = 2;
    /// SPNEGO negotiation
    pub const GSS_NEGOTIATE: u16 = 9;
    /// NTLM authentication
    pub const WINNT: u16 = 10;
    /// Kerberos authentication
    pub const GSS_KERBEROS: u16 = 16;
}

/// One link of a security-binding chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityBinding {
    /// Authentication service (never 0)
    pub authn_svc: u16,
    /// Authorization service
    pub authz_svc: u16,
    /// Principal name
    pub principal_name: String,
}

impl SecurityBinding {
    /// Size of fixed fields
    pub const FIXED_SIZE: usize = 4;

    pub fn new(authn_svc: u16, authz_svc: u16, principal_name: impl Into<String>) -> Self {
        Self {
            authn_svc,
            authz_svc,
            principal_name: principal_name.into(),
        }
    }

    /// Principal name length in UTF-16 code units
    pub fn principal_units(&self) -> usize {
        self.principal_name.encode_utf16().count()
    }

    /// Encoded size in bytes: the fixed fields, the name and its terminator
    pub fn length(&self) -> usize {
        Self::FIXED_SIZE + 2 * self.principal_units() + 2
    }

    /// Encoded size in 16-bit units
    pub(crate) fn units(&self) -> usize {
        self.length() / 2
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        if self.authn_svc == authn_svc::NONE {
            return Err(DcomError::InvalidSecurityBinding(
                "authentication service 0 is reserved for the chain terminator".to_string(),
            ));
        }
        if self.principal_name.contains('\0') {
            return Err(DcomError::InvalidSecurityBinding(
                "principal name contains a NUL".to_string(),
            ));
        }
        ctx.write_u16(buf, position, self.authn_svc);
        ctx.write_u16(buf, position, self.authz_svc);
        for unit in self.principal_name.encode_utf16() {
            ctx.write_u16(buf, position, unit);
        }
        ctx.write_u16(buf, position, 0);
        Ok(())
    }

    /// Decode one binding. `Ok(None)` when the terminator is read.
    pub fn decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Option<Self>> {
        let authn_svc = ctx.read_u16(buf, position)?;
        if authn_svc == authn_svc::NONE {
            return Ok(None);
        }
        let authz_svc = ctx.read_u16(buf, position)?;

        let mut units = Vec::new();
        loop {
            let unit = ctx.read_u16(buf, position)?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        let principal_name = String::from_utf16(&units)
            .map_err(|_| DcomError::InvalidSecurityBinding("principal name is not valid UTF-16".to_string()))?;

        Ok(Some(Self {
            authn_svc,
            authz_svc,
            principal_name,
        }))
    }

    /// Write every binding followed by the terminator
    pub fn encode_chain<B: BufMut>(
        bindings: &[SecurityBinding],
        buf: &mut B,
        ctx: &NdrContext,
        position: &mut usize,
    ) -> Result<()> {
        for binding in bindings {
            binding.encode(buf, ctx, position)?;
        }
        ctx.write_u16(buf, position, authn_svc::NONE);
        Ok(())
    }

    /// Read bindings up to and including the terminator
    pub fn decode_chain<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Vec<SecurityBinding>> {
        let mut bindings = Vec::new();
        while let Some(binding) = Self::decode(buf, ctx, position)? {
            bindings.push(binding);
        }
        debug!(count = bindings.len(), "decoded security binding chain");
        Ok(bindings)
    }
}
