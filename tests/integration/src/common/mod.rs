//! Common utilities for integration tests
//!
//! Builders for crafted peer buffers and a one-time tracing setup.

#![allow(dead_code)]

use std::sync::Once;

use bytes::{Bytes, BytesMut};
use dcom_orpc::{InterfacePointer, Ipid, Oid, Oxid, StdObjRef};
use midl_ndr::{NdrContext, NdrEncode};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Install a fmt subscriber honoring `RUST_LOG`, once per test binary
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Writes NDR the way a peer stub would, tracking the stream position
pub struct WireBuilder {
    ctx: NdrContext,
    buf: BytesMut,
    position: usize,
}

impl WireBuilder {
    pub fn new() -> Self {
        Self {
            ctx: NdrContext::new(),
            buf: BytesMut::new(),
            position: 0,
        }
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.ctx.write_u16(&mut self.buf, &mut self.position, value);
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.ctx.write_u32(&mut self.buf, &mut self.position, value);
        self
    }

    pub fn guid(mut self, value: Uuid) -> Self {
        value
            .ndr_encode(&mut self.buf, &self.ctx, &mut self.position)
            .expect("GUID encode");
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.ctx.write_bytes(&mut self.buf, &mut self.position, bytes);
        self
    }

    /// ORPC_EXTENT body: hoisted conformance, id, size, data padded to 8
    pub fn extent(self, id: Uuid, data: &[u8]) -> Self {
        let padded = (data.len() + 7) & !7;
        let mut body = data.to_vec();
        body.resize(padded, 0);
        self.u32(padded as u32).guid(id).u32(data.len() as u32).raw(&body)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for WireBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sample_std_ref() -> StdObjRef {
    StdObjRef::new(Oxid::generate(), Oid::generate(), Ipid::generate(), 5)
}

pub fn sample_pointer() -> InterfacePointer {
    InterfacePointer::with_tcp_port(Uuid::new_v4(), &["10.1.2.3", "host.example"], 49152, sample_std_ref())
}
