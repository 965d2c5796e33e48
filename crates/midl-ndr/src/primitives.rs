//! NDR primitive type implementations
//!
//! | MIDL Type      | Rust Type    | Size | Alignment |
//! |----------------|--------------|------|-----------|
//! | byte           | u8           | 1    | 1         |
//! | unsigned short | u16          | 2    | 2         |
//! | long           | i32          | 4    | 4         |
//! | unsigned long  | u32          | 4    | 4         |
//! | unsigned hyper | u64          | 8    | 8         |
//! | GUID           | uuid::Uuid   | 16   | 4         |
//!
//! A GUID goes out as `Data1: u32, Data2: u16, Data3: u16, Data4: [u8; 8]`,
//! so the first three fields follow the negotiated byte order while `Data4`
//! is copied verbatim.

use crate::{NdrContext, NdrDecode, NdrEncode, Result};
use bytes::{Buf, BufMut};
use uuid::Uuid;

macro_rules! impl_ndr_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl NdrEncode for $ty {
            fn ndr_encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
                ctx.$write(buf, position, *self);
                Ok(())
            }
        }

        impl NdrDecode for $ty {
            fn ndr_decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
                ctx.$read(buf, position)
            }
        }
    };
}

impl_ndr_primitive!(u8, write_u8, read_u8);
impl_ndr_primitive!(u16, write_u16, read_u16);
impl_ndr_primitive!(u32, write_u32, read_u32);
impl_ndr_primitive!(i32, write_i32, read_i32);
impl_ndr_primitive!(u64, write_u64, read_u64);

impl NdrEncode for Uuid {
    fn ndr_encode<B: BufMut>(&self, buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<()> {
        let (data1, data2, data3, data4) = self.as_fields();
        ctx.write_u32(buf, position, data1);
        ctx.write_u16(buf, position, data2);
        ctx.write_u16(buf, position, data3);
        ctx.write_bytes(buf, position, data4);
        Ok(())
    }
}

impl NdrDecode for Uuid {
    fn ndr_decode<B: Buf>(buf: &mut B, ctx: &NdrContext, position: &mut usize) -> Result<Self> {
        let data1 = ctx.read_u32(buf, position)?;
        let data2 = ctx.read_u16(buf, position)?;
        let data3 = ctx.read_u16(buf, position)?;
        let data4: [u8; 8] = ctx.read_array(buf, position)?;
        Ok(Uuid::from_fields(data1, data2, data3, &data4))
    }
}
