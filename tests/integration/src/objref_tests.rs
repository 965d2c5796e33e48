//! Object Reference Tests - OBJREF_STANDARD on the wire
//!
//! These tests exercise marshaled interface pointers:
//! - Round-trips over arbitrary identities and resolver addresses
//! - Signature corruption
//! - Handler and custom references
//! - Null pointers and the decode2 layout

mod common;

use bytes::{Buf, BytesMut};
use proptest::prelude::*;

use common::*;
use dcom_orpc::types::{authn_svc, objref_flags, protocol_id};
use dcom_orpc::{
    marshal_flags, DcomError, ErrorKind, InterfacePointer, Ipid, Oid, Oxid, ResolverAddressList,
    SecurityBinding, StdObjRef, StringBinding,
};
use midl_ndr::NdrContext;
use uuid::Uuid;

fn encode(pointer: &InterfacePointer, flags: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    let mut pos = 0;
    pointer
        .encode(&mut buf, &NdrContext::new(), &mut pos, flags)
        .expect("encode");
    buf
}

fn decode(wire: &[u8], flags: u32) -> Result<Option<InterfacePointer>, DcomError> {
    let mut reader = wire;
    let mut pos = 0;
    InterfacePointer::decode(&mut reader, &NdrContext::new(), &mut pos, flags)
}

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn arb_std_ref() -> impl Strategy<Value = StdObjRef> {
    (any::<u32>(), any::<i32>(), any::<[u8; 8]>(), any::<[u8; 8]>(), arb_uuid()).prop_map(
        |(flags, public_refs, oxid, oid, ipid)| StdObjRef {
            flags,
            public_refs,
            oxid: Oxid::new(oxid),
            oid: Oid::new(oid),
            ipid: Ipid::new(ipid),
        },
    )
}

fn arb_resolver() -> impl Strategy<Value = ResolverAddressList> {
    let string_binding = (
        prop_oneof![Just(protocol_id::NCACN_IP_TCP), Just(protocol_id::NCACN_NP), Just(protocol_id::NCACN_HTTP)],
        "[a-z0-9.\\-]{1,24}",
        proptest::option::of(1u16..=u16::MAX),
    )
        .prop_map(|(tower_id, host, port)| match (tower_id, port) {
            (protocol_id::NCACN_IP_TCP, port) => StringBinding::tcp(&host, port),
            (tower_id, _) => StringBinding::new(tower_id, host),
        });
    let security_binding = (
        prop_oneof![Just(authn_svc::WINNT), Just(authn_svc::GSS_KERBEROS), Just(authn_svc::GSS_NEGOTIATE)],
        any::<u16>(),
        "[A-Za-z0-9/\\\\@ ]{0,16}",
    )
        .prop_map(|(authn, authz, name)| SecurityBinding::new(authn, authz, name));

    (
        proptest::collection::vec(string_binding, 0..4),
        proptest::collection::vec(security_binding, 0..3),
    )
        .prop_map(|(string_bindings, security_bindings)| ResolverAddressList {
            string_bindings,
            security_bindings,
        })
}

proptest! {
    #[test]
    fn prop_objref_roundtrip(iid in arb_uuid(), std_ref in arb_std_ref(), resolver in arb_resolver()) {
        let pointer = InterfacePointer::new(iid, std_ref.clone(), resolver.clone());
        let wire = encode(&pointer, marshal_flags::FLAG_NULL);

        let length = u32::from_le_bytes([wire[4], wire[5], wire[6], wire[7]]);
        prop_assert_eq!(length, pointer.wire_length());

        let decoded = decode(&wire, marshal_flags::FLAG_NULL).unwrap().unwrap();
        prop_assert_eq!(decoded.iid(), iid);
        prop_assert_eq!(decoded.std_obj_ref(), &std_ref);
        prop_assert_eq!(decoded.resolver_addresses(), &resolver);
        prop_assert_eq!(decoded.wire_length(), length);
    }

    #[test]
    fn prop_objref_roundtrip_big_endian(std_ref in arb_std_ref(), resolver in arb_resolver()) {
        let ctx = NdrContext::big_endian();
        let pointer = InterfacePointer::new(Uuid::new_v4(), std_ref, resolver);
        let mut buf = BytesMut::new();
        let mut pos = 0;
        pointer.encode(&mut buf, &ctx, &mut pos, 0).unwrap();

        let mut reader = buf.freeze();
        let mut pos = 0;
        let decoded = InterfacePointer::decode(&mut reader, &ctx, &mut pos, 0).unwrap().unwrap();
        prop_assert_eq!(decoded, pointer);
        prop_assert_eq!(reader.remaining(), 0);
    }
}

#[test]
fn test_every_signature_byte_is_checked() {
    init_logging();
    let wire = encode(&sample_pointer(), 0);
    // referent id and the length pair come first
    for offset in 12..16 {
        let mut corrupt = wire.clone();
        corrupt[offset] ^= 0x20;
        let err = decode(&corrupt, 0).unwrap_err();
        assert!(matches!(err, DcomError::InvalidObjRef(_)), "byte {}: {:?}", offset, err);
        assert_eq!(err.kind(), ErrorKind::MalformedWireData);
    }
}

#[test]
fn test_handler_and_custom_kinds_are_unsupported() {
    init_logging();
    for kind in [objref_flags::OBJREF_HANDLER, objref_flags::OBJREF_CUSTOM, 0x8] {
        let mut wire = encode(&sample_pointer(), 0);
        wire[16..20].copy_from_slice(&kind.to_le_bytes());
        let err = decode(&wire, 0).unwrap_err();
        assert!(matches!(err, DcomError::UnsupportedObjRefKind(k) if k == kind));
        assert_eq!(err.kind(), ErrorKind::UnsupportedVariant);
    }
}

#[test]
fn test_custom_objref_from_peer() {
    // OBJREF_CUSTOM: clsid, cbExtension, size, data
    let clsid = Uuid::new_v4();
    let wire = WireBuilder::new()
        .u32(0x0002_0000)
        .u32(48)
        .u32(48)
        .raw(b"MEOW")
        .u32(objref_flags::OBJREF_CUSTOM)
        .guid(Uuid::new_v4())
        .guid(clsid)
        .u32(0)
        .u32(4)
        .raw(&[1, 2, 3, 4])
        .finish();
    let err = decode(&wire, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVariant);
}

#[test]
fn test_null_interface_pointer_is_absent() {
    let wire = [0u8; 4];
    assert!(decode(&wire, 0).unwrap().is_none());
}

#[test]
fn test_truncated_objref() {
    let wire = encode(&sample_pointer(), 0);
    for cut in [8, 14, 30, 70, wire.len() - 1] {
        let err = decode(&wire[..cut], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedWireData, "cut at {}", cut);
    }
}

#[test]
fn test_decode2_is_selected_by_flag() {
    let pointer = sample_pointer();
    let wire = encode(&pointer, marshal_flags::INTERFACEPTR_DECODE2);
    assert_eq!(&wire[..4], b"MEOW");

    let decoded = decode(&wire, marshal_flags::INTERFACEPTR_DECODE2).unwrap().unwrap();
    assert_eq!(decoded, pointer);

    // the same bytes read with the default layout are not an OBJREF
    assert!(decode(&wire, marshal_flags::FLAG_NULL).is_err());
}

#[test]
fn test_iunknown_override() {
    let pointer = sample_pointer();
    let wire = encode(&pointer, marshal_flags::USE_IUNKNOWN_IID);
    let decoded = decode(&wire, 0).unwrap().unwrap();
    assert_eq!(decoded.iid(), dcom_orpc::types::iid::IUNKNOWN);
    assert_eq!(decoded.std_obj_ref(), pointer.std_obj_ref());
}

#[test]
fn test_requalified_keeps_identity() {
    let pointer = sample_pointer();
    let other = InterfacePointer::requalified(Uuid::new_v4(), &pointer);
    assert_ne!(other.iid(), pointer.iid());
    assert_eq!(other.ipid(), pointer.ipid());
    assert!(InterfacePointer::is_oxid_equal(&other, &pointer));
    assert_eq!(other.wire_length(), pointer.wire_length());

    let elsewhere = InterfacePointer::new(Uuid::new_v4(), sample_std_ref(), ResolverAddressList::new());
    assert!(!InterfacePointer::is_oxid_equal(&elsewhere, &pointer));
}

#[test]
fn test_resolver_list_from_windows_peer() {
    // ncacn_ip_tcp:"A", then WINNT with no principal
    let wire = WireBuilder::new()
        .u32(0x0002_0000)
        .u32(0)
        .u32(0)
        .raw(b"MEOW")
        .u32(objref_flags::OBJREF_STANDARD)
        .guid(Uuid::new_v4())
        .u32(0)
        .u32(1)
        .raw(&[1; 8])
        .raw(&[2; 8])
        .guid(Uuid::new_v4())
        .u16(8)
        .u16(4)
        .u16(7)
        .u16(u16::from(b'A'))
        .u16(0)
        .u16(0)
        .u16(10)
        .u16(0xffff)
        .u16(0)
        .u16(0)
        .finish();
    let decoded = decode(&wire, 0).unwrap().unwrap();
    let resolver = decoded.resolver_addresses();
    assert_eq!(resolver.string_bindings, vec![StringBinding::new(protocol_id::NCACN_IP_TCP, "A")]);
    assert_eq!(resolver.security_bindings.len(), 1);
    assert_eq!(resolver.security_bindings[0].principal_name, "");
    assert_eq!(decoded.oid(), Oid::new([2; 8]));
    assert_eq!(decoded.oxid(), Oxid::new([1; 8]));
}
