//! Security Binding Tests - chains as peers send them
//!
//! These tests exercise:
//! - Chain termination on authentication service 0
//! - Principal names outside ASCII
//! - Security bindings inside a resolver address list

mod common;

use bytes::{Buf, BytesMut};

use common::*;
use dcom_orpc::types::{authn_svc, COM_C_AUTHZ_NONE};
use dcom_orpc::{DcomError, ErrorKind, ResolverAddressList, SecurityBinding, StringBinding};
use midl_ndr::NdrContext;

fn decode_chain(wire: &[u8]) -> Result<Vec<SecurityBinding>, DcomError> {
    let mut reader = wire;
    let mut pos = 0;
    SecurityBinding::decode_chain(&mut reader, &NdrContext::new(), &mut pos)
}

fn name(builder: WireBuilder, text: &str) -> WireBuilder {
    text.encode_utf16()
        .fold(builder, |b, unit| b.u16(unit))
        .u16(0)
}

#[test]
fn test_two_bindings_then_terminator() {
    init_logging();
    let builder = WireBuilder::new().u16(authn_svc::GSS_KERBEROS).u16(0);
    let builder = name(builder, "host/server.example").u16(authn_svc::WINNT).u16(COM_C_AUTHZ_NONE);
    let wire = name(builder, "").u16(0).finish();

    let bindings = decode_chain(&wire).unwrap();
    assert_eq!(
        bindings,
        vec![
            SecurityBinding::new(authn_svc::GSS_KERBEROS, 0, "host/server.example"),
            SecurityBinding::new(authn_svc::WINNT, COM_C_AUTHZ_NONE, ""),
        ]
    );
}

#[test]
fn test_chain_stops_at_terminator() {
    // a binding after the terminator belongs to whatever follows the chain
    let builder = WireBuilder::new().u16(0).u16(authn_svc::WINNT).u16(0);
    let wire = name(builder, "ignored").finish();

    let mut reader = &wire[..];
    let mut pos = 0;
    let bindings = SecurityBinding::decode_chain(&mut reader, &NdrContext::new(), &mut pos).unwrap();
    assert!(bindings.is_empty());
    assert_eq!(pos, 2);
    assert_eq!(reader.remaining(), wire.len() - 2);
}

#[test]
fn test_chain_without_terminator() {
    let builder = WireBuilder::new().u16(authn_svc::WINNT).u16(0);
    let wire = name(builder, "a").finish();
    let err = decode_chain(&wire).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedWireData);
}

#[test]
fn test_unpaired_surrogate_in_principal() {
    let wire = WireBuilder::new()
        .u16(authn_svc::WINNT)
        .u16(0)
        .u16(0xd800)
        .u16(0)
        .u16(0)
        .finish();
    let err = decode_chain(&wire).unwrap_err();
    assert!(matches!(err, DcomError::InvalidSecurityBinding(_)));
}

#[test]
fn test_non_ascii_principal_roundtrip() {
    let ctx = NdrContext::new();
    let bindings = vec![
        SecurityBinding::new(authn_svc::GSS_NEGOTIATE, 0, "DOMÄNE\\bенутзер"),
        SecurityBinding::new(authn_svc::GSS_KERBEROS, 0, "svc/𝔥ost"),
    ];
    let mut buf = BytesMut::new();
    let mut pos = 0;
    SecurityBinding::encode_chain(&bindings, &mut buf, &ctx, &mut pos).unwrap();
    let expected: usize = bindings.iter().map(SecurityBinding::length).sum::<usize>() + 2;
    assert_eq!(buf.len(), expected);
    // the astral character takes two units
    assert_eq!(bindings[1].principal_units(), 9);

    assert_eq!(decode_chain(&buf).unwrap(), bindings);
}

#[test]
fn test_terminator_binding_cannot_be_encoded() {
    let mut buf = BytesMut::new();
    let mut pos = 0;
    let err = SecurityBinding::new(authn_svc::NONE, 0, "x")
        .encode(&mut buf, &NdrContext::new(), &mut pos)
        .unwrap_err();
    assert!(matches!(err, DcomError::InvalidSecurityBinding(_)));
}

#[test]
fn test_resolver_list_sections() {
    let ctx = NdrContext::new();
    let mut list = ResolverAddressList::new();
    list.add_string_binding(StringBinding::tcp("10.0.0.1", Some(135)));
    list.add_security_binding(SecurityBinding::new(authn_svc::WINNT, COM_C_AUTHZ_NONE, ""));
    list.add_security_binding(SecurityBinding::new(authn_svc::GSS_KERBEROS, 0, "host/a"));

    let mut buf = BytesMut::new();
    let mut pos = 0;
    list.encode(&mut buf, &ctx, &mut pos).unwrap();
    assert_eq!(buf.len(), list.length());

    let num_entries = u16::from_le_bytes([buf[0], buf[1]]) as usize;
    let security_offset = u16::from_le_bytes([buf[2], buf[3]]) as usize;
    assert_eq!(num_entries, list.num_entries());
    assert_eq!(security_offset, list.security_offset());

    // the security section starts with the first binding's authn service
    let start = ResolverAddressList::HEADER_SIZE + 2 * security_offset;
    assert_eq!(u16::from_le_bytes([buf[start], buf[start + 1]]), authn_svc::WINNT);

    let mut reader = buf.freeze();
    let mut pos = 0;
    let decoded = ResolverAddressList::decode(&mut reader, &ctx, &mut pos).unwrap();
    assert_eq!(decoded, list);
}

#[test]
fn test_security_offset_beyond_entries() {
    let wire = WireBuilder::new().u16(2).u16(3).u16(0).u16(0).finish();
    let mut reader = &wire[..];
    let mut pos = 0;
    let err = ResolverAddressList::decode(&mut reader, &NdrContext::new(), &mut pos).unwrap_err();
    assert!(matches!(err, DcomError::InvalidStringBinding(_)));
    assert_eq!(err.kind(), ErrorKind::MalformedWireData);
}

#[test]
fn test_names_with_nul_are_rejected_on_encode() {
    let ctx = NdrContext::new();
    let mut list = ResolverAddressList::new();
    list.add_security_binding(SecurityBinding::new(authn_svc::WINNT, COM_C_AUTHZ_NONE, "a\0b"));
    let mut buf = BytesMut::new();
    let mut pos = 0;
    let err = list.encode(&mut buf, &ctx, &mut pos).unwrap_err();
    assert!(matches!(err, DcomError::InvalidSecurityBinding(_)));

    let mut list = ResolverAddressList::new();
    list.add_string_binding(StringBinding::new(7, "x\0y"));
    let mut buf = BytesMut::new();
    let mut pos = 0;
    let err = list.encode(&mut buf, &ctx, &mut pos).unwrap_err();
    assert!(matches!(err, DcomError::InvalidStringBinding(_)));
}
