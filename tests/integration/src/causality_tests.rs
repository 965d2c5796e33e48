//! Causality Tests - call-chain ids across nested and concurrent calls
//!
//! A server decodes the inbound ORPCTHIS, then makes calls of its own while
//! servicing it (A->B->A callbacks). Those calls must carry the inbound id.
//! Threads servicing other chains must never see it.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use bytes::BytesMut;

use common::*;
use dcom_orpc::causality::{self, CausalityScope};
use dcom_orpc::OrpcThis;
use midl_ndr::NdrContext;
use uuid::Uuid;

fn encode(orpc: &OrpcThis) -> BytesMut {
    let mut buf = BytesMut::new();
    let mut pos = 0;
    orpc.encode(&mut buf, &NdrContext::new(), &mut pos).expect("encode");
    buf
}

/// Causality id as it appears on the wire
fn wire_causality(wire: &[u8]) -> Uuid {
    let mut reader = wire;
    let mut pos = 0;
    let _scope = CausalityScope::enter();
    OrpcThis::decode(&mut reader, &NdrContext::new(), &mut pos)
        .expect("decode")
        .causality_id
}

fn receive(wire: &[u8]) -> OrpcThis {
    let mut reader = wire;
    let mut pos = 0;
    OrpcThis::decode(&mut reader, &NdrContext::new(), &mut pos).expect("decode")
}

#[test]
fn test_nested_call_carries_inbound_id() {
    init_logging();
    let _scope = CausalityScope::enter();
    let c1 = Uuid::new_v4();
    let inbound = encode(&OrpcThis::with_causality(c1));

    receive(&inbound);
    assert_eq!(causality::current_inbound(), Some(c1));

    // a fresh header for the callback still goes out under C1
    let nested = OrpcThis::new();
    assert_ne!(nested.causality_id, c1);
    assert_eq!(nested.effective_causality_id(), c1);
    assert_eq!(wire_causality(&encode(&nested)), c1);
}

#[test]
fn test_other_thread_uses_its_own_id() {
    let _scope = CausalityScope::enter();
    let c1 = Uuid::new_v4();
    receive(&encode(&OrpcThis::with_causality(c1)));

    let (own, written) = thread::spawn(|| {
        let orpc = OrpcThis::new();
        let wire = encode(&orpc);
        (orpc.causality_id, wire_causality(&wire))
    })
    .join()
    .unwrap();

    assert_ne!(written, c1);
    assert_eq!(written, own);
    assert_eq!(causality::current_inbound(), Some(c1));
}

#[test]
fn test_concurrent_chains_stay_apart() {
    const THREADS: usize = 8;
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _scope = CausalityScope::enter();
                let inbound = Uuid::new_v4();
                receive(&encode(&OrpcThis::with_causality(inbound)));
                barrier.wait();
                let written = wire_causality(&encode(&OrpcThis::new()));
                (inbound, written)
            })
        })
        .collect();

    let mut seen = Vec::new();
    for handle in handles {
        let (inbound, written) = handle.join().unwrap();
        assert_eq!(written, inbound);
        assert!(!seen.contains(&written));
        seen.push(written);
    }
}

#[test]
fn test_scope_ends_the_chain() {
    let c1 = Uuid::new_v4();
    {
        let _scope = CausalityScope::enter();
        receive(&encode(&OrpcThis::with_causality(c1)));
        assert_eq!(causality::current_inbound(), Some(c1));
    }
    assert_eq!(causality::current_inbound(), None);

    let after = OrpcThis::new();
    assert_eq!(wire_causality(&encode(&after)), after.causality_id);
}

#[test]
fn test_clear_forgets_inbound_id() {
    let _scope = CausalityScope::enter();
    receive(&encode(&OrpcThis::with_causality(Uuid::new_v4())));
    causality::clear();

    let orpc = OrpcThis::new();
    assert_eq!(orpc.effective_causality_id(), orpc.causality_id);
}

#[test]
fn test_nested_scopes_restore_outer_chain() {
    let outer = Uuid::new_v4();
    let inner = Uuid::new_v4();
    let _outer = CausalityScope::with_inbound(outer);
    {
        let _inner = CausalityScope::enter();
        receive(&encode(&OrpcThis::with_causality(inner)));
        assert_eq!(wire_causality(&encode(&OrpcThis::new())), inner);
    }
    assert_eq!(wire_causality(&encode(&OrpcThis::new())), outer);
}
