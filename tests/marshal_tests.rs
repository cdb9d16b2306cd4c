//! Integration tests for the marshaling engine, driven through `Context`.
//!
//! Allocation-sensitive tests run on a `TrackingAllocator` so they can prove
//! every block handed out is released exactly once.

use std::sync::Arc;

use sysbind::{Context, MarshalConfig, Marshaler, NativeRecord};
use sysbind_core::{
    ConversionError, ErrorKind, HostSequence, HostTable, HostValue, NarrowingMode, NativeRecord as _,
    RegistryError, TrackingAllocator, TypeCode, scalars,
};
use sysbind_modules::{InAddr, PollFd, Timespec, Timeval};
use sysbind_registry::TypeDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, NativeRecord)]
#[repr(C)]
#[native(name = "pair")]
struct Pair {
    a: i32,
    b: i32,
}

fn context(config: MarshalConfig) -> Context {
    let mut ctx = Context::with_config(config);
    for module in sysbind_modules::default_modules() {
        ctx.install(module).unwrap();
    }
    ctx.register_type(TypeDescriptor::record::<Pair>().unwrap())
        .unwrap();
    ctx.seal().unwrap();
    ctx
}

fn tracked(config: MarshalConfig) -> (Marshaler, Arc<TrackingAllocator>) {
    let tracker = Arc::new(TrackingAllocator::new());
    let ctx = context(config.with_allocator(tracker.clone()));
    (ctx.create_marshaler().unwrap(), tracker)
}

fn ints(values: &[i64]) -> HostValue {
    HostValue::from(
        values
            .iter()
            .copied()
            .map(HostValue::Int)
            .collect::<HostSequence>(),
    )
}

fn pair_table(a: i64, b: i64) -> HostValue {
    HostValue::Table(HostTable::new().with("a", a).with("b", b))
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn lookup_returns_registered_code() {
    let ctx = context(MarshalConfig::new());
    let registry = ctx.registry().unwrap();
    for ty in registry.iter() {
        assert_eq!(registry.lookup(ty.code()).unwrap().code(), ty.code());
    }
    assert!(registry.len() > 8);
}

#[test]
fn reregistering_a_code_keeps_the_original() {
    let mut ctx = Context::new();
    ctx.register_type(TypeDescriptor::record::<Pair>().unwrap())
        .unwrap();

    let impostor = TypeDescriptor::builder("pair2")
        .code(Pair::CODE)
        .layout(4, 4)
        .build()
        .unwrap();
    let err = ctx.register_type(impostor).unwrap_err();
    assert!(matches!(
        err,
        sysbind::ContextError::Registry(RegistryError::DuplicateId { .. })
    ));

    let registry = ctx.seal().unwrap();
    let ty = registry.lookup(Pair::CODE).unwrap();
    assert_eq!(ty.name(), "pair");
    assert_eq!(ty.element_size(), 8);
}

// =============================================================================
// Host -> native
// =============================================================================

#[test]
fn pair_example_produces_native_layout() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let input = HostValue::from(HostSequence::from(vec![pair_table(1, 2), pair_table(3, 4)]));

    let array = m.sequence_to_array(Pair::CODE, &input, None).unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array.byte_len(), 16);

    let expected: Vec<u8> = [1i32, 2, 3, 4]
        .iter()
        .flat_map(|v| v.to_ne_bytes())
        .collect();
    assert_eq!(array.as_bytes(), expected.as_slice());

    let output = m.array_to_sequence(Pair::CODE, &array).unwrap();
    let first = output.get(1).and_then(HostValue::as_opaque).unwrap();
    let second = output.get(2).and_then(HostValue::as_opaque).unwrap();
    assert_eq!(m.record::<Pair>(first).unwrap(), Pair { a: 1, b: 2 });
    assert_eq!(m.get_field(second, "a").unwrap(), HostValue::Int(3));
    assert_eq!(m.get_field(second, "b").unwrap(), HostValue::Int(4));
}

#[test]
fn round_trip_preserves_length_and_values() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let values = [0, -1, i32::MAX as i64, i32::MIN as i64, 42];

    let array = m
        .sequence_to_array(scalars::INT32, &ints(&values), None)
        .unwrap();
    let output = m.array_into_sequence(scalars::INT32, array).unwrap();

    assert_eq!(output.len(), values.len());
    for (i, value) in values.iter().enumerate() {
        assert_eq!(output.get(i + 1), Some(&HostValue::Int(*value)));
    }
    assert!(tracker.stats().is_balanced());
}

#[test]
fn record_round_trip_through_wrappers() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let records = [
        PollFd {
            fd: 0,
            events: 1,
            revents: 0,
        },
        PollFd {
            fd: 7,
            events: 4,
            revents: 8,
        },
    ];
    let array = m.records_to_array(&records).unwrap();
    let sequence = m.array_into_sequence(PollFd::CODE, array).unwrap();

    let again = m
        .sequence_to_array(PollFd::CODE, &HostValue::from(sequence), Some(2))
        .unwrap();
    assert_eq!(again.to_records::<PollFd>().unwrap(), records);
}

#[test]
fn zero_length_allocates_nothing() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let empty = HostValue::from(HostSequence::new());

    let array = m.sequence_to_array(Timespec::CODE, &empty, Some(0)).unwrap();
    assert!(array.is_empty());
    assert!(array.as_ptr().is_null());
    assert_eq!(tracker.stats().allocations, 0);

    let output = m.array_into_sequence(Timespec::CODE, array).unwrap();
    assert!(output.is_empty());
    assert_eq!(tracker.stats().allocations, 0);
}

#[test]
fn cardinality_mismatch_allocates_nothing() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let err = m
        .sequence_to_array(scalars::INT32, &ints(&[1, 2, 3, 4, 5]), Some(3))
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::CardinalityMismatch {
            expected: 3,
            actual: 5,
        }
        .into()
    );
    assert_eq!(tracker.stats().allocations, 0);
}

#[test]
fn failure_midway_frees_buffer_once() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let input = HostValue::from(HostSequence::from(vec![
        HostValue::Int(1),
        HostValue::Int(2),
        HostValue::from("three"),
        HostValue::Int(4),
    ]));

    let err = m.sequence_to_array(scalars::INT64, &input, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidElement);
    assert!(matches!(
        err,
        sysbind_core::MarshalError::Conversion(ConversionError::InvalidElement { index: 3, .. })
    ));

    let stats = tracker.stats();
    assert_eq!(stats.allocations, 1);
    assert_eq!(stats.releases, 1);
    assert!(stats.is_balanced());
}

#[test]
fn missing_element_frees_buffer() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let mut seq = HostSequence::from(vec![pair_table(1, 1), pair_table(2, 2), pair_table(3, 3)]);
    seq.set(3, HostValue::Nil);

    let err = m
        .sequence_to_array(Pair::CODE, &HostValue::from(seq), None)
        .unwrap_err();
    assert_eq!(err, ConversionError::MissingElement { index: 3 }.into());
    assert!(tracker.stats().is_balanced());
}

#[test]
fn zero_sized_elements_are_still_converted() {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut ctx = Context::with_config(MarshalConfig::new().with_allocator(tracker.clone()));
    let empty = TypeDescriptor::builder("empty_rec").build().unwrap();
    let code = empty.code();
    ctx.register_type(empty).unwrap();
    ctx.seal().unwrap();
    let mut m = ctx.create_marshaler().unwrap();
    let stray = m.create_value(scalars::INT32, None).unwrap();

    let holes = HostValue::from(HostSequence::from(vec![
        HostValue::Nil,
        HostValue::from("not a record"),
        HostValue::Opaque(stray),
    ]));
    let err = m.sequence_to_array(code, &holes, None).unwrap_err();
    assert_eq!(err, ConversionError::MissingElement { index: 1 }.into());

    let strings = HostValue::from(HostSequence::from(vec![HostValue::from("not a record")]));
    let err = m.sequence_to_array(code, &strings, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidElement);

    let foreign = HostValue::from(HostSequence::from_iter([stray]));
    let err = m.sequence_to_array(code, &foreign, None).unwrap_err();
    assert!(matches!(
        err,
        sysbind_core::MarshalError::Conversion(ConversionError::InvalidElement { index: 1, .. })
    ));

    let own = m.create_value(code, None).unwrap();
    let input = HostValue::from(HostSequence::from_iter([own, own]));
    let array = m.sequence_to_array(code, &input, Some(2)).unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array.byte_len(), 0);
    // Only the int32 wrapper ever allocated.
    assert_eq!(tracker.stats().allocations, 1);
}

#[test]
fn allocator_refusal_is_out_of_memory() {
    let tracker = Arc::new(TrackingAllocator::with_limit(64));
    let ctx = context(MarshalConfig::new().with_allocator(tracker.clone()));
    let mut m = ctx.create_marshaler().unwrap();

    let err = m
        .sequence_to_array(scalars::INT64, &ints(&[0; 9]), None)
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::OutOfMemory {
            count: 9,
            element_size: 8,
        }
        .into()
    );
    assert_eq!(tracker.stats().refused, 1);
    assert_eq!(tracker.stats().allocations, 0);
}

#[test]
fn reverse_failure_destroys_created_wrappers() {
    // Room for the array and exactly one wrapper.
    let tracker = Arc::new(TrackingAllocator::with_limit(48 + 16));
    let ctx = context(MarshalConfig::new().with_allocator(tracker.clone()));
    let mut m = ctx.create_marshaler().unwrap();

    let array = m
        .records_to_array(&[Timespec::default(); 3])
        .unwrap();
    let err = m.array_to_sequence(Timespec::CODE, &array).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    assert!(matches!(
        err,
        sysbind_core::MarshalError::Conversion(ConversionError::Value { index: 2, .. })
    ));
    assert!(m.heap().is_empty());

    drop(array);
    assert!(tracker.stats().is_balanced());
}

#[test]
fn foreign_opaque_value_is_invalid() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let tv = m
        .create_record(&Timeval {
            tv_sec: 1,
            tv_usec: 2,
        })
        .unwrap();
    let input = HostValue::from(HostSequence::from_iter([tv]));

    let err = m.sequence_to_array(Timespec::CODE, &input, None).unwrap_err();
    assert!(matches!(
        err,
        sysbind_core::MarshalError::Conversion(ConversionError::InvalidElement { index: 1, .. })
    ));
}

#[test]
fn array_of_another_type_is_rejected() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let array = m.records_to_array(&[Timeval::default()]).unwrap();
    let err = m.array_to_sequence(Timespec::CODE, &array).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(array.to_records::<Timespec>().unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn non_sequence_inputs() {
    let (mut m, _) = tracked(MarshalConfig::new());
    for value in [HostValue::Nil, HostValue::Int(3), pair_table(1, 2)] {
        let err = m.sequence_to_array(Pair::CODE, &value, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotASequence);
    }
    assert!(
        m.optional_sequence_to_array(Pair::CODE, &HostValue::Nil, None)
            .unwrap()
            .is_none()
    );
    assert_eq!(
        m.optional_sequence_to_array(Pair::CODE, &HostValue::from(HostSequence::new()), None)
            .unwrap()
            .map(|a| a.len()),
        Some(0)
    );
}

// =============================================================================
// Narrowing
// =============================================================================

#[test]
fn masking_narrows_like_native_code() {
    let (mut m, _) = tracked(MarshalConfig::new());

    let bytes = m
        .sequence_to_array(scalars::UINT8, &ints(&[300]), None)
        .unwrap();
    assert_eq!(bytes.as_bytes(), &[44]);

    let shorts = m
        .sequence_to_array(scalars::UINT16, &ints(&[-1]), None)
        .unwrap();
    assert_eq!(shorts.as_bytes(), 0xffffu16.to_ne_bytes().as_slice());
    let back = m.array_into_sequence(scalars::UINT16, shorts).unwrap();
    assert_eq!(back.get(1), Some(&HostValue::Int(0xffff)));
}

#[test]
fn checked_mode_rejects_overflow() {
    let (mut m, tracker) = tracked(MarshalConfig::new().with_narrowing(NarrowingMode::Checked));

    let err = m
        .sequence_to_array(scalars::UINT8, &ints(&[300]), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegerOverflow);

    let err = m
        .sequence_to_array(scalars::UINT16, &ints(&[-1]), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegerOverflow);

    let ok = m
        .sequence_to_array(scalars::UINT16, &ints(&[65535]), None)
        .unwrap();
    assert_eq!(ok.len(), 1);
    drop(ok);
    assert!(tracker.stats().is_balanced());
}

#[test]
fn integral_floats_are_accepted() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let input = HostValue::from(HostSequence::from(vec![
        HostValue::Float(2.0),
        HostValue::Float(-3.0),
    ]));
    let array = m.sequence_to_array(scalars::INT32, &input, None).unwrap();
    let output = m.array_into_sequence(scalars::INT32, array).unwrap();
    assert_eq!(output.into_vec(), vec![HostValue::Int(2), HostValue::Int(-3)]);

    let fractional = HostValue::from(HostSequence::from(vec![HostValue::Float(0.5)]));
    let err = m
        .sequence_to_array(scalars::INT32, &fractional, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidElement);
}

// =============================================================================
// Opaque values
// =============================================================================

#[test]
fn double_destroy_releases_once() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let h = m.create_value(Timespec::CODE, None).unwrap();
    assert_eq!(tracker.stats().allocations, 1);

    assert!(m.destroy_value(h));
    assert!(!m.destroy_value(h));
    assert_eq!(
        m.try_destroy_value(h).unwrap_err().kind(),
        ErrorKind::DoubleDestroy
    );

    let stats = tracker.stats();
    assert_eq!(stats.releases, 1);
    assert!(stats.is_balanced());
}

#[test]
fn payloads_are_zeroed_before_release() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let h = m
        .create_record(&Timespec {
            tv_sec: -1,
            tv_nsec: 999_999_999,
        })
        .unwrap();
    assert!(m.destroy_value(h));

    let stats = tracker.stats();
    assert_eq!(stats.releases, 1);
    assert_eq!(stats.dirty_releases, 0);
}

#[test]
fn init_and_raw_pointer() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let h = m.create_value(Pair::CODE, None).unwrap();

    let short = m.init_value(h, &[1, 2, 3]).unwrap_err();
    assert_eq!(short.kind(), ErrorKind::SizeMismatch);

    let bytes = Pair { a: 5, b: 6 }.as_bytes().to_vec();
    m.init_value(h, &bytes).unwrap();
    let ptr = m.raw_ptr(h).unwrap();
    assert!(!ptr.is_null());
    // SAFETY: the value is live and holds a `Pair`.
    let pair = unsafe { (ptr as *const Pair).read_unaligned() };
    assert_eq!(pair, Pair { a: 5, b: 6 });
}

#[test]
fn create_value_with_oversized_init_truncates() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let mut bytes = Pair { a: 9, b: 10 }.as_bytes().to_vec();
    bytes.extend_from_slice(&[0xff; 4]);
    let h = m.create_value(Pair::CODE, Some(&bytes)).unwrap();
    assert_eq!(m.record::<Pair>(h).unwrap(), Pair { a: 9, b: 10 });
}

#[test]
fn destroying_parent_destroys_children() {
    let (mut m, tracker) = tracked(MarshalConfig::new());
    let parent = m.create_value(Pair::CODE, None).unwrap();
    let child = m.create_value(Timespec::CODE, None).unwrap();
    let grandchild = m.create_value(PollFd::CODE, None).unwrap();
    m.adopt(parent, child).unwrap();
    m.adopt(child, grandchild).unwrap();

    assert_eq!(m.try_destroy_value(parent).unwrap(), 3);
    assert!(m.heap().is_empty());
    assert!(!m.destroy_value(grandchild));
    assert!(tracker.stats().is_balanced());
}

#[test]
fn reparenting_detaches_first() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let first = m.create_value(Pair::CODE, None).unwrap();
    let second = m.create_value(Pair::CODE, None).unwrap();
    let child = m.create_value(Timespec::CODE, None).unwrap();

    m.adopt(first, child).unwrap();
    m.adopt(second, child).unwrap();
    assert!(m.heap().children(first).unwrap().is_empty());
    assert_eq!(m.heap().owner(child).unwrap(), Some(second));

    assert!(m.destroy_value(first));
    assert!(m.heap().contains(child));

    let err = m.adopt(child, second).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OwnershipCycle);

    assert_eq!(m.detach(child).unwrap(), Some(second));
    assert!(m.destroy_value(second));
    assert!(m.heap().contains(child));
}

#[test]
fn unknown_type_is_reported() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let err = m
        .create_value(TypeCode::from_name("struct stat"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}

// =============================================================================
// Custom codecs
// =============================================================================

#[test]
fn in_addr_accepts_strings_and_integers() {
    let (mut m, _) = tracked(MarshalConfig::new());
    let input = HostValue::from(HostSequence::from(vec![
        HostValue::from("10.0.0.1"),
        HostValue::Int(0x7f00_0001),
    ]));

    let array = m.sequence_to_array(InAddr::CODE, &input, None).unwrap();
    assert_eq!(array.as_bytes(), &[10, 0, 0, 1, 127, 0, 0, 1]);
    let records = array.to_records::<InAddr>().unwrap();
    assert_eq!(records[1].to_ipv4(), std::net::Ipv4Addr::LOCALHOST);

    let output = m.array_into_sequence(InAddr::CODE, array).unwrap();
    assert_eq!(output.get(1).and_then(HostValue::as_str), Some("10.0.0.1"));
    assert_eq!(output.get(2).and_then(HostValue::as_str), Some("127.0.0.1"));

    let bad = HostValue::from(HostSequence::from(vec![HostValue::from("localhost")]));
    let err = m.sequence_to_array(InAddr::CODE, &bad, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidElement);
}
