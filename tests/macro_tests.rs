//! Integration tests for `#[derive(NativeRecord)]`.

use sysbind::NativeRecord;
use sysbind_core::{FieldLayout, NativeRecord as _, ScalarKind, TypeCode};
use sysbind_registry::{BindingModule, ElementKind, TypeDescriptor, TypeFlags, TypeRegistry};

/// Default name is the struct name.
#[derive(Debug, Clone, Copy, PartialEq, NativeRecord)]
#[repr(C)]
struct Winsize {
    ws_row: u16,
    ws_col: u16,
    ws_xpixel: u16,
    ws_ypixel: u16,
}

#[test]
fn test_default_name_and_code() {
    assert_eq!(Winsize::NAME, "Winsize");
    assert_eq!(Winsize::CODE, TypeCode::from_name("Winsize"));
}

#[test]
fn test_field_offsets() {
    assert_eq!(
        Winsize::FIELDS,
        &[
            FieldLayout::new("ws_row", 0, ScalarKind::Uint16),
            FieldLayout::new("ws_col", 2, ScalarKind::Uint16),
            FieldLayout::new("ws_xpixel", 4, ScalarKind::Uint16),
            FieldLayout::new("ws_ypixel", 6, ScalarKind::Uint16),
        ]
    );
}

/// Explicit name, explicit code and a renamed field.
#[derive(Debug, Clone, Copy, PartialEq, NativeRecord)]
#[repr(C)]
#[native(name = "flock", code = 0x0f10_c000)]
struct Flock {
    #[native(name = "l_start")]
    start: i64,
    l_len: i64,
    l_pid: i32,
    l_type: i16,
    l_whence: i16,
}

#[test]
fn test_attributes() {
    assert_eq!(Flock::NAME, "flock");
    assert_eq!(Flock::CODE, TypeCode::new(0x0f10_c000));
    assert_eq!(Flock::FIELDS[0].name, "l_start");
    assert_eq!(Flock::FIELDS[3].offset, 20);
    assert_eq!(Flock::FIELDS[3].kind, ScalarKind::Int16);
}

#[test]
fn test_bytes_round_trip() {
    let lock = Flock {
        start: 10,
        l_len: 20,
        l_pid: 30,
        l_type: 1,
        l_whence: 0,
    };
    assert_eq!(lock.as_bytes().len(), 24);
    assert_eq!(Flock::from_bytes(lock.as_bytes()), Some(lock));
    assert_eq!(Flock::from_bytes(&[0; 4]), None);
}

#[test]
fn test_derived_record_descriptor() {
    let ty = TypeDescriptor::record::<Flock>().unwrap();
    assert_eq!(ty.code(), Flock::CODE);
    assert_eq!(ty.element_size(), 24);
    assert_eq!(ty.align(), 8);
    assert!(ty.flags().contains(TypeFlags::FIELDS));
    assert!(matches!(ty.element(), ElementKind::Record(fields) if fields.len() == 4));
    assert_eq!(ty.field("l_pid").map(|f| f.offset), Some(16));
}

#[test]
fn test_module_of_derived_records() {
    let module = BindingModule::new("sys/ioctl")
        .record::<Winsize>()
        .record::<Flock>();
    let mut registry = TypeRegistry::new();
    assert_eq!(module.install_into(&mut registry), Ok(2));
    assert_eq!(registry.lookup_name("flock").unwrap().code(), Flock::CODE);
}
