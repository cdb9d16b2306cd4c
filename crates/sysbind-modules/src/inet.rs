//! `netinet/in.h` records.
//!
//! `in_addr` has its own codec: scripts pass addresses as dotted-quad
//! strings (`"127.0.0.1"`) or host-order integers, and get strings back.

use std::net::Ipv4Addr;

use sysbind_core::{ElementError, HostValue, ScalarKind};
use sysbind_macros::NativeRecord;
use sysbind_registry::{BindingModule, CodecContext, ElementCodec, RecordCodec, TypeDescriptor};

/// `struct in_addr`. `s_addr` holds the address in network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, NativeRecord)]
#[repr(C)]
#[native(name = "in_addr")]
pub struct InAddr {
    pub s_addr: u32,
}

impl InAddr {
    pub const ANY: InAddr = InAddr { s_addr: 0 };

    pub fn to_ipv4(self) -> Ipv4Addr {
        Ipv4Addr::from(self.s_addr.to_ne_bytes())
    }
}

impl From<Ipv4Addr> for InAddr {
    fn from(addr: Ipv4Addr) -> Self {
        Self {
            s_addr: u32::from_ne_bytes(addr.octets()),
        }
    }
}

/// Codec converting between `in_addr` and dotted-quad strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct InAddrCodec;

impl ElementCodec for InAddrCodec {
    fn from_host(
        &self,
        ty: &TypeDescriptor,
        value: &HostValue,
        dst: &mut [u8],
        cx: &mut CodecContext<'_>,
    ) -> Result<(), ElementError> {
        match value {
            HostValue::Str(text) => {
                let addr: Ipv4Addr = text.parse().map_err(|_| {
                    ElementError::invalid("dotted-quad address", format!("string '{text}'"))
                })?;
                dst.copy_from_slice(&addr.octets());
                Ok(())
            }
            HostValue::Int(_) | HostValue::Float(_) => {
                let int = value
                    .as_integer()
                    .ok_or_else(|| ElementError::invalid("in_addr", value.type_name()))?;
                let bits = ScalarKind::Uint32.narrow(int, cx.narrowing)?;
                dst.copy_from_slice(&(bits as u32).to_be_bytes());
                Ok(())
            }
            HostValue::Opaque(handle) => RecordCodec::copy_opaque(ty, *handle, dst, cx.heap),
            other => Err(ElementError::invalid(
                "dotted-quad address or in_addr",
                other.type_name(),
            )),
        }
    }

    fn to_host(
        &self,
        _ty: &TypeDescriptor,
        src: &[u8],
        _cx: &mut CodecContext<'_>,
    ) -> Result<HostValue, ElementError> {
        let octets: [u8; 4] = src
            .try_into()
            .map_err(|_| ElementError::invalid("4-byte in_addr", format!("{} bytes", src.len())))?;
        Ok(HostValue::Str(Ipv4Addr::from(octets).to_string()))
    }
}

/// Creates the `netinet/in` module.
pub fn module() -> BindingModule {
    BindingModule::new("netinet/in")
        .try_descriptor(
            TypeDescriptor::builder("in_addr")
                .record::<InAddr>()
                .codec(InAddrCodec)
                .build(),
        )
        .scalar_alias::<u16>("in_port_t")
}
