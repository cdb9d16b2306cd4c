//! Runtime value type of the host scripting language.

use std::fmt;

use super::{HostSequence, HostTable};
use crate::runtime::ValueHandle;

/// A value as seen by the embedded scripting runtime.
///
/// Integers of every native width travel as `Int(i64)`; opaque values travel
/// as handles into a [`ValueHeap`](crate::runtime::ValueHeap), never as raw
/// pointers.
#[derive(Clone, PartialEq, Default)]
pub enum HostValue {
    /// Absent / nil.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Handle to a wrapped native record.
    Opaque(ValueHandle),
    /// One-based ordered sequence.
    Sequence(HostSequence),
    /// String-keyed table.
    Table(HostTable),
}

impl HostValue {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Nil => "nil",
            HostValue::Bool(_) => "boolean",
            HostValue::Int(_) => "integer",
            HostValue::Float(_) => "number",
            HostValue::Str(_) => "string",
            HostValue::Opaque(_) => "userdata",
            HostValue::Sequence(_) => "sequence",
            HostValue::Table(_) => "table",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }

    /// Integer view of a numeric value.
    ///
    /// Floats qualify only when they hold an exact integer within `i64`
    /// range.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            HostValue::Int(v) => Some(v),
            HostValue::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Some(f as i64)
            }
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<ValueHandle> {
        match self {
            HostValue::Opaque(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&HostSequence> {
        match self {
            HostValue::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&HostTable> {
        match self {
            HostValue::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Nil => write!(f, "Nil"),
            HostValue::Bool(v) => write!(f, "Bool({})", v),
            HostValue::Int(v) => write!(f, "Int({})", v),
            HostValue::Float(v) => write!(f, "Float({})", v),
            HostValue::Str(s) => write!(f, "Str({:?})", s),
            HostValue::Opaque(h) => write!(f, "Opaque({:?})", h),
            HostValue::Sequence(s) => f.debug_list().entries(s.iter()).finish(),
            HostValue::Table(t) => f.debug_map().entries(t.iter()).finish(),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for HostValue {
                fn from(value: $ty) -> Self {
                    HostValue::Int(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<ValueHandle> for HostValue {
    fn from(handle: ValueHandle) -> Self {
        HostValue::Opaque(handle)
    }
}

impl From<HostSequence> for HostValue {
    fn from(seq: HostSequence) -> Self {
        HostValue::Sequence(seq)
    }
}

impl From<HostTable> for HostValue {
    fn from(table: HostTable) -> Self {
        HostValue::Table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_integer_range() {
        // 2^63 is one past i64::MAX; the next float down is 2^63 - 1024.
        let two_63 = 9_223_372_036_854_775_808.0_f64;
        assert_eq!(HostValue::Float(two_63).as_integer(), None);
        assert_eq!(
            HostValue::Float(9_223_372_036_854_774_784.0).as_integer(),
            Some(i64::MAX - 1023)
        );
        assert_eq!(HostValue::Float(-two_63).as_integer(), Some(i64::MIN));
        assert_eq!(HostValue::Float(-two_63 - 2048.0).as_integer(), None);
    }

    #[test]
    fn non_integral_floats() {
        assert_eq!(HostValue::Float(1.5).as_integer(), None);
        assert_eq!(HostValue::Float(f64::NAN).as_integer(), None);
        assert_eq!(HostValue::Float(f64::INFINITY).as_integer(), None);
        assert_eq!(HostValue::Float(-0.0).as_integer(), Some(0));
        assert_eq!(HostValue::from("1").as_integer(), None);
    }
}
