//! Zero-value detection used to build sparse update documents.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Reports whether a value equals its type's zero value.
///
/// Implemented for the scalar and container types that can appear in an
/// entity, and derived for records via `#[derive(Entity)]` or
/// `#[derive(IsDefault)]` (a record is default when every member is).
pub trait IsDefault {
    fn is_default(&self) -> bool;
}

macro_rules! impl_is_default_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IsDefault for $ty {
                fn is_default(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_is_default_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

// Negative zero has a sign bit set and is therefore not the zero value.
impl IsDefault for f32 {
    fn is_default(&self) -> bool {
        self.to_bits() == 0
    }
}

impl IsDefault for f64 {
    fn is_default(&self) -> bool {
        self.to_bits() == 0
    }
}

impl IsDefault for bool {
    fn is_default(&self) -> bool {
        !*self
    }
}

impl IsDefault for char {
    fn is_default(&self) -> bool {
        *self == '\0'
    }
}

impl IsDefault for String {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl IsDefault for &str {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsDefault for Option<T> {
    fn is_default(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsDefault for Vec<T> {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> IsDefault for HashMap<K, V, S> {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsDefault for BTreeMap<K, V> {
    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl<T: IsDefault + ?Sized> IsDefault for Box<T> {
    fn is_default(&self) -> bool {
        (**self).is_default()
    }
}

impl IsDefault for Value {
    fn is_default(&self) -> bool {
        self.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_detect_zero() {
        assert!(0i32.is_default());
        assert!(!7u64.is_default());
        assert!(0.0f64.is_default());
        assert!(!(-0.0f64).is_default());
        assert!(!1.5f32.is_default());
        assert!(false.is_default());
        assert!(!true.is_default());
        assert!('\0'.is_default());
    }

    #[test]
    fn containers_detect_empty() {
        assert!(String::new().is_default());
        assert!(!"x".to_string().is_default());
        assert!(None::<u8>.is_default());
        assert!(!Some(0u8).is_default());
        assert!(Vec::<String>::new().is_default());
        assert!(HashMap::<String, u8>::new().is_default());
        assert!(Box::new(0u16).is_default());
        assert!(Value::Null.is_default());
        assert!(!Value::Bool(false).is_default());
    }
}
