//! Coercion of arbitrary answer values to a yes/no response.
//!
//! Callers often hold a classifier output rather than a `bool`. Zero, empty,
//! and absent values are falsy; everything else is truthy.

/// A value that can be read as a yes/no response.
pub trait Truthy {
    /// `true` for an affirmative response.
    fn truthy(&self) -> bool;
}

impl Truthy for bool {
    fn truthy(&self) -> bool {
        *self
    }
}

macro_rules! impl_truthy_int {
    ($($ty:ty),*) => {
        $(
            impl Truthy for $ty {
                fn truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

impl_truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn truthy(&self) -> bool {
        *self != 0.0
    }
}

impl Truthy for f64 {
    fn truthy(&self) -> bool {
        *self != 0.0
    }
}

impl Truthy for str {
    fn truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::truthy)
    }
}

impl<T> Truthy for [T] {
    fn truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn truthy(&self) -> bool {
        (**self).truthy()
    }
}

impl Truthy for serde_json::Value {
    fn truthy(&self) -> bool {
        use serde_json::Value;
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool() {
        assert!(true.truthy());
        assert!(!false.truthy());
    }

    #[test]
    fn test_numbers() {
        assert!(1i32.truthy());
        assert!((-3i64).truthy());
        assert!(!0u8.truthy());
        assert!(0.5f64.truthy());
        assert!(!0.0f32.truthy());
    }

    #[test]
    fn test_strings() {
        assert!("no".truthy());
        assert!(!"".truthy());
        assert!(String::from("x").truthy());
    }

    #[test]
    fn test_option_and_collections() {
        assert!(!None::<bool>.truthy());
        assert!(!Some(false).truthy());
        assert!(Some(true).truthy());
        assert!(!Vec::<u8>::new().truthy());
        assert!(vec![0].truthy());
    }

    #[test]
    fn test_json_values() {
        assert!(!json!(null).truthy());
        assert!(json!(true).truthy());
        assert!(!json!(0).truthy());
        assert!(json!(2.5).truthy());
        assert!(!json!("").truthy());
        assert!(!json!([]).truthy());
        assert!(json!({"a": 1}).truthy());
    }
}
