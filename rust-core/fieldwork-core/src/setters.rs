//! # Setters
//!
//! Transforms applied to a value when it is assigned to a record, before
//! validation.

use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

type SetterFn = dyn Fn(Value) -> Result<Value> + Send + Sync;

/// A value transform run on assignment
#[derive(Clone)]
pub struct Setter(Arc<SetterFn>);

impl Setter {
    /// Wrap a transform
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply the transform
    ///
    /// # Errors
    ///
    /// Propagates the transform's failure.
    pub fn apply(&self, value: Value) -> Result<Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
    }
}

/// Reject every assignment
///
/// The error's target is filled in with the field name by the record.
pub fn frozen() -> Setter {
    Setter::new(|value| {
        Err(Error::Frozen {
            target: String::new(),
            message: format!("Cannot modify frozen field with value: {value}"),
        })
    })
}

/// Apply setters in sequence
pub fn pipe(setters: impl IntoIterator<Item = Setter>) -> Setter {
    let setters: Vec<Setter> = setters.into_iter().collect();
    Setter::new(move |value| setters.iter().try_fold(value, |acc, setter| setter.apply(acc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_rejects() {
        let err = frozen().apply(Value::Int(1)).unwrap_err();
        assert!(matches!(err, Error::Frozen { .. }));
        assert!(err.to_string().contains("with value: 1"));
    }

    #[test]
    fn test_pipe_applies_in_order() {
        let trim = Setter::new(|value| {
            Ok(match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            })
        });
        let shout = Setter::new(|value| {
            Ok(match value {
                Value::String(s) => Value::String(format!("{s}!")),
                other => other,
            })
        });
        let pipeline = pipe([trim, shout]);
        assert_eq!(pipeline.apply(Value::from("  hi ")).unwrap(), Value::from("hi!"));
    }
}
