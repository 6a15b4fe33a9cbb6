//! Deferred values
//!
//! An [`Output`] is a value assigned by the provider when a resource is
//! actually created. During apply it is `Known`; during preview a value
//! belonging to a resource that does not exist yet is `Computed`. Dependent
//! declarations chain on outputs with [`Output::map`], [`Output::zip`] and
//! [`Output::all`], which is the only way dependency order is expressed in a
//! program.

use serde::Serialize;
use serde_json::Value;

/// A provider-assigned value, either resolved or still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output<T> {
    /// The value has been resolved by a completed provider operation.
    Known(T),
    /// The value is not known yet (resource not created in this run).
    Computed,
}

impl<T> Output<T> {
    /// Wrap a resolved value.
    pub fn known(value: T) -> Self {
        Self::Known(value)
    }

    /// A pending value.
    pub fn computed() -> Self {
        Self::Computed
    }

    /// Whether the value has been resolved.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// The resolved value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Computed => None,
        }
    }

    /// Consume the output, returning the resolved value if any.
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Computed => None,
        }
    }

    /// Apply a function to the resolved value, keeping pending values pending.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Output<U> {
        match self {
            Self::Known(v) => Output::Known(f(v)),
            Self::Computed => Output::Computed,
        }
    }

    /// Combine two outputs; the result is pending if either side is.
    pub fn zip<U>(self, other: Output<U>) -> Output<(T, U)> {
        match (self, other) {
            (Self::Known(a), Output::Known(b)) => Output::Known((a, b)),
            _ => Output::Computed,
        }
    }
}

impl<T> Output<T>
where
    T: Serialize,
{
    /// JSON rendering for exports and resource inputs. Pending values render
    /// as `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Known(v) => serde_json::to_value(v).unwrap_or(Value::Null),
            Self::Computed => Value::Null,
        }
    }
}

impl Output<Value> {
    /// Collect many outputs into one; pending if any element is pending.
    pub fn all(outputs: Vec<Output<Value>>) -> Output<Vec<Value>> {
        let mut values = Vec::with_capacity(outputs.len());
        for output in outputs {
            match output {
                Output::Known(v) => values.push(v),
                Output::Computed => return Output::Computed,
            }
        }
        Output::Known(values)
    }
}

impl<T> From<T> for Output<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_known() {
        let name = Output::known("law-dev".to_string());
        let solution = name.map(|n| format!("Updates({})", n));
        assert_eq!(solution.get().map(String::as_str), Some("Updates(law-dev)"));
    }

    #[test]
    fn test_map_computed_stays_computed() {
        let name: Output<String> = Output::computed();
        let solution = name.map(|n| format!("Updates({})", n));
        assert!(!solution.is_known());
    }

    #[test]
    fn test_zip() {
        let rg = Output::known("rg-mgmt".to_string());
        let ws = Output::known("law-dev".to_string());
        assert_eq!(
            rg.clone().zip(ws).get(),
            Some(&("rg-mgmt".to_string(), "law-dev".to_string()))
        );

        let pending: Output<String> = Output::computed();
        assert!(!rg.zip(pending).is_known());
    }

    #[test]
    fn test_all() {
        let known = vec![Output::known(json!(1)), Output::known(json!(2))];
        assert_eq!(Output::all(known).get(), Some(&vec![json!(1), json!(2)]));

        let mixed = vec![Output::known(json!(1)), Output::computed()];
        assert!(!Output::all(mixed).is_known());
    }

    #[test]
    fn test_to_value() {
        assert_eq!(Output::known("pip".to_string()).to_value(), json!("pip"));
        assert_eq!(Output::<String>::computed().to_value(), Value::Null);
    }
}
