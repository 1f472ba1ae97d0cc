use std::collections::BTreeMap;

use oox_core::{Expression, Identifier, Reference, RuntimeType};

// HEAP CELLS
// ================================================================================================

/// A heap allocation: an object or an array. Field and element values are
/// expressions in evaluated normal form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapValue {
    Object {
        class: Identifier,
        fields: BTreeMap<Identifier, Expression>,
    },
    Array {
        elem_ty: RuntimeType,
        elements: Vec<Expression>,
    },
}

impl HeapValue {
    /// The runtime type of the allocation.
    pub fn ty(&self) -> RuntimeType {
        match self {
            HeapValue::Object { class, .. } => RuntimeType::Reference(class.clone()),
            HeapValue::Array { elem_ty, .. } => RuntimeType::Array(Box::new(elem_ty.clone())),
        }
    }
}

// DEPENDENT REFERENCES
// ================================================================================================

/// An element of a POR read/write set.
///
/// `Unknown` is the distinguished bottom marker standing for a symbolic
/// reference whose aliases have not been resolved yet; it orders before
/// every concrete reference and makes its owner pessimistically dependent
/// on any non-empty set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependentRef {
    Unknown,
    Concrete(Reference),
}

// DEFAULTS
// ================================================================================================

/// The default value written by `Declare` and used for fresh fields and
/// array elements.
pub(crate) fn default_value(ty: &RuntimeType) -> Expression {
    match ty {
        RuntimeType::Int => Expression::int(0),
        RuntimeType::Bool => Expression::bool(false),
        RuntimeType::Void
        | RuntimeType::Reference(_)
        | RuntimeType::Array(_) => Expression::null(),
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_orders_before_concrete_references() {
        let bottom = DependentRef::Unknown;
        let concrete = DependentRef::Concrete(Reference::new(0));
        assert!(bottom < concrete);
    }

    #[test]
    fn defaults_per_type() {
        assert_eq!(default_value(&RuntimeType::Int), Expression::int(0));
        assert_eq!(default_value(&RuntimeType::Bool), Expression::bool(false));
        assert_eq!(
            default_value(&RuntimeType::Reference(oox_core::ident("C"))),
            Expression::null()
        );
    }
}
