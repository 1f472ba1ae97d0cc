use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    Identifier,
    syntax::{Class, CompilationUnit, DeclarationMember},
};

// SYMBOL TABLE
// ================================================================================================

/// Resolves `(class, member)` pairs to declaration members and class names
/// to their declarations (for field layouts at allocation time).
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    classes: BTreeMap<Identifier, Arc<Class>>,
    members: BTreeMap<(Identifier, Identifier), DeclarationMember>,
}

impl SymbolTable {
    /// Builds the table from a compilation unit. Constructors are registered
    /// under their class name, fields under their field name.
    pub fn build(unit: &CompilationUnit) -> Self {
        let mut table = SymbolTable::default();
        for class in &unit.classes {
            table.classes.insert(class.name.clone(), class.clone());
            for field in &class.fields {
                table.members.insert(
                    (class.name.clone(), field.name.clone()),
                    DeclarationMember::Field(field.clone()),
                );
            }
            for member in &class.members {
                table
                    .members
                    .insert((class.name.clone(), member.name().clone()), member.clone());
            }
        }
        table
    }

    pub fn class(&self, name: &Identifier) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    pub fn lookup(&self, class: &Identifier, member: &Identifier) -> Option<&DeclarationMember> {
        self.members.get(&(class.clone(), member.clone()))
    }

    /// Resolves a `"Class.member"` qualified name.
    pub fn lookup_qualified(&self, qualified: &str) -> Option<&DeclarationMember> {
        let (class, member) = qualified.split_once('.')?;
        self.lookup(&crate::ident(class), &crate::ident(member))
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ident,
        syntax::{Constructor, Field, Method, Specification},
        types::RuntimeType,
    };

    fn sample_unit() -> CompilationUnit {
        CompilationUnit::new(vec![Class {
            name: ident("Counter"),
            fields: vec![Field::new(RuntimeType::Int, "v")],
            members: vec![
                DeclarationMember::Constructor(
                    Constructor {
                        name: ident("Counter"),
                        params: vec![],
                        specification: Specification::default(),
                        body: vec![],
                    }
                    .into(),
                ),
                DeclarationMember::Method(
                    Method {
                        is_static: true,
                        return_ty: RuntimeType::Void,
                        name: ident("incr"),
                        params: vec![],
                        specification: Specification::default(),
                        body: vec![],
                    }
                    .into(),
                ),
            ],
        }])
    }

    #[test]
    fn resolves_methods_constructors_and_fields() {
        let table = SymbolTable::build(&sample_unit());

        assert!(matches!(
            table.lookup(&ident("Counter"), &ident("incr")),
            Some(DeclarationMember::Method(_))
        ));
        assert!(matches!(
            table.lookup(&ident("Counter"), &ident("Counter")),
            Some(DeclarationMember::Constructor(_))
        ));
        assert!(matches!(
            table.lookup(&ident("Counter"), &ident("v")),
            Some(DeclarationMember::Field(_))
        ));
        assert!(table.lookup(&ident("Counter"), &ident("missing")).is_none());
    }

    #[test]
    fn resolves_qualified_names() {
        let table = SymbolTable::build(&sample_unit());
        assert!(table.lookup_qualified("Counter.incr").is_some());
        assert!(table.lookup_qualified("Counter").is_none());
        assert!(table.lookup_qualified("Other.incr").is_none());
    }
}
