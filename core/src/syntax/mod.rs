//! The typed syntax tree of an OOX program.

use std::sync::Arc;

use crate::{Identifier, types::RuntimeType};

pub mod expression;

mod statement;

pub use expression::Expression;
pub use statement::{Invocation, Lhs, Rhs, Statement};

// DECLARATIONS
// ================================================================================================

/// A typed, labelled OOX program: the unit the verifier consumes.
#[derive(Clone, Debug, Default)]
pub struct CompilationUnit {
    pub classes: Vec<Arc<Class>>,
}

impl CompilationUnit {
    pub fn new(classes: Vec<Class>) -> Self {
        CompilationUnit { classes: classes.into_iter().map(Arc::new).collect() }
    }
}

#[derive(Clone, Debug)]
pub struct Class {
    pub name: Identifier,
    pub fields: Vec<Field>,
    pub members: Vec<DeclarationMember>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub ty: RuntimeType,
    pub name: Identifier,
}

impl Field {
    pub fn new(ty: RuntimeType, name: &str) -> Self {
        Field { ty, name: crate::ident(name) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub ty: RuntimeType,
    pub name: Identifier,
}

impl Parameter {
    pub fn new(ty: RuntimeType, name: &str) -> Self {
        Parameter { ty, name: crate::ident(name) }
    }
}

/// The contract attached to a method or constructor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Specification {
    pub requires: Option<Expression>,
    pub ensures: Option<Expression>,
    pub exceptional: Option<Expression>,
}

#[derive(Clone, Debug)]
pub struct Method {
    pub is_static: bool,
    pub return_ty: RuntimeType,
    pub name: Identifier,
    pub params: Vec<Parameter>,
    pub specification: Specification,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct Constructor {
    pub name: Identifier,
    pub params: Vec<Parameter>,
    pub specification: Specification,
    pub body: Vec<Statement>,
}

/// A class member, dispatched by pattern match.
#[derive(Clone, Debug)]
pub enum DeclarationMember {
    Method(Arc<Method>),
    Constructor(Arc<Constructor>),
    Field(Field),
}

impl DeclarationMember {
    pub fn name(&self) -> &Identifier {
        match self {
            DeclarationMember::Method(m) => &m.name,
            DeclarationMember::Constructor(c) => &c.name,
            DeclarationMember::Field(f) => &f.name,
        }
    }

    /// Returns the contract of this member; fields have none.
    pub fn specification(&self) -> Option<&Specification> {
        match self {
            DeclarationMember::Method(m) => Some(&m.specification),
            DeclarationMember::Constructor(c) => Some(&c.specification),
            DeclarationMember::Field(_) => None,
        }
    }

    pub fn params(&self) -> &[Parameter] {
        match self {
            DeclarationMember::Method(m) => &m.params,
            DeclarationMember::Constructor(c) => &c.params,
            DeclarationMember::Field(_) => &[],
        }
    }

    pub fn return_ty(&self) -> RuntimeType {
        match self {
            DeclarationMember::Method(m) => m.return_ty.clone(),
            DeclarationMember::Constructor(c) => RuntimeType::Reference(c.name.clone()),
            DeclarationMember::Field(f) => f.ty.clone(),
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            DeclarationMember::Method(m) => m.is_static,
            DeclarationMember::Constructor(_) => false,
            DeclarationMember::Field(_) => false,
        }
    }
}
