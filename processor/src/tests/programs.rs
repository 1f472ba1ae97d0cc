//! The scenario programs, assembled the way a front end would hand them to
//! the engine.

use oox_core::{
    Class, CompilationUnit, Constructor, DeclarationMember, Expression, Field, Invocation, Lhs,
    Method, Parameter, Rhs, RuntimeType, Specification, Statement, SymbolTable,
    cfg::ControlFlowGraph, ident,
};

use super::Built;

pub(crate) fn build(classes: Vec<Class>) -> Built {
    let unit = CompilationUnit::new(classes);
    let cfg = ControlFlowGraph::lower(&unit);
    let table = SymbolTable::build(&unit);
    Built { unit, cfg, table }
}

fn method(
    is_static: bool,
    name: &str,
    return_ty: RuntimeType,
    params: Vec<Parameter>,
    specification: Specification,
    body: Vec<Statement>,
) -> DeclarationMember {
    DeclarationMember::Method(
        Method { is_static, return_ty, name: ident(name), params, specification, body }.into(),
    )
}

fn static_method(
    name: &str,
    return_ty: RuntimeType,
    params: Vec<Parameter>,
    body: Vec<Statement>,
) -> DeclarationMember {
    method(true, name, return_ty, params, Specification::default(), body)
}

fn empty_constructor(class: &str) -> DeclarationMember {
    DeclarationMember::Constructor(
        Constructor {
            name: ident(class),
            params: vec![],
            specification: Specification::default(),
            body: vec![],
        }
        .into(),
    )
}

fn int(value: i64) -> Expression {
    Expression::int(value)
}

fn var(name: &str) -> Expression {
    Expression::var(name)
}

fn cell_class() -> Class {
    Class {
        name: ident("Cell"),
        fields: vec![Field::new(RuntimeType::Int, "x")],
        members: vec![empty_constructor("Cell")],
    }
}

fn counter_ref() -> RuntimeType {
    RuntimeType::Reference(ident("Counter"))
}

fn cell_ref() -> RuntimeType {
    RuntimeType::Reference(ident("Cell"))
}

// SEQUENTIAL SCENARIOS
// ================================================================================================

/// `SomeClass`: straight-line arithmetic and symbolic arrays.
pub(crate) fn simple_unit() -> Built {
    let int_array = RuntimeType::array_of(RuntimeType::Int);
    let array_prelude = |assert_rhs: i64| {
        vec![
            Statement::assume(Expression::gte(Expression::size_of("a"), int(1))),
            Statement::assign(Lhs::elem("a", int(0)), Rhs::expr(int(10))),
            Statement::declare(RuntimeType::Int, "y"),
            Statement::assign(Lhs::var("y"), Rhs::elem("a", int(0))),
            Statement::assert(Expression::eq(var("y"), int(assert_rhs))),
        ]
    };
    build(vec![Class {
        name: ident("SomeClass"),
        fields: vec![],
        members: vec![
            static_method(
                "m1",
                RuntimeType::Void,
                vec![Parameter::new(RuntimeType::Int, "x")],
                vec![
                    Statement::assume(Expression::lt(var("x"), int(10))),
                    Statement::assign(Lhs::var("x"), Rhs::expr(Expression::plus(var("x"), int(1)))),
                    Statement::assert(Expression::lte(var("x"), int(10))),
                ],
            ),
            static_method(
                "m1Invalid",
                RuntimeType::Void,
                vec![Parameter::new(RuntimeType::Int, "x")],
                vec![
                    Statement::assume(Expression::lt(var("x"), int(10))),
                    Statement::assign(Lhs::var("x"), Rhs::expr(Expression::plus(var("x"), int(1)))),
                    Statement::assert(Expression::lt(var("x"), int(10))),
                ],
            ),
            static_method(
                "m3",
                RuntimeType::Void,
                vec![Parameter::new(int_array.clone(), "a")],
                array_prelude(10),
            ),
            static_method(
                "m3Invalid",
                RuntimeType::Void,
                vec![Parameter::new(int_array.clone(), "a")],
                array_prelude(5),
            ),
            static_method(
                "allPositive",
                RuntimeType::Void,
                vec![Parameter::new(int_array.clone(), "a")],
                vec![
                    Statement::assume(Expression::eq(Expression::size_of("a"), int(2))),
                    Statement::assume(Expression::forall("e", "i", "a", Expression::gte(var("e"), int(0)))),
                    Statement::declare(RuntimeType::Int, "y"),
                    Statement::assign(Lhs::var("y"), Rhs::elem("a", int(0))),
                    Statement::assert(Expression::gte(var("y"), int(0))),
                ],
            ),
            static_method(
                "allPositiveInvalid",
                RuntimeType::Void,
                vec![Parameter::new(int_array, "a")],
                vec![
                    Statement::assume(Expression::eq(Expression::size_of("a"), int(2))),
                    Statement::assume(Expression::forall("e", "i", "a", Expression::gte(var("e"), int(0)))),
                    Statement::declare(RuntimeType::Int, "y"),
                    Statement::assign(Lhs::var("y"), Rhs::elem("a", int(0))),
                    Statement::assert(Expression::gt(var("y"), int(0))),
                ],
            ),
        ],
    }])
}

// CONCURRENT SCENARIOS
// ================================================================================================

/// `Counter` increments with and without locking, forked from `Main`.
pub(crate) fn concurrent_unit() -> Built {
    let counter_body = |locked: bool| {
        let mut body = vec![Statement::declare(RuntimeType::Int, "t")];
        if locked {
            body.push(Statement::lock("c"));
        }
        body.extend([
            Statement::assign(Lhs::var("t"), Rhs::field("c", "v")),
            Statement::assign(Lhs::var("t"), Rhs::expr(Expression::plus(var("t"), int(1)))),
            Statement::assign(Lhs::field("c", "v"), Rhs::expr(var("t"))),
        ]);
        if locked {
            body.push(Statement::unlock("c"));
        }
        body
    };

    let spawn_two = |target_method: &str, shared: bool, expected: i64| {
        let mut body = vec![
            Statement::declare(counter_ref(), "c1"),
            Statement::call(Invocation::constructor("Counter", vec![]), Some(Lhs::var("c1"))),
        ];
        let second = if shared { "c1" } else { "c2" };
        if !shared {
            body.extend([
                Statement::declare(counter_ref(), "c2"),
                Statement::call(Invocation::constructor("Counter", vec![]), Some(Lhs::var("c2"))),
            ]);
        }
        body.extend([
            Statement::fork(Invocation::static_call("Counter", target_method, vec![var("c1")])),
            Statement::fork(Invocation::static_call("Counter", target_method, vec![var(second)])),
            Statement::Join,
            Statement::declare(RuntimeType::Int, "y"),
            Statement::assign(Lhs::var("y"), Rhs::field("c1", "v")),
            Statement::assert(Expression::eq(var("y"), int(expected))),
        ]);
        body
    };

    build(vec![
        Class {
            name: ident("Counter"),
            fields: vec![Field::new(RuntimeType::Int, "v")],
            members: vec![
                empty_constructor("Counter"),
                static_method(
                    "incr",
                    RuntimeType::Void,
                    vec![Parameter::new(counter_ref(), "c")],
                    counter_body(true),
                ),
                static_method(
                    "bump",
                    RuntimeType::Void,
                    vec![Parameter::new(counter_ref(), "c")],
                    counter_body(false),
                ),
            ],
        },
        Class {
            name: ident("Main"),
            fields: vec![],
            members: vec![
                // Two disjoint counters: POR collapses the interleavings.
                static_method("m2", RuntimeType::Void, vec![], spawn_two("incr", false, 1)),
                // A shared counter without locks races.
                static_method(
                    "m3_invalid1",
                    RuntimeType::Void,
                    vec![],
                    spawn_two("bump", true, 2),
                ),
                // A shared counter behind a lock does not.
                static_method("m2_locked", RuntimeType::Void, vec![], spawn_two("incr", true, 2)),
            ],
        },
    ])
}

/// Two threads taking two locks in opposite order.
pub(crate) fn deadlock_unit() -> Built {
    let taker = |first: &str, second: &str| {
        vec![
            Statement::lock(first),
            Statement::lock(second),
            Statement::unlock(second),
            Statement::unlock(first),
        ]
    };
    let two_cells = |v: &str| Parameter::new(cell_ref(), v);
    build(vec![
        cell_class(),
        Class {
            name: ident("Main"),
            fields: vec![],
            members: vec![
                static_method(
                    "main",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(cell_ref(), "a"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("a"))),
                        Statement::declare(cell_ref(), "b"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("b"))),
                        Statement::fork(Invocation::static_call("Main", "t1", vec![var("a"), var("b")])),
                        Statement::fork(Invocation::static_call("Main", "t2", vec![var("a"), var("b")])),
                    ],
                ),
                static_method(
                    "t1",
                    RuntimeType::Void,
                    vec![two_cells("x"), two_cells("y")],
                    taker("x", "y"),
                ),
                static_method(
                    "t2",
                    RuntimeType::Void,
                    vec![two_cells("x"), two_cells("y")],
                    taker("y", "x"),
                ),
            ],
        },
    ])
}

/// Three philosophers, three forks, circular acquisition order.
pub(crate) fn philosophers_unit() -> Built {
    build(vec![
        cell_class(),
        Class {
            name: ident("Main"),
            fields: vec![],
            members: vec![
                static_method(
                    "main",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(cell_ref(), "f0"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("f0"))),
                        Statement::declare(cell_ref(), "f1"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("f1"))),
                        Statement::declare(cell_ref(), "f2"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("f2"))),
                        Statement::fork(Invocation::static_call("Main", "phil", vec![var("f0"), var("f1")])),
                        Statement::fork(Invocation::static_call("Main", "phil", vec![var("f1"), var("f2")])),
                        Statement::fork(Invocation::static_call("Main", "phil", vec![var("f2"), var("f0")])),
                    ],
                ),
                static_method(
                    "phil",
                    RuntimeType::Void,
                    vec![
                        Parameter::new(cell_ref(), "left"),
                        Parameter::new(cell_ref(), "right"),
                    ],
                    vec![
                        Statement::lock("left"),
                        Statement::lock("right"),
                        Statement::unlock("right"),
                        Statement::unlock("left"),
                    ],
                ),
            ],
        },
    ])
}

// LOCKS, NULLS, EXCEPTIONS, CONTRACTS
// ================================================================================================

/// Lock edge cases: re-entrancy, null targets, release on despawn.
pub(crate) fn locks_unit() -> Built {
    build(vec![
        cell_class(),
        Class {
            name: ident("Main"),
            fields: vec![],
            members: vec![
                static_method(
                    "relock",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(cell_ref(), "c"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("c"))),
                        Statement::lock("c"),
                        Statement::lock("c"),
                        Statement::unlock("c"),
                    ],
                ),
                static_method(
                    "lockNull",
                    RuntimeType::Void,
                    vec![],
                    vec![Statement::declare(cell_ref(), "c"), Statement::lock("c")],
                ),
                static_method(
                    "lockLeak",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(cell_ref(), "c"),
                        Statement::call(Invocation::constructor("Cell", vec![]), Some(Lhs::var("c"))),
                        Statement::fork(Invocation::static_call("Main", "locker", vec![var("c")])),
                        Statement::Join,
                        Statement::lock("c"),
                        Statement::unlock("c"),
                    ],
                ),
                static_method(
                    "locker",
                    RuntimeType::Void,
                    vec![Parameter::new(cell_ref(), "c")],
                    vec![Statement::lock("c")],
                ),
                static_method(
                    "assertNotNull",
                    RuntimeType::Void,
                    vec![Parameter::new(cell_ref(), "c")],
                    vec![Statement::assert(Expression::neq(var("c"), Expression::null()))],
                ),
            ],
        },
    ])
}

/// Throwing, catching, and exceptional contracts.
pub(crate) fn exceptions_unit() -> Built {
    build(vec![Class {
        name: ident("Main"),
        fields: vec![],
        members: vec![
            static_method("thrower", RuntimeType::Void, vec![], vec![Statement::throw("boom")]),
            method(
                true,
                "throwerBad",
                RuntimeType::Void,
                vec![],
                Specification { exceptional: Some(Expression::bool(false)), ..Default::default() },
                vec![Statement::throw("boom")],
            ),
            static_method(
                "safe",
                RuntimeType::Void,
                vec![],
                vec![
                    Statement::declare(RuntimeType::Int, "y"),
                    Statement::Try {
                        body: vec![Statement::call(
                            Invocation::static_call("Main", "thrower", vec![]),
                            None,
                        )],
                        catch: vec![Statement::assign(Lhs::var("y"), Rhs::expr(int(1)))],
                    },
                    Statement::assert(Expression::eq(var("y"), int(1))),
                ],
            ),
            static_method(
                "unhandled",
                RuntimeType::Void,
                vec![],
                vec![
                    Statement::call(Invocation::static_call("Main", "thrower", vec![]), None),
                    // Unreachable: the exception terminates the thread first.
                    Statement::assert(Expression::bool(false)),
                ],
            ),
            static_method(
                "violates",
                RuntimeType::Void,
                vec![],
                vec![Statement::call(Invocation::static_call("Main", "throwerBad", vec![]), None)],
            ),
            static_method(
                "indirect",
                RuntimeType::Void,
                vec![],
                vec![Statement::call(Invocation::static_call("Main", "thrower", vec![]), None)],
            ),
            // The throw unwinds two frames before reaching the handler.
            static_method(
                "caughtTwoFramesUp",
                RuntimeType::Void,
                vec![],
                vec![
                    Statement::declare(RuntimeType::Int, "y"),
                    Statement::Try {
                        body: vec![
                            Statement::call(
                                Invocation::static_call("Main", "indirect", vec![]),
                                None,
                            ),
                        ],
                        catch: vec![Statement::assign(Lhs::var("y"), Rhs::expr(int(7)))],
                    },
                    Statement::assert(Expression::eq(var("y"), int(7))),
                ],
            ),
        ],
    }])
}

/// Instance methods, constructors, and requires/ensures contracts.
pub(crate) fn members_unit() -> Built {
    build(vec![
        Class {
            name: ident("Acc"),
            fields: vec![Field::new(RuntimeType::Int, "n")],
            members: vec![
                empty_constructor("Acc"),
                method(
                    false,
                    "add",
                    RuntimeType::Void,
                    vec![Parameter::new(RuntimeType::Int, "k")],
                    Specification::default(),
                    vec![
                        Statement::declare(RuntimeType::Int, "t"),
                        Statement::assign(Lhs::var("t"), Rhs::field("this", "n")),
                        Statement::assign(Lhs::var("t"), Rhs::expr(Expression::plus(var("t"), var("k")))),
                        Statement::assign(Lhs::field("this", "n"), Rhs::expr(var("t"))),
                    ],
                ),
            ],
        },
        Class {
            name: ident("Main"),
            fields: vec![],
            members: vec![
                static_method(
                    "useAcc",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(RuntimeType::Reference(ident("Acc")), "a"),
                        Statement::call(Invocation::constructor("Acc", vec![]), Some(Lhs::var("a"))),
                        Statement::call(
                            Invocation::instance_call("a", "Acc", "add", vec![int(5)]),
                            None,
                        ),
                        Statement::declare(RuntimeType::Int, "y"),
                        Statement::assign(Lhs::var("y"), Rhs::field("a", "n")),
                        Statement::assert(Expression::eq(var("y"), int(5))),
                    ],
                ),
                method(
                    true,
                    "incPos",
                    RuntimeType::Int,
                    vec![Parameter::new(RuntimeType::Int, "x")],
                    Specification {
                        requires: Some(Expression::gt(var("x"), int(0))),
                        ensures: Some(Expression::gt(var("retval"), int(1))),
                        exceptional: None,
                    },
                    vec![Statement::ret(Expression::plus(var("x"), int(1)))],
                ),
                method(
                    true,
                    "incPosBad",
                    RuntimeType::Int,
                    vec![Parameter::new(RuntimeType::Int, "x")],
                    Specification {
                        requires: Some(Expression::gt(var("x"), int(0))),
                        ensures: Some(Expression::gt(var("retval"), int(2))),
                        exceptional: None,
                    },
                    vec![Statement::ret(Expression::plus(var("x"), int(1)))],
                ),
                static_method(
                    "callerOk",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(RuntimeType::Int, "w"),
                        Statement::call(
                            Invocation::static_call("Main", "incPos", vec![int(5)]),
                            Some(Lhs::var("w")),
                        ),
                        Statement::assert(Expression::eq(var("w"), int(6))),
                    ],
                ),
                static_method(
                    "callerBad",
                    RuntimeType::Void,
                    vec![],
                    vec![
                        Statement::declare(RuntimeType::Int, "w"),
                        Statement::call(
                            Invocation::static_call("Main", "incPos", vec![int(0)]),
                            Some(Lhs::var("w")),
                        ),
                    ],
                ),
            ],
        },
    ])
}

/// Branching and loops, for depth and control-flow coverage.
pub(crate) fn control_unit() -> Built {
    build(vec![Class {
        name: ident("Main"),
        fields: vec![],
        members: vec![
            static_method(
                "absValid",
                RuntimeType::Void,
                vec![Parameter::new(RuntimeType::Int, "x")],
                vec![
                    Statement::declare(RuntimeType::Int, "y"),
                    Statement::Ite {
                        guard: Expression::lt(var("x"), int(0)),
                        if_true: vec![Statement::assign(Lhs::var("y"), Rhs::expr(Expression::neg(var("x"))))],
                        if_false: vec![Statement::assign(Lhs::var("y"), Rhs::expr(var("x")))],
                    },
                    Statement::assert(Expression::gte(var("y"), int(0))),
                ],
            ),
            static_method(
                "countToThree",
                RuntimeType::Void,
                vec![],
                vec![
                    Statement::declare(RuntimeType::Int, "i"),
                    Statement::While {
                        guard: Expression::lt(var("i"), int(3)),
                        body: vec![Statement::assign(
                            Lhs::var("i"),
                            Rhs::expr(Expression::plus(var("i"), int(1))),
                        )],
                    },
                    Statement::assert(Expression::eq(var("i"), int(3))),
                ],
            ),
        ],
    }])
}
