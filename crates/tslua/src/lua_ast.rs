// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The emitted Lua syntax tree.
//!
//! A closed model: tagged statement and expression variants plus structural
//! constructors. Every node carries an optional origin pointer (a [`NodeId`]
//! into the source tree) so positions survive into diagnostics and source
//! maps. Traversal is external — the printer walks the tree itself; no
//! visitor protocol is baked in.
//!
//! Well-formedness is enforced by construction: statements cannot appear in
//! expression position, and assignment targets are restricted to identifiers
//! and index accesses by the lowering code.

use crate::ast::NodeId;
use crate::symbols::SymbolId;
use serde::{Deserialize, Serialize};

/// A sequence of Lua statements forming one lexical block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LuaBlock {
    /// Statements in emission order.
    pub statements: Vec<LuaStatement>,
}

impl LuaBlock {
    /// Creates a block from statements.
    pub fn new(statements: Vec<LuaStatement>) -> Self {
        Self { statements }
    }
}

/// An emitted Lua identifier.
///
/// Carries the transformer's symbol id (when the identifier stands for a
/// source symbol) and the original source text when mangling renamed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaIdentifier {
    /// The emitted text.
    pub text: String,
    /// The source symbol this identifier stands for, if any.
    pub symbol: Option<SymbolId>,
    /// The pre-mangling source text, for diagnostics and export lookups.
    pub original: Option<String>,
    /// Origin node in the source tree.
    pub origin: Option<NodeId>,
}

impl LuaIdentifier {
    /// A plain identifier with no symbol attached.
    pub fn named(text: impl Into<String>) -> Self {
        Self { text: text.into(), symbol: None, original: None, origin: None }
    }

    /// An identifier bound to a source symbol.
    pub fn symbolic(text: impl Into<String>, symbol: SymbolId, origin: Option<NodeId>) -> Self {
        Self { text: text.into(), symbol: Some(symbol), original: None, origin }
    }

    /// Clones this identifier, preserving symbol and original text.
    pub fn clone_identifier(&self) -> Self {
        self.clone()
    }
}

/// A Lua statement with its origin pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaStatement {
    /// Origin node in the source tree.
    pub origin: Option<NodeId>,
    /// The statement payload.
    pub kind: LuaStatementKind,
}

/// All Lua statement forms the transformer emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaStatementKind {
    /// `do … end`
    Do(LuaBlock),
    /// `local a, b = x, y`
    LocalDeclaration {
        /// Declared names.
        names: Vec<LuaIdentifier>,
        /// Initializer expressions; may be empty.
        expressions: Vec<LuaExpression>,
    },
    /// `a, b = x, y`
    Assignment {
        /// Assignment targets: identifiers or index accesses only.
        targets: Vec<LuaExpression>,
        /// Assigned expressions.
        expressions: Vec<LuaExpression>,
    },
    /// `if cond then … elseif … else … end`
    If {
        /// Condition.
        condition: LuaExpression,
        /// Then block.
        then_block: LuaBlock,
        /// Else block; a single nested `If` prints as `elseif`.
        else_block: Option<LuaBlock>,
    },
    /// `while cond do … end`
    While {
        /// Condition.
        condition: LuaExpression,
        /// Body.
        body: LuaBlock,
    },
    /// `repeat … until cond`
    Repeat {
        /// Body.
        body: LuaBlock,
        /// Until condition.
        until: LuaExpression,
    },
    /// `for i = start, limit, step do … end`
    NumericFor {
        /// Control variable.
        control: LuaIdentifier,
        /// Start expression.
        start: LuaExpression,
        /// Limit expression.
        limit: LuaExpression,
        /// Optional step expression.
        step: Option<LuaExpression>,
        /// Body.
        body: LuaBlock,
    },
    /// `for a, b in exprs do … end`
    GenericFor {
        /// Bound names.
        names: Vec<LuaIdentifier>,
        /// Iterator expressions.
        expressions: Vec<LuaExpression>,
        /// Body.
        body: LuaBlock,
    },
    /// `return a, b`
    Return(Vec<LuaExpression>),
    /// `break`
    Break,
    /// `goto label`
    Goto(String),
    /// `::label::`
    Label(String),
    /// An expression evaluated as a statement (calls only in valid Lua).
    Expression(LuaExpression),
}

/// A Lua expression with its origin pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaExpression {
    /// Origin node in the source tree.
    pub origin: Option<NodeId>,
    /// The expression payload.
    pub kind: LuaExpressionKind,
}

/// All Lua expression forms the transformer emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaExpressionKind {
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// `...`
    Dots,
    /// A numeric literal.
    Number(f64),
    /// A string literal.
    String(String),
    /// An identifier reference.
    Identifier(LuaIdentifier),
    /// `function(params) … end`
    Function {
        /// Parameter names.
        parameters: Vec<LuaIdentifier>,
        /// True when the function is vararg (`...`).
        vararg: bool,
        /// Body block.
        body: LuaBlock,
    },
    /// A table constructor.
    Table(Vec<LuaTableField>),
    /// A binary operation.
    Binary {
        /// Operator.
        op: LuaBinaryOp,
        /// Left operand.
        left: Box<LuaExpression>,
        /// Right operand.
        right: Box<LuaExpression>,
    },
    /// A unary operation.
    Unary {
        /// Operator.
        op: LuaUnaryOp,
        /// Operand.
        operand: Box<LuaExpression>,
    },
    /// An index access `t[k]` (printed as `t.k` for safe string keys).
    Index {
        /// Indexed table.
        object: Box<LuaExpression>,
        /// Key expression.
        key: Box<LuaExpression>,
    },
    /// A call `f(args)`.
    Call {
        /// Callee.
        function: Box<LuaExpression>,
        /// Arguments.
        arguments: Vec<LuaExpression>,
    },
    /// A method call `obj:name(args)`.
    MethodCall {
        /// Receiver.
        object: Box<LuaExpression>,
        /// Method name (must be a valid Lua identifier).
        method: String,
        /// Arguments.
        arguments: Vec<LuaExpression>,
    },
}

/// One field of a table constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaTableField {
    /// A positional entry `expr`.
    Positional(LuaExpression),
    /// A named entry `name = expr`.
    Named {
        /// Field name.
        key: String,
        /// Field value.
        value: LuaExpression,
    },
    /// A computed entry `[key] = expr`.
    Computed {
        /// Key expression.
        key: LuaExpression,
        /// Field value.
        value: LuaExpression,
    },
}

/// Binary operators of the emitted Lua.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuaBinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `^`
    Pow,
    /// `..`
    Concat,
    /// `==`
    Eq,
    /// `~=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `and`
    And,
    /// `or`
    Or,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `~`
    BitXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
}

/// Unary operators of the emitted Lua.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuaUnaryOp {
    /// `-`
    Neg,
    /// `not`
    Not,
    /// `#`
    Len,
    /// `~`
    BitNot,
}

impl LuaExpression {
    fn with(kind: LuaExpressionKind, origin: Option<NodeId>) -> Self {
        Self { origin, kind }
    }

    /// `nil`
    pub fn nil(origin: Option<NodeId>) -> Self {
        Self::with(LuaExpressionKind::Nil, origin)
    }

    /// A boolean literal.
    pub fn boolean(value: bool, origin: Option<NodeId>) -> Self {
        Self::with(if value { LuaExpressionKind::True } else { LuaExpressionKind::False }, origin)
    }

    /// `...`
    pub fn dots(origin: Option<NodeId>) -> Self {
        Self::with(LuaExpressionKind::Dots, origin)
    }

    /// A numeric literal.
    pub fn number(value: f64, origin: Option<NodeId>) -> Self {
        Self::with(LuaExpressionKind::Number(value), origin)
    }

    /// A string literal.
    pub fn string(value: impl Into<String>, origin: Option<NodeId>) -> Self {
        Self::with(LuaExpressionKind::String(value.into()), origin)
    }

    /// An identifier expression.
    pub fn identifier(identifier: LuaIdentifier) -> Self {
        let origin = identifier.origin;
        Self::with(LuaExpressionKind::Identifier(identifier), origin)
    }

    /// A plain named identifier expression.
    pub fn name(text: impl Into<String>, origin: Option<NodeId>) -> Self {
        let mut ident = LuaIdentifier::named(text);
        ident.origin = origin;
        Self::identifier(ident)
    }

    /// A function expression.
    pub fn function(
        parameters: Vec<LuaIdentifier>,
        vararg: bool,
        body: LuaBlock,
        origin: Option<NodeId>,
    ) -> Self {
        Self::with(LuaExpressionKind::Function { parameters, vararg, body }, origin)
    }

    /// A table constructor.
    pub fn table(fields: Vec<LuaTableField>, origin: Option<NodeId>) -> Self {
        Self::with(LuaExpressionKind::Table(fields), origin)
    }

    /// A binary operation.
    pub fn binary(op: LuaBinaryOp, left: LuaExpression, right: LuaExpression, origin: Option<NodeId>) -> Self {
        Self::with(
            LuaExpressionKind::Binary { op, left: Box::new(left), right: Box::new(right) },
            origin,
        )
    }

    /// A unary operation.
    pub fn unary(op: LuaUnaryOp, operand: LuaExpression, origin: Option<NodeId>) -> Self {
        Self::with(LuaExpressionKind::Unary { op, operand: Box::new(operand) }, origin)
    }

    /// An index access with an arbitrary key.
    pub fn index(object: LuaExpression, key: LuaExpression, origin: Option<NodeId>) -> Self {
        Self::with(
            LuaExpressionKind::Index { object: Box::new(object), key: Box::new(key) },
            origin,
        )
    }

    /// A dotted access `object.field` (field emitted as a string key).
    pub fn dot(object: LuaExpression, field: impl Into<String>, origin: Option<NodeId>) -> Self {
        Self::index(object, LuaExpression::string(field, origin), origin)
    }

    /// A call expression.
    pub fn call(function: LuaExpression, arguments: Vec<LuaExpression>, origin: Option<NodeId>) -> Self {
        Self::with(
            LuaExpressionKind::Call { function: Box::new(function), arguments },
            origin,
        )
    }

    /// A method call `object:method(args)`.
    pub fn method_call(
        object: LuaExpression,
        method: impl Into<String>,
        arguments: Vec<LuaExpression>,
        origin: Option<NodeId>,
    ) -> Self {
        Self::with(
            LuaExpressionKind::MethodCall {
                object: Box::new(object),
                method: method.into(),
                arguments,
            },
            origin,
        )
    }

    /// Sets the origin pointer, returning the modified expression.
    pub fn at(mut self, origin: Option<NodeId>) -> Self {
        self.origin = origin;
        self
    }

    /// True when this expression is a call or method call.
    ///
    /// Only calls are valid Lua expression statements.
    pub fn is_call(&self) -> bool {
        matches!(
            self.kind,
            LuaExpressionKind::Call { .. } | LuaExpressionKind::MethodCall { .. }
        )
    }

    /// True when this expression is valid as an assignment target.
    pub fn is_assignment_target(&self) -> bool {
        matches!(
            self.kind,
            LuaExpressionKind::Identifier(_) | LuaExpressionKind::Index { .. }
        )
    }
}

impl LuaStatement {
    fn with(kind: LuaStatementKind, origin: Option<NodeId>) -> Self {
        Self { origin, kind }
    }

    /// `do … end`
    pub fn do_block(block: LuaBlock, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Do(block), origin)
    }

    /// `local a, b = x, y`
    pub fn local_declaration(
        names: Vec<LuaIdentifier>,
        expressions: Vec<LuaExpression>,
        origin: Option<NodeId>,
    ) -> Self {
        Self::with(LuaStatementKind::LocalDeclaration { names, expressions }, origin)
    }

    /// A single-name local declaration.
    pub fn local_single(
        name: LuaIdentifier,
        expression: Option<LuaExpression>,
        origin: Option<NodeId>,
    ) -> Self {
        Self::local_declaration(vec![name], expression.into_iter().collect(), origin)
    }

    /// `a, b = x, y`
    pub fn assignment(
        targets: Vec<LuaExpression>,
        expressions: Vec<LuaExpression>,
        origin: Option<NodeId>,
    ) -> Self {
        debug_assert!(targets.iter().all(LuaExpression::is_assignment_target));
        Self::with(LuaStatementKind::Assignment { targets, expressions }, origin)
    }

    /// A single-target assignment.
    pub fn assign(target: LuaExpression, value: LuaExpression, origin: Option<NodeId>) -> Self {
        Self::assignment(vec![target], vec![value], origin)
    }

    /// `if cond then … else … end`
    pub fn if_statement(
        condition: LuaExpression,
        then_block: LuaBlock,
        else_block: Option<LuaBlock>,
        origin: Option<NodeId>,
    ) -> Self {
        Self::with(LuaStatementKind::If { condition, then_block, else_block }, origin)
    }

    /// `while cond do … end`
    pub fn while_loop(condition: LuaExpression, body: LuaBlock, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::While { condition, body }, origin)
    }

    /// `repeat … until cond`
    pub fn repeat_loop(body: LuaBlock, until: LuaExpression, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Repeat { body, until }, origin)
    }

    /// `for i = start, limit[, step] do … end`
    pub fn numeric_for(
        control: LuaIdentifier,
        start: LuaExpression,
        limit: LuaExpression,
        step: Option<LuaExpression>,
        body: LuaBlock,
        origin: Option<NodeId>,
    ) -> Self {
        Self::with(LuaStatementKind::NumericFor { control, start, limit, step, body }, origin)
    }

    /// `for a, b in exprs do … end`
    pub fn generic_for(
        names: Vec<LuaIdentifier>,
        expressions: Vec<LuaExpression>,
        body: LuaBlock,
        origin: Option<NodeId>,
    ) -> Self {
        Self::with(LuaStatementKind::GenericFor { names, expressions, body }, origin)
    }

    /// `return a, b`
    pub fn return_statement(expressions: Vec<LuaExpression>, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Return(expressions), origin)
    }

    /// `break`
    pub fn break_statement(origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Break, origin)
    }

    /// `goto label`
    pub fn goto(label: impl Into<String>, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Goto(label.into()), origin)
    }

    /// `::label::`
    pub fn label(label: impl Into<String>, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Label(label.into()), origin)
    }

    /// An expression statement.
    pub fn expression(expression: LuaExpression, origin: Option<NodeId>) -> Self {
        Self::with(LuaStatementKind::Expression(expression), origin)
    }
}

/// Collapses a left-fold of `..` concatenations into one operand list.
///
/// `((a .. b) .. c)` yields `[a, b, c]`; non-concat expressions yield a
/// single-element list.
pub fn flatten_concat(expression: &LuaExpression) -> Vec<&LuaExpression> {
    match &expression.kind {
        LuaExpressionKind::Binary { op: LuaBinaryOp::Concat, left, right } => {
            let mut parts = flatten_concat(left);
            parts.extend(flatten_concat(right));
            parts
        }
        _ => vec![expression],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_identifier_preserves_symbol_and_original() {
        let mut ident = LuaIdentifier::symbolic("x", SymbolId(3), None);
        ident.original = Some("x-y".into());
        let copy = ident.clone_identifier();
        assert_eq!(copy.symbol, Some(SymbolId(3)));
        assert_eq!(copy.original.as_deref(), Some("x-y"));
    }

    #[test]
    fn flatten_concat_collapses_left_folds() {
        let a = LuaExpression::string("a", None);
        let b = LuaExpression::string("b", None);
        let c = LuaExpression::string("c", None);
        let fold = LuaExpression::binary(
            LuaBinaryOp::Concat,
            LuaExpression::binary(LuaBinaryOp::Concat, a, b, None),
            c,
            None,
        );
        let parts = flatten_concat(&fold);
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn only_calls_count_as_statement_expressions() {
        let call = LuaExpression::call(LuaExpression::name("f", None), vec![], None);
        assert!(call.is_call());
        assert!(!LuaExpression::number(1.0, None).is_call());
    }

    #[test]
    fn assignment_targets_are_restricted() {
        assert!(LuaExpression::name("x", None).is_assignment_target());
        let indexed = LuaExpression::dot(LuaExpression::name("t", None), "k", None);
        assert!(indexed.is_assignment_target());
        assert!(!LuaExpression::number(0.0, None).is_assignment_target());
    }

    #[test]
    fn nodes_round_trip_through_json() {
        let statement = LuaStatement::local_single(
            LuaIdentifier::symbolic("x", SymbolId(1), Some(NodeId(9))),
            Some(LuaExpression::binary(
                LuaBinaryOp::Concat,
                LuaExpression::string("a", None),
                LuaExpression::number(1.0, None),
                None,
            )),
            Some(NodeId(9)),
        );
        let json = serde_json::to_string(&statement).expect("serialize");
        let back: LuaStatement = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(statement, back);
    }
}
