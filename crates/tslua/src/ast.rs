// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree (AST) types for the typed source language.
//!
//! This module defines the data structures that represent a type-checked
//! source file as handed to the transformer. The tree is produced by an
//! external parser/checker; the transformer only reads it.
//!
//! # Structure
//!
//! A [`SourceFile`] contains an ordered list of top-level [`Statement`]s.
//! Every statement and expression carries a [`NodeId`] (the key used for all
//! [`crate::oracle::TypeOracle`] queries) and a [`Span`] for diagnostics.
//!
//! # Node identity
//!
//! Node ids are allocated by the parser through a [`NodeIdAllocator`] and are
//! unique within a compilation. The transformer never mints ids of its own;
//! emitted Lua nodes refer back to these ids as origin pointers.

use serde::{Deserialize, Serialize};

/// Unique identity of a syntax node within a compilation.
///
/// All [`crate::oracle::TypeOracle`] queries are keyed by node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out fresh node ids, one per syntax node.
///
/// Owned by the parser; provided here so that embedders and tests can build
/// trees without inventing their own numbering discipline.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NodeIdAllocator {
    next: u32,
}

impl NodeIdAllocator {
    /// Creates an allocator starting at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused node id.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Source location information for error reporting and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from the start of the source.
    pub start: usize,
    /// Byte offset of the end (exclusive).
    pub end: usize,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

impl Span {
    /// Creates a new source span.
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }
}

/// A doc comment attached to a declaration.
///
/// Two directive syntaxes are carried: free-form text lines (the deprecated
/// `!directive` form) and structured tags (`@directive arg…`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocComment {
    /// Raw text lines of the comment body.
    pub text: Vec<String>,
    /// Structured tags, in source order.
    pub tags: Vec<DocTag>,
}

/// A structured doc tag such as `@tupleReturn` or `@forRange`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocTag {
    /// Tag name without the leading `@`.
    pub name: String,
    /// Remaining tag text, split on whitespace.
    pub arguments: Vec<String>,
}

/// A complete, type-checked source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Node id of the file itself (used for file-level oracle queries).
    pub id: NodeId,
    /// Path of the file, relative or absolute as the host provided it.
    pub path: String,
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
    /// True when the file is a JSON module rather than source code.
    pub is_json: bool,
}

/// An identifier occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    /// Node id of this occurrence.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// The identifier text as written.
    pub text: String,
}

/// A statement node: id, span and the statement payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// The statement payload.
    pub kind: StatementKind,
}

/// All statement forms of the source language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// `let`/`const` declaration, possibly destructuring.
    Variable(VariableDeclaration),
    /// A bare expression evaluated for its effects.
    Expression(Expression),
    /// `function f(…) {…}` declaration.
    Function(FunctionDeclaration),
    /// `class C {…}` declaration.
    Class(ClassDeclaration),
    /// `enum E {…}` declaration.
    Enum(EnumDeclaration),
    /// `namespace N {…}` declaration.
    Namespace(NamespaceDeclaration),
    /// `import …` declaration.
    Import(ImportDeclaration),
    /// `export default …` (unsupported, reported as an error).
    ExportDefault(Expression),
    /// `export … from "m"` re-export declaration.
    ExportDeclaration {
        /// Module specifier when re-exporting from another module.
        module: Option<String>,
    },
    /// `return expr?`.
    Return(Option<Expression>),
    /// `if (…) … else …`.
    If(IfStatement),
    /// `while (…) …`.
    While {
        /// Loop condition.
        condition: Expression,
        /// Loop body.
        body: Block,
    },
    /// `do … while (…)`.
    DoWhile {
        /// Loop body.
        body: Block,
        /// Loop condition, tested after the body.
        condition: Expression,
    },
    /// Classic three-clause `for` loop.
    For(ForStatement),
    /// `for (… of …) …`.
    ForOf(ForOfStatement),
    /// `for (… in …) …`.
    ForIn(ForInStatement),
    /// `switch (…) { case …: … }`.
    Switch(SwitchStatement),
    /// `break`.
    Break,
    /// `continue`.
    Continue,
    /// `try { … } catch { … } finally { … }`.
    Try(TryStatement),
    /// `throw expr`.
    Throw(Expression),
    /// A free-standing `{ … }` block.
    Block(Block),
}

/// A braced statement list with its own lexical scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// Statements in source order.
    pub statements: Vec<Statement>,
}

/// A `let`/`const` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// True when the declaration carries an `export` modifier.
    pub exported: bool,
    /// True for `declare` (ambient) declarations.
    pub ambient: bool,
    /// The declared name or destructuring pattern.
    pub name: BindingName,
    /// Initializer expression, if present.
    pub initializer: Option<Expression>,
}

/// The target of a declaration: a plain name or a destructuring pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingName {
    /// A single identifier.
    Identifier(Identifier),
    /// An array pattern `[a, b = 1, …rest]`. `None` entries are holes.
    ArrayPattern {
        /// Pattern node id.
        id: NodeId,
        /// Pattern elements; `None` marks an elision.
        elements: Vec<Option<BindingElement>>,
    },
    /// An object pattern `{ a, b: c = 1 }`.
    ObjectPattern {
        /// Pattern node id.
        id: NodeId,
        /// Pattern elements.
        elements: Vec<BindingElement>,
    },
}

/// One element of a destructuring pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingElement {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// Source property name for object patterns (`b` in `{ b: c }`).
    pub property_name: Option<String>,
    /// The bound name, possibly a nested pattern.
    pub name: BindingName,
    /// Default value applied when the incoming value is `undefined`.
    pub default: Option<Expression>,
    /// True for a rest element `…rest`.
    pub rest: bool,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// True when exported from the enclosing file or namespace.
    pub exported: bool,
    /// True for `declare` (ambient) declarations and overload signatures.
    pub ambient: bool,
    /// Function name; absent names are an error for declarations.
    pub name: Option<Identifier>,
    /// Parameter list.
    pub parameters: Vec<Parameter>,
    /// Function body; absent for ambient declarations.
    pub body: Option<Block>,
    /// True for generator functions (`function*`).
    pub generator: bool,
}

/// One formal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// The parameter name or destructuring pattern.
    pub name: BindingName,
    /// Default value, if any.
    pub default: Option<Expression>,
    /// True for a rest parameter `…args`.
    pub rest: bool,
    /// True for an explicit `this` parameter (affects context typing only).
    pub this_parameter: bool,
    /// True for constructor parameter properties (`constructor(private x)`).
    pub property: bool,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDeclaration {
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// True when exported from the enclosing file or namespace.
    pub exported: bool,
    /// True for `declare` (ambient) classes.
    pub ambient: bool,
    /// Class name; required unless the class is an extension table.
    pub name: Option<Identifier>,
    /// The `extends` clause expression, if any.
    pub extends: Option<Expression>,
    /// Decorator expressions applied to the class, in source order.
    pub decorators: Vec<Expression>,
    /// Class members in source order.
    pub members: Vec<ClassMember>,
}

/// A member of a class body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// The member payload.
    pub kind: ClassMemberKind,
}

/// The different kinds of class members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMemberKind {
    /// The constructor.
    Constructor {
        /// Parameters, possibly with property modifiers.
        parameters: Vec<Parameter>,
        /// Body; absent for overload signatures.
        body: Option<Block>,
    },
    /// An instance or static method.
    Method {
        /// Member name.
        name: PropertyName,
        /// Parameters.
        parameters: Vec<Parameter>,
        /// Body; absent for overload signatures.
        body: Option<Block>,
        /// True for `static` members.
        is_static: bool,
        /// True for generator methods.
        generator: bool,
    },
    /// An instance or static field.
    Property {
        /// Member name.
        name: PropertyName,
        /// Initializer, if any.
        initializer: Option<Expression>,
        /// True for `static` members.
        is_static: bool,
    },
    /// A `get` accessor.
    Getter {
        /// Member name.
        name: PropertyName,
        /// Body.
        body: Block,
        /// True for `static` members.
        is_static: bool,
    },
    /// A `set` accessor.
    Setter {
        /// Member name.
        name: PropertyName,
        /// The single value parameter.
        parameter: Parameter,
        /// Body.
        body: Block,
        /// True for `static` members.
        is_static: bool,
    },
}

/// A member or property key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyName {
    /// A plain identifier key.
    Identifier(String),
    /// A string literal key.
    String(String),
    /// A numeric literal key.
    Number(f64),
    /// A computed key `[expr]`.
    Computed(Box<Expression>),
}

/// An `enum` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDeclaration {
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// True when exported from the enclosing file or namespace.
    pub exported: bool,
    /// True for `const enum` declarations.
    pub is_const: bool,
    /// Enum name.
    pub name: Identifier,
    /// Members in source order.
    pub members: Vec<EnumMember>,
}

/// One member of an enum declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// Member name.
    pub name: PropertyName,
    /// Explicit initializer, if any.
    pub initializer: Option<Expression>,
}

/// A `namespace N { … }` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDeclaration {
    /// Attached doc comment, if any.
    pub doc: Option<DocComment>,
    /// True when exported from the enclosing file or namespace.
    pub exported: bool,
    /// Namespace name.
    pub name: Identifier,
    /// Body statements.
    pub statements: Vec<Statement>,
}

/// An import declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// The module specifier text.
    pub module: String,
    /// What is imported.
    pub clause: ImportClause,
}

/// The clause of an import declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportClause {
    /// `import "m"` for side effects only.
    SideEffect,
    /// `import * as ns from "m"`.
    Namespace(Identifier),
    /// `import { a, b as c } from "m"`.
    Named(Vec<ImportSpecifier>),
    /// `import d from "m"` (unsupported, reported as an error).
    Default(Identifier),
}

/// One named import binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    /// Node id of the binding.
    pub id: NodeId,
    /// The exported name in the source module.
    pub name: Identifier,
    /// The local alias, when written as `name as alias`.
    pub alias: Option<Identifier>,
}

/// An `if` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    /// Condition expression.
    pub condition: Expression,
    /// Then branch.
    pub then_branch: Block,
    /// Optional else branch; a nested `If` models `else if` chains.
    pub else_branch: Option<Box<Statement>>,
}

/// A classic `for (init; cond; incr)` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    /// Initializer; either a declaration or an expression.
    pub initializer: Option<ForInitializer>,
    /// Loop condition; absent means `true`.
    pub condition: Option<Expression>,
    /// Incrementor expression, run after each iteration.
    pub incrementor: Option<Expression>,
    /// Loop body.
    pub body: Block,
}

/// Initializer clause of a classic `for` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInitializer {
    /// A `let`/`const` declaration scoped to the loop.
    Variable(Box<Statement>),
    /// A bare expression.
    Expression(Expression),
}

/// A `for (… of …)` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForOfStatement {
    /// The declared loop variable or pattern; absent is an error.
    pub variable: Option<BindingName>,
    /// The iterated expression.
    pub expression: Expression,
    /// Loop body.
    pub body: Block,
}

/// A `for (… in …)` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInStatement {
    /// The declared key variable.
    pub variable: Identifier,
    /// The enumerated expression.
    pub expression: Expression,
    /// Loop body.
    pub body: Block,
}

/// A `switch` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatement {
    /// The switched-on expression.
    pub expression: Expression,
    /// Clauses in source order.
    pub clauses: Vec<SwitchClause>,
}

/// One `case`/`default` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchClause {
    /// Node id.
    pub id: NodeId,
    /// Case expression; `None` for the `default` clause.
    pub expression: Option<Expression>,
    /// Clause statements (fall-through is preserved).
    pub statements: Vec<Statement>,
}

/// A `try` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    /// The guarded block.
    pub try_block: Block,
    /// Optional catch clause.
    pub catch: Option<CatchClause>,
    /// Optional finally block.
    pub finally: Option<Block>,
}

/// The catch clause of a `try` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Node id.
    pub id: NodeId,
    /// The caught-value binding; may be omitted.
    pub variable: Option<Identifier>,
    /// Catch body.
    pub block: Block,
}

/// An expression node: id, span and the expression payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Node id.
    pub id: NodeId,
    /// Source location.
    pub span: Span,
    /// The expression payload.
    pub kind: ExpressionKind,
}

/// All expression forms of the source language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// An identifier reference.
    Identifier(Identifier),
    /// A numeric literal.
    Number(f64),
    /// A string literal.
    String(String),
    /// A boolean literal.
    Boolean(bool),
    /// The `null` literal.
    Null,
    /// A template literal `` `a${b}c` ``.
    Template(TemplateLiteral),
    /// A tagged template `` tag`a${b}` ``.
    TaggedTemplate {
        /// The tag function expression.
        tag: Box<Expression>,
        /// The template body.
        template: TemplateLiteral,
    },
    /// An array literal.
    Array(Vec<Expression>),
    /// An object literal.
    Object(Vec<ObjectLiteralMember>),
    /// A function or arrow expression.
    Function(FunctionExpression),
    /// A call `f(args)`.
    Call {
        /// Callee expression.
        callee: Box<Expression>,
        /// Arguments in source order.
        arguments: Vec<Expression>,
    },
    /// A constructor call `new C(args)`.
    New {
        /// Constructed class expression.
        callee: Box<Expression>,
        /// Arguments in source order.
        arguments: Vec<Expression>,
    },
    /// A property access `obj.name`.
    PropertyAccess {
        /// The accessed object.
        object: Box<Expression>,
        /// The property name.
        name: String,
    },
    /// An element access `obj[index]`.
    ElementAccess {
        /// The accessed object.
        object: Box<Expression>,
        /// The index expression.
        index: Box<Expression>,
    },
    /// A binary operation.
    Binary {
        /// Operator.
        op: BinaryOperator,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// A prefix unary operation.
    Unary {
        /// Operator.
        op: UnaryOperator,
        /// Operand.
        operand: Box<Expression>,
    },
    /// `++x`, `x--` and friends.
    Update {
        /// Increment or decrement.
        op: UpdateOperator,
        /// True for the prefix form.
        prefix: bool,
        /// The updated target.
        target: Box<Expression>,
    },
    /// An assignment, possibly compound (`+=`).
    Assignment {
        /// The compound operator; `None` for plain `=`.
        op: Option<BinaryOperator>,
        /// Assignment target (identifier, access, or destructuring literal).
        target: Box<Expression>,
        /// Assigned value.
        value: Box<Expression>,
    },
    /// A conditional `cond ? a : b`.
    Conditional {
        /// Condition.
        condition: Box<Expression>,
        /// Value when truthy.
        when_true: Box<Expression>,
        /// Value when falsy.
        when_false: Box<Expression>,
    },
    /// `typeof expr`.
    TypeOf(Box<Expression>),
    /// `delete expr`.
    Delete(Box<Expression>),
    /// `yield expr?` inside a generator.
    Yield(Option<Box<Expression>>),
    /// A spread `…expr` in call arguments or array literals.
    Spread(Box<Expression>),
    /// The `this` keyword.
    This,
    /// The `super` keyword.
    Super,
    /// An elided element in a destructuring array literal.
    Omitted,
}

/// A template literal: a head string followed by (expression, text) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLiteral {
    /// Cooked text before the first substitution.
    pub head: String,
    /// Each substitution with the cooked text following it.
    pub spans: Vec<(Expression, String)>,
    /// Raw text segments (head first), for tagged templates.
    pub raw: Vec<String>,
}

/// A member of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectLiteralMember {
    /// `name: value`.
    Property {
        /// Property key.
        name: PropertyName,
        /// Property value.
        value: Expression,
    },
    /// Shorthand `{ name }`.
    Shorthand(Identifier),
    /// Spread `{ …expr }`.
    Spread(Expression),
    /// `method() { … }`.
    Method {
        /// Method key.
        name: PropertyName,
        /// The method as a function expression.
        function: FunctionExpression,
    },
}

/// A function or arrow expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpression {
    /// Node id of the function itself.
    pub id: NodeId,
    /// Optional name (named function expressions).
    pub name: Option<Identifier>,
    /// Parameters.
    pub parameters: Vec<Parameter>,
    /// Body block.
    pub body: Block,
    /// True for arrow functions (lexical `this`).
    pub arrow: bool,
    /// True for generator functions.
    pub generator: bool,
}

/// Binary operators of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `==` / `===`
    Equal,
    /// `!=` / `!==`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterEqual,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    BitwiseXor,
    /// `<<`
    ShiftLeft,
    /// `>>` (signed; intentionally unsupported on every target)
    ShiftRight,
    /// `>>>`
    ShiftRightUnsigned,
    /// `instanceof`
    InstanceOf,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `-x`
    Negate,
    /// `+x`
    Plus,
    /// `!x`
    Not,
    /// `~x`
    BitwiseNot,
}

/// Increment/decrement operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOperator {
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

impl Expression {
    /// Creates an expression node.
    pub fn new(id: NodeId, span: Span, kind: ExpressionKind) -> Self {
        Self { id, span, kind }
    }

    /// Returns the identifier payload when this expression is one.
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match &self.kind {
            ExpressionKind::Identifier(ident) => Some(ident),
            _ => None,
        }
    }

    /// True when evaluating the expression cannot have side effects.
    ///
    /// Used to decide whether index expressions need caching before reuse.
    pub fn is_effect_free(&self) -> bool {
        match &self.kind {
            ExpressionKind::Identifier(_)
            | ExpressionKind::Number(_)
            | ExpressionKind::String(_)
            | ExpressionKind::Boolean(_)
            | ExpressionKind::Null
            | ExpressionKind::This
            | ExpressionKind::Omitted => true,
            ExpressionKind::Unary { operand, .. } => operand.is_effect_free(),
            ExpressionKind::PropertyAccess { object, .. } => object.is_effect_free(),
            _ => false,
        }
    }
}

impl Statement {
    /// Creates a statement node.
    pub fn new(id: NodeId, span: Span, kind: StatementKind) -> Self {
        Self { id, span, kind }
    }

    /// The doc comment attached to this statement's declaration, if any.
    pub fn doc(&self) -> Option<&DocComment> {
        match &self.kind {
            StatementKind::Variable(decl) => decl.doc.as_ref(),
            StatementKind::Function(decl) => decl.doc.as_ref(),
            StatementKind::Class(decl) => decl.doc.as_ref(),
            StatementKind::Enum(decl) => decl.doc.as_ref(),
            StatementKind::Namespace(decl) => decl.doc.as_ref(),
            _ => None,
        }
    }
}

impl BindingName {
    /// Iterates the identifiers bound by this name or pattern.
    pub fn bound_identifiers(&self) -> Vec<&Identifier> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a Identifier>) {
        match self {
            BindingName::Identifier(ident) => out.push(ident),
            BindingName::ArrayPattern { elements, .. } => {
                for element in elements.iter().flatten() {
                    element.name.collect_identifiers(out);
                }
            }
            BindingName::ObjectPattern { elements, .. } => {
                for element in elements {
                    element.name.collect_identifiers(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_sequential() {
        let mut ids = NodeIdAllocator::new();
        assert_eq!(ids.allocate(), NodeId(0));
        assert_eq!(ids.allocate(), NodeId(1));
    }

    #[test]
    fn binding_patterns_report_bound_identifiers() {
        let mut ids = NodeIdAllocator::new();
        let a = Identifier { id: ids.allocate(), span: Span::default(), text: "a".into() };
        let b = Identifier { id: ids.allocate(), span: Span::default(), text: "b".into() };
        let pattern = BindingName::ObjectPattern {
            id: ids.allocate(),
            elements: vec![
                BindingElement {
                    id: ids.allocate(),
                    span: Span::default(),
                    property_name: None,
                    name: BindingName::Identifier(a),
                    default: None,
                    rest: false,
                },
                BindingElement {
                    id: ids.allocate(),
                    span: Span::default(),
                    property_name: Some("x".into()),
                    name: BindingName::Identifier(b),
                    default: None,
                    rest: false,
                },
            ],
        };
        let names: Vec<_> = pattern.bound_identifiers().iter().map(|i| i.text.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
