// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the transformer.
//!
//! Every error is fatal for the file being transformed and carries the source
//! [`Span`] of the offending node so the host can render a position. The set
//! of kinds is closed; nothing outside this enum is ever raised.

use crate::ast::Span;
use thiserror::Error;

/// The main error type for transformation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranspileError {
    /// A syntax kind the transformer does not support.
    #[error("unsupported syntax kind {kind} at {span:?}")]
    UnsupportedKind {
        /// Description of the unsupported construct.
        kind: String,
        /// Origin position.
        span: Span,
    },

    /// A built-in property with no Lua lowering.
    #[error("unsupported property {name} at {span:?}")]
    UnsupportedProperty {
        /// The property name.
        name: String,
        /// Origin position.
        span: Span,
    },

    /// A construct unavailable on the configured Lua target.
    #[error("{what} is not supported for the target Lua version at {span:?}")]
    UnsupportedForTarget {
        /// Description of the construct.
        what: String,
        /// Origin position.
        span: Span,
    },

    /// Assignment of an overloaded function to a narrower type.
    #[error("cannot assign an overloaded function here at {span:?}")]
    UnsupportedOverloadAssignment {
        /// Origin position.
        span: Span,
    },

    /// Conversion of a self-taking function to a no-self context.
    #[error("unable to convert function with a 'this' parameter to function without a 'this' parameter at {span:?}")]
    UnsupportedSelfFunctionConversion {
        /// Origin position.
        span: Span,
    },

    /// Conversion of a no-self function to a self-taking context.
    #[error("unable to convert function without a 'this' parameter to function with a 'this' parameter at {span:?}")]
    UnsupportedNoSelfFunctionConversion {
        /// Origin position.
        span: Span,
    },

    /// A non-ambient function without a body.
    #[error("functions without bodies are not supported at {span:?}")]
    UnsupportedFunctionWithoutBody {
        /// Origin position.
        span: Span,
    },

    /// A JSON source file whose content is not a single expression.
    #[error("invalid JSON file content at {span:?}")]
    InvalidJsonFileContent {
        /// Origin position.
        span: Span,
    },

    /// A decorator in a position that cannot be lowered.
    #[error("decorator is not allowed in this context at {span:?}")]
    InvalidDecoratorContext {
        /// Origin position.
        span: Span,
    },

    /// A decorator call with the wrong number of arguments.
    #[error("decorator expects {expected} argument(s) but got {got} at {span:?}")]
    InvalidDecoratorArgumentNumber {
        /// Expected argument count.
        expected: usize,
        /// Received argument count.
        got: usize,
        /// Origin position.
        span: Span,
    },

    /// `@extension` and `@metaExtension` on the same declaration.
    #[error("cannot use both '@extension' and '@metaExtension' at {span:?}")]
    InvalidExtensionMetaExtension {
        /// Origin position.
        span: Span,
    },

    /// An `@extension` class with an `extends` clause.
    #[error("extension classes cannot extend at {span:?}")]
    InvalidExtendsExtension {
        /// Origin position.
        span: Span,
    },

    /// Extending a `@luaTable` class.
    #[error("cannot extend a '@luaTable' class at {span:?}")]
    InvalidExtendsLuaTable {
        /// Origin position.
        span: Span,
    },

    /// `instanceof` against an `@extension` class.
    #[error("'instanceof' is not supported for extension classes at {span:?}")]
    InvalidInstanceOfExtension {
        /// Origin position.
        span: Span,
    },

    /// `instanceof` against a `@luaTable` class.
    #[error("'instanceof' is not supported for '@luaTable' classes at {span:?}")]
    InvalidInstanceOfLuaTable {
        /// Origin position.
        span: Span,
    },

    /// An ambient declaration whose name is not a valid Lua identifier.
    #[error("invalid ambient identifier name '{name}' at {span:?}")]
    InvalidAmbientIdentifierName {
        /// The offending name.
        name: String,
        /// Origin position.
        span: Span,
    },

    /// Exporting an `@extension` class.
    #[error("extension classes cannot be exported at {span:?}")]
    InvalidExportsExtension {
        /// Origin position.
        span: Span,
    },

    /// An export declaration form with no Lua counterpart.
    #[error("invalid export declaration at {span:?}")]
    InvalidExportDeclaration {
        /// Origin position.
        span: Span,
    },

    /// `throw` with a non-string operand.
    #[error("invalid throw expression, only strings can be thrown at {span:?}")]
    InvalidThrowExpression {
        /// Origin position.
        span: Span,
    },

    /// A `@forRange` call outside a for-of head or with bad arity.
    #[error("invalid '@forRange' call at {span:?}")]
    InvalidForRangeCall {
        /// Origin position.
        span: Span,
    },

    /// A built-in property used as a call in an unsupported shape.
    #[error("invalid call to property {name} at {span:?}")]
    InvalidPropertyCall {
        /// The property name.
        name: String,
        /// Origin position.
        span: Span,
    },

    /// An element-access call in an unsupported shape.
    #[error("invalid element call at {span:?}")]
    InvalidElementCall {
        /// Origin position.
        span: Span,
    },

    /// `new` on an `@extension`/`@metaExtension` class.
    #[error("cannot construct an extension class at {span:?}")]
    InvalidNewExpressionOnExtension {
        /// Origin position.
        span: Span,
    },

    /// A class declaration that needs a name but has none.
    #[error("class declarations must have a name at {span:?}")]
    MissingClassName {
        /// Origin position.
        span: Span,
    },

    /// `@metaExtension` without the required extended-type argument.
    #[error("'@metaExtension' requires the name of the metatable to extend at {span:?}")]
    MissingMetaExtension {
        /// Origin position.
        span: Span,
    },

    /// A function declaration without a name.
    #[error("function declarations must have a name at {span:?}")]
    MissingFunctionName {
        /// Origin position.
        span: Span,
    },

    /// A node that should belong to a source file but does not.
    #[error("node is missing a source file at {span:?}")]
    MissingSourceFile {
        /// Origin position.
        span: Span,
    },

    /// A for-of statement without a declared variable.
    #[error("for-of statement is missing its variables at {span:?}")]
    MissingForOfVariables {
        /// Origin position.
        span: Span,
    },

    /// An internal scope-stack query found no scope.
    #[error("internal: no scope of the requested kind is active at {span:?}")]
    UndefinedScope {
        /// Origin position.
        span: Span,
    },

    /// A type node the oracle could not produce.
    #[error("internal: undefined type node at {span:?}")]
    UndefinedTypeNode {
        /// Origin position.
        span: Span,
    },

    /// A recorded function definition disappeared before hoisting.
    #[error("internal: undefined function definition for symbol {symbol} at {span:?}")]
    UndefinedFunctionDefinition {
        /// The transformer-local symbol id.
        symbol: u32,
        /// Origin position.
        span: Span,
    },

    /// An enum mixing string and number initializers.
    #[error("enum {name} mixes string and numeric members at {span:?}")]
    HeterogeneousEnum {
        /// Enum name.
        name: String,
        /// Origin position.
        span: Span,
    },

    /// An `extends` clause that does not resolve to a class.
    #[error("unknown super type at {span:?}")]
    UnknownSuperType {
        /// Origin position.
        span: Span,
    },

    /// An import path that cannot be expressed relative to the root.
    #[error("cannot resolve require path for import {path} at {span:?}")]
    UnresolvableRequirePath {
        /// The import specifier.
        path: String,
        /// Origin position.
        span: Span,
    },

    /// A static class member shadowing a reserved class field.
    #[error("static property name {name} is reserved at {span:?}")]
    ForbiddenStaticClassPropertyName {
        /// The member name.
        name: String,
        /// Origin position.
        span: Span,
    },

    /// A `@luaTable` value used in an unsupported position.
    #[error("invalid use of a '@luaTable' class at {span:?}")]
    ForbiddenLuaTableUseException {
        /// Origin position.
        span: Span,
    },

    /// A `@luaTable` class declared outside a declaration file.
    #[error("'@luaTable' classes must be ambient at {span:?}")]
    ForbiddenLuaTableNonDeclaration {
        /// Origin position.
        span: Span,
    },

    /// A `@luaTable` set-call used as an expression.
    #[error("'@luaTable' set() cannot be used as an expression at {span:?}")]
    ForbiddenLuaTableSetExpression {
        /// Origin position.
        span: Span,
    },

    /// `for … in` over an array-typed value.
    #[error("iterating an array with 'for…in' is not allowed at {span:?}")]
    ForbiddenForIn {
        /// Origin position.
        span: Span,
    },

    /// A rest element in a destructuring pattern.
    #[error("ellipsis destructuring is not supported at {span:?}")]
    ForbiddenEllipsisDestruction {
        /// Origin position.
        span: Span,
    },

    /// Object destructuring of a for-of loop variable.
    #[error("object destructuring in for-of is not supported at {span:?}")]
    UnsupportedObjectDestructuringInForOf {
        /// Origin position.
        span: Span,
    },

    /// A `@luaIterator` for-of without destructured tuple variables.
    #[error("a '@luaIterator' with '@tupleReturn' must be destructured at {span:?}")]
    UnsupportedNonDestructuringLuaIterator {
        /// Origin position.
        span: Span,
    },

    /// An import form with no Lua counterpart.
    #[error("unsupported import type at {span:?}")]
    UnsupportedImportType {
        /// Origin position.
        span: Span,
    },

    /// `export default`.
    #[error("default exports are not supported at {span:?}")]
    UnsupportedDefaultExport {
        /// Origin position.
        span: Span,
    },

    /// `import d from "m"`.
    #[error("default imports are not supported at {span:?}")]
    DefaultImportsNotSupported {
        /// Origin position.
        span: Span,
    },

    /// A symbol read before its declaration where hoisting cannot help.
    #[error("{name} is referenced before its declaration at {span:?}")]
    ReferencedBeforeDeclaration {
        /// The symbol name.
        name: String,
        /// Origin position.
        span: Span,
    },

    /// A cast the transformer cannot honor.
    #[error("could not cast at {span:?}")]
    CouldNotCast {
        /// Origin position.
        span: Span,
    },
}

impl TranspileError {
    /// The origin position carried by every error.
    pub fn span(&self) -> Span {
        use TranspileError::*;
        match self {
            UnsupportedKind { span, .. }
            | UnsupportedProperty { span, .. }
            | UnsupportedForTarget { span, .. }
            | UnsupportedOverloadAssignment { span }
            | UnsupportedSelfFunctionConversion { span }
            | UnsupportedNoSelfFunctionConversion { span }
            | UnsupportedFunctionWithoutBody { span }
            | InvalidJsonFileContent { span }
            | InvalidDecoratorContext { span }
            | InvalidDecoratorArgumentNumber { span, .. }
            | InvalidExtensionMetaExtension { span }
            | InvalidExtendsExtension { span }
            | InvalidExtendsLuaTable { span }
            | InvalidInstanceOfExtension { span }
            | InvalidInstanceOfLuaTable { span }
            | InvalidAmbientIdentifierName { span, .. }
            | InvalidExportsExtension { span }
            | InvalidExportDeclaration { span }
            | InvalidThrowExpression { span }
            | InvalidForRangeCall { span }
            | InvalidPropertyCall { span, .. }
            | InvalidElementCall { span }
            | InvalidNewExpressionOnExtension { span }
            | MissingClassName { span }
            | MissingMetaExtension { span }
            | MissingFunctionName { span }
            | MissingSourceFile { span }
            | MissingForOfVariables { span }
            | UndefinedScope { span }
            | UndefinedTypeNode { span }
            | UndefinedFunctionDefinition { span, .. }
            | HeterogeneousEnum { span, .. }
            | UnknownSuperType { span }
            | UnresolvableRequirePath { span, .. }
            | ForbiddenStaticClassPropertyName { span, .. }
            | ForbiddenLuaTableUseException { span }
            | ForbiddenLuaTableNonDeclaration { span }
            | ForbiddenLuaTableSetExpression { span }
            | ForbiddenForIn { span }
            | ForbiddenEllipsisDestruction { span }
            | UnsupportedObjectDestructuringInForOf { span }
            | UnsupportedNonDestructuringLuaIterator { span }
            | UnsupportedImportType { span }
            | UnsupportedDefaultExport { span }
            | DefaultImportsNotSupported { span }
            | ReferencedBeforeDeclaration { span, .. }
            | CouldNotCast { span } => *span,
        }
    }
}

/// Convenience type alias for Results with [`TranspileError`].
pub type Result<T> = std::result::Result<T, TranspileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_their_span() {
        let span = Span::new(4, 9, 2, 1);
        let error = TranspileError::InvalidThrowExpression { span };
        assert_eq!(error.span(), span);
        assert!(error.to_string().contains("throw"));
    }
}
