// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The type-resolution oracle consumed by the transformer.
//!
//! Parsing and type checking happen outside this crate. The transformer only
//! asks narrow questions about nodes it walks — "what is the type here",
//! "which symbol does this identifier resolve to", "what signature does this
//! call use" — through the [`TypeOracle`] trait.
//!
//! All trait methods have permissive defaults (everything is `any`, nothing
//! resolves), so a transformer wired to [`NullOracle`] still produces output;
//! it just loses the type-directed lowerings (1-based index adjustment,
//! intrinsic dispatch, const-enum folding).

use crate::ast::NodeId;
use serde::{Deserialize, Serialize};

/// Opaque checker-side symbol identity.
///
/// Distinct from [`crate::symbols::SymbolId`], which is the transformer's own
/// per-file numbering; the tracker maps one to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolHandle(pub u64);

/// Whether a function-type value receives an implicit `this`/`self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContextType {
    /// Not a function type.
    #[default]
    None,
    /// No implicit context parameter (`@noSelf` or explicit `this: void`).
    Void,
    /// An implicit context parameter is expected.
    NonVoid,
    /// A union mixing void and non-void contexts (conversion error fodder).
    Mixed,
}

impl ContextType {
    /// Combines contexts from multiple signatures or union members.
    pub fn merge(self, other: ContextType) -> ContextType {
        match (self, other) {
            (ContextType::None, c) | (c, ContextType::None) => c,
            (a, b) if a == b => a,
            _ => ContextType::Mixed,
        }
    }
}

/// A resolved type as the oracle reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    /// The shape of the type.
    pub kind: TypeKind,
}

/// The closed set of type shapes the transformer distinguishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    /// `any`
    Any,
    /// `unknown`
    Unknown,
    /// `never`
    Never,
    /// `void`
    Void,
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `number`
    Number,
    /// `string`
    String,
    /// A structural object type.
    Object,
    /// `T[]`
    Array(Box<Type>),
    /// A fixed-arity tuple.
    Tuple(Vec<Type>),
    /// A callable type with a single relevant signature.
    Function(Box<Signature>),
    /// A union of types.
    Union(Vec<Type>),
    /// A literal string type.
    StringLiteral(String),
    /// A literal number type.
    NumberLiteral(f64),
    /// A literal boolean type.
    BooleanLiteral(bool),
    /// A nominal reference such as `Map`, `Set`, or a user class.
    Reference {
        /// The referenced type's name as the checker prints it.
        name: String,
    },
}

impl Type {
    /// The `any` type.
    pub const ANY: Type = Type { kind: TypeKind::Any };

    /// Creates a type from a kind.
    pub fn new(kind: TypeKind) -> Self {
        Self { kind }
    }

    /// Shorthand for `T[]`.
    pub fn array(element: Type) -> Self {
        Type::new(TypeKind::Array(Box::new(element)))
    }

    /// Shorthand for a number type.
    pub fn number() -> Self {
        Type::new(TypeKind::Number)
    }

    /// Shorthand for a string type.
    pub fn string() -> Self {
        Type::new(TypeKind::String)
    }

    /// True for `string` and string-literal types, including unions of them.
    pub fn is_string_like(&self) -> bool {
        match &self.kind {
            TypeKind::String | TypeKind::StringLiteral(_) => true,
            TypeKind::Union(members) => members.iter().all(Type::is_string_like),
            _ => false,
        }
    }

    /// True for `number` and number-literal types, including unions of them.
    pub fn is_number_like(&self) -> bool {
        match &self.kind {
            TypeKind::Number | TypeKind::NumberLiteral(_) => true,
            TypeKind::Union(members) => members.iter().all(Type::is_number_like),
            _ => false,
        }
    }

    /// True for array and tuple types, including unions of them.
    pub fn is_array_like(&self) -> bool {
        match &self.kind {
            TypeKind::Array(_) | TypeKind::Tuple(_) => true,
            TypeKind::Union(members) => members.iter().all(Type::is_array_like),
            _ => false,
        }
    }

    /// True when the type names the given built-in reference (`Map`, `Set`, …).
    pub fn is_reference_to(&self, name: &str) -> bool {
        matches!(&self.kind, TypeKind::Reference { name: n } if n == name)
    }

    /// True when a value of this type may be `nil` or `false` on the Lua side.
    ///
    /// Lua treats only `nil` and `false` as falsy, so numbers and strings are
    /// always safe; everything nullable, boolean, or unknown is not. Without
    /// strict null checks, any non-literal type may hold `undefined`.
    pub fn lua_falsy_possible(&self, strict_null_checks: bool) -> bool {
        match &self.kind {
            TypeKind::Undefined
            | TypeKind::Null
            | TypeKind::Void
            | TypeKind::Boolean
            | TypeKind::Any
            | TypeKind::Unknown
            | TypeKind::Never => true,
            TypeKind::BooleanLiteral(value) => !*value,
            TypeKind::Union(members) => {
                members.iter().any(|m| m.lua_falsy_possible(strict_null_checks))
            }
            TypeKind::NumberLiteral(_) | TypeKind::StringLiteral(_) => false,
            _ => !strict_null_checks,
        }
    }

    /// The context type of this type's call signatures.
    pub fn context_type(&self) -> ContextType {
        match &self.kind {
            TypeKind::Function(signature) => signature.context,
            TypeKind::Union(members) => members
                .iter()
                .fold(ContextType::None, |acc, m| acc.merge(m.context_type())),
            _ => ContextType::None,
        }
    }
}

/// A resolved call signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Whether callers must pass an implicit context argument.
    pub context: ContextType,
    /// The declared return type.
    pub return_type: Type,
    /// The declaration node carrying this signature's doc directives, if any.
    pub declaration: Option<NodeId>,
    /// Number of declared parameters (used by `@forRange` validation).
    pub parameter_count: usize,
}

impl Signature {
    /// A plain void-context signature returning `any`.
    pub fn plain() -> Self {
        Self {
            context: ContextType::Void,
            return_type: Type::ANY,
            declaration: None,
            parameter_count: 0,
        }
    }

    /// A method-style signature (implicit context) returning `any`.
    pub fn method() -> Self {
        Self { context: ContextType::NonVoid, ..Self::plain() }
    }
}

/// A constant value folded by the checker (const enums, literal types).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    /// A numeric constant.
    Number(f64),
    /// A string constant.
    String(String),
}

/// The capability set the transformer requires from the external checker.
///
/// Every method takes node ids from the tree being transformed. Defaults are
/// maximally permissive so partial oracles stay usable.
pub trait TypeOracle {
    /// The type of an expression or declaration node.
    fn type_of(&self, _node: NodeId) -> Type {
        Type::ANY
    }

    /// The type denoted by a type-annotation node.
    fn type_from_type_node(&self, _node: NodeId) -> Type {
        Type::ANY
    }

    /// The symbol a node resolves to, if any.
    fn symbol_of(&self, _node: NodeId) -> Option<SymbolHandle> {
        None
    }

    /// Declaration nodes of a symbol, in source order.
    fn symbol_declarations(&self, _symbol: SymbolHandle) -> Vec<NodeId> {
        Vec::new()
    }

    /// Symbols exported from a file or namespace scope symbol.
    fn exports_of(&self, _scope: SymbolHandle) -> Vec<SymbolHandle> {
        Vec::new()
    }

    /// The checker's fully qualified name for a symbol (`"Math"`, `"Array.push"`).
    fn fully_qualified_name(&self, _symbol: SymbolHandle) -> Option<String> {
        None
    }

    /// The signature a call expression resolves to.
    fn resolved_signature(&self, _call: NodeId) -> Option<Signature> {
        None
    }

    /// The return type of a signature.
    fn return_type_of_signature(&self, signature: &Signature) -> Type {
        signature.return_type.clone()
    }

    /// Call signatures of a type (empty when not callable).
    fn call_signatures_of_type(&self, ty: &Type) -> Vec<Signature> {
        match &ty.kind {
            TypeKind::Function(signature) => vec![(**signature).clone()],
            TypeKind::Union(members) => members
                .iter()
                .flat_map(|m| self.call_signatures_of_type(m))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The contextual (expected) type at a node, if the checker knows one.
    fn contextual_type(&self, _node: NodeId) -> Option<Type> {
        None
    }

    /// The base constraint of a type parameter, if any.
    fn base_constraint_of(&self, _ty: &Type) -> Option<Type> {
        None
    }

    /// Base types (extends chain) of a class or interface type.
    fn base_types_of(&self, _ty: &Type) -> Vec<Type> {
        Vec::new()
    }

    /// The folded constant value of a property or element access.
    fn constant_value(&self, _node: NodeId) -> Option<ConstantValue> {
        None
    }

    /// Emit-resolver query: does this alias declaration reference a value?
    fn is_value_alias_declaration(&self, _node: NodeId) -> bool {
        true
    }

    /// Emit-resolver query: is this import alias actually referenced?
    fn is_referenced_alias_declaration(&self, _node: NodeId) -> bool {
        true
    }

    /// Emit-resolver query: is this a top-level value import with an entity name?
    fn is_top_level_value_import_with_entity_name(&self, _node: NodeId) -> bool {
        false
    }

    /// Emit-resolver query: does the imported module export any value?
    fn module_exports_some_value(&self, _module: NodeId) -> bool {
        true
    }
}

/// An oracle that knows nothing: every node is `any`, nothing resolves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOracle;

impl TypeOracle for NullOracle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_strings_is_string_like() {
        let ty = Type::new(TypeKind::Union(vec![
            Type::string(),
            Type::new(TypeKind::StringLiteral("a".into())),
        ]));
        assert!(ty.is_string_like());
        assert!(!ty.is_number_like());
    }

    #[test]
    fn falsy_analysis_follows_lua_rules() {
        // Numbers are never falsy in Lua, even 0.
        assert!(!Type::number().lua_falsy_possible(true));
        // Booleans can be false.
        assert!(Type::new(TypeKind::Boolean).lua_falsy_possible(true));
        // Non-literals may be undefined without strict null checks.
        assert!(Type::new(TypeKind::Object).lua_falsy_possible(false));
        assert!(!Type::new(TypeKind::Object).lua_falsy_possible(true));
    }

    #[test]
    fn context_merge_mixes_conflicts() {
        assert_eq!(ContextType::Void.merge(ContextType::Void), ContextType::Void);
        assert_eq!(ContextType::Void.merge(ContextType::NonVoid), ContextType::Mixed);
        assert_eq!(ContextType::None.merge(ContextType::NonVoid), ContextType::NonVoid);
    }

    #[test]
    fn null_oracle_defaults_are_permissive() {
        let oracle = NullOracle;
        assert_eq!(oracle.type_of(NodeId(0)), Type::ANY);
        assert!(oracle.symbol_of(NodeId(0)).is_none());
        assert!(oracle.resolved_signature(NodeId(0)).is_none());
    }
}
