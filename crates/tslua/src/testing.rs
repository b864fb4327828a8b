// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Shared test scaffolding: a compact tree builder and a recording oracle.
//!
//! The builder hands every node a fresh id and a synthetic, strictly
//! increasing source position, so hoisting decisions behave as they would on
//! real input. The oracle is a plain map-backed [`TypeOracle`] that tests
//! preload with exactly the facts a scenario needs.

use crate::ast::*;
use crate::oracle::{ConstantValue, Signature, SymbolHandle, Type, TypeOracle};
use std::collections::HashMap;

/// Builds source trees with sequential ids and positions.
#[derive(Default)]
pub(crate) struct AstBuilder {
    ids: NodeIdAllocator,
    position: usize,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn span(&mut self) -> Span {
        self.position += 10;
        Span::new(self.position, self.position + 1, 1, self.position)
    }

    fn node(&mut self) -> (NodeId, Span) {
        (self.ids.allocate(), self.span())
    }

    // ---- expressions ----

    pub fn expr(&mut self, kind: ExpressionKind) -> Expression {
        let (id, span) = self.node();
        Expression::new(id, span, kind)
    }

    pub fn num(&mut self, value: f64) -> Expression {
        self.expr(ExpressionKind::Number(value))
    }

    pub fn str(&mut self, value: &str) -> Expression {
        self.expr(ExpressionKind::String(value.to_string()))
    }

    pub fn ident(&mut self, text: &str) -> Identifier {
        let (id, span) = self.node();
        Identifier { id, span, text: text.to_string() }
    }

    pub fn ident_expr(&mut self, text: &str) -> Expression {
        let identifier = self.ident(text);
        let span = identifier.span;
        Expression::new(self.ids.allocate(), span, ExpressionKind::Identifier(identifier))
    }

    pub fn array(&mut self, elements: Vec<Expression>) -> Expression {
        self.expr(ExpressionKind::Array(elements))
    }

    pub fn this(&mut self) -> Expression {
        self.expr(ExpressionKind::This)
    }

    pub fn prop(&mut self, object: Expression, name: &str) -> Expression {
        self.expr(ExpressionKind::PropertyAccess {
            object: Box::new(object),
            name: name.to_string(),
        })
    }

    pub fn elem(&mut self, object: Expression, index: Expression) -> Expression {
        self.expr(ExpressionKind::ElementAccess {
            object: Box::new(object),
            index: Box::new(index),
        })
    }

    pub fn call(&mut self, callee: Expression, arguments: Vec<Expression>) -> Expression {
        self.expr(ExpressionKind::Call { callee: Box::new(callee), arguments })
    }

    pub fn new_expr(&mut self, callee: Expression, arguments: Vec<Expression>) -> Expression {
        self.expr(ExpressionKind::New { callee: Box::new(callee), arguments })
    }

    pub fn binary(&mut self, op: BinaryOperator, left: Expression, right: Expression) -> Expression {
        self.expr(ExpressionKind::Binary { op, left: Box::new(left), right: Box::new(right) })
    }

    pub fn assign(&mut self, target: Expression, value: Expression) -> Expression {
        self.expr(ExpressionKind::Assignment {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    // ---- statements ----

    pub fn stmt(&mut self, kind: StatementKind) -> Statement {
        let (id, span) = self.node();
        Statement::new(id, span, kind)
    }

    pub fn block(&mut self, statements: Vec<Statement>) -> Block {
        let (id, span) = self.node();
        Block { id, span, statements }
    }

    pub fn var(&mut self, name: &str, initializer: Option<Expression>) -> Statement {
        let identifier = self.ident(name);
        self.stmt(StatementKind::Variable(VariableDeclaration {
            doc: None,
            exported: false,
            ambient: false,
            name: BindingName::Identifier(identifier),
            initializer,
        }))
    }

    pub fn exported_var(&mut self, name: &str, initializer: Expression) -> Statement {
        let identifier = self.ident(name);
        self.stmt(StatementKind::Variable(VariableDeclaration {
            doc: None,
            exported: true,
            ambient: false,
            name: BindingName::Identifier(identifier),
            initializer: Some(initializer),
        }))
    }

    pub fn expr_stmt(&mut self, expression: Expression) -> Statement {
        self.stmt(StatementKind::Expression(expression))
    }

    pub fn ret(&mut self, expression: Option<Expression>) -> Statement {
        self.stmt(StatementKind::Return(expression))
    }

    pub fn parameter(&mut self, name: &str) -> Parameter {
        let identifier = self.ident(name);
        let (id, span) = self.node();
        Parameter {
            id,
            span,
            doc: None,
            name: BindingName::Identifier(identifier),
            default: None,
            rest: false,
            this_parameter: false,
            property: false,
        }
    }

    pub fn raw_function(
        &mut self,
        parameters: Vec<Parameter>,
        body: Block,
        generator: bool,
    ) -> FunctionExpression {
        let (id, _) = self.node();
        FunctionExpression { id, name: None, parameters, body, arrow: false, generator }
    }

    pub fn function_expr(
        &mut self,
        parameters: Vec<Parameter>,
        body: Block,
        generator: bool,
    ) -> Expression {
        let function = self.raw_function(parameters, body, generator);
        self.expr(ExpressionKind::Function(function))
    }

    pub fn function_decl(
        &mut self,
        name: &str,
        parameters: Vec<Parameter>,
        body: Block,
        generator: bool,
    ) -> Statement {
        let identifier = self.ident(name);
        self.stmt(StatementKind::Function(FunctionDeclaration {
            doc: None,
            exported: false,
            ambient: false,
            name: Some(identifier),
            parameters,
            body: Some(body),
            generator,
        }))
    }

    pub fn boolean(&mut self, value: bool) -> Expression {
        self.expr(ExpressionKind::Boolean(value))
    }

    pub fn class_member(&mut self, kind: ClassMemberKind) -> ClassMember {
        let (id, span) = self.node();
        ClassMember { id, span, doc: None, kind }
    }

    pub fn catch(&mut self, variable: Option<Identifier>, block: Block) -> CatchClause {
        let (id, _) = self.node();
        CatchClause { id, variable, block }
    }

    pub fn switch_clause(
        &mut self,
        expression: Option<Expression>,
        statements: Vec<Statement>,
    ) -> SwitchClause {
        let (id, _) = self.node();
        SwitchClause { id, expression, statements }
    }

    pub fn binding_element(
        &mut self,
        property_name: Option<&str>,
        name: BindingName,
        default: Option<Expression>,
    ) -> BindingElement {
        let (id, span) = self.node();
        BindingElement {
            id,
            span,
            property_name: property_name.map(str::to_string),
            name,
            default,
            rest: false,
        }
    }

    pub fn object_pattern(&mut self, elements: Vec<BindingElement>) -> BindingName {
        let (id, _) = self.node();
        BindingName::ObjectPattern { id, elements }
    }

    pub fn file(&mut self, statements: Vec<Statement>) -> SourceFile {
        SourceFile {
            id: self.ids.allocate(),
            path: "main.ts".to_string(),
            statements,
            is_json: false,
        }
    }
}

/// A map-backed oracle preloaded by tests.
#[derive(Default)]
pub(crate) struct TestOracle {
    pub types: HashMap<NodeId, Type>,
    pub symbols: HashMap<NodeId, SymbolHandle>,
    pub declarations: HashMap<SymbolHandle, Vec<NodeId>>,
    pub exports: HashMap<SymbolHandle, Vec<SymbolHandle>>,
    pub signatures: HashMap<NodeId, Signature>,
    pub constants: HashMap<NodeId, ConstantValue>,
    pub contextual: HashMap<NodeId, Type>,
}

impl TestOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(&mut self, node: NodeId, ty: Type) {
        self.types.insert(node, ty);
    }

    /// Types an expression node (spans the identifier inside, too).
    pub fn type_expression(&mut self, expression: &Expression, ty: Type) {
        self.set_type(expression.id, ty.clone());
        if let Some(identifier) = expression.as_identifier() {
            self.set_type(identifier.id, ty);
        }
    }

    pub fn set_symbol(&mut self, node: NodeId, symbol: SymbolHandle) {
        self.symbols.insert(node, symbol);
    }

    pub fn set_exports(&mut self, scope: SymbolHandle, exported: Vec<SymbolHandle>) {
        self.exports.insert(scope, exported);
    }

    pub fn set_signature(&mut self, call: NodeId, signature: Signature) {
        self.signatures.insert(call, signature);
    }
}

impl TypeOracle for TestOracle {
    fn type_of(&self, node: NodeId) -> Type {
        self.types.get(&node).cloned().unwrap_or(Type::ANY)
    }

    fn symbol_of(&self, node: NodeId) -> Option<SymbolHandle> {
        self.symbols.get(&node).copied()
    }

    fn symbol_declarations(&self, symbol: SymbolHandle) -> Vec<NodeId> {
        self.declarations.get(&symbol).cloned().unwrap_or_default()
    }

    fn exports_of(&self, scope: SymbolHandle) -> Vec<SymbolHandle> {
        self.exports.get(&scope).cloned().unwrap_or_default()
    }

    fn resolved_signature(&self, call: NodeId) -> Option<Signature> {
        self.signatures.get(&call).cloned()
    }

    fn constant_value(&self, node: NodeId) -> Option<ConstantValue> {
        self.constants.get(&node).cloned()
    }

    fn contextual_type(&self, node: NodeId) -> Option<Type> {
        self.contextual.get(&node).cloned()
    }
}
