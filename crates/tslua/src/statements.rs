// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Statement lowering.
//!
//! Orchestrates block transformation, control-flow lowerings and loop-body
//! labelling. Free-standing blocks become `do … end`; `switch` becomes a
//! goto chain; `try` becomes a `pcall` of a closure with marker returns;
//! `continue` becomes a goto to a label placed before loop re-entry.

use crate::ast::{
    BindingElement, BindingName, Expression, ExpressionKind, ForInitializer, ForOfStatement,
    ForStatement, IfStatement, NodeId, Statement, StatementKind, SwitchStatement, TryStatement,
    VariableDeclaration,
};
use crate::directives::DirectiveKind;
use crate::error::{Result, TranspileError};
use crate::hoist;
use crate::lua_ast::{
    LuaBinaryOp, LuaBlock, LuaExpression, LuaIdentifier, LuaStatement, LuaUnaryOp,
};
use crate::lualib::LuaLibFeature;
use crate::scope::{FunctionDefinitionInfo, ScopeKind};
use crate::transformer::Transformer;

impl<'a> Transformer<'a> {
    /// Lowers one statement into zero or more Lua statements.
    pub(crate) fn transform_statement(&mut self, statement: &Statement) -> Result<Vec<LuaStatement>> {
        if self.directives.node_has(statement.id, DirectiveKind::Phantom) {
            return Ok(Vec::new());
        }

        match &statement.kind {
            StatementKind::Variable(decl) => self.transform_variable_declaration(statement, decl),
            StatementKind::Expression(expression) => {
                self.transform_expression_statement(statement, expression)
            }
            StatementKind::Function(decl) => self.transform_function_declaration(statement, decl),
            StatementKind::Class(decl) => self.transform_class_declaration(statement, decl),
            StatementKind::Enum(decl) => self.transform_enum_declaration(statement, decl),
            StatementKind::Namespace(decl) => self.transform_namespace_declaration(statement, decl),
            StatementKind::Import(decl) => self.transform_import_declaration(statement, decl),
            StatementKind::ExportDefault(_) => {
                Err(TranspileError::UnsupportedDefaultExport { span: statement.span })
            }
            StatementKind::ExportDeclaration { .. } => {
                Err(TranspileError::InvalidExportDeclaration { span: statement.span })
            }
            StatementKind::Return(expression) => self.transform_return(statement, expression),
            StatementKind::If(if_statement) => self.transform_if(statement, if_statement),
            StatementKind::While { condition, body } => {
                let condition = self.transform_expression(condition)?;
                let (body, _) = self.transform_loop_body(body)?;
                Ok(vec![LuaStatement::while_loop(condition, body, Some(statement.id))])
            }
            StatementKind::DoWhile { body, condition } => {
                let (body, _) = self.transform_loop_body(body)?;
                let condition = self.transform_expression(condition)?;
                let until = LuaExpression::unary(LuaUnaryOp::Not, condition, Some(statement.id));
                Ok(vec![LuaStatement::repeat_loop(body, until, Some(statement.id))])
            }
            StatementKind::For(for_statement) => self.transform_for(statement, for_statement),
            StatementKind::ForOf(for_of) => self.transform_for_of(statement, for_of),
            StatementKind::ForIn(for_in) => {
                let expression_type = self.oracle.type_of(for_in.expression.id);
                if expression_type.is_array_like() {
                    return Err(TranspileError::ForbiddenForIn { span: statement.span });
                }
                let key = self.transform_identifier(&for_in.variable);
                let iterated = self.transform_expression(&for_in.expression)?;
                let (body, _) = self.transform_loop_body(&for_in.body)?;
                Ok(vec![LuaStatement::generic_for(
                    vec![key],
                    vec![LuaExpression::call(
                        LuaExpression::name("pairs", None),
                        vec![iterated],
                        Some(statement.id),
                    )],
                    body,
                    Some(statement.id),
                )])
            }
            StatementKind::Switch(switch) => self.transform_switch(statement, switch),
            StatementKind::Break => self.transform_break(statement),
            StatementKind::Continue => self.transform_continue(statement),
            StatementKind::Try(try_statement) => self.transform_try(statement, try_statement),
            StatementKind::Throw(expression) => {
                if !self.throwable_is_string(expression) {
                    return Err(TranspileError::InvalidThrowExpression { span: statement.span });
                }
                let value = self.transform_expression(expression)?;
                Ok(vec![LuaStatement::expression(
                    LuaExpression::call(
                        LuaExpression::name("error", None),
                        vec![value, LuaExpression::number(0.0, None)],
                        Some(statement.id),
                    ),
                    Some(statement.id),
                )])
            }
            StatementKind::Block(block) => {
                let block = self.transform_scoped_block(ScopeKind::Block, block)?;
                Ok(vec![LuaStatement::do_block(block, Some(statement.id))])
            }
        }
    }

    fn throwable_is_string(&self, expression: &Expression) -> bool {
        matches!(
            expression.kind,
            ExpressionKind::String(_) | ExpressionKind::Template(_)
        ) || self.oracle.type_of(expression.id).is_string_like()
    }

    // ---- declarations ----------------------------------------------------

    fn transform_variable_declaration(
        &mut self,
        statement: &Statement,
        decl: &VariableDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        if decl.ambient {
            for identifier in decl.name.bound_identifiers() {
                self.check_ambient_name(identifier)?;
            }
            return Ok(Vec::new());
        }

        let origin = statement.id;
        match &decl.name {
            BindingName::Identifier(identifier) => {
                let initializer = decl
                    .initializer
                    .as_ref()
                    .map(|e| self.transform_expression(e))
                    .transpose()?;

                if decl.exported {
                    let Some(value) = initializer else { return Ok(Vec::new()) };
                    return Ok(vec![LuaStatement::assign(
                        self.export_reference(&identifier.text, Some(origin)),
                        value,
                        Some(origin),
                    )]);
                }

                let name = self.transform_identifier(identifier);
                self.scopes.record_declaration_for(&name, statement.span.start);
                if let Some(symbol) = name.symbol {
                    if matches!(
                        decl.initializer.as_ref().map(|e| &e.kind),
                        Some(ExpressionKind::Function(_))
                    ) {
                        let captures = self.last_function_captures.take().unwrap_or_default();
                        self.scopes.record_function_definition(
                            symbol,
                            FunctionDefinitionInfo {
                                referenced_symbols: captures,
                                position: statement.span.start,
                            },
                        );
                    }
                }
                Ok(vec![LuaStatement::local_single(name, initializer, Some(origin))])
            }
            pattern => {
                let initializer = decl.initializer.as_ref().ok_or_else(|| {
                    TranspileError::UnsupportedKind {
                        kind: "destructuring declaration without initializer".to_string(),
                        span: statement.span,
                    }
                })?;
                self.transform_destructuring_declaration(pattern, initializer, decl.exported, origin)
            }
        }
    }

    /// Lowers `const [a, b] = …` / `const {a} = …`.
    fn transform_destructuring_declaration(
        &mut self,
        pattern: &BindingName,
        initializer: &Expression,
        exported: bool,
        origin: NodeId,
    ) -> Result<Vec<LuaStatement>> {
        if let BindingName::ArrayPattern { elements, .. } = pattern {
            let simple = !exported
                && elements.iter().all(|e| match e {
                    Some(element) => {
                        element.default.is_none()
                            && !element.rest
                            && matches!(element.name, BindingName::Identifier(_))
                    }
                    None => true,
                });
            if simple {
                // `local a, b = <multi-value>`
                let mut names = Vec::new();
                for element in elements {
                    match element {
                        Some(element) => {
                            if let BindingName::Identifier(identifier) = &element.name {
                                let name = self.transform_identifier(identifier);
                                self.scopes.record_declaration_for(&name, identifier.span.start);
                                names.push(name);
                            }
                        }
                        None => names.push(self.temp_identifier()),
                    }
                }
                let values = self.multi_value_initializer(initializer)?;
                return Ok(vec![LuaStatement::local_declaration(names, values, Some(origin))]);
            }
        }

        // General shape: bind the source once, then pick it apart.
        let temp = self.temp_identifier();
        let mut statements = Vec::new();
        let value = match &initializer.kind {
            // A tuple-return call must be boxed back into a table before
            // field-wise destructuring.
            ExpressionKind::Call { .. } if self.is_tuple_return_call(initializer) => {
                LuaExpression::table(
                    vec![crate::lua_ast::LuaTableField::Positional(
                        self.transform_expression(initializer)?,
                    )],
                    Some(origin),
                )
            }
            _ => self.transform_expression(initializer)?,
        };
        statements.push(LuaStatement::local_single(temp.clone(), Some(value), Some(origin)));
        statements.extend(self.destructure_binding_into(
            pattern,
            LuaExpression::identifier(temp),
            exported,
            origin,
        )?);
        Ok(statements)
    }

    fn is_tuple_return_call(&self, expression: &Expression) -> bool {
        self.oracle
            .resolved_signature(expression.id)
            .map(|s| self.directives.signature_has(&s, DirectiveKind::TupleReturn))
            .unwrap_or(false)
    }

    /// The multi-value RHS for an array-pattern declaration.
    fn multi_value_initializer(&mut self, initializer: &Expression) -> Result<Vec<LuaExpression>> {
        if self.is_tuple_return_call(initializer) {
            return Ok(vec![self.transform_expression(initializer)?]);
        }
        let value = self.transform_expression(initializer)?;
        Ok(vec![LuaExpression::call(
            self.unpack_expression(),
            vec![value],
            Some(initializer.id),
        )])
    }

    /// Destructures `source` (an effect-free expression) into the bindings of
    /// a pattern, declaring locals (or export fields when `exported`).
    pub(crate) fn destructure_binding_into(
        &mut self,
        name: &BindingName,
        source: LuaExpression,
        exported: bool,
        origin: NodeId,
    ) -> Result<Vec<LuaStatement>> {
        let mut out = Vec::new();
        match name {
            BindingName::Identifier(identifier) => {
                if exported {
                    out.push(LuaStatement::assign(
                        self.export_reference(&identifier.text, Some(origin)),
                        source,
                        Some(origin),
                    ));
                } else {
                    let local = self.transform_identifier(identifier);
                    self.scopes.record_declaration_for(&local, identifier.span.start);
                    out.push(LuaStatement::local_single(local, Some(source), Some(origin)));
                }
            }
            BindingName::ArrayPattern { elements, .. } => {
                for (index, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    if element.rest {
                        return Err(TranspileError::ForbiddenEllipsisDestruction {
                            span: element.span,
                        });
                    }
                    let item = LuaExpression::index(
                        source.clone(),
                        LuaExpression::number(index as f64 + 1.0, None),
                        Some(element.id),
                    );
                    out.extend(self.destructure_element(element, item, exported, origin)?);
                }
            }
            BindingName::ObjectPattern { elements, .. } => {
                for element in elements {
                    if element.rest {
                        return Err(TranspileError::ForbiddenEllipsisDestruction {
                            span: element.span,
                        });
                    }
                    let key = element.property_name.clone().unwrap_or_else(|| {
                        element
                            .name
                            .bound_identifiers()
                            .first()
                            .map(|i| i.text.clone())
                            .unwrap_or_default()
                    });
                    let item = LuaExpression::dot(source.clone(), key, Some(element.id));
                    out.extend(self.destructure_element(element, item, exported, origin)?);
                }
            }
        }
        Ok(out)
    }

    /// Non-exported variant used for parameters and loop variables.
    pub(crate) fn destructure_binding(
        &mut self,
        name: &BindingName,
        source: LuaExpression,
        origin: NodeId,
    ) -> Result<Vec<LuaStatement>> {
        self.destructure_binding_into(name, source, false, origin)
    }

    fn destructure_element(
        &mut self,
        element: &BindingElement,
        item: LuaExpression,
        exported: bool,
        origin: NodeId,
    ) -> Result<Vec<LuaStatement>> {
        let mut out = Vec::new();
        match (&element.name, &element.default) {
            (BindingName::Identifier(_), None) => {
                out.extend(self.destructure_binding_into(&element.name, item, exported, origin)?);
            }
            (BindingName::Identifier(identifier), Some(default)) => {
                if exported {
                    let target = self.export_reference(&identifier.text, Some(origin));
                    out.push(LuaStatement::assign(target.clone(), item, Some(origin)));
                    let default_value = self.transform_expression(default)?;
                    out.push(LuaStatement::if_statement(
                        LuaExpression::binary(
                            LuaBinaryOp::Eq,
                            target.clone(),
                            LuaExpression::nil(None),
                            Some(origin),
                        ),
                        LuaBlock::new(vec![LuaStatement::assign(
                            target,
                            default_value,
                            Some(origin),
                        )]),
                        None,
                        Some(origin),
                    ));
                } else {
                    let local = self.transform_identifier(identifier);
                    self.scopes.record_declaration_for(&local, identifier.span.start);
                    out.push(LuaStatement::local_single(local.clone(), Some(item), Some(origin)));
                    let default_value = self.transform_expression(default)?;
                    out.push(self.nil_default_assignment(&local, default_value, element.id));
                }
            }
            (nested, default) => {
                // Nested pattern: land the value in a temporary, apply the
                // default, then recurse.
                let temp = self.temp_identifier();
                out.push(LuaStatement::local_single(temp.clone(), Some(item), Some(origin)));
                if let Some(default) = default {
                    let default_value = self.transform_expression(default)?;
                    out.push(self.nil_default_assignment(&temp, default_value, element.id));
                }
                out.extend(self.destructure_binding_into(
                    nested,
                    LuaExpression::identifier(temp),
                    exported,
                    origin,
                )?);
            }
        }
        Ok(out)
    }

    fn transform_function_declaration(
        &mut self,
        statement: &Statement,
        decl: &crate::ast::FunctionDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        let name = decl.name.as_ref().ok_or(TranspileError::MissingFunctionName {
            span: statement.span,
        })?;

        if decl.ambient {
            self.check_ambient_name(name)?;
            return Ok(Vec::new());
        }
        let Some(body) = &decl.body else {
            // Overload signatures carry no body and emit nothing.
            return Ok(Vec::new());
        };

        let context = self.function_context_type(statement.id, &decl.parameters);
        let tuple_return = self.directives.node_has(statement.id, DirectiveKind::TupleReturn);

        if decl.exported {
            let function = self.transform_function_expression(
                statement.id,
                &decl.parameters,
                body,
                context,
                decl.generator,
                tuple_return,
            )?;
            return Ok(vec![LuaStatement::assign(
                self.export_reference(&name.text, Some(statement.id)),
                function,
                Some(statement.id),
            )]);
        }

        let local = self.transform_identifier(name);
        self.scopes.record_declaration_for(&local, statement.span.start);
        let function = self.transform_function_expression(
            statement.id,
            &decl.parameters,
            body,
            context,
            decl.generator,
            tuple_return,
        )?;
        if let Some(symbol) = local.symbol {
            let captures = self.last_function_captures.take().unwrap_or_default();
            self.scopes.record_function_definition(
                symbol,
                FunctionDefinitionInfo {
                    referenced_symbols: captures,
                    position: statement.span.start,
                },
            );
        }
        Ok(vec![LuaStatement::local_single(local, Some(function), Some(statement.id))])
    }

    // ---- expression statements -------------------------------------------

    fn transform_expression_statement(
        &mut self,
        statement: &Statement,
        expression: &Expression,
    ) -> Result<Vec<LuaStatement>> {
        match &expression.kind {
            ExpressionKind::Assignment { op, target, value } => {
                self.transform_assignment_statements(expression, *op, target, value)
            }
            ExpressionKind::Update { op, target, .. } => {
                let lua_op = match op {
                    crate::ast::UpdateOperator::Increment => LuaBinaryOp::Add,
                    crate::ast::UpdateOperator::Decrement => LuaBinaryOp::Sub,
                };
                let mut body = Vec::new();
                let access = self.cached_assignment_target(target, &mut body)?;
                body.push(LuaStatement::assign(
                    access.clone(),
                    LuaExpression::binary(
                        lua_op,
                        access,
                        LuaExpression::number(1.0, None),
                        Some(expression.id),
                    ),
                    Some(statement.id),
                ));
                Ok(body)
            }
            ExpressionKind::Delete(target) => self.transform_delete_statements(target, statement.id),
            ExpressionKind::Call { callee, arguments } => {
                // `t.set(k, v)` on a `@luaTable` value is only legal here, as
                // a raw assignment.
                if let ExpressionKind::PropertyAccess { object, name } = &callee.kind {
                    if name == "set" && self.is_lua_table_object(object) {
                        if arguments.len() != 2 {
                            return Err(TranspileError::InvalidPropertyCall {
                                name: "set".to_string(),
                                span: expression.span,
                            });
                        }
                        let obj = self.transform_expression(object)?;
                        let key = self.transform_expression(&arguments[0])?;
                        let value = self.transform_expression(&arguments[1])?;
                        return Ok(vec![LuaStatement::assign(
                            LuaExpression::index(obj, key, Some(expression.id)),
                            value,
                            Some(statement.id),
                        )]);
                    }
                }
                let call = self.transform_call(expression, callee, arguments)?;
                if call.is_call() {
                    return Ok(vec![LuaStatement::expression(call, Some(statement.id))]);
                }
                // Some call shapes lower to plain expressions (`t.get(k)`,
                // `hasOwnProperty`); those need a statement-legal carrier.
                Ok(vec![LuaStatement::local_single(
                    self.temp_identifier(),
                    Some(call),
                    Some(statement.id),
                )])
            }
            _ => {
                let value = self.transform_expression(expression)?;
                if value.is_call() {
                    return Ok(vec![LuaStatement::expression(value, Some(statement.id))]);
                }
                if expression.is_effect_free() {
                    return Ok(Vec::new());
                }
                // Not a valid Lua statement on its own; evaluate into a
                // throwaway local to preserve effects.
                Ok(vec![LuaStatement::local_single(
                    self.temp_identifier(),
                    Some(value),
                    Some(statement.id),
                )])
            }
        }
    }

    /// Lowers an assignment in statement position.
    pub(crate) fn transform_assignment_statements(
        &mut self,
        expression: &Expression,
        op: Option<crate::ast::BinaryOperator>,
        target: &Expression,
        value: &Expression,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(expression.id);

        if let ExpressionKind::Array(elements) = &target.kind {
            if op.is_some() {
                return Err(TranspileError::UnsupportedKind {
                    kind: "compound destructuring assignment".to_string(),
                    span: expression.span,
                });
            }
            return self.transform_array_destructuring_assignment(expression, elements, value);
        }
        if let ExpressionKind::Object(members) = &target.kind {
            if op.is_some() {
                return Err(TranspileError::UnsupportedKind {
                    kind: "compound destructuring assignment".to_string(),
                    span: expression.span,
                });
            }
            return self.transform_object_destructuring_assignment(expression, members, value);
        }

        let mut body = Vec::new();
        let access = self.cached_assignment_target(target, &mut body)?;
        let new_value = match op {
            None => self.transform_expression(value)?,
            Some(op) => self.compound_value(op, access.clone(), value, target)?,
        };
        body.push(LuaStatement::assign(access, new_value, origin));
        Ok(body)
    }

    fn transform_array_destructuring_assignment(
        &mut self,
        expression: &Expression,
        elements: &[Expression],
        value: &Expression,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(expression.id);
        let mut targets = Vec::new();
        let mut hole = None;
        for element in elements {
            match &element.kind {
                ExpressionKind::Omitted => {
                    let temp = hole.get_or_insert_with(|| self.temp_identifier()).clone();
                    targets.push(LuaExpression::identifier(temp));
                }
                ExpressionKind::Array(_) | ExpressionKind::Object(_) => {
                    return Err(TranspileError::UnsupportedKind {
                        kind: "nested destructuring assignment".to_string(),
                        span: element.span,
                    });
                }
                ExpressionKind::Spread(_) => {
                    return Err(TranspileError::ForbiddenEllipsisDestruction {
                        span: element.span,
                    });
                }
                _ => targets.push(self.transform_expression(element)?),
            }
        }

        let values = self.multi_value_initializer(value)?;
        let mut out = Vec::new();
        if let Some(temp) = hole {
            out.push(LuaStatement::local_single(temp, None, origin));
        }
        out.push(LuaStatement::assignment(targets, values, origin));
        Ok(out)
    }

    fn transform_object_destructuring_assignment(
        &mut self,
        expression: &Expression,
        members: &[crate::ast::ObjectLiteralMember],
        value: &Expression,
    ) -> Result<Vec<LuaStatement>> {
        use crate::ast::ObjectLiteralMember;
        let origin = Some(expression.id);
        let temp = self.temp_identifier();
        let mut out = Vec::new();
        let source = self.transform_expression(value)?;
        out.push(LuaStatement::local_single(temp.clone(), Some(source), origin));

        for member in members {
            match member {
                ObjectLiteralMember::Shorthand(identifier) => {
                    let target = self.transform_identifier_expression(identifier)?;
                    out.push(LuaStatement::assign(
                        target,
                        LuaExpression::dot(
                            LuaExpression::identifier(temp.clone()),
                            identifier.text.clone(),
                            origin,
                        ),
                        origin,
                    ));
                }
                ObjectLiteralMember::Property { name, value } => {
                    let key = match name {
                        crate::ast::PropertyName::Identifier(text)
                        | crate::ast::PropertyName::String(text) => text.clone(),
                        _ => {
                            return Err(TranspileError::UnsupportedKind {
                                kind: "computed key in destructuring assignment".to_string(),
                                span: expression.span,
                            })
                        }
                    };
                    let target = self.transform_expression(value)?;
                    if !target.is_assignment_target() {
                        return Err(TranspileError::UnsupportedKind {
                            kind: "destructuring assignment target".to_string(),
                            span: value.span,
                        });
                    }
                    out.push(LuaStatement::assign(
                        target,
                        LuaExpression::dot(LuaExpression::identifier(temp.clone()), key, origin),
                        origin,
                    ));
                }
                _ => {
                    return Err(TranspileError::UnsupportedKind {
                        kind: "destructuring assignment member".to_string(),
                        span: expression.span,
                    })
                }
            }
        }
        Ok(out)
    }

    /// `delete obj.k` → `obj.k = nil` (with receiver caching when needed).
    pub(crate) fn transform_delete_statements(
        &mut self,
        target: &Expression,
        origin: NodeId,
    ) -> Result<Vec<LuaStatement>> {
        if !matches!(
            target.kind,
            ExpressionKind::PropertyAccess { .. } | ExpressionKind::ElementAccess { .. }
        ) {
            return Err(TranspileError::UnsupportedKind {
                kind: "delete target".to_string(),
                span: target.span,
            });
        }
        let mut body = Vec::new();
        let access = self.cached_assignment_target(target, &mut body)?;
        body.push(LuaStatement::assign(access, LuaExpression::nil(None), Some(origin)));
        Ok(body)
    }

    // ---- control flow ----------------------------------------------------

    fn transform_return(
        &mut self,
        statement: &Statement,
        expression: &Option<Expression>,
    ) -> Result<Vec<LuaStatement>> {
        self.scopes.mark_returned();
        let origin = Some(statement.id);
        let tuple_return =
            self.function_stack.last().map(|f| f.tuple_return).unwrap_or(false);
        let through_try = self.scopes.returns_through_try();

        let mut values: Vec<LuaExpression> = match expression {
            None => Vec::new(),
            Some(expression) if tuple_return => match &expression.kind {
                ExpressionKind::Array(elements) => {
                    let mut out = Vec::new();
                    for element in elements {
                        match &element.kind {
                            ExpressionKind::Spread(operand) => {
                                out.push(self.transform_spread(operand)?)
                            }
                            _ => out.push(self.transform_expression(element)?),
                        }
                    }
                    out
                }
                _ => {
                    let value = self.transform_expression(expression)?;
                    vec![LuaExpression::call(
                        self.unpack_expression(),
                        vec![value],
                        origin,
                    )]
                }
            },
            Some(expression) => vec![self.transform_expression(expression)?],
        };

        if through_try {
            // Inside a pcall closure: prefix the truthy marker, and box
            // tuple returns into a single slot.
            if tuple_return {
                let fields = values
                    .into_iter()
                    .map(crate::lua_ast::LuaTableField::Positional)
                    .collect();
                values = vec![
                    LuaExpression::boolean(true, origin),
                    LuaExpression::table(fields, origin),
                ];
            } else {
                values.insert(0, LuaExpression::boolean(true, origin));
            }
        }

        Ok(vec![LuaStatement::return_statement(values, origin)])
    }

    fn transform_if(
        &mut self,
        statement: &Statement,
        if_statement: &IfStatement,
    ) -> Result<Vec<LuaStatement>> {
        let condition = self.transform_expression(&if_statement.condition)?;
        let then_block =
            self.transform_scoped_block(ScopeKind::Conditional, &if_statement.then_branch)?;
        let else_block = match &if_statement.else_branch {
            None => None,
            Some(else_statement) => match &else_statement.kind {
                StatementKind::Block(block) => {
                    Some(self.transform_scoped_block(ScopeKind::Conditional, block)?)
                }
                _ => Some(LuaBlock::new(self.transform_statement(else_statement)?)),
            },
        };
        Ok(vec![LuaStatement::if_statement(
            condition,
            then_block,
            else_block,
            Some(statement.id),
        )])
    }

    fn transform_for(
        &mut self,
        statement: &Statement,
        for_statement: &ForStatement,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);
        self.scopes.push(ScopeKind::Block);

        let mut outer = Vec::new();
        match &for_statement.initializer {
            Some(ForInitializer::Variable(decl)) => {
                outer.extend(self.transform_statement(decl)?);
            }
            Some(ForInitializer::Expression(expression)) => {
                let pseudo = Statement::new(expression.id, expression.span, StatementKind::Expression(expression.clone()));
                outer.extend(self.transform_expression_statement(&pseudo, expression)?);
            }
            None => {}
        }

        let condition = match &for_statement.condition {
            Some(condition) => self.transform_expression(condition)?,
            None => LuaExpression::boolean(true, origin),
        };

        let (mut body, _) = self.transform_loop_body(&for_statement.body)?;
        if let Some(incrementor) = &for_statement.incrementor {
            let pseudo = Statement::new(
                incrementor.id,
                incrementor.span,
                StatementKind::Expression(incrementor.clone()),
            );
            body.statements
                .extend(self.transform_expression_statement(&pseudo, incrementor)?);
        }

        outer.push(LuaStatement::while_loop(condition, body, origin));

        let scope = self.scopes.pop();
        let statements = hoist::hoist_statements(&scope, outer, &self.symbols, self.options);
        Ok(vec![LuaStatement::do_block(LuaBlock::new(statements), origin)])
    }

    fn transform_for_of(
        &mut self,
        statement: &Statement,
        for_of: &ForOfStatement,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);
        let variable = for_of.variable.as_ref().ok_or(TranspileError::MissingForOfVariables {
            span: statement.span,
        })?;

        // `@forRange` calls become a numeric for.
        if let ExpressionKind::Call { arguments, .. } = &for_of.expression.kind {
            if let Some(signature) = self.oracle.resolved_signature(for_of.expression.id) {
                if self.directives.signature_has(&signature, DirectiveKind::ForRange) {
                    if !(2..=3).contains(&arguments.len())
                        || arguments
                            .iter()
                            .any(|a| !self.oracle.type_of(a.id).is_number_like())
                    {
                        return Err(TranspileError::InvalidForRangeCall {
                            span: for_of.expression.span,
                        });
                    }
                    let BindingName::Identifier(identifier) = variable else {
                        return Err(TranspileError::InvalidForRangeCall {
                            span: statement.span,
                        });
                    };
                    let control = self.transform_identifier(identifier);
                    let start = self.transform_expression(&arguments[0])?;
                    let limit = self.transform_expression(&arguments[1])?;
                    let step = arguments
                        .get(2)
                        .map(|a| self.transform_expression(a))
                        .transpose()?;
                    let (body, _) = self.transform_loop_body(&for_of.body)?;
                    return Ok(vec![LuaStatement::numeric_for(
                        control, start, limit, step, body, origin,
                    )]);
                }
            }
        }

        // `@luaIterator` values are already Lua iterators.
        if self.is_lua_iterator(&for_of.expression) {
            let iterable = self.transform_expression(&for_of.expression)?;
            if self.is_tuple_return_iterator(&for_of.expression) {
                let BindingName::ArrayPattern { elements, .. } = variable else {
                    return Err(TranspileError::UnsupportedNonDestructuringLuaIterator {
                        span: statement.span,
                    });
                };
                let mut names = Vec::new();
                for element in elements {
                    match element {
                        Some(element) => match &element.name {
                            BindingName::Identifier(identifier) => {
                                names.push(self.transform_identifier(identifier))
                            }
                            _ => {
                                return Err(TranspileError::UnsupportedObjectDestructuringInForOf {
                                    span: element.span,
                                })
                            }
                        },
                        None => names.push(self.temp_identifier()),
                    }
                }
                let (body, _) = self.transform_loop_body(&for_of.body)?;
                return Ok(vec![LuaStatement::generic_for(names, vec![iterable], body, origin)]);
            }
            let BindingName::Identifier(identifier) = variable else {
                return Err(TranspileError::UnsupportedObjectDestructuringInForOf {
                    span: statement.span,
                });
            };
            let name = self.transform_identifier(identifier);
            let (body, _) = self.transform_loop_body(&for_of.body)?;
            return Ok(vec![LuaStatement::generic_for(vec![name], vec![iterable], body, origin)]);
        }

        // Arrays iterate with ipairs; everything else goes through the
        // iterator protocol helper.
        let iterated_type = self.oracle.type_of(for_of.expression.id);
        let (names, prologue_pattern): (Vec<LuaIdentifier>, Option<&BindingName>) = match variable {
            BindingName::Identifier(identifier) => {
                (vec![self.transform_identifier(identifier)], None)
            }
            BindingName::ArrayPattern { .. } => (vec![self.temp_identifier()], Some(variable)),
            BindingName::ObjectPattern { .. } => {
                return Err(TranspileError::UnsupportedObjectDestructuringInForOf {
                    span: statement.span,
                })
            }
        };
        let value_name = names[0].clone_identifier();

        let iterable = self.transform_expression(&for_of.expression)?;
        let (expressions, mut loop_names) = if iterated_type.is_array_like() {
            (
                vec![LuaExpression::call(
                    LuaExpression::name("ipairs", None),
                    vec![iterable],
                    origin,
                )],
                vec![LuaIdentifier::named("_")],
            )
        } else {
            let callee = self.lualib_callee(LuaLibFeature::Iterator);
            (vec![LuaExpression::call(callee, vec![iterable], origin)], Vec::new())
        };
        loop_names.extend(names);

        let (body, _) = self.transform_loop_body_with(&for_of.body, |this| match prologue_pattern {
            Some(pattern) => {
                this.destructure_binding(pattern, LuaExpression::identifier(value_name), statement.id)
            }
            None => Ok(Vec::new()),
        })?;

        Ok(vec![LuaStatement::generic_for(loop_names, expressions, body, origin)])
    }

    fn is_lua_iterator(&self, expression: &Expression) -> bool {
        if let Some(signature) = self.oracle.resolved_signature(expression.id) {
            if self.directives.signature_has(&signature, DirectiveKind::LuaIterator) {
                return true;
            }
        }
        expression
            .as_identifier()
            .and_then(|i| self.oracle.symbol_of(i.id))
            .map(|s| self.directives.symbol_has(s, DirectiveKind::LuaIterator, self.oracle))
            .unwrap_or(false)
    }

    fn is_tuple_return_iterator(&self, expression: &Expression) -> bool {
        if let Some(signature) = self.oracle.resolved_signature(expression.id) {
            if self.directives.signature_has(&signature, DirectiveKind::TupleReturn) {
                return true;
            }
        }
        expression
            .as_identifier()
            .and_then(|i| self.oracle.symbol_of(i.id))
            .map(|s| self.directives.symbol_has(s, DirectiveKind::TupleReturn, self.oracle))
            .unwrap_or(false)
    }

    fn transform_switch(
        &mut self,
        statement: &Statement,
        switch: &SwitchStatement,
    ) -> Result<Vec<LuaStatement>> {
        if !self.options.lua_target.supports_goto() {
            return Err(TranspileError::UnsupportedForTarget {
                what: "switch statements".to_string(),
                span: statement.span,
            });
        }

        let origin = Some(statement.id);
        let scope_id = self.scopes.push(ScopeKind::Switch);
        let prefix = format!("____TS_switch{}", scope_id);

        let mut out = Vec::new();
        let switch_variable = LuaIdentifier::named(prefix.clone());
        let value = self.transform_expression(&switch.expression)?;
        out.push(LuaStatement::local_single(switch_variable.clone(), Some(value), origin));

        let default_index = switch.clauses.iter().position(|c| c.expression.is_none());

        // Dispatch chain.
        for (index, clause) in switch.clauses.iter().enumerate() {
            let Some(case_expression) = &clause.expression else { continue };
            let case_value = self.transform_expression(case_expression)?;
            let label = format!("{prefix}_case_{index}");
            out.push(LuaStatement::if_statement(
                LuaExpression::binary(
                    LuaBinaryOp::Eq,
                    LuaExpression::identifier(switch_variable.clone_identifier()),
                    case_value,
                    Some(clause.id),
                ),
                LuaBlock::new(vec![LuaStatement::goto(label, Some(clause.id))]),
                None,
                Some(clause.id),
            ));
        }
        match default_index {
            Some(index) => out.push(LuaStatement::goto(format!("{prefix}_case_{index}"), origin)),
            None => out.push(LuaStatement::goto(format!("{prefix}_end"), origin)),
        }

        // Clause bodies, each in its own do-block so clause locals do not
        // leak into later labels.
        for (index, clause) in switch.clauses.iter().enumerate() {
            out.push(LuaStatement::label(format!("{prefix}_case_{index}"), Some(clause.id)));
            self.scopes.push(ScopeKind::Block);
            let lowered = self.transform_statements(&clause.statements)?;
            let clause_scope = self.scopes.pop();
            let body =
                hoist::hoist_statements(&clause_scope, lowered, &self.symbols, self.options);
            out.push(LuaStatement::do_block(LuaBlock::new(body), Some(clause.id)));
        }

        out.push(LuaStatement::label(format!("{prefix}_end"), origin));
        self.scopes.pop();
        Ok(out)
    }

    fn transform_break(&mut self, statement: &Statement) -> Result<Vec<LuaStatement>> {
        let mask = ScopeKind::Switch.mask() | ScopeKind::Loop.mask();
        let scope = self.scopes.find_nearest(mask).ok_or(TranspileError::UndefinedScope {
            span: statement.span,
        })?;
        match scope.kind {
            Some(ScopeKind::Switch) => Ok(vec![LuaStatement::goto(
                format!("____TS_switch{}_end", scope.id),
                Some(statement.id),
            )]),
            _ => Ok(vec![LuaStatement::break_statement(Some(statement.id))]),
        }
    }

    fn transform_continue(&mut self, statement: &Statement) -> Result<Vec<LuaStatement>> {
        if !self.options.lua_target.supports_goto() {
            return Err(TranspileError::UnsupportedForTarget {
                what: "continue statements".to_string(),
                span: statement.span,
            });
        }
        let scope = self
            .scopes
            .find_nearest_mut(ScopeKind::Loop.mask())
            .ok_or(TranspileError::UndefinedScope { span: statement.span })?;
        scope.loop_continued = true;
        let label = format!("__continue{}", scope.id);
        Ok(vec![LuaStatement::goto(label, Some(statement.id))])
    }

    // ---- try/catch/finally -----------------------------------------------

    fn transform_try(
        &mut self,
        statement: &Statement,
        try_statement: &TryStatement,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);

        self.scopes.push(ScopeKind::Try);
        let lowered_try = self.transform_statements(&try_statement.try_block.statements)?;
        let try_scope = self.scopes.pop();
        let try_returned = try_scope.function_returned;
        let try_block = LuaBlock::new(hoist::hoist_statements(
            &try_scope,
            lowered_try,
            &self.symbols,
            self.options,
        ));

        let mut catch_returned = false;
        let catch = match &try_statement.catch {
            Some(catch) => {
                self.scopes.push(ScopeKind::Catch);
                let variable = catch
                    .variable
                    .as_ref()
                    .map(|v| self.transform_identifier(v))
                    .unwrap_or_else(|| LuaIdentifier::named("____TS_error"));
                let lowered = self.transform_statements(&catch.block.statements)?;
                let catch_scope = self.scopes.pop();
                catch_returned = catch_scope.function_returned;
                let block = LuaBlock::new(hoist::hoist_statements(
                    &catch_scope,
                    lowered,
                    &self.symbols,
                    self.options,
                ));
                Some((variable, block))
            }
            None => None,
        };

        let finally = try_statement
            .finally
            .as_ref()
            .map(|block| self.transform_scoped_block(ScopeKind::Block, block))
            .transpose()?;

        let any_returns = try_returned || catch_returned;
        let tuple_return =
            self.function_stack.last().map(|f| f.tuple_return).unwrap_or(false);

        let ok = LuaIdentifier::named("____TS_try_ok");
        let try_closure = LuaExpression::function(Vec::new(), false, try_block, origin);
        let pcall = |args: Vec<LuaExpression>| {
            LuaExpression::call(LuaExpression::name("pcall", None), args, origin)
        };

        let mut out = Vec::new();

        if !any_returns {
            let error_slot = LuaIdentifier::named("____TS_try_error");
            out.push(LuaStatement::local_declaration(
                vec![ok.clone(), error_slot.clone()],
                vec![pcall(vec![try_closure])],
                origin,
            ));
            if let Some((variable, block)) = catch {
                let mut catch_statements = vec![LuaStatement::local_single(
                    variable,
                    Some(LuaExpression::identifier(error_slot.clone())),
                    origin,
                )];
                catch_statements.extend(block.statements);
                out.push(LuaStatement::if_statement(
                    LuaExpression::unary(
                        LuaUnaryOp::Not,
                        LuaExpression::identifier(ok.clone()),
                        origin,
                    ),
                    LuaBlock::new(catch_statements),
                    None,
                    origin,
                ));
                if let Some(finally) = finally {
                    out.extend(finally.statements);
                }
            } else {
                if let Some(finally) = finally {
                    out.extend(finally.statements);
                }
                // No catch: rethrow after finally has run.
                out.push(LuaStatement::if_statement(
                    LuaExpression::unary(
                        LuaUnaryOp::Not,
                        LuaExpression::identifier(ok),
                        origin,
                    ),
                    LuaBlock::new(vec![LuaStatement::expression(
                        LuaExpression::call(
                            LuaExpression::name("error", None),
                            vec![
                                LuaExpression::identifier(error_slot),
                                LuaExpression::number(0.0, None),
                            ],
                            origin,
                        ),
                        origin,
                    )]),
                    None,
                    origin,
                ));
            }
            return Ok(out);
        }

        // Returns somewhere inside: thread a marker and a single value slot
        // through the pcall.
        let returned = LuaIdentifier::named("____TS_try_returned");
        let result = LuaIdentifier::named("____TS_try_result");
        out.push(LuaStatement::local_declaration(
            vec![ok.clone(), returned.clone(), result.clone()],
            vec![pcall(vec![try_closure])],
            origin,
        ));

        let has_catch = catch.is_some();
        if let Some((variable, block)) = catch {
            let catch_closure =
                LuaExpression::function(vec![variable], false, block, origin);
            out.push(LuaStatement::if_statement(
                LuaExpression::unary(
                    LuaUnaryOp::Not,
                    LuaExpression::identifier(ok.clone()),
                    origin,
                ),
                LuaBlock::new(vec![LuaStatement::assignment(
                    vec![
                        LuaExpression::identifier(returned.clone()),
                        LuaExpression::identifier(result.clone()),
                    ],
                    vec![LuaExpression::call(
                        catch_closure,
                        vec![LuaExpression::identifier(returned.clone())],
                        origin,
                    )],
                    origin,
                )]),
                None,
                origin,
            ));
        }

        if let Some(finally) = finally {
            out.extend(finally.statements);
        }

        // Propagate a cached return value.
        let propagate = if self.scopes.returns_through_try() {
            // Still inside an enclosing try: keep the slot boxed and marked.
            LuaStatement::return_statement(
                vec![
                    LuaExpression::boolean(true, origin),
                    LuaExpression::identifier(result.clone()),
                ],
                origin,
            )
        } else if tuple_return {
            LuaStatement::return_statement(
                vec![LuaExpression::call(
                    self.unpack_expression(),
                    vec![LuaExpression::identifier(result.clone())],
                    origin,
                )],
                origin,
            )
        } else {
            LuaStatement::return_statement(
                vec![LuaExpression::identifier(result.clone())],
                origin,
            )
        };

        let condition = if has_catch {
            LuaExpression::identifier(returned.clone())
        } else {
            LuaExpression::binary(
                LuaBinaryOp::And,
                LuaExpression::identifier(ok.clone()),
                LuaExpression::identifier(returned.clone()),
                origin,
            )
        };
        out.push(LuaStatement::if_statement(
            condition,
            LuaBlock::new(vec![propagate]),
            None,
            origin,
        ));

        if !has_catch {
            out.push(LuaStatement::if_statement(
                LuaExpression::unary(LuaUnaryOp::Not, LuaExpression::identifier(ok), origin),
                LuaBlock::new(vec![LuaStatement::expression(
                    LuaExpression::call(
                        LuaExpression::name("error", None),
                        vec![
                            LuaExpression::identifier(returned),
                            LuaExpression::number(0.0, None),
                        ],
                        origin,
                    ),
                    origin,
                )]),
                None,
                origin,
            ));
        }

        Ok(out)
    }
}
