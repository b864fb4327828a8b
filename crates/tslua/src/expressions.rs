// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Expression lowering.
//!
//! One method per source expression form, plus the built-in dispatchers for
//! string, array, `Math`, `Object`, `Symbol`, `Number` and `console`
//! intrinsics. Everything here produces expressions only; lowerings that
//! need statement sequences (compound assignment as a value, delete) wrap
//! them in immediately-invoked functions to preserve evaluation order.

use crate::ast::{
    BinaryOperator, Expression, ExpressionKind, Identifier, NodeId, ObjectLiteralMember,
    PropertyName, TemplateLiteral, UnaryOperator, UpdateOperator,
};
use crate::directives::DirectiveKind;
use crate::error::{Result, TranspileError};
use crate::lua_ast::{
    LuaBinaryOp, LuaBlock, LuaExpression, LuaExpressionKind, LuaStatement, LuaTableField,
    LuaUnaryOp,
};
use crate::lualib::LuaLibFeature;
use crate::mangle;
use crate::oracle::ContextType;
use crate::transformer::Transformer;

impl<'a> Transformer<'a> {
    /// Lowers any expression.
    pub(crate) fn transform_expression(&mut self, expression: &Expression) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        match &expression.kind {
            ExpressionKind::Identifier(identifier) => {
                self.transform_identifier_expression(identifier)
            }
            ExpressionKind::Number(value) => Ok(LuaExpression::number(*value, origin)),
            ExpressionKind::String(value) => Ok(LuaExpression::string(value.clone(), origin)),
            ExpressionKind::Boolean(value) => Ok(LuaExpression::boolean(*value, origin)),
            ExpressionKind::Null => Ok(LuaExpression::nil(origin)),
            ExpressionKind::Template(template) => self.transform_template(template, expression.id),
            ExpressionKind::TaggedTemplate { tag, template } => {
                self.transform_tagged_template(tag, template, expression.id)
            }
            ExpressionKind::Array(elements) => self.transform_array_literal(elements, expression.id),
            ExpressionKind::Object(members) => self.transform_object_literal(members, expression.id),
            ExpressionKind::Function(function) => {
                let context = self.function_context_type(function.id, &function.parameters);
                if let Some(expected) = self.oracle.contextual_type(function.id) {
                    match (context, expected.context_type()) {
                        (ContextType::Void, ContextType::NonVoid) => {
                            return Err(TranspileError::UnsupportedNoSelfFunctionConversion {
                                span: expression.span,
                            })
                        }
                        (ContextType::NonVoid, ContextType::Void)
                            if function.parameters.iter().any(|p| p.this_parameter) =>
                        {
                            return Err(TranspileError::UnsupportedSelfFunctionConversion {
                                span: expression.span,
                            })
                        }
                        _ => {}
                    }
                }
                let tuple_return = self
                    .oracle
                    .contextual_type(function.id)
                    .and_then(|ty| match ty.kind {
                        crate::oracle::TypeKind::Function(signature) => Some(*signature),
                        _ => None,
                    })
                    .map(|signature| self.directives.signature_has(&signature, DirectiveKind::TupleReturn))
                    .unwrap_or(false);
                self.transform_function_expression(
                    function.id,
                    &function.parameters,
                    &function.body,
                    context,
                    function.generator,
                    tuple_return,
                )
            }
            ExpressionKind::Call { callee, arguments } => {
                self.transform_call(expression, callee, arguments)
            }
            ExpressionKind::New { callee, arguments } => {
                self.transform_new(expression, callee, arguments)
            }
            ExpressionKind::PropertyAccess { object, name } => {
                self.transform_property_access(expression, object, name)
            }
            ExpressionKind::ElementAccess { object, index } => {
                self.transform_element_access(expression, object, index)
            }
            ExpressionKind::Binary { op, left, right } => {
                self.transform_binary(expression, *op, left, right)
            }
            ExpressionKind::Unary { op, operand } => self.transform_unary(expression, *op, operand),
            ExpressionKind::Update { op, prefix, target } => {
                self.transform_update_expression(expression, *op, *prefix, target)
            }
            ExpressionKind::Assignment { op, target, value } => {
                self.transform_assignment_expression(expression, *op, target, value)
            }
            ExpressionKind::Conditional { condition, when_true, when_false } => {
                self.transform_conditional(expression, condition, when_true, when_false)
            }
            ExpressionKind::TypeOf(operand) => {
                let value = self.transform_expression(operand)?;
                let callee = self.lualib_callee(LuaLibFeature::TypeOf);
                Ok(LuaExpression::call(callee, vec![value], origin))
            }
            ExpressionKind::Delete(target) => {
                let mut body = self.transform_delete_statements(target, expression.id)?;
                body.push(LuaStatement::return_statement(
                    vec![LuaExpression::boolean(true, origin)],
                    origin,
                ));
                Ok(self.iife(body, origin))
            }
            ExpressionKind::Yield(operand) => {
                let mut arguments = Vec::new();
                if let Some(operand) = operand {
                    arguments.push(self.transform_expression(operand)?);
                }
                Ok(LuaExpression::call(
                    LuaExpression::dot(LuaExpression::name("coroutine", None), "yield", None),
                    arguments,
                    origin,
                ))
            }
            ExpressionKind::Spread(operand) => self.transform_spread(operand),
            ExpressionKind::This => Ok(LuaExpression::name("self", origin)),
            ExpressionKind::Super => Ok(self.super_reference(origin)),
            ExpressionKind::Omitted => Ok(LuaExpression::nil(origin)),
        }
    }

    // ---- identifiers -----------------------------------------------------

    /// Lowers an identifier in expression position.
    pub(crate) fn transform_identifier_expression(
        &mut self,
        identifier: &Identifier,
    ) -> Result<LuaExpression> {
        let origin = Some(identifier.id);
        match identifier.text.as_str() {
            "undefined" => return Ok(LuaExpression::nil(origin)),
            "NaN" => {
                return Ok(LuaExpression::binary(
                    LuaBinaryOp::Div,
                    LuaExpression::number(0.0, origin),
                    LuaExpression::number(0.0, origin),
                    origin,
                ))
            }
            "Infinity" => {
                return Ok(LuaExpression::dot(LuaExpression::name("math", None), "huge", origin))
            }
            "globalThis" => return Ok(LuaExpression::name("_G", origin)),
            _ => {}
        }

        if let Some(handle) = self.oracle.symbol_of(identifier.id) {
            if self.is_symbol_exported(handle) {
                // Track the reference even though the emitted form is a table
                // field rather than a local.
                let id = self.symbols.track(handle, identifier.span);
                self.scopes.add_reference(id, identifier.id);
                return Ok(self.export_reference(&identifier.text, origin));
            }
        }

        Ok(LuaExpression::identifier(self.transform_identifier(identifier)))
    }

    fn super_reference(&self, origin: Option<NodeId>) -> LuaExpression {
        let class = self
            .class_stack
            .last()
            .map(|c| c.local_name.clone())
            .unwrap_or_else(|| "self".to_string());
        LuaExpression::dot(LuaExpression::name(class, origin), "____super", origin)
    }

    // ---- literals --------------------------------------------------------

    fn transform_template(
        &mut self,
        template: &TemplateLiteral,
        node: NodeId,
    ) -> Result<LuaExpression> {
        let origin = Some(node);
        let mut result = if template.head.is_empty() && !template.spans.is_empty() {
            None
        } else {
            Some(LuaExpression::string(template.head.clone(), origin))
        };

        for (expression, text) in &template.spans {
            let value = self.transform_expression(expression)?;
            let value = self.stringify_operand(value, expression);
            result = Some(match result {
                Some(acc) => LuaExpression::binary(LuaBinaryOp::Concat, acc, value, origin),
                None => value,
            });
            if !text.is_empty() {
                let text = LuaExpression::string(text.clone(), origin);
                result = Some(match result {
                    Some(acc) => LuaExpression::binary(LuaBinaryOp::Concat, acc, text, origin),
                    None => text,
                });
            }
        }

        Ok(result.unwrap_or_else(|| LuaExpression::string("", origin)))
    }

    fn transform_tagged_template(
        &mut self,
        tag: &Expression,
        template: &TemplateLiteral,
        node: NodeId,
    ) -> Result<LuaExpression> {
        let origin = Some(node);

        let mut fields: Vec<LuaTableField> = Vec::new();
        let mut raw_fields: Vec<LuaTableField> = Vec::new();
        let mut cooked: Vec<&str> = vec![template.head.as_str()];
        cooked.extend(template.spans.iter().map(|(_, text)| text.as_str()));
        for text in &cooked {
            fields.push(LuaTableField::Positional(LuaExpression::string(*text, origin)));
        }
        for raw in &template.raw {
            raw_fields.push(LuaTableField::Positional(LuaExpression::string(raw.clone(), origin)));
        }
        fields.push(LuaTableField::Named {
            key: "raw".to_string(),
            value: LuaExpression::table(raw_fields, origin),
        });

        let mut arguments = vec![LuaExpression::table(fields, origin)];
        for (expression, _) in &template.spans {
            arguments.push(self.transform_expression(expression)?);
        }

        let callee = self.transform_expression(tag)?;
        let context = self
            .oracle
            .resolved_signature(node)
            .map(|s| s.context)
            .unwrap_or(ContextType::NonVoid);
        if matches!(context, ContextType::NonVoid | ContextType::Mixed) {
            arguments.insert(0, self.bare_call_context(origin));
        }
        Ok(LuaExpression::call(callee, arguments, origin))
    }

    fn transform_array_literal(
        &mut self,
        elements: &[Expression],
        node: NodeId,
    ) -> Result<LuaExpression> {
        let origin = Some(node);
        let mut fields = Vec::new();
        let last = elements.len().saturating_sub(1);
        for (i, element) in elements.iter().enumerate() {
            match &element.kind {
                ExpressionKind::Spread(operand) => {
                    if i != last {
                        return Err(TranspileError::UnsupportedKind {
                            kind: "spread element before the end of an array literal".to_string(),
                            span: element.span,
                        });
                    }
                    fields.push(LuaTableField::Positional(self.transform_spread(operand)?));
                }
                ExpressionKind::Omitted => {
                    fields.push(LuaTableField::Positional(LuaExpression::nil(Some(element.id))));
                }
                _ => fields.push(LuaTableField::Positional(self.transform_expression(element)?)),
            }
        }
        Ok(LuaExpression::table(fields, origin))
    }

    fn transform_object_literal(
        &mut self,
        members: &[ObjectLiteralMember],
        node: NodeId,
    ) -> Result<LuaExpression> {
        let origin = Some(node);

        if members.iter().any(|m| matches!(m, ObjectLiteralMember::Spread(_))) {
            return self.transform_object_literal_with_spread(members, node);
        }

        let mut fields = Vec::new();
        for member in members {
            match member {
                ObjectLiteralMember::Property { name, value } => {
                    let value = self.transform_expression(value)?;
                    fields.push(self.table_field(name, value)?);
                }
                ObjectLiteralMember::Shorthand(identifier) => {
                    let value = self.transform_identifier_expression(identifier)?;
                    fields.push(LuaTableField::Named { key: identifier.text.clone(), value });
                }
                ObjectLiteralMember::Method { name, function } => {
                    let context = self.function_context_type(function.id, &function.parameters);
                    let value = self.transform_function_expression(
                        function.id,
                        &function.parameters,
                        &function.body,
                        context,
                        function.generator,
                        false,
                    )?;
                    fields.push(self.table_field(name, value)?);
                }
                ObjectLiteralMember::Spread(_) => unreachable!("handled above"),
            }
        }
        Ok(LuaExpression::table(fields, origin))
    }

    /// `{ …a, b: 1 }` becomes `__TS__ObjectAssign({}, a, {b = 1})`.
    fn transform_object_literal_with_spread(
        &mut self,
        members: &[ObjectLiteralMember],
        node: NodeId,
    ) -> Result<LuaExpression> {
        let origin = Some(node);
        let mut arguments = vec![LuaExpression::table(Vec::new(), origin)];
        let mut pending: Vec<LuaTableField> = Vec::new();

        for member in members {
            match member {
                ObjectLiteralMember::Spread(expression) => {
                    if !pending.is_empty() {
                        arguments.push(LuaExpression::table(std::mem::take(&mut pending), origin));
                    }
                    arguments.push(self.transform_expression(expression)?);
                }
                ObjectLiteralMember::Property { name, value } => {
                    let value = self.transform_expression(value)?;
                    pending.push(self.table_field(name, value)?);
                }
                ObjectLiteralMember::Shorthand(identifier) => {
                    let value = self.transform_identifier_expression(identifier)?;
                    pending.push(LuaTableField::Named { key: identifier.text.clone(), value });
                }
                ObjectLiteralMember::Method { name, function } => {
                    let context = self.function_context_type(function.id, &function.parameters);
                    let value = self.transform_function_expression(
                        function.id,
                        &function.parameters,
                        &function.body,
                        context,
                        function.generator,
                        false,
                    )?;
                    pending.push(self.table_field(name, value)?);
                }
            }
        }
        if !pending.is_empty() {
            arguments.push(LuaExpression::table(pending, origin));
        }

        let callee = self.lualib_callee(LuaLibFeature::ObjectAssign);
        Ok(LuaExpression::call(callee, arguments, origin))
    }

    /// Converts a property name into a table-constructor field.
    pub(crate) fn table_field(
        &mut self,
        name: &PropertyName,
        value: LuaExpression,
    ) -> Result<LuaTableField> {
        Ok(match name {
            PropertyName::Identifier(text) if mangle::is_valid_lua_identifier(text) => {
                LuaTableField::Named { key: text.clone(), value }
            }
            PropertyName::Identifier(text) | PropertyName::String(text) => LuaTableField::Computed {
                key: LuaExpression::string(text.clone(), None),
                value,
            },
            PropertyName::Number(number) => LuaTableField::Computed {
                key: LuaExpression::number(*number, None),
                value,
            },
            PropertyName::Computed(expression) => LuaTableField::Computed {
                key: self.transform_expression(expression)?,
                value,
            },
        })
    }

    // ---- operators -------------------------------------------------------

    fn transform_binary(
        &mut self,
        expression: &Expression,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        match op {
            BinaryOperator::And => Ok(LuaExpression::binary(
                LuaBinaryOp::And,
                self.transform_expression(left)?,
                self.transform_expression(right)?,
                origin,
            )),
            BinaryOperator::Or => Ok(LuaExpression::binary(
                LuaBinaryOp::Or,
                self.transform_expression(left)?,
                self.transform_expression(right)?,
                origin,
            )),
            BinaryOperator::InstanceOf => self.transform_instanceof(expression, left, right),
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                if let Some(fused) = self.try_fuse_typeof_comparison(op, left, right)? {
                    return Ok(fused.at(origin));
                }
                let lua_op = if op == BinaryOperator::Equal { LuaBinaryOp::Eq } else { LuaBinaryOp::Ne };
                Ok(LuaExpression::binary(
                    lua_op,
                    self.transform_expression(left)?,
                    self.transform_expression(right)?,
                    origin,
                ))
            }
            BinaryOperator::Add => {
                if self.is_string_concat(left, right) {
                    let lhs = self.transform_expression(left)?;
                    let lhs = self.stringify_operand(lhs, left);
                    let rhs = self.transform_expression(right)?;
                    let rhs = self.stringify_operand(rhs, right);
                    Ok(LuaExpression::binary(LuaBinaryOp::Concat, lhs, rhs, origin))
                } else {
                    Ok(LuaExpression::binary(
                        LuaBinaryOp::Add,
                        self.transform_expression(left)?,
                        self.transform_expression(right)?,
                        origin,
                    ))
                }
            }
            BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => {
                let lua_op = match op {
                    BinaryOperator::Subtract => LuaBinaryOp::Sub,
                    BinaryOperator::Multiply => LuaBinaryOp::Mul,
                    BinaryOperator::Divide => LuaBinaryOp::Div,
                    BinaryOperator::Modulo => LuaBinaryOp::Mod,
                    BinaryOperator::LessThan => LuaBinaryOp::Lt,
                    BinaryOperator::LessEqual => LuaBinaryOp::Le,
                    BinaryOperator::GreaterThan => LuaBinaryOp::Gt,
                    BinaryOperator::GreaterEqual => LuaBinaryOp::Ge,
                    _ => unreachable!(),
                };
                Ok(LuaExpression::binary(
                    lua_op,
                    self.transform_expression(left)?,
                    self.transform_expression(right)?,
                    origin,
                ))
            }
            BinaryOperator::ShiftRight => Err(TranspileError::UnsupportedKind {
                kind: "signed right shift ('>>'); use '>>>' instead".to_string(),
                span: expression.span,
            }),
            BinaryOperator::BitwiseAnd
            | BinaryOperator::BitwiseOr
            | BinaryOperator::BitwiseXor
            | BinaryOperator::ShiftLeft
            | BinaryOperator::ShiftRightUnsigned => {
                self.transform_bitwise(expression, op, left, right)
            }
        }
    }

    fn transform_bitwise(
        &mut self,
        expression: &Expression,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let lhs = self.transform_expression(left)?;
        let rhs = self.transform_expression(right)?;

        if self.options.lua_target.native_bitwise() {
            let lua_op = match op {
                BinaryOperator::BitwiseAnd => LuaBinaryOp::BitAnd,
                BinaryOperator::BitwiseOr => LuaBinaryOp::BitOr,
                BinaryOperator::BitwiseXor => LuaBinaryOp::BitXor,
                BinaryOperator::ShiftLeft => LuaBinaryOp::ShiftLeft,
                BinaryOperator::ShiftRightUnsigned => LuaBinaryOp::ShiftRight,
                _ => unreachable!(),
            };
            return Ok(LuaExpression::binary(lua_op, lhs, rhs, origin));
        }

        if let Some(library) = self.options.lua_target.bit_library() {
            let function = match op {
                BinaryOperator::BitwiseAnd => "band",
                BinaryOperator::BitwiseOr => "bor",
                BinaryOperator::BitwiseXor => "bxor",
                BinaryOperator::ShiftLeft => "lshift",
                BinaryOperator::ShiftRightUnsigned => "rshift",
                _ => unreachable!(),
            };
            return Ok(LuaExpression::call(
                LuaExpression::dot(LuaExpression::name(library, None), function, None),
                vec![lhs, rhs],
                origin,
            ));
        }

        Err(TranspileError::UnsupportedForTarget {
            what: "bitwise operations".to_string(),
            span: expression.span,
        })
    }

    fn transform_unary(
        &mut self,
        expression: &Expression,
        op: UnaryOperator,
        operand: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let value = self.transform_expression(operand)?;
        match op {
            UnaryOperator::Negate => Ok(LuaExpression::unary(LuaUnaryOp::Neg, value, origin)),
            UnaryOperator::Plus => Ok(value),
            UnaryOperator::Not => Ok(LuaExpression::unary(LuaUnaryOp::Not, value, origin)),
            UnaryOperator::BitwiseNot => {
                if self.options.lua_target.native_bitwise() {
                    Ok(LuaExpression::unary(LuaUnaryOp::BitNot, value, origin))
                } else if let Some(library) = self.options.lua_target.bit_library() {
                    Ok(LuaExpression::call(
                        LuaExpression::dot(LuaExpression::name(library, None), "bnot", None),
                        vec![value],
                        origin,
                    ))
                } else {
                    Err(TranspileError::UnsupportedForTarget {
                        what: "bitwise operations".to_string(),
                        span: expression.span,
                    })
                }
            }
        }
    }

    /// Fuses `typeof x == "literal"` into `type(x) == "mapped"`.
    fn try_fuse_typeof_comparison(
        &mut self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Option<LuaExpression>> {
        let (operand, literal) = match (&left.kind, &right.kind) {
            (ExpressionKind::TypeOf(operand), ExpressionKind::String(literal)) => (operand, literal),
            (ExpressionKind::String(literal), ExpressionKind::TypeOf(operand)) => (operand, literal),
            _ => return Ok(None),
        };
        let mapped = match literal.as_str() {
            "object" => "table",
            "undefined" => "nil",
            "number" => "number",
            "string" => "string",
            "boolean" => "boolean",
            "function" => "function",
            _ => return Ok(None),
        };
        let value = self.transform_expression(operand)?;
        let lua_op = if op == BinaryOperator::Equal { LuaBinaryOp::Eq } else { LuaBinaryOp::Ne };
        Ok(Some(LuaExpression::binary(
            lua_op,
            LuaExpression::call(LuaExpression::name("type", None), vec![value], None),
            LuaExpression::string(mapped, None),
            None,
        )))
    }

    fn transform_instanceof(
        &mut self,
        expression: &Expression,
        left: &Expression,
        right: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        if let Some(symbol) = right.as_identifier().and_then(|i| self.oracle.symbol_of(i.id)) {
            if self.directives.symbol_has(symbol, DirectiveKind::Extension, self.oracle)
                || self.directives.symbol_has(symbol, DirectiveKind::MetaExtension, self.oracle)
            {
                return Err(TranspileError::InvalidInstanceOfExtension { span: expression.span });
            }
            if self.directives.symbol_has(symbol, DirectiveKind::LuaTable, self.oracle) {
                return Err(TranspileError::InvalidInstanceOfLuaTable { span: expression.span });
            }
        }
        if let Some(identifier) = right.as_identifier() {
            if self.lua_table_classes.contains(&identifier.text) {
                return Err(TranspileError::InvalidInstanceOfLuaTable { span: expression.span });
            }
            if identifier.text == "Object" && self.oracle.symbol_of(identifier.id).is_none() {
                let value = self.transform_expression(left)?;
                let callee = self.lualib_callee(LuaLibFeature::InstanceOfObject);
                return Ok(LuaExpression::call(callee, vec![value], origin));
            }
        }

        let value = self.transform_expression(left)?;
        let class = self.transform_expression(right)?;
        let callee = self.lualib_callee(LuaLibFeature::InstanceOf);
        Ok(LuaExpression::call(callee, vec![value, class], origin))
    }

    fn transform_conditional(
        &mut self,
        expression: &Expression,
        condition: &Expression,
        when_true: &Expression,
        when_false: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let condition = self.transform_expression(condition)?;

        let true_type = self.oracle.type_of(when_true.id);
        if true_type.lua_falsy_possible(self.options.has_strict_null_checks()) {
            // `cond and a or b` would pick `b` whenever `a` is nil or false;
            // thunk both branches and call the winner.
            let thunk = |body: LuaExpression| {
                LuaExpression::function(
                    Vec::new(),
                    false,
                    LuaBlock::new(vec![LuaStatement::return_statement(vec![body], None)]),
                    None,
                )
            };
            let true_value = self.transform_expression(when_true)?;
            let false_value = self.transform_expression(when_false)?;
            let chosen = LuaExpression::binary(
                LuaBinaryOp::Or,
                LuaExpression::binary(LuaBinaryOp::And, condition, thunk(true_value), origin),
                thunk(false_value),
                origin,
            );
            return Ok(LuaExpression::call(chosen, Vec::new(), origin));
        }

        let true_value = self.transform_expression(when_true)?;
        let false_value = self.transform_expression(when_false)?;
        Ok(LuaExpression::binary(
            LuaBinaryOp::Or,
            LuaExpression::binary(LuaBinaryOp::And, condition, true_value, origin),
            false_value,
            origin,
        ))
    }

    // ---- accesses --------------------------------------------------------

    pub(crate) fn transform_property_access(
        &mut self,
        expression: &Expression,
        object: &Expression,
        name: &str,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        // Const-enum members fold to their checker-computed value.
        if let Some(constant) = self.oracle.constant_value(expression.id) {
            return Ok(self.constant_expression(constant, origin));
        }

        let object_type = self.oracle.type_of(object.id);

        if name == "length" && (object_type.is_array_like() || object_type.is_string_like()) {
            let value = self.transform_expression(object)?;
            return Ok(LuaExpression::unary(LuaUnaryOp::Len, value, origin));
        }

        if self.is_lua_table_object(object) {
            if name == "length" {
                let value = self.transform_expression(object)?;
                return Ok(LuaExpression::unary(LuaUnaryOp::Len, value, origin));
            }
            return Err(TranspileError::ForbiddenLuaTableUseException { span: expression.span });
        }

        if let Some(namespace) = self.builtin_receiver(object) {
            match namespace {
                "Math" => return self.transform_math_property(expression, name),
                "Number" => return self.transform_number_property(expression, name),
                "Symbol" => {
                    self.lualib.use_feature(LuaLibFeature::Symbol);
                    return Ok(LuaExpression::dot(
                        LuaExpression::name("Symbol", None),
                        name,
                        origin,
                    ));
                }
                _ => {}
            }
        }

        let value = self.transform_expression(object)?;
        Ok(LuaExpression::dot(value, name, origin))
    }

    pub(crate) fn transform_element_access(
        &mut self,
        expression: &Expression,
        object: &Expression,
        index: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        if let Some(constant) = self.oracle.constant_value(expression.id) {
            return Ok(self.constant_expression(constant, origin));
        }

        let object_value = self.transform_expression(object)?;
        let index_value = self.transform_index_expression(object, index)?;
        Ok(LuaExpression::index(object_value, index_value, origin))
    }

    /// Lowers an index expression, adding the 1-based adjustment for numeric
    /// indices into array-typed values.
    pub(crate) fn transform_index_expression(
        &mut self,
        object: &Expression,
        index: &Expression,
    ) -> Result<LuaExpression> {
        let object_type = self.oracle.type_of(object.id);
        let index_type = self.oracle.type_of(index.id);
        if object_type.is_array_like() && index_type.is_number_like() {
            return self.add_one(index);
        }
        self.transform_expression(index)
    }

    /// `i` → `i + 1`, folding literals and cancelling a trailing `- 1`.
    pub(crate) fn add_one(&mut self, index: &Expression) -> Result<LuaExpression> {
        match &index.kind {
            ExpressionKind::Number(value) => Ok(LuaExpression::number(value + 1.0, Some(index.id))),
            ExpressionKind::Binary { op: BinaryOperator::Subtract, left, right }
                if matches!(right.kind, ExpressionKind::Number(n) if n == 1.0) =>
            {
                self.transform_expression(left)
            }
            _ => {
                let value = self.transform_expression(index)?;
                Ok(LuaExpression::binary(
                    LuaBinaryOp::Add,
                    value,
                    LuaExpression::number(1.0, None),
                    Some(index.id),
                ))
            }
        }
    }

    fn constant_expression(
        &self,
        constant: crate::oracle::ConstantValue,
        origin: Option<NodeId>,
    ) -> LuaExpression {
        match constant {
            crate::oracle::ConstantValue::Number(value) => LuaExpression::number(value, origin),
            crate::oracle::ConstantValue::String(value) => LuaExpression::string(value, origin),
        }
    }

    // ---- string concatenation helpers -----------------------------------

    fn is_string_concat(&self, left: &Expression, right: &Expression) -> bool {
        self.expression_is_stringish(left) || self.expression_is_stringish(right)
    }

    fn expression_is_stringish(&self, expression: &Expression) -> bool {
        matches!(
            expression.kind,
            ExpressionKind::String(_) | ExpressionKind::Template(_)
        ) || self.oracle.type_of(expression.id).is_string_like()
    }

    /// Wraps concat operands that are not literal strings, numbers or other
    /// concatenations in `tostring(…)`.
    fn stringify_operand(&self, value: LuaExpression, source: &Expression) -> LuaExpression {
        let literal = matches!(
            source.kind,
            ExpressionKind::String(_) | ExpressionKind::Number(_) | ExpressionKind::Template(_)
        ) || matches!(
            &source.kind,
            ExpressionKind::Binary { op: BinaryOperator::Add, .. }
                if matches!(value.kind, LuaExpressionKind::Binary { op: LuaBinaryOp::Concat, .. })
        );
        if literal {
            value
        } else {
            let origin = value.origin;
            LuaExpression::call(LuaExpression::name("tostring", None), vec![value], origin)
        }
    }

    // ---- spread ----------------------------------------------------------

    /// Lowers a spread operand into a multi-value expression.
    pub(crate) fn transform_spread(&mut self, operand: &Expression) -> Result<LuaExpression> {
        let origin = Some(operand.id);

        // A spread of a tuple-return call passes the values straight through.
        if let ExpressionKind::Call { .. } = &operand.kind {
            if let Some(signature) = self.oracle.resolved_signature(operand.id) {
                if self.directives.signature_has(&signature, DirectiveKind::TupleReturn) {
                    return self.transform_expression(operand);
                }
            }
        }

        // A `@vararg` rest parameter spreads as the literal `...`.
        if let Some(identifier) = operand.as_identifier() {
            if let Some(symbol) = self.oracle.symbol_of(identifier.id) {
                if self.directives.symbol_has(symbol, DirectiveKind::Vararg, self.oracle) {
                    return Ok(LuaExpression::dots(origin));
                }
            }
        }

        let operand_type = self.oracle.type_of(operand.id);
        let value = self.transform_expression(operand)?;
        if operand_type.is_array_like() {
            return Ok(LuaExpression::call(self.unpack_expression(), vec![value], origin));
        }

        let callee = self.lualib_callee(LuaLibFeature::Spread);
        Ok(LuaExpression::call(callee, vec![value], origin))
    }

    // ---- assignment-as-expression ---------------------------------------

    fn transform_assignment_expression(
        &mut self,
        expression: &Expression,
        op: Option<BinaryOperator>,
        target: &Expression,
        value: &Expression,
    ) -> Result<LuaExpression> {
        if matches!(target.kind, ExpressionKind::Array(_) | ExpressionKind::Object(_)) {
            return Err(TranspileError::UnsupportedKind {
                kind: "destructuring assignment used as an expression".to_string(),
                span: expression.span,
            });
        }

        let origin = Some(expression.id);
        let mut body = Vec::new();
        let target_access = self.cached_assignment_target(target, &mut body)?;

        let result = self.temp_identifier();
        let new_value = match op {
            None => self.transform_expression(value)?,
            Some(op) => {
                let current = target_access.clone();
                self.compound_value(op, current, value, target)?
            }
        };
        body.push(LuaStatement::local_single(result.clone(), Some(new_value), origin));
        body.push(LuaStatement::assign(
            target_access,
            LuaExpression::identifier(result.clone()),
            origin,
        ));
        body.push(LuaStatement::return_statement(
            vec![LuaExpression::identifier(result)],
            origin,
        ));
        Ok(self.iife(body, origin))
    }

    fn transform_update_expression(
        &mut self,
        expression: &Expression,
        op: UpdateOperator,
        prefix: bool,
        target: &Expression,
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let lua_op = match op {
            UpdateOperator::Increment => LuaBinaryOp::Add,
            UpdateOperator::Decrement => LuaBinaryOp::Sub,
        };

        let mut body = Vec::new();
        let target_access = self.cached_assignment_target(target, &mut body)?;

        if prefix {
            let result = self.temp_identifier();
            body.push(LuaStatement::local_single(
                result.clone(),
                Some(LuaExpression::binary(
                    lua_op,
                    target_access.clone(),
                    LuaExpression::number(1.0, None),
                    origin,
                )),
                origin,
            ));
            body.push(LuaStatement::assign(
                target_access,
                LuaExpression::identifier(result.clone()),
                origin,
            ));
            body.push(LuaStatement::return_statement(
                vec![LuaExpression::identifier(result)],
                origin,
            ));
        } else {
            let old = self.temp_identifier();
            body.push(LuaStatement::local_single(old.clone(), Some(target_access.clone()), origin));
            body.push(LuaStatement::assign(
                target_access,
                LuaExpression::binary(
                    lua_op,
                    LuaExpression::identifier(old.clone()),
                    LuaExpression::number(1.0, None),
                    origin,
                ),
                origin,
            ));
            body.push(LuaStatement::return_statement(
                vec![LuaExpression::identifier(old)],
                origin,
            ));
        }
        Ok(self.iife(body, origin))
    }

    /// Lowers an assignment target, caching effectful receivers and indices
    /// into temporaries appended to `body` so each is evaluated once.
    pub(crate) fn cached_assignment_target(
        &mut self,
        target: &Expression,
        body: &mut Vec<LuaStatement>,
    ) -> Result<LuaExpression> {
        match &target.kind {
            ExpressionKind::Identifier(_) | ExpressionKind::This => {
                self.transform_expression(target)
            }
            ExpressionKind::PropertyAccess { object, name } => {
                let object_value = self.transform_expression(object)?;
                let object_value = if object.is_effect_free() {
                    object_value
                } else {
                    let temp = self.temp_identifier();
                    body.push(LuaStatement::local_single(temp.clone(), Some(object_value), None));
                    LuaExpression::identifier(temp)
                };
                Ok(LuaExpression::dot(object_value, name, Some(target.id)))
            }
            ExpressionKind::ElementAccess { object, index } => {
                let object_value = self.transform_expression(object)?;
                let index_value = self.transform_index_expression(object, index)?;
                if object.is_effect_free() && index.is_effect_free() {
                    return Ok(LuaExpression::index(object_value, index_value, Some(target.id)));
                }
                let object_temp = self.temp_identifier();
                let index_temp = self.temp_identifier();
                body.push(LuaStatement::local_declaration(
                    vec![object_temp.clone(), index_temp.clone()],
                    vec![object_value, index_value],
                    None,
                ));
                Ok(LuaExpression::index(
                    LuaExpression::identifier(object_temp),
                    LuaExpression::identifier(index_temp),
                    Some(target.id),
                ))
            }
            _ => Err(TranspileError::UnsupportedKind {
                kind: "assignment target".to_string(),
                span: target.span,
            }),
        }
    }

    /// Builds the value side of a compound assignment from the already
    /// lowered current-value expression.
    pub(crate) fn compound_value(
        &mut self,
        op: BinaryOperator,
        current: LuaExpression,
        value: &Expression,
        target: &Expression,
    ) -> Result<LuaExpression> {
        let rhs = self.transform_expression(value)?;
        let origin = current.origin;
        let result = match op {
            BinaryOperator::Add => {
                let target_type = self.oracle.type_of(target.id);
                if target_type.is_string_like() || self.expression_is_stringish(value) {
                    let rhs = self.stringify_operand(rhs, value);
                    LuaExpression::binary(LuaBinaryOp::Concat, current, rhs, origin)
                } else {
                    LuaExpression::binary(LuaBinaryOp::Add, current, rhs, origin)
                }
            }
            BinaryOperator::Subtract => LuaExpression::binary(LuaBinaryOp::Sub, current, rhs, origin),
            BinaryOperator::Multiply => LuaExpression::binary(LuaBinaryOp::Mul, current, rhs, origin),
            BinaryOperator::Divide => LuaExpression::binary(LuaBinaryOp::Div, current, rhs, origin),
            BinaryOperator::Modulo => LuaExpression::binary(LuaBinaryOp::Mod, current, rhs, origin),
            BinaryOperator::And => LuaExpression::binary(LuaBinaryOp::And, current, rhs, origin),
            BinaryOperator::Or => LuaExpression::binary(LuaBinaryOp::Or, current, rhs, origin),
            BinaryOperator::BitwiseAnd
            | BinaryOperator::BitwiseOr
            | BinaryOperator::BitwiseXor
            | BinaryOperator::ShiftLeft
            | BinaryOperator::ShiftRightUnsigned => {
                if self.options.lua_target.native_bitwise() {
                    let lua_op = match op {
                        BinaryOperator::BitwiseAnd => LuaBinaryOp::BitAnd,
                        BinaryOperator::BitwiseOr => LuaBinaryOp::BitOr,
                        BinaryOperator::BitwiseXor => LuaBinaryOp::BitXor,
                        BinaryOperator::ShiftLeft => LuaBinaryOp::ShiftLeft,
                        _ => LuaBinaryOp::ShiftRight,
                    };
                    LuaExpression::binary(lua_op, current, rhs, origin)
                } else if let Some(library) = self.options.lua_target.bit_library() {
                    let function = match op {
                        BinaryOperator::BitwiseAnd => "band",
                        BinaryOperator::BitwiseOr => "bor",
                        BinaryOperator::BitwiseXor => "bxor",
                        BinaryOperator::ShiftLeft => "lshift",
                        _ => "rshift",
                    };
                    LuaExpression::call(
                        LuaExpression::dot(LuaExpression::name(library, None), function, None),
                        vec![current, rhs],
                        origin,
                    )
                } else {
                    return Err(TranspileError::UnsupportedForTarget {
                        what: "bitwise operations".to_string(),
                        span: target.span,
                    });
                }
            }
            other => {
                return Err(TranspileError::UnsupportedKind {
                    kind: format!("compound assignment operator {:?}", other),
                    span: target.span,
                })
            }
        };
        Ok(result)
    }

    // ---- misc helpers ----------------------------------------------------

    /// The context value a bare call receives: `_G`, or `nil` under strict.
    pub(crate) fn bare_call_context(&self, origin: Option<NodeId>) -> LuaExpression {
        if self.options.is_strict() {
            LuaExpression::nil(origin)
        } else {
            LuaExpression::name("_G", origin)
        }
    }

    /// Recognises `Math`, `Object`, `console`, `Symbol`, `Number`, `String`
    /// receivers that dispatch to dedicated lowerings.
    pub(crate) fn builtin_receiver(&self, expression: &Expression) -> Option<&'static str> {
        const NAMESPACES: [&str; 6] = ["Math", "Object", "console", "Symbol", "Number", "String"];
        let identifier = expression.as_identifier()?;
        let name = NAMESPACES.iter().find(|n| **n == identifier.text)?;
        match self.oracle.symbol_of(identifier.id) {
            None => Some(name),
            Some(symbol) => match self.oracle.fully_qualified_name(symbol) {
                Some(fqn) if fqn == *name => Some(name),
                None => Some(name),
                _ => None,
            },
        }
    }

    /// True when the expression's type is one of the `@luaTable` classes.
    pub(crate) fn is_lua_table_object(&self, expression: &Expression) -> bool {
        match &self.oracle.type_of(expression.id).kind {
            crate::oracle::TypeKind::Reference { name } => self.lua_table_classes.contains(name),
            _ => false,
        }
    }

    fn transform_math_property(&mut self, expression: &Expression, name: &str) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let constant = |value: f64| Ok(LuaExpression::number(value, origin));
        match name {
            "PI" => Ok(LuaExpression::dot(LuaExpression::name("math", None), "pi", origin)),
            "E" => constant(std::f64::consts::E),
            "LN10" => constant(std::f64::consts::LN_10),
            "LN2" => constant(std::f64::consts::LN_2),
            "LOG10E" => constant(std::f64::consts::LOG10_E),
            "LOG2E" => constant(std::f64::consts::LOG2_E),
            "SQRT2" => constant(std::f64::consts::SQRT_2),
            "SQRT1_2" => constant(std::f64::consts::FRAC_1_SQRT_2),
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("Math.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_number_property(&mut self, expression: &Expression, name: &str) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        match name {
            "MAX_VALUE" => Ok(LuaExpression::number(f64::MAX, origin)),
            "MIN_VALUE" => Ok(LuaExpression::number(f64::MIN_POSITIVE, origin)),
            "MAX_SAFE_INTEGER" => Ok(LuaExpression::number(9007199254740991.0, origin)),
            "MIN_SAFE_INTEGER" => Ok(LuaExpression::number(-9007199254740991.0, origin)),
            "POSITIVE_INFINITY" => {
                Ok(LuaExpression::dot(LuaExpression::name("math", None), "huge", origin))
            }
            "NEGATIVE_INFINITY" => Ok(LuaExpression::unary(
                LuaUnaryOp::Neg,
                LuaExpression::dot(LuaExpression::name("math", None), "huge", origin),
                origin,
            )),
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("Number.{name}"),
                span: expression.span,
            }),
        }
    }
}
