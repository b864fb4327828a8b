// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Call and construction lowering.
//!
//! Calls are the most context-sensitive lowering: whether the callee expects
//! an implicit `self` decides between `obj:method(…)`, explicit-receiver
//! calls, and bare calls with an injected `_G`/`nil` context. Built-in
//! receivers (strings, arrays, `Math`, `Object`, `console`, `Symbol`,
//! `Number`, `String`) bypass the protocol and dispatch to intrinsic
//! lowerings or lualib helpers.

use crate::ast::{Expression, ExpressionKind, NodeId};
use crate::directives::DirectiveKind;
use crate::error::{Result, TranspileError};
use crate::lua_ast::{LuaBinaryOp, LuaExpression, LuaStatement, LuaUnaryOp};
use crate::lualib::LuaLibFeature;
use crate::mangle;
use crate::oracle::ContextType;
use crate::transformer::Transformer;

impl<'a> Transformer<'a> {
    /// Lowers a call expression.
    pub(crate) fn transform_call(
        &mut self,
        expression: &Expression,
        callee: &Expression,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        if matches!(callee.kind, ExpressionKind::Super) {
            return self.transform_super_call(expression, arguments);
        }

        if let ExpressionKind::PropertyAccess { object, name } = &callee.kind {
            return self.transform_property_call(expression, callee, object, name, arguments);
        }

        if let ExpressionKind::ElementAccess { object, index } = &callee.kind {
            return self.transform_element_call(expression, object, index, arguments);
        }

        // Bare call.
        if let Some(signature) = self.oracle.resolved_signature(expression.id) {
            if self.directives.signature_has(&signature, DirectiveKind::ForRange) {
                return Err(TranspileError::InvalidForRangeCall { span: expression.span });
            }
        }
        let context = self.call_context(expression.id, callee);
        let function = self.transform_expression(callee)?;
        let mut args = self.transform_arguments(arguments)?;
        if matches!(context, ContextType::NonVoid | ContextType::Mixed) {
            args.insert(0, self.bare_call_context(origin));
        }
        Ok(LuaExpression::call(function, args, origin))
    }

    /// `super(…)` chains to the base constructor with the current `self`.
    fn transform_super_call(
        &mut self,
        expression: &Expression,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let class = self.class_stack.last().cloned().ok_or(TranspileError::UnknownSuperType {
            span: expression.span,
        })?;
        let mut args = vec![LuaExpression::name("self", origin)];
        args.extend(self.transform_arguments(arguments)?);
        let constructor = LuaExpression::dot(
            LuaExpression::dot(
                LuaExpression::dot(
                    LuaExpression::name(class.local_name, origin),
                    "____super",
                    origin,
                ),
                "prototype",
                origin,
            ),
            "____constructor",
            origin,
        );
        Ok(LuaExpression::call(constructor, args, origin))
    }

    fn transform_property_call(
        &mut self,
        expression: &Expression,
        callee: &Expression,
        object: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        // super.method(…) dispatches on the base prototype with our self.
        if matches!(object.kind, ExpressionKind::Super) {
            let class = self.class_stack.last().cloned().ok_or(TranspileError::UnknownSuperType {
                span: expression.span,
            })?;
            let mut args = vec![LuaExpression::name("self", origin)];
            args.extend(self.transform_arguments(arguments)?);
            let method = LuaExpression::dot(
                LuaExpression::dot(
                    LuaExpression::dot(
                        LuaExpression::name(class.local_name, origin),
                        "____super",
                        origin,
                    ),
                    "prototype",
                    origin,
                ),
                name,
                origin,
            );
            return Ok(LuaExpression::call(method, args, origin));
        }

        if let Some(namespace) = self.builtin_receiver(object) {
            return self.transform_namespace_call(expression, namespace, name, arguments);
        }

        if self.is_lua_table_object(object) {
            return self.transform_lua_table_call(expression, object, name, arguments);
        }

        if name == "hasOwnProperty" && arguments.len() == 1 {
            // Intentional divergence: inherited properties are not seen.
            let obj = self.transform_expression(object)?;
            let key = self.transform_expression(&arguments[0])?;
            return Ok(LuaExpression::binary(
                LuaBinaryOp::Ne,
                LuaExpression::call(LuaExpression::name("rawget", None), vec![obj, key], origin),
                LuaExpression::nil(None),
                origin,
            ));
        }

        if name == "toString" && arguments.is_empty() {
            let obj = self.transform_expression(object)?;
            return Ok(LuaExpression::call(
                LuaExpression::name("tostring", None),
                vec![obj],
                origin,
            ));
        }

        let object_type = self.oracle.type_of(object.id);
        if object_type.is_string_like() {
            return self.transform_string_call(expression, object, name, arguments);
        }
        if object_type.is_array_like() {
            return self.transform_array_call(expression, object, name, arguments);
        }

        // General property call: the signature decides the self protocol.
        let context = self.call_context(expression.id, callee);
        let args = self.transform_arguments(arguments)?;

        if matches!(context, ContextType::NonVoid | ContextType::Mixed) {
            if mangle::is_valid_lua_identifier(name) {
                let obj = self.transform_expression(object)?;
                return Ok(LuaExpression::method_call(obj, name, args, origin));
            }
            // Not addressable with `:`; pass the receiver explicitly, caching
            // it when re-evaluation could be observed.
            if object.is_effect_free() {
                let obj = self.transform_expression(object)?;
                let obj_again = self.transform_expression(object)?;
                let mut full_args = vec![obj_again];
                full_args.extend(args);
                return Ok(LuaExpression::call(
                    LuaExpression::dot(obj, name, origin),
                    full_args,
                    origin,
                ));
            }
            let receiver = self.temp_identifier();
            let obj = self.transform_expression(object)?;
            let mut full_args = vec![LuaExpression::identifier(receiver.clone())];
            full_args.extend(args);
            let body = vec![
                LuaStatement::local_single(receiver.clone(), Some(obj), origin),
                LuaStatement::return_statement(
                    vec![LuaExpression::call(
                        LuaExpression::dot(LuaExpression::identifier(receiver), name, origin),
                        full_args,
                        origin,
                    )],
                    origin,
                ),
            ];
            return Ok(self.iife(body, origin));
        }

        let obj = self.transform_expression(object)?;
        Ok(LuaExpression::call(LuaExpression::dot(obj, name, origin), args, origin))
    }

    fn transform_element_call(
        &mut self,
        expression: &Expression,
        object: &Expression,
        index: &Expression,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let context = self
            .oracle
            .resolved_signature(expression.id)
            .map(|s| s.context)
            .unwrap_or(ContextType::NonVoid);
        let args = self.transform_arguments(arguments)?;

        if matches!(context, ContextType::NonVoid | ContextType::Mixed) {
            if object.is_effect_free() && index.is_effect_free() {
                let obj = self.transform_expression(object)?;
                let idx = self.transform_index_expression(object, index)?;
                let obj_again = self.transform_expression(object)?;
                let mut full_args = vec![obj_again];
                full_args.extend(args);
                return Ok(LuaExpression::call(
                    LuaExpression::index(obj, idx, origin),
                    full_args,
                    origin,
                ));
            }
            let obj_temp = self.temp_identifier();
            let idx_temp = self.temp_identifier();
            let obj = self.transform_expression(object)?;
            let idx = self.transform_index_expression(object, index)?;
            let mut full_args = vec![LuaExpression::identifier(obj_temp.clone())];
            full_args.extend(args);
            let body = vec![
                LuaStatement::local_declaration(
                    vec![obj_temp.clone(), idx_temp.clone()],
                    vec![obj, idx],
                    origin,
                ),
                LuaStatement::return_statement(
                    vec![LuaExpression::call(
                        LuaExpression::index(
                            LuaExpression::identifier(obj_temp),
                            LuaExpression::identifier(idx_temp),
                            origin,
                        ),
                        full_args,
                        origin,
                    )],
                    origin,
                ),
            ];
            return Ok(self.iife(body, origin));
        }

        let obj = self.transform_expression(object)?;
        let idx = self.transform_index_expression(object, index)?;
        Ok(LuaExpression::call(LuaExpression::index(obj, idx, origin), args, origin))
    }

    /// Lowers `new C(…)`.
    pub(crate) fn transform_new(
        &mut self,
        expression: &Expression,
        callee: &Expression,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        if let Some(identifier) = callee.as_identifier() {
            if self.lua_table_classes.contains(&identifier.text) {
                if !arguments.is_empty() {
                    return Err(TranspileError::ForbiddenLuaTableUseException {
                        span: expression.span,
                    });
                }
                return Ok(LuaExpression::table(Vec::new(), origin));
            }

            if self.oracle.symbol_of(identifier.id).is_none() {
                let feature = match identifier.text.as_str() {
                    "Map" => Some(LuaLibFeature::Map),
                    "Set" => Some(LuaLibFeature::Set),
                    "WeakMap" => Some(LuaLibFeature::WeakMap),
                    "WeakSet" => Some(LuaLibFeature::WeakSet),
                    _ => None,
                };
                if let Some(feature) = feature {
                    let callee = self.lualib_callee(feature);
                    let args = self.transform_arguments(arguments)?;
                    return Ok(LuaExpression::call(
                        LuaExpression::dot(callee, "new", origin),
                        args,
                        origin,
                    ));
                }
            }

            if let Some(symbol) = self.oracle.symbol_of(identifier.id) {
                if self.directives.symbol_has(symbol, DirectiveKind::Extension, self.oracle)
                    || self.directives.symbol_has(symbol, DirectiveKind::MetaExtension, self.oracle)
                {
                    return Err(TranspileError::InvalidNewExpressionOnExtension {
                        span: expression.span,
                    });
                }
                if self.directives.symbol_has(symbol, DirectiveKind::LuaTable, self.oracle) {
                    if !arguments.is_empty() {
                        return Err(TranspileError::ForbiddenLuaTableUseException {
                            span: expression.span,
                        });
                    }
                    return Ok(LuaExpression::table(Vec::new(), origin));
                }
                for directive in self.directives.for_symbol(symbol, self.oracle) {
                    if directive.kind == DirectiveKind::CustomConstructor {
                        if let Some(function_name) = directive.arguments.first() {
                            let args = self.transform_arguments(arguments)?;
                            return Ok(LuaExpression::call(
                                LuaExpression::name(function_name.clone(), origin),
                                args,
                                origin,
                            ));
                        }
                    }
                }
            }
        }

        let class = self.transform_expression(callee)?;
        let args = self.transform_arguments(arguments)?;
        Ok(LuaExpression::call(LuaExpression::dot(class, "new", origin), args, origin))
    }

    /// Lowers an argument list; a trailing spread becomes a multi-value tail.
    pub(crate) fn transform_arguments(
        &mut self,
        arguments: &[Expression],
    ) -> Result<Vec<LuaExpression>> {
        let mut out = Vec::with_capacity(arguments.len());
        let last = arguments.len().saturating_sub(1);
        for (i, argument) in arguments.iter().enumerate() {
            match &argument.kind {
                ExpressionKind::Spread(operand) => {
                    if i != last {
                        return Err(TranspileError::UnsupportedKind {
                            kind: "spread argument before the end of an argument list".to_string(),
                            span: argument.span,
                        });
                    }
                    out.push(self.transform_spread(operand)?);
                }
                _ => out.push(self.transform_expression(argument)?),
            }
        }
        Ok(out)
    }

    /// The effective context type of a call.
    pub(crate) fn call_context(&self, call: NodeId, callee: &Expression) -> ContextType {
        if let Some(signature) = self.oracle.resolved_signature(call) {
            if signature.context != ContextType::None {
                return signature.context;
            }
        }
        match self.oracle.type_of(callee.id).context_type() {
            ContextType::None => {
                if self.directives.file_has(DirectiveKind::NoSelfInFile) {
                    ContextType::Void
                } else {
                    ContextType::NonVoid
                }
            }
            context => context,
        }
    }

    /// `@luaTable` method calls in expression position.
    ///
    /// `get` maps to raw indexing; `set` is only legal as a statement and is
    /// intercepted by the statement lowering before this runs.
    pub(crate) fn transform_lua_table_call(
        &mut self,
        expression: &Expression,
        object: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        match name {
            "get" => {
                if arguments.len() != 1 {
                    return Err(TranspileError::InvalidPropertyCall {
                        name: "get".to_string(),
                        span: expression.span,
                    });
                }
                let obj = self.transform_expression(object)?;
                let key = self.transform_expression(&arguments[0])?;
                Ok(LuaExpression::index(obj, key, origin))
            }
            "set" => {
                Err(TranspileError::ForbiddenLuaTableSetExpression { span: expression.span })
            }
            _ => Err(TranspileError::ForbiddenLuaTableUseException { span: expression.span }),
        }
    }

    // ---- built-in namespaces ---------------------------------------------

    fn transform_namespace_call(
        &mut self,
        expression: &Expression,
        namespace: &str,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        match namespace {
            "Math" => self.transform_math_call(expression, name, arguments),
            "console" => self.transform_console_call(expression, name, arguments),
            "Object" => self.transform_object_call(expression, name, arguments),
            "Symbol" => self.transform_symbol_call(expression, name, arguments),
            "Number" => self.transform_number_call(expression, name, arguments),
            "String" => self.transform_string_namespace_call(expression, name, arguments),
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("{namespace}.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_math_call(
        &mut self,
        expression: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let math = |function: &str, args: Vec<LuaExpression>| {
            LuaExpression::call(
                LuaExpression::dot(LuaExpression::name("math", None), function, None),
                args,
                origin,
            )
        };

        match name {
            "abs" | "acos" | "asin" | "atan" | "ceil" | "cos" | "exp" | "floor" | "fmod"
            | "log" | "max" | "min" | "random" | "sin" | "sqrt" | "tan" => {
                let args = self.transform_arguments(arguments)?;
                Ok(math(name, args))
            }
            "atan2" => {
                let mut args = self.transform_arguments(arguments)?;
                if args.len() != 2 {
                    return Err(TranspileError::InvalidPropertyCall {
                        name: "Math.atan2".to_string(),
                        span: expression.span,
                    });
                }
                let b = args.pop().unwrap();
                let a = args.pop().unwrap();
                Ok(math("atan", vec![LuaExpression::binary(LuaBinaryOp::Div, a, b, origin)]))
            }
            "pow" => {
                let mut args = self.transform_arguments(arguments)?;
                if args.len() != 2 {
                    return Err(TranspileError::InvalidPropertyCall {
                        name: "Math.pow".to_string(),
                        span: expression.span,
                    });
                }
                let exponent = args.pop().unwrap();
                let base = args.pop().unwrap();
                Ok(LuaExpression::binary(LuaBinaryOp::Pow, base, exponent, origin))
            }
            "round" => {
                let args = self.transform_arguments(arguments)?;
                let x = args.into_iter().next().ok_or(TranspileError::InvalidPropertyCall {
                    name: "Math.round".to_string(),
                    span: expression.span,
                })?;
                Ok(math(
                    "floor",
                    vec![LuaExpression::binary(
                        LuaBinaryOp::Add,
                        x,
                        LuaExpression::number(0.5, None),
                        origin,
                    )],
                ))
            }
            "log10" | "log2" => {
                let args = self.transform_arguments(arguments)?;
                let x = args.into_iter().next().ok_or(TranspileError::InvalidPropertyCall {
                    name: format!("Math.{name}"),
                    span: expression.span,
                })?;
                let denominator = if name == "log10" {
                    std::f64::consts::LN_10
                } else {
                    std::f64::consts::LN_2
                };
                Ok(LuaExpression::binary(
                    LuaBinaryOp::Div,
                    math("log", vec![x]),
                    LuaExpression::number(denominator, None),
                    origin,
                ))
            }
            "log1p" => {
                let args = self.transform_arguments(arguments)?;
                let x = args.into_iter().next().ok_or(TranspileError::InvalidPropertyCall {
                    name: "Math.log1p".to_string(),
                    span: expression.span,
                })?;
                Ok(math(
                    "log",
                    vec![LuaExpression::binary(
                        LuaBinaryOp::Add,
                        LuaExpression::number(1.0, None),
                        x,
                        origin,
                    )],
                ))
            }
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("Math.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_console_call(
        &mut self,
        expression: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let args = self.transform_arguments(arguments)?;
        match name {
            "log" | "info" | "warn" | "error" | "trace" => {
                Ok(LuaExpression::call(LuaExpression::name("print", None), args, origin))
            }
            "assert" => Ok(LuaExpression::call(LuaExpression::name("assert", None), args, origin)),
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("console.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_object_call(
        &mut self,
        expression: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let feature = match name {
            "keys" => LuaLibFeature::ObjectKeys,
            "values" => LuaLibFeature::ObjectValues,
            "entries" => LuaLibFeature::ObjectEntries,
            "assign" => LuaLibFeature::ObjectAssign,
            _ => {
                return Err(TranspileError::UnsupportedProperty {
                    name: format!("Object.{name}"),
                    span: expression.span,
                })
            }
        };
        let args = self.transform_arguments(arguments)?;
        let callee = self.lualib_callee(feature);
        Ok(LuaExpression::call(callee, args, origin))
    }

    fn transform_symbol_call(
        &mut self,
        expression: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let args = self.transform_arguments(arguments)?;
        match name {
            "for" => {
                self.lualib.use_feature(LuaLibFeature::Symbol);
                self.lualib.use_feature(LuaLibFeature::SymbolRegistry);
                Ok(LuaExpression::call(
                    LuaExpression::name("__TS__SymbolRegistryFor", None),
                    args,
                    origin,
                ))
            }
            "keyFor" => {
                self.lualib.use_feature(LuaLibFeature::Symbol);
                self.lualib.use_feature(LuaLibFeature::SymbolRegistry);
                Ok(LuaExpression::call(
                    LuaExpression::name("__TS__SymbolRegistryKeyFor", None),
                    args,
                    origin,
                ))
            }
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("Symbol.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_number_call(
        &mut self,
        expression: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let single = |this: &mut Self, arguments: &[Expression]| -> Result<LuaExpression> {
            let arg = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                name: format!("Number.{name}"),
                span: expression.span,
            })?;
            this.transform_expression(arg)
        };

        match name {
            "isNaN" => {
                let source = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                    name: "Number.isNaN".to_string(),
                    span: expression.span,
                })?;
                self.with_cached_value(source, origin, |_, value| {
                    Ok(LuaExpression::binary(LuaBinaryOp::Ne, value.clone(), value, origin))
                })
            }
            "isInteger" => {
                let source = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                    name: "Number.isInteger".to_string(),
                    span: expression.span,
                })?;
                self.with_cached_value(source, origin, |_, value| {
                    Ok(LuaExpression::binary(
                        LuaBinaryOp::Eq,
                        LuaExpression::call(
                            LuaExpression::dot(LuaExpression::name("math", None), "floor", None),
                            vec![value.clone()],
                            origin,
                        ),
                        value,
                        origin,
                    ))
                })
            }
            "isFinite" => {
                let source = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                    name: "Number.isFinite".to_string(),
                    span: expression.span,
                })?;
                self.with_cached_value(source, origin, |_, value| {
                    let huge = LuaExpression::dot(LuaExpression::name("math", None), "huge", None);
                    let not_nan =
                        LuaExpression::binary(LuaBinaryOp::Eq, value.clone(), value.clone(), origin);
                    let below = LuaExpression::binary(
                        LuaBinaryOp::Ne,
                        value.clone(),
                        huge.clone(),
                        origin,
                    );
                    let above = LuaExpression::binary(
                        LuaBinaryOp::Ne,
                        value,
                        LuaExpression::unary(LuaUnaryOp::Neg, huge, None),
                        origin,
                    );
                    Ok(LuaExpression::binary(
                        LuaBinaryOp::And,
                        LuaExpression::binary(LuaBinaryOp::And, not_nan, below, origin),
                        above,
                        origin,
                    ))
                })
            }
            "parseFloat" => {
                let value = single(self, arguments)?;
                Ok(LuaExpression::call(LuaExpression::name("tonumber", None), vec![value], origin))
            }
            "parseInt" => {
                let value = single(self, arguments)?;
                Ok(LuaExpression::call(
                    LuaExpression::dot(LuaExpression::name("math", None), "floor", None),
                    vec![LuaExpression::call(
                        LuaExpression::name("tonumber", None),
                        vec![value],
                        origin,
                    )],
                    origin,
                ))
            }
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("Number.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_string_namespace_call(
        &mut self,
        expression: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let args = self.transform_arguments(arguments)?;
        match name {
            "fromCharCode" => Ok(LuaExpression::call(
                LuaExpression::dot(LuaExpression::name("string", None), "char", None),
                args,
                origin,
            )),
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("String.{name}"),
                span: expression.span,
            }),
        }
    }

    // ---- string / array instance intrinsics -------------------------------

    fn transform_string_call(
        &mut self,
        expression: &Expression,
        object: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);
        let string_fn = |function: &str, args: Vec<LuaExpression>| {
            LuaExpression::call(
                LuaExpression::dot(LuaExpression::name("string", None), function, None),
                args,
                origin,
            )
        };

        match name {
            "split" => {
                let obj = self.transform_expression(object)?;
                let mut args = vec![obj];
                args.extend(self.transform_arguments(arguments)?);
                let callee = self.lualib_callee(LuaLibFeature::StringSplit);
                Ok(LuaExpression::call(callee, args, origin))
            }
            "indexOf" => {
                let obj = self.transform_expression(object)?;
                let mut args = vec![obj];
                args.extend(self.transform_arguments(arguments)?);
                let callee = self.lualib_callee(LuaLibFeature::StringIndexOf);
                Ok(LuaExpression::call(callee, args, origin))
            }
            "trim" => {
                let obj = self.transform_expression(object)?;
                let callee = self.lualib_callee(LuaLibFeature::StringTrim);
                Ok(LuaExpression::call(callee, vec![obj], origin))
            }
            "toUpperCase" => {
                let obj = self.transform_expression(object)?;
                Ok(string_fn("upper", vec![obj]))
            }
            "toLowerCase" => {
                let obj = self.transform_expression(object)?;
                Ok(string_fn("lower", vec![obj]))
            }
            "substring" => {
                let obj = self.transform_expression(object)?;
                let start = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                    name: "substring".to_string(),
                    span: expression.span,
                })?;
                let mut args = vec![obj, self.add_one(start)?];
                if let Some(end) = arguments.get(1) {
                    args.push(self.transform_expression(end)?);
                }
                Ok(string_fn("sub", args))
            }
            "charAt" => {
                let index = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                    name: "charAt".to_string(),
                    span: expression.span,
                })?;
                if index.is_effect_free() {
                    let obj = self.transform_expression(object)?;
                    let i1 = self.add_one(index)?;
                    let i2 = self.add_one(index)?;
                    Ok(string_fn("sub", vec![obj, i1, i2]))
                } else {
                    let obj = self.transform_expression(object)?;
                    let temp = self.temp_identifier();
                    let value = self.add_one(index)?;
                    let body = vec![
                        LuaStatement::local_single(temp.clone(), Some(value), origin),
                        LuaStatement::return_statement(
                            vec![string_fn(
                                "sub",
                                vec![
                                    obj,
                                    LuaExpression::identifier(temp.clone()),
                                    LuaExpression::identifier(temp),
                                ],
                            )],
                            origin,
                        ),
                    ];
                    Ok(self.iife(body, origin))
                }
            }
            "charCodeAt" => {
                let obj = self.transform_expression(object)?;
                let index = arguments.first().ok_or(TranspileError::InvalidPropertyCall {
                    name: "charCodeAt".to_string(),
                    span: expression.span,
                })?;
                let i = self.add_one(index)?;
                Ok(string_fn("byte", vec![obj, i]))
            }
            "repeat" => {
                let obj = self.transform_expression(object)?;
                let mut args = vec![obj];
                args.extend(self.transform_arguments(arguments)?);
                Ok(string_fn("rep", args))
            }
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("string.{name}"),
                span: expression.span,
            }),
        }
    }

    fn transform_array_call(
        &mut self,
        expression: &Expression,
        object: &Expression,
        name: &str,
        arguments: &[Expression],
    ) -> Result<LuaExpression> {
        let origin = Some(expression.id);

        let feature = match name {
            "push" => Some(LuaLibFeature::ArrayPush),
            "concat" => Some(LuaLibFeature::ArrayConcat),
            "join" => Some(LuaLibFeature::ArrayJoin),
            "indexOf" => Some(LuaLibFeature::ArrayIndexOf),
            "map" => Some(LuaLibFeature::ArrayMap),
            "filter" => Some(LuaLibFeature::ArrayFilter),
            "forEach" => Some(LuaLibFeature::ArrayForEach),
            "some" => Some(LuaLibFeature::ArraySome),
            "every" => Some(LuaLibFeature::ArrayEvery),
            _ => None,
        };
        if let Some(feature) = feature {
            let obj = self.transform_expression(object)?;
            let mut args = vec![obj];
            args.extend(self.transform_arguments(arguments)?);
            let callee = self.lualib_callee(feature);
            return Ok(LuaExpression::call(callee, args, origin));
        }

        let table_fn = |function: &str, args: Vec<LuaExpression>| {
            LuaExpression::call(
                LuaExpression::dot(LuaExpression::name("table", None), function, None),
                args,
                origin,
            )
        };
        match name {
            "pop" => {
                let obj = self.transform_expression(object)?;
                Ok(table_fn("remove", vec![obj]))
            }
            "shift" => {
                let obj = self.transform_expression(object)?;
                Ok(table_fn("remove", vec![obj, LuaExpression::number(1.0, None)]))
            }
            "unshift" => {
                if arguments.len() != 1 {
                    return Err(TranspileError::InvalidPropertyCall {
                        name: "unshift".to_string(),
                        span: expression.span,
                    });
                }
                let obj = self.transform_expression(object)?;
                let value = self.transform_expression(&arguments[0])?;
                Ok(table_fn("insert", vec![obj, LuaExpression::number(1.0, None), value]))
            }
            _ => Err(TranspileError::UnsupportedProperty {
                name: format!("array.{name}"),
                span: expression.span,
            }),
        }
    }

    /// Evaluates `source` exactly once and hands the reusable value to
    /// `build`; wraps in an IIFE only when re-evaluation could be observed.
    fn with_cached_value(
        &mut self,
        source: &Expression,
        origin: Option<NodeId>,
        build: impl FnOnce(&mut Self, LuaExpression) -> Result<LuaExpression>,
    ) -> Result<LuaExpression> {
        if source.is_effect_free() {
            let value = self.transform_expression(source)?;
            return build(self, value);
        }
        let temp = self.temp_identifier();
        let value = self.transform_expression(source)?;
        let result = build(self, LuaExpression::identifier(temp.clone()))?;
        let body = vec![
            LuaStatement::local_single(temp, Some(value), origin),
            LuaStatement::return_statement(vec![result], origin),
        ];
        Ok(self.iife(body, origin))
    }
}
