// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Class lowering: the prototype-table protocol.
//!
//! A class becomes a pair of tables. The class table holds statics, `name`,
//! `new` and the `____super` pointer; the prototype table holds methods,
//! accessor tables and `____constructor`. Inheritance links both tables to
//! the base class's pair via metatables. Accessors route `__index` and
//! `__newindex` through lualib helpers.
//!
//! `@extension`, `@metaExtension`, `@luaTable` and `@customConstructor`
//! replace or forbid parts of this protocol.

use crate::ast::{
    Block, ClassDeclaration, ClassMember, ClassMemberKind, Parameter, PropertyName, Statement,
};
use crate::directives::DirectiveKind;
use crate::error::{Result, TranspileError};
use crate::hoist;
use crate::lua_ast::{LuaBlock, LuaExpression, LuaIdentifier, LuaStatement, LuaTableField};
use crate::lualib::LuaLibFeature;
use crate::mangle;
use crate::oracle::ContextType;
use crate::scope::ScopeKind;
use crate::transformer::{ClassContext, FunctionContext, Transformer};

const RESERVED_STATIC_NAMES: [&str; 6] =
    ["new", "name", "prototype", "____super", "____getters", "____setters"];

impl<'a> Transformer<'a> {
    /// Lowers a class declaration.
    pub(crate) fn transform_class_declaration(
        &mut self,
        statement: &Statement,
        decl: &ClassDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        let has_extension = self.directives.node_has(statement.id, DirectiveKind::Extension);
        let has_meta = self.directives.node_has(statement.id, DirectiveKind::MetaExtension);
        if has_extension && has_meta {
            return Err(TranspileError::InvalidExtensionMetaExtension { span: statement.span });
        }

        if self.directives.node_has(statement.id, DirectiveKind::LuaTable) {
            if !decl.ambient {
                return Err(TranspileError::ForbiddenLuaTableNonDeclaration {
                    span: statement.span,
                });
            }
            if decl.extends.is_some() {
                return Err(TranspileError::InvalidExtendsLuaTable { span: statement.span });
            }
            return Ok(Vec::new());
        }

        if has_extension || has_meta {
            if decl.exported {
                return Err(TranspileError::InvalidExportsExtension { span: statement.span });
            }
            if decl.extends.is_some() {
                return Err(TranspileError::InvalidExtendsExtension { span: statement.span });
            }
            return self.transform_extension_class(statement, decl, has_meta);
        }

        if decl.ambient {
            if let Some(name) = &decl.name {
                self.check_ambient_name(name)?;
            }
            return Ok(Vec::new());
        }

        self.transform_regular_class(statement, decl)
    }

    fn transform_regular_class(
        &mut self,
        statement: &Statement,
        decl: &ClassDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);
        let name = decl.name.as_ref().ok_or(TranspileError::MissingClassName {
            span: statement.span,
        })?;

        let class_ident = self.transform_identifier(name);
        let class_name = class_ident.text.clone();
        let class = || LuaExpression::name(class_name.clone(), origin);
        let prototype = || LuaExpression::dot(class(), "prototype", origin);

        let mut out = Vec::new();

        // 1. the class table, with a local alias when exported
        if decl.exported {
            out.push(LuaStatement::assign(
                self.export_reference(&name.text, origin),
                LuaExpression::table(Vec::new(), origin),
                origin,
            ));
            out.push(LuaStatement::local_single(
                class_ident.clone_identifier(),
                Some(self.export_reference(&name.text, origin)),
                origin,
            ));
        } else {
            self.scopes.record_declaration_for(&class_ident, statement.span.start);
            out.push(LuaStatement::local_single(
                class_ident.clone_identifier(),
                Some(LuaExpression::table(Vec::new(), origin)),
                origin,
            ));
        }

        let instance_getters = class_accessors(&decl.members, false, true);
        let instance_setters = class_accessors(&decl.members, false, false);
        let static_getters = class_accessors(&decl.members, true, true);
        let static_setters = class_accessors(&decl.members, true, false);
        let has_static_accessors = static_getters || static_setters;

        // 2. identity fields
        out.push(LuaStatement::assign(
            LuaExpression::dot(class(), "name", origin),
            LuaExpression::string(name.text.clone(), origin),
            origin,
        ));
        out.push(LuaStatement::assign(
            LuaExpression::dot(class(), "__index", origin),
            class(),
            origin,
        ));
        out.push(LuaStatement::assign(
            prototype(),
            LuaExpression::table(Vec::new(), origin),
            origin,
        ));

        if instance_getters {
            out.push(LuaStatement::assign(
                LuaExpression::dot(prototype(), "____getters", origin),
                LuaExpression::table(Vec::new(), origin),
                origin,
            ));
        }
        if instance_setters {
            out.push(LuaStatement::assign(
                LuaExpression::dot(prototype(), "____setters", origin),
                LuaExpression::table(Vec::new(), origin),
                origin,
            ));
        }

        if instance_getters {
            let callee = self.lualib_callee(LuaLibFeature::Index);
            out.push(LuaStatement::assign(
                LuaExpression::dot(prototype(), "__index", origin),
                LuaExpression::call(callee, vec![prototype()], origin),
                origin,
            ));
        } else {
            out.push(LuaStatement::assign(
                LuaExpression::dot(prototype(), "__index", origin),
                prototype(),
                origin,
            ));
        }
        if instance_setters {
            let callee = self.lualib_callee(LuaLibFeature::NewIndex);
            out.push(LuaStatement::assign(
                LuaExpression::dot(prototype(), "__newindex", origin),
                LuaExpression::call(callee, vec![prototype()], origin),
                origin,
            ));
        }

        out.push(LuaStatement::assign(
            LuaExpression::dot(prototype(), "constructor", origin),
            class(),
            origin,
        ));

        if has_static_accessors {
            out.push(LuaStatement::assign(
                LuaExpression::dot(class(), "____getters", origin),
                LuaExpression::table(Vec::new(), origin),
                origin,
            ));
            out.push(LuaStatement::assign(
                LuaExpression::dot(class(), "____setters", origin),
                LuaExpression::table(Vec::new(), origin),
                origin,
            ));
        }

        // 3. inheritance
        if let Some(extends) = &decl.extends {
            let base = self.transform_expression(extends)?;
            if let Some(base_identifier) = extends.as_identifier() {
                if let Some(symbol) = self.oracle.symbol_of(base_identifier.id) {
                    if self.directives.symbol_has(symbol, DirectiveKind::Extension, self.oracle)
                        || self.directives.symbol_has(
                            symbol,
                            DirectiveKind::MetaExtension,
                            self.oracle,
                        )
                    {
                        return Err(TranspileError::InvalidExtendsExtension {
                            span: statement.span,
                        });
                    }
                    if self.directives.symbol_has(symbol, DirectiveKind::LuaTable, self.oracle) {
                        return Err(TranspileError::InvalidExtendsLuaTable {
                            span: statement.span,
                        });
                    }
                }
                if self.lua_table_classes.contains(&base_identifier.text) {
                    return Err(TranspileError::InvalidExtendsLuaTable { span: statement.span });
                }
            }
            out.push(LuaStatement::assign(
                LuaExpression::dot(class(), "____super", origin),
                base,
                origin,
            ));
            if !has_static_accessors {
                out.push(LuaStatement::expression(
                    LuaExpression::call(
                        LuaExpression::name("setmetatable", None),
                        vec![class(), LuaExpression::dot(class(), "____super", origin)],
                        origin,
                    ),
                    origin,
                ));
            }
            out.push(LuaStatement::expression(
                LuaExpression::call(
                    LuaExpression::name("setmetatable", None),
                    vec![
                        prototype(),
                        LuaExpression::dot(
                            LuaExpression::dot(class(), "____super", origin),
                            "prototype",
                            origin,
                        ),
                    ],
                    origin,
                ),
                origin,
            ));
        }
        if has_static_accessors {
            let index = self.lualib_callee(LuaLibFeature::ClassIndex);
            let newindex = self.lualib_callee(LuaLibFeature::ClassNewIndex);
            out.push(LuaStatement::expression(
                LuaExpression::call(
                    LuaExpression::name("setmetatable", None),
                    vec![
                        class(),
                        LuaExpression::table(
                            vec![
                                LuaTableField::Named { key: "__index".to_string(), value: index },
                                LuaTableField::Named {
                                    key: "__newindex".to_string(),
                                    value: newindex,
                                },
                            ],
                            origin,
                        ),
                    ],
                    origin,
                ),
                origin,
            ));
        }

        // 4. construction entry point
        out.push(LuaStatement::assign(
            LuaExpression::dot(class(), "new", origin),
            self.class_new_function(&class_name, origin),
            origin,
        ));

        self.class_stack.push(ClassContext { local_name: class_name.clone() });

        // 5. the constructor (explicit or generated)
        let constructor = decl.members.iter().find_map(|m| match &m.kind {
            ClassMemberKind::Constructor { parameters, body } => {
                body.as_ref().map(|body| (m, parameters, body))
            }
            _ => None,
        });
        let constructor_fn = match constructor {
            Some((member, parameters, body)) => {
                self.transform_constructor(member, parameters, body, decl)?
            }
            None => self.generated_constructor(decl, origin)?,
        };
        out.push(LuaStatement::assign(
            LuaExpression::dot(prototype(), "____constructor", origin),
            constructor_fn,
            origin,
        ));

        // 6. methods, static fields, accessors
        for member in &decl.members {
            if self.directives.node_has(member.id, DirectiveKind::PureAbstract) {
                continue;
            }
            match &member.kind {
                ClassMemberKind::Constructor { .. } => {}
                ClassMemberKind::Method { name, parameters, body, is_static, generator } => {
                    let Some(body) = body else { continue };
                    if *is_static {
                        self.check_static_member_name(name, member)?;
                    }
                    let context = if self.directives.node_has(member.id, DirectiveKind::NoSelf) {
                        ContextType::Void
                    } else {
                        ContextType::NonVoid
                    };
                    let tuple_return =
                        self.directives.node_has(member.id, DirectiveKind::TupleReturn);
                    let function = self.transform_function_expression(
                        member.id,
                        parameters,
                        body,
                        context,
                        *generator,
                        tuple_return,
                    )?;
                    let target_table = if *is_static { class() } else { prototype() };
                    let target = if !*is_static
                        && matches!(name, PropertyName::Identifier(n) if n == "toString")
                    {
                        LuaExpression::dot(target_table, "__tostring", origin)
                    } else {
                        self.member_target(target_table, name, origin)?
                    };
                    out.push(LuaStatement::assign(target, function, origin));
                }
                ClassMemberKind::Property { name, initializer, is_static } => {
                    if *is_static {
                        self.check_static_member_name(name, member)?;
                        if let Some(initializer) = initializer {
                            let value = self.transform_expression(initializer)?;
                            let target = self.member_target(class(), name, origin)?;
                            out.push(LuaStatement::assign(target, value, origin));
                        }
                    }
                    // Instance fields initialise inside the constructor.
                }
                ClassMemberKind::Getter { name, body, is_static } => {
                    if *is_static {
                        self.check_static_member_name(name, member)?;
                    }
                    let function = self.transform_accessor(member, &[], body)?;
                    let table = if *is_static { class() } else { prototype() };
                    let target = self.member_target(
                        LuaExpression::dot(table, "____getters", origin),
                        name,
                        origin,
                    )?;
                    out.push(LuaStatement::assign(target, function, origin));
                }
                ClassMemberKind::Setter { name, parameter, body, is_static } => {
                    if *is_static {
                        self.check_static_member_name(name, member)?;
                    }
                    let function =
                        self.transform_accessor(member, std::slice::from_ref(parameter), body)?;
                    let table = if *is_static { class() } else { prototype() };
                    let target = self.member_target(
                        LuaExpression::dot(table, "____setters", origin),
                        name,
                        origin,
                    )?;
                    out.push(LuaStatement::assign(target, function, origin));
                }
            }
        }

        self.class_stack.pop();

        // 7. decorators
        if !decl.decorators.is_empty() {
            let mut fields = Vec::new();
            for decorator in &decl.decorators {
                fields.push(LuaTableField::Positional(self.transform_expression(decorator)?));
            }
            let callee = self.lualib_callee(LuaLibFeature::Decorate);
            let decorated = LuaExpression::call(
                callee,
                vec![LuaExpression::table(fields, origin), class()],
                origin,
            );
            out.push(LuaStatement::assign(class(), decorated, origin));
            if decl.exported {
                out.push(LuaStatement::assign(
                    self.export_reference(&name.text, origin),
                    class(),
                    origin,
                ));
            }
        }

        Ok(out)
    }

    /// `function C.new(...) local self = setmetatable({}, C.prototype); …`
    fn class_new_function(
        &mut self,
        class_name: &str,
        origin: Option<crate::ast::NodeId>,
    ) -> LuaExpression {
        let self_ident = LuaIdentifier::named("self");
        let body = LuaBlock::new(vec![
            LuaStatement::local_single(
                self_ident.clone(),
                Some(LuaExpression::call(
                    LuaExpression::name("setmetatable", None),
                    vec![
                        LuaExpression::table(Vec::new(), origin),
                        LuaExpression::dot(
                            LuaExpression::name(class_name, origin),
                            "prototype",
                            origin,
                        ),
                    ],
                    origin,
                )),
                origin,
            ),
            LuaStatement::expression(
                LuaExpression::method_call(
                    LuaExpression::identifier(self_ident.clone()),
                    "____constructor",
                    vec![LuaExpression::dots(origin)],
                    origin,
                ),
                origin,
            ),
            LuaStatement::return_statement(
                vec![LuaExpression::identifier(self_ident)],
                origin,
            ),
        ]);
        LuaExpression::function(Vec::new(), true, body, origin)
    }

    /// Lowers an explicit constructor with parameter properties and field
    /// initialisers injected at entry.
    fn transform_constructor(
        &mut self,
        member: &ClassMember,
        parameters: &[Parameter],
        body: &Block,
        decl: &ClassDeclaration,
    ) -> Result<LuaExpression> {
        let origin = Some(member.id);

        // Parameter properties with defaults keep the `x or default` shape
        // instead of the nil-check prologue.
        let stripped: Vec<Parameter> = parameters
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if p.property {
                    p.default = None;
                }
                p
            })
            .collect();

        self.function_stack.push(FunctionContext::default());
        self.scopes.push(ScopeKind::Function);

        let (names, vararg, mut statements) = self.transform_parameters(&stripped, true)?;

        for (parameter, original) in stripped.iter().zip(parameters) {
            if !parameter.property {
                continue;
            }
            if let crate::ast::BindingName::Identifier(identifier) = &parameter.name {
                let field = LuaExpression::dot(
                    LuaExpression::name("self", origin),
                    identifier.text.clone(),
                    origin,
                );
                let parameter_ref = LuaExpression::identifier(self.transform_identifier(identifier));
                let value = match &original.default {
                    Some(default) => {
                        let default_value = self.transform_expression(default)?;
                        LuaExpression::binary(
                            crate::lua_ast::LuaBinaryOp::Or,
                            parameter_ref,
                            default_value,
                            origin,
                        )
                    }
                    None => parameter_ref,
                };
                statements.push(LuaStatement::assign(field, value, origin));
            }
        }

        statements.extend(self.instance_field_initializers(decl)?);

        let lowered = self.transform_statements(&body.statements)?;
        let scope = self.scopes.pop();
        self.function_stack.pop();
        statements.extend(hoist::hoist_statements(&scope, lowered, &self.symbols, self.options));

        Ok(LuaExpression::function(names, vararg, LuaBlock::new(statements), origin))
    }

    /// The generated constructor: chain to super, then run field initialisers.
    fn generated_constructor(
        &mut self,
        decl: &ClassDeclaration,
        origin: Option<crate::ast::NodeId>,
    ) -> Result<LuaExpression> {
        self.function_stack.push(FunctionContext::default());
        self.scopes.push(ScopeKind::Function);

        let mut statements = Vec::new();
        if decl.extends.is_some() {
            let class = self.class_stack.last().expect("inside class").local_name.clone();
            statements.push(LuaStatement::expression(
                LuaExpression::call(
                    LuaExpression::dot(
                        LuaExpression::dot(
                            LuaExpression::dot(
                                LuaExpression::name(class, origin),
                                "____super",
                                origin,
                            ),
                            "prototype",
                            origin,
                        ),
                        "____constructor",
                        origin,
                    ),
                    vec![LuaExpression::name("self", origin), LuaExpression::dots(origin)],
                    origin,
                ),
                origin,
            ));
        }
        statements.extend(self.instance_field_initializers(decl)?);

        self.scopes.pop();
        self.function_stack.pop();

        Ok(LuaExpression::function(
            vec![LuaIdentifier::named("self")],
            true,
            LuaBlock::new(statements),
            origin,
        ))
    }

    fn instance_field_initializers(&mut self, decl: &ClassDeclaration) -> Result<Vec<LuaStatement>> {
        let mut out = Vec::new();
        for member in &decl.members {
            if let ClassMemberKind::Property { name, initializer: Some(initializer), is_static: false } =
                &member.kind
            {
                let value = self.transform_expression(initializer)?;
                let target =
                    self.member_target(LuaExpression::name("self", Some(member.id)), name, Some(member.id))?;
                out.push(LuaStatement::assign(target, value, Some(member.id)));
            }
        }
        Ok(out)
    }

    fn transform_accessor(
        &mut self,
        member: &ClassMember,
        parameters: &[Parameter],
        body: &Block,
    ) -> Result<LuaExpression> {
        self.transform_function_expression(
            member.id,
            parameters,
            body,
            ContextType::NonVoid,
            false,
            false,
        )
    }

    /// `table.name`, `table["odd name"]`, `table[3]` or `table[computed]`.
    pub(crate) fn member_target(
        &mut self,
        table: LuaExpression,
        name: &PropertyName,
        origin: Option<crate::ast::NodeId>,
    ) -> Result<LuaExpression> {
        Ok(match name {
            PropertyName::Identifier(text) if mangle::is_valid_lua_identifier(text) => {
                LuaExpression::dot(table, text.clone(), origin)
            }
            PropertyName::Identifier(text) | PropertyName::String(text) => {
                LuaExpression::index(table, LuaExpression::string(text.clone(), origin), origin)
            }
            PropertyName::Number(value) => {
                LuaExpression::index(table, LuaExpression::number(*value, origin), origin)
            }
            PropertyName::Computed(expression) => {
                let key = self.transform_expression(expression)?;
                LuaExpression::index(table, key, origin)
            }
        })
    }

    fn check_static_member_name(&self, name: &PropertyName, member: &ClassMember) -> Result<()> {
        if let PropertyName::Identifier(text) | PropertyName::String(text) = name {
            if RESERVED_STATIC_NAMES.contains(&text.as_str()) {
                return Err(TranspileError::ForbiddenStaticClassPropertyName {
                    name: text.clone(),
                    span: member.span,
                });
            }
        }
        Ok(())
    }

    /// `@extension` / `@metaExtension`: members land on an existing table.
    fn transform_extension_class(
        &mut self,
        statement: &Statement,
        decl: &ClassDeclaration,
        meta: bool,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);
        let mut out = Vec::new();

        let target_table: LuaExpression = if meta {
            let directive = self
                .directives
                .node_directive(statement.id, DirectiveKind::MetaExtension)
                .cloned();
            let argument = directive
                .and_then(|d| d.arguments.first().cloned())
                .ok_or(TranspileError::MissingMetaExtension { span: statement.span })?;
            let temp = self.temp_identifier();
            out.push(LuaStatement::local_single(
                temp.clone(),
                Some(LuaExpression::index(
                    LuaExpression::call(
                        LuaExpression::dot(LuaExpression::name("debug", None), "getregistry", None),
                        Vec::new(),
                        origin,
                    ),
                    LuaExpression::string(argument, origin),
                    origin,
                )),
                origin,
            ));
            LuaExpression::identifier(temp)
        } else {
            let directive = self
                .directives
                .node_directive(statement.id, DirectiveKind::Extension)
                .cloned();
            let target = directive
                .and_then(|d| d.arguments.first().cloned())
                .or_else(|| decl.name.as_ref().map(|n| n.text.clone()))
                .ok_or(TranspileError::MissingClassName { span: statement.span })?;
            LuaExpression::name(target, origin)
        };

        for member in &decl.members {
            if self.directives.node_has(member.id, DirectiveKind::PureAbstract) {
                continue;
            }
            match &member.kind {
                ClassMemberKind::Constructor { .. } => {
                    return Err(TranspileError::UnsupportedKind {
                        kind: "constructor in an extension class".to_string(),
                        span: member.span,
                    })
                }
                ClassMemberKind::Method { name, parameters, body, generator, .. } => {
                    let Some(body) = body else { continue };
                    let context = if self.directives.node_has(member.id, DirectiveKind::NoSelf) {
                        ContextType::Void
                    } else {
                        ContextType::NonVoid
                    };
                    let function = self.transform_function_expression(
                        member.id,
                        parameters,
                        body,
                        context,
                        *generator,
                        self.directives.node_has(member.id, DirectiveKind::TupleReturn),
                    )?;
                    let target = self.member_target(target_table.clone(), name, origin)?;
                    out.push(LuaStatement::assign(target, function, origin));
                }
                ClassMemberKind::Property { name, initializer, .. } => {
                    if let Some(initializer) = initializer {
                        let value = self.transform_expression(initializer)?;
                        let target = self.member_target(target_table.clone(), name, origin)?;
                        out.push(LuaStatement::assign(target, value, origin));
                    }
                }
                ClassMemberKind::Getter { .. } | ClassMemberKind::Setter { .. } => {
                    return Err(TranspileError::UnsupportedKind {
                        kind: "accessor in an extension class".to_string(),
                        span: member.span,
                    })
                }
            }
        }

        Ok(out)
    }
}

/// True when the class declares an accessor with the given placement.
fn class_accessors(members: &[ClassMember], want_static: bool, want_getter: bool) -> bool {
    members.iter().any(|member| match &member.kind {
        ClassMemberKind::Getter { is_static, .. } => want_getter && *is_static == want_static,
        ClassMemberKind::Setter { is_static, .. } => !want_getter && *is_static == want_static,
        _ => false,
    })
}
