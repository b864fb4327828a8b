// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The AST-to-AST transformer driver.
//!
//! [`transform_source_file`] is the single entry point the host calls: it
//! walks one typed source file top-down and produces a Lua block plus the
//! set of runtime-support features the emitted code relies on.
//!
//! The walker itself is a stateful struct; expression, statement, class and
//! module lowerings live in sibling modules as further `impl` blocks on
//! [`Transformer`]. Scope push/pop, hoisting, temp naming and the shared
//! function-lowering machinery are here.

use crate::ast::{
    Block, Identifier, NodeId, Parameter, SourceFile, Statement, StatementKind,
};
use crate::directives::{DirectiveKind, DirectiveTable};
use crate::error::{Result, TranspileError};
use crate::hoist;
use crate::lua_ast::{
    LuaBlock, LuaExpression, LuaIdentifier, LuaStatement, LuaTableField,
};
use crate::lualib::{self, LuaLibFeature, LuaLibRegistry, LUALIB_BUNDLE_MODULE};
use crate::mangle;
use crate::options::CompilerOptions;
use crate::oracle::{ContextType, SymbolHandle, TypeOracle};
use crate::scope::{ScopeKind, ScopeStack};
use crate::symbols::SymbolTracker;
use std::collections::BTreeSet;
use std::collections::HashSet;

/// The literal name of the per-file exports table.
pub const EXPORTS_TABLE: &str = "____exports";

/// An export scope: the table exported symbols are routed through.
#[derive(Debug, Clone)]
pub(crate) struct ExportScope {
    /// The checker symbol of the file or namespace.
    pub symbol: Option<SymbolHandle>,
    /// The Lua name of the scope's export table.
    pub table: String,
}

/// Per-function transformation context.
#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionContext {
    /// Set when the function carries `@tupleReturn`.
    pub tuple_return: bool,
}

/// Per-class transformation context, for `super` and constructor lowering.
#[derive(Debug, Clone)]
pub(crate) struct ClassContext {
    /// The local Lua name the class table is bound to.
    pub local_name: String,
}

/// Transforms one source file into a Lua block.
///
/// Returns the block and the lualib features the emitted code uses. No
/// partial output is produced on error; the stack is abandoned with the file.
pub fn transform_source_file(
    file: &SourceFile,
    oracle: &dyn TypeOracle,
    options: &CompilerOptions,
) -> Result<(LuaBlock, BTreeSet<LuaLibFeature>)> {
    let mut transformer = Transformer::new(file, oracle, options);
    let block = transformer.transform_file()?;
    let features = transformer.lualib.used_features().clone();
    Ok((block, features))
}

/// The stateful file walker.
pub struct Transformer<'a> {
    pub(crate) file: &'a SourceFile,
    pub(crate) oracle: &'a dyn TypeOracle,
    pub(crate) options: &'a CompilerOptions,
    pub(crate) directives: DirectiveTable,
    pub(crate) scopes: ScopeStack,
    pub(crate) symbols: SymbolTracker,
    pub(crate) lualib: LuaLibRegistry,
    pub(crate) export_scopes: Vec<ExportScope>,
    pub(crate) function_stack: Vec<FunctionContext>,
    pub(crate) class_stack: Vec<ClassContext>,
    pub(crate) lua_table_classes: HashSet<String>,
    /// Capture set of the most recently lowered function expression, for
    /// function-definition records consumed by the hoister.
    pub(crate) last_function_captures: Option<HashSet<crate::symbols::SymbolId>>,
    temp_counter: u32,
}

impl<'a> Transformer<'a> {
    pub(crate) fn new(
        file: &'a SourceFile,
        oracle: &'a dyn TypeOracle,
        options: &'a CompilerOptions,
    ) -> Self {
        let directives = DirectiveTable::from_source_file(file);
        let mut transformer = Self {
            file,
            oracle,
            options,
            directives,
            scopes: ScopeStack::new(),
            symbols: SymbolTracker::new(),
            lualib: LuaLibRegistry::new(),
            export_scopes: Vec::new(),
            function_stack: Vec::new(),
            class_stack: Vec::new(),
            lua_table_classes: HashSet::new(),
            last_function_captures: None,
            temp_counter: 0,
        };
        transformer.collect_lua_table_classes(&file.statements);
        transformer
    }

    fn collect_lua_table_classes(&mut self, statements: &[Statement]) {
        for statement in statements {
            match &statement.kind {
                StatementKind::Class(decl) => {
                    if self.directives.node_has(statement.id, DirectiveKind::LuaTable) {
                        if let Some(name) = &decl.name {
                            self.lua_table_classes.insert(name.text.clone());
                        }
                    }
                }
                StatementKind::Namespace(decl) => {
                    self.collect_lua_table_classes(&decl.statements);
                }
                _ => {}
            }
        }
    }

    /// Transforms the whole file.
    pub(crate) fn transform_file(&mut self) -> Result<LuaBlock> {
        tracing::debug!("transforming {}", self.file.path);

        if self.file.is_json {
            return self.transform_json_file();
        }

        self.scopes.push(ScopeKind::File);
        self.export_scopes.push(ExportScope {
            symbol: self.oracle.symbol_of(self.file.id),
            table: EXPORTS_TABLE.to_string(),
        });
        self.function_stack.push(FunctionContext::default());

        let body = self.transform_statements(&self.file.statements)?;

        self.function_stack.pop();
        self.export_scopes.pop();
        let scope = self.scopes.pop();
        let mut statements = hoist::hoist_statements(&scope, body, &self.symbols, self.options);

        let is_module = self.file_has_exports();
        if is_module {
            statements.insert(
                0,
                LuaStatement::local_single(
                    LuaIdentifier::named(EXPORTS_TABLE),
                    Some(LuaExpression::table(Vec::new(), None)),
                    None,
                ),
            );
            statements.push(LuaStatement::return_statement(
                vec![LuaExpression::name(EXPORTS_TABLE, None)],
                None,
            ));
        }

        if lualib::wants_require(self.options.lualib_import, !self.lualib.is_empty()) {
            statements.insert(
                0,
                LuaStatement::expression(
                    LuaExpression::call(
                        LuaExpression::name("require", None),
                        vec![LuaExpression::string(LUALIB_BUNDLE_MODULE, None)],
                        None,
                    ),
                    None,
                ),
            );
        }

        Ok(LuaBlock::new(statements))
    }

    /// JSON modules become `return <expression>` with no exports table.
    fn transform_json_file(&mut self) -> Result<LuaBlock> {
        self.scopes.push(ScopeKind::File);
        let statement = self.file.statements.first().ok_or_else(|| {
            TranspileError::InvalidJsonFileContent { span: Default::default() }
        })?;
        let expression = match &statement.kind {
            StatementKind::Expression(expression) => expression,
            _ => return Err(TranspileError::InvalidJsonFileContent { span: statement.span }),
        };
        let value = self.transform_expression(expression)?;
        self.scopes.pop();
        Ok(LuaBlock::new(vec![LuaStatement::return_statement(
            vec![value],
            Some(statement.id),
        )]))
    }

    /// True when any top-level declaration is exported.
    pub(crate) fn file_has_exports(&self) -> bool {
        self.file.statements.iter().any(|statement| match &statement.kind {
            StatementKind::Variable(decl) => decl.exported,
            StatementKind::Function(decl) => decl.exported,
            StatementKind::Class(decl) => decl.exported,
            StatementKind::Enum(decl) => decl.exported,
            StatementKind::Namespace(decl) => decl.exported,
            StatementKind::ExportDefault(_) | StatementKind::ExportDeclaration { .. } => true,
            _ => false,
        })
    }

    // ---- scope plumbing -------------------------------------------------

    /// Transforms a block under a fresh scope of the given kind, hoisting on
    /// the way out.
    pub(crate) fn transform_scoped_block(
        &mut self,
        kind: ScopeKind,
        block: &Block,
    ) -> Result<LuaBlock> {
        self.scopes.push(kind);
        let body = self.transform_statements(&block.statements)?;
        let scope = self.scopes.pop();
        Ok(LuaBlock::new(hoist::hoist_statements(&scope, body, &self.symbols, self.options)))
    }

    /// Transforms a loop body under a `Loop` scope, placing the continue
    /// label before loop re-entry when a `continue` targeted it.
    pub(crate) fn transform_loop_body(&mut self, block: &Block) -> Result<(LuaBlock, u32)> {
        self.transform_loop_body_with(block, |_| Ok(Vec::new()))
    }

    /// Like [`Self::transform_loop_body`], with caller-provided prologue
    /// statements generated inside the loop scope (destructured loop
    /// variables land there).
    pub(crate) fn transform_loop_body_with<F>(
        &mut self,
        block: &Block,
        prologue: F,
    ) -> Result<(LuaBlock, u32)>
    where
        F: FnOnce(&mut Self) -> Result<Vec<LuaStatement>>,
    {
        let scope_id = self.scopes.push(ScopeKind::Loop);
        let mut body = prologue(self)?;
        body.extend(self.transform_statements(&block.statements)?);
        let scope = self.scopes.pop();
        if scope.loop_continued {
            body.push(LuaStatement::label(format!("__continue{}", scope_id), None));
        }
        Ok((
            LuaBlock::new(hoist::hoist_statements(&scope, body, &self.symbols, self.options)),
            scope_id,
        ))
    }

    /// Transforms a statement list in the current scope.
    pub(crate) fn transform_statements(
        &mut self,
        statements: &[Statement],
    ) -> Result<Vec<LuaStatement>> {
        let mut out = Vec::new();
        for statement in statements {
            out.extend(self.transform_statement(statement)?);
        }
        Ok(out)
    }

    // ---- identifiers ----------------------------------------------------

    /// Lowers an identifier occurrence: tracks its symbol, records the
    /// reference, and mangles unsafe names.
    pub(crate) fn transform_identifier(&mut self, identifier: &Identifier) -> LuaIdentifier {
        let symbol = self.oracle.symbol_of(identifier.id).map(|handle| {
            let id = self.symbols.track(handle, identifier.span);
            self.scopes.add_reference(id, identifier.id);
            id
        });

        let text = identifier.text.clone();
        if mangle::is_unsafe_name(&text) {
            LuaIdentifier {
                text: mangle::safe_name(&text),
                symbol,
                original: Some(text),
                origin: Some(identifier.id),
            }
        } else {
            LuaIdentifier { text, symbol, original: None, origin: Some(identifier.id) }
        }
    }

    /// Validates an ambient name, which cannot be renamed.
    pub(crate) fn check_ambient_name(&self, identifier: &Identifier) -> Result<()> {
        if mangle::is_unsafe_name(&identifier.text) {
            return Err(TranspileError::InvalidAmbientIdentifierName {
                name: identifier.text.clone(),
                span: identifier.span,
            });
        }
        Ok(())
    }

    /// True when the symbol is exported from the current file or namespace.
    pub(crate) fn is_symbol_exported(&self, symbol: SymbolHandle) -> bool {
        match self.export_scopes.last().and_then(|scope| scope.symbol) {
            Some(scope_symbol) => self.oracle.exports_of(scope_symbol).contains(&symbol),
            None => false,
        }
    }

    /// The export-table access for an exported name, `____exports["name"]`.
    pub(crate) fn export_reference(&self, name: &str, origin: Option<NodeId>) -> LuaExpression {
        let table = self
            .export_scopes
            .last()
            .map(|scope| scope.table.clone())
            .unwrap_or_else(|| EXPORTS_TABLE.to_string());
        LuaExpression::dot(LuaExpression::name(table, origin), name, origin)
    }

    // ---- shared helpers -------------------------------------------------

    /// Mints a fresh temporary identifier, `____TS_tmp0`, `____TS_tmp1`, …
    pub(crate) fn temp_identifier(&mut self) -> LuaIdentifier {
        let name = format!("____TS_tmp{}", self.temp_counter);
        self.temp_counter += 1;
        LuaIdentifier::named(name)
    }

    /// The dialect-correct `unpack` callee.
    pub(crate) fn unpack_expression(&self) -> LuaExpression {
        match self.options.lua_target.unpack() {
            "unpack" => LuaExpression::name("unpack", None),
            _ => LuaExpression::dot(LuaExpression::name("table", None), "unpack", None),
        }
    }

    /// Registers a lualib feature and returns its helper-call callee.
    pub(crate) fn lualib_callee(&mut self, feature: LuaLibFeature) -> LuaExpression {
        self.lualib.use_feature(feature);
        LuaExpression::name(feature.helper_name(), None)
    }

    /// Wraps statements into a zero-argument immediately-invoked function.
    pub(crate) fn iife(&self, body: Vec<LuaStatement>, origin: Option<NodeId>) -> LuaExpression {
        LuaExpression::call(
            LuaExpression::function(Vec::new(), false, LuaBlock::new(body), origin),
            Vec::new(),
            origin,
        )
    }

    // ---- function machinery ---------------------------------------------

    /// The context type of a function declared with the given parameters.
    ///
    /// Explicit `this` parameters win, then `@noSelf` on the declaration,
    /// then `@noSelfInFile`, then the checker's contextual type; the default
    /// is an implicit context.
    pub(crate) fn function_context_type(
        &self,
        node: NodeId,
        parameters: &[Parameter],
    ) -> ContextType {
        if let Some(this_param) = parameters.iter().find(|p| p.this_parameter) {
            let ty = self.oracle.type_of(this_param.id);
            return if matches!(ty.kind, crate::oracle::TypeKind::Void) {
                ContextType::Void
            } else {
                ContextType::NonVoid
            };
        }
        if self.directives.node_has(node, DirectiveKind::NoSelf) {
            return ContextType::Void;
        }
        if self.directives.file_has(DirectiveKind::NoSelfInFile) {
            return ContextType::Void;
        }
        if let Some(contextual) = self.oracle.contextual_type(node) {
            match contextual.context_type() {
                ContextType::None => {}
                other => return other,
            }
        }
        ContextType::NonVoid
    }

    /// Lowers a parameter list and the prologue statements it needs.
    ///
    /// Returns `(parameter identifiers, vararg flag, prologue)`. Destructured
    /// parameters land in temporaries that the prologue unpacks; defaulted
    /// parameters get `if p == nil then p = default end`; rest parameters
    /// become `...` materialised as `local rest = {...}` unless `@vararg`.
    pub(crate) fn transform_parameters(
        &mut self,
        parameters: &[Parameter],
        implicit_self: bool,
    ) -> Result<(Vec<LuaIdentifier>, bool, Vec<LuaStatement>)> {
        let mut names = Vec::new();
        let mut prologue = Vec::new();
        let mut vararg = false;

        if implicit_self {
            names.push(LuaIdentifier::named("self"));
        }

        for parameter in parameters {
            if parameter.this_parameter {
                continue;
            }
            if parameter.rest {
                vararg = true;
                if let crate::ast::BindingName::Identifier(ident) = &parameter.name {
                    if !self.directives.node_has(parameter.id, DirectiveKind::Vararg) {
                        let rest_name = self.transform_identifier(ident);
                        self.scopes
                            .record_declaration_for(&rest_name, ident.span.start);
                        prologue.push(LuaStatement::local_single(
                            rest_name,
                            Some(LuaExpression::table(
                                vec![LuaTableField::Positional(LuaExpression::dots(Some(
                                    parameter.id,
                                )))],
                                Some(parameter.id),
                            )),
                            Some(parameter.id),
                        ));
                    }
                }
                continue;
            }

            match &parameter.name {
                crate::ast::BindingName::Identifier(ident) => {
                    let name = self.transform_identifier(ident);
                    if let Some(default) = &parameter.default {
                        let default_value = self.transform_expression(default)?;
                        prologue.push(self.nil_default_assignment(&name, default_value, parameter.id));
                    }
                    names.push(name);
                }
                pattern => {
                    // Destructured parameter: bind a temporary, then reuse the
                    // declaration lowering to spread it into locals.
                    let temp = self.temp_identifier();
                    names.push(temp.clone());
                    let mut source = LuaExpression::identifier(temp);
                    if let Some(default) = &parameter.default {
                        let default_value = self.transform_expression(default)?;
                        let name = match &source.kind {
                            crate::lua_ast::LuaExpressionKind::Identifier(i) => i.clone(),
                            _ => unreachable!(),
                        };
                        prologue.push(self.nil_default_assignment(&name, default_value, parameter.id));
                        source = LuaExpression::identifier(name);
                    }
                    prologue.extend(self.destructure_binding(pattern, source, parameter.id)?);
                }
            }
        }

        Ok((names, vararg, prologue))
    }

    /// `if name == nil then name = default end`
    pub(crate) fn nil_default_assignment(
        &self,
        name: &LuaIdentifier,
        default: LuaExpression,
        origin: NodeId,
    ) -> LuaStatement {
        let origin = Some(origin);
        LuaStatement::if_statement(
            LuaExpression::binary(
                crate::lua_ast::LuaBinaryOp::Eq,
                LuaExpression::identifier(name.clone_identifier()),
                LuaExpression::nil(origin),
                origin,
            ),
            LuaBlock::new(vec![LuaStatement::assign(
                LuaExpression::identifier(name.clone_identifier()),
                default,
                origin,
            )]),
            None,
            origin,
        )
    }

    /// Lowers a function body, producing the complete function expression.
    pub(crate) fn transform_function_expression(
        &mut self,
        node: NodeId,
        parameters: &[Parameter],
        body: &Block,
        context: ContextType,
        generator: bool,
        tuple_return: bool,
    ) -> Result<LuaExpression> {
        let implicit_self = matches!(context, ContextType::NonVoid | ContextType::Mixed);

        self.function_stack.push(FunctionContext { tuple_return });
        self.scopes.push(ScopeKind::Function);
        let (names, vararg, prologue) = self.transform_parameters(parameters, implicit_self)?;
        let lowered = self.transform_statements(&body.statements)?;
        let scope = self.scopes.pop();
        self.function_stack.pop();

        let hoisted = hoist::hoist_statements(&scope, lowered, &self.symbols, self.options);
        self.last_function_captures = Some(scope.referenced_symbols.keys().copied().collect());

        if generator {
            // The prologue stays in the outer function: rest parameters read
            // `...`, which is not visible inside the coroutine closure.
            let wrapped = self.wrap_generator_body(LuaBlock::new(hoisted), node);
            let mut statements = prologue;
            statements.extend(wrapped.statements);
            return Ok(LuaExpression::function(names, vararg, LuaBlock::new(statements), Some(node)));
        }

        let mut statements = prologue;
        statements.extend(hoisted);
        Ok(LuaExpression::function(names, vararg, LuaBlock::new(statements), Some(node)))
    }

    /// Wraps a generator body into the coroutine-backed iterator protocol.
    ///
    /// The emitted function builds a coroutine from the body and returns an
    /// iterator object whose `next` resumes it and reports
    /// `{done, value}`; the object is its own `Symbol.iterator`.
    fn wrap_generator_body(&mut self, body: LuaBlock, origin: NodeId) -> LuaBlock {
        use crate::lua_ast::LuaBinaryOp;
        self.lualib.use_feature(LuaLibFeature::Symbol);
        let origin = Some(origin);

        let co = LuaIdentifier::named("____TS_co");
        let coroutine_create = LuaExpression::call(
            LuaExpression::dot(LuaExpression::name("coroutine", None), "create", None),
            vec![LuaExpression::function(Vec::new(), false, body, origin)],
            origin,
        );

        // next = function(self, ...)
        //     local ok, value = coroutine.resume(co, ...)
        //     if not ok then error(value) end
        //     return {done = coroutine.status(co) == "dead", value = value}
        // end
        let ok = LuaIdentifier::named("____TS_ok");
        let value = LuaIdentifier::named("____TS_value");
        let next_body = LuaBlock::new(vec![
            LuaStatement::local_declaration(
                vec![ok.clone(), value.clone()],
                vec![LuaExpression::call(
                    LuaExpression::dot(LuaExpression::name("coroutine", None), "resume", None),
                    vec![
                        LuaExpression::identifier(co.clone()),
                        LuaExpression::dots(origin),
                    ],
                    origin,
                )],
                origin,
            ),
            LuaStatement::if_statement(
                LuaExpression::unary(
                    crate::lua_ast::LuaUnaryOp::Not,
                    LuaExpression::identifier(ok),
                    origin,
                ),
                LuaBlock::new(vec![LuaStatement::expression(
                    LuaExpression::call(
                        LuaExpression::name("error", None),
                        vec![LuaExpression::identifier(value.clone())],
                        origin,
                    ),
                    origin,
                )]),
                None,
                origin,
            ),
            LuaStatement::return_statement(
                vec![LuaExpression::table(
                    vec![
                        LuaTableField::Named {
                            key: "done".to_string(),
                            value: LuaExpression::binary(
                                LuaBinaryOp::Eq,
                                LuaExpression::call(
                                    LuaExpression::dot(
                                        LuaExpression::name("coroutine", None),
                                        "status",
                                        None,
                                    ),
                                    vec![LuaExpression::identifier(co.clone())],
                                    origin,
                                ),
                                LuaExpression::string("dead", None),
                                origin,
                            ),
                        },
                        LuaTableField::Named {
                            key: "value".to_string(),
                            value: LuaExpression::identifier(value),
                        },
                    ],
                    origin,
                )],
                origin,
            ),
        ]);
        let next_function = LuaExpression::function(
            vec![LuaIdentifier::named("self")],
            true,
            next_body,
            origin,
        );

        // [Symbol.iterator] = function(self) return self end
        let iterator_key = LuaExpression::dot(LuaExpression::name("Symbol", None), "iterator", None);
        let self_function = LuaExpression::function(
            vec![LuaIdentifier::named("self")],
            false,
            LuaBlock::new(vec![LuaStatement::return_statement(
                vec![LuaExpression::name("self", None)],
                origin,
            )]),
            origin,
        );

        LuaBlock::new(vec![
            LuaStatement::local_single(co, Some(coroutine_create), origin),
            LuaStatement::return_statement(
                vec![LuaExpression::table(
                    vec![
                        LuaTableField::Named { key: "next".to_string(), value: next_function },
                        LuaTableField::Computed { key: iterator_key, value: self_function },
                    ],
                    origin,
                )],
                origin,
            ),
        ])
    }
}

// Small extension so scope recording can work from identifier data alone.
impl ScopeStack {
    pub(crate) fn record_declaration_for(&mut self, name: &LuaIdentifier, position: usize) {
        if let Some(symbol) = name.symbol {
            self.record_declaration(symbol, position);
        }
    }
}
