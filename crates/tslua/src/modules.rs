// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Module lowering: imports, namespaces and enums.
//!
//! A file with any export gets a `____exports` table prepended and returned
//! (handled by the driver); this module contributes the per-statement
//! pieces: `require` statements collected for import hoisting, namespace
//! tables with merged declarations, and enum tables with reverse mappings
//! for numeric members.

use crate::ast::{
    EnumDeclaration, ImportClause, ImportDeclaration, NamespaceDeclaration, PropertyName,
    Statement,
};
use crate::directives::DirectiveKind;
use crate::error::{Result, TranspileError};
use crate::hoist;
use crate::lua_ast::{LuaBinaryOp, LuaBlock, LuaExpression, LuaIdentifier, LuaStatement};
use crate::scope::ScopeKind;
use crate::transformer::{ExportScope, Transformer};

impl<'a> Transformer<'a> {
    // ---- imports ---------------------------------------------------------

    /// Lowers an import declaration into require statements collected on the
    /// current scope; the hoister places them first.
    pub(crate) fn transform_import_declaration(
        &mut self,
        statement: &Statement,
        decl: &ImportDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);
        let path = if self.directives.node_has(statement.id, DirectiveKind::NoResolution) {
            decl.module.clone()
        } else {
            self.resolve_require_path(statement, &decl.module)?
        };
        let require = LuaExpression::call(
            LuaExpression::name("require", None),
            vec![LuaExpression::string(path, origin)],
            origin,
        );

        let mut imports = Vec::new();
        match &decl.clause {
            ImportClause::SideEffect => {
                imports.push(LuaStatement::expression(require, origin));
            }
            ImportClause::Namespace(identifier) => {
                let name = self.transform_identifier(identifier);
                imports.push(LuaStatement::local_single(name, Some(require), origin));
            }
            ImportClause::Named(specifiers) => {
                let referenced: Vec<_> = specifiers
                    .iter()
                    .filter(|s| self.oracle.is_referenced_alias_declaration(s.id))
                    .collect();
                if referenced.is_empty() {
                    if self.oracle.module_exports_some_value(statement.id) {
                        imports.push(LuaStatement::expression(require, origin));
                    }
                } else {
                    let module_local = LuaIdentifier::named(module_local_name(&decl.module));
                    imports.push(LuaStatement::local_single(
                        module_local.clone(),
                        Some(require),
                        origin,
                    ));
                    for specifier in referenced {
                        let binding = specifier.alias.as_ref().unwrap_or(&specifier.name);
                        let local = self.transform_identifier(binding);
                        imports.push(LuaStatement::local_single(
                            local,
                            Some(LuaExpression::dot(
                                LuaExpression::identifier(module_local.clone_identifier()),
                                specifier.name.text.clone(),
                                origin,
                            )),
                            origin,
                        ));
                    }
                }
            }
            ImportClause::Default(_) => {
                return Err(TranspileError::DefaultImportsNotSupported { span: statement.span });
            }
        }

        self.scopes.peek_mut().import_statements.extend(imports);
        Ok(Vec::new())
    }

    /// Resolves an import specifier into a dotted require path.
    ///
    /// Relative specifiers resolve against the importing file's directory,
    /// non-relative ones against the configured base URL; the result is
    /// re-expressed relative to the root directory. Escaping the root is a
    /// hard error.
    fn resolve_require_path(&self, statement: &Statement, specifier: &str) -> Result<String> {
        let error = || TranspileError::UnresolvableRequirePath {
            path: specifier.to_string(),
            span: statement.span,
        };

        let resolved = if specifier.starts_with("./") || specifier.starts_with("../") {
            let directory = parent_directory(&self.file.path);
            join_normalized(&directory, specifier).ok_or_else(error)?
        } else if let Some(base) = &self.options.base_url {
            join_normalized(&normalize_separators(&base.to_string_lossy()), specifier)
                .ok_or_else(error)?
        } else {
            normalize_path(specifier).ok_or_else(error)?
        };

        let relative = match &self.options.root_dir {
            Some(root) => {
                let root = normalize_path(&normalize_separators(&root.to_string_lossy()))
                    .unwrap_or_default();
                strip_root(&resolved, &root).ok_or_else(error)?
            }
            None => resolved,
        };

        if relative.is_empty() {
            return Err(error());
        }
        Ok(relative.replace('/', "."))
    }

    // ---- namespaces ------------------------------------------------------

    pub(crate) fn transform_namespace_declaration(
        &mut self,
        statement: &Statement,
        decl: &NamespaceDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        let origin = Some(statement.id);
        let compile_members_only =
            self.directives.node_has(statement.id, DirectiveKind::CompileMembersOnly);

        let name = self.transform_identifier(&decl.name);
        let table_name = name.text.clone();
        let mut out = Vec::new();

        if !compile_members_only {
            if decl.exported {
                // `____exports.NS = ____exports.NS or {}` keeps merged
                // declarations pointing at one table.
                let target = self.export_reference(&decl.name.text, origin);
                out.push(LuaStatement::assign(
                    target.clone(),
                    LuaExpression::binary(
                        LuaBinaryOp::Or,
                        target.clone(),
                        LuaExpression::table(Vec::new(), origin),
                        origin,
                    ),
                    origin,
                ));
                out.push(LuaStatement::local_single(
                    name.clone_identifier(),
                    Some(target),
                    origin,
                ));
            } else {
                self.scopes.record_declaration_for(&name, statement.span.start);
                out.push(LuaStatement::local_single(
                    name.clone_identifier(),
                    Some(LuaExpression::binary(
                        LuaBinaryOp::Or,
                        LuaExpression::identifier(name.clone_identifier()),
                        LuaExpression::table(Vec::new(), origin),
                        origin,
                    )),
                    origin,
                ));
            }
        }

        self.export_scopes.push(ExportScope {
            symbol: self.oracle.symbol_of(statement.id),
            table: table_name,
        });
        self.scopes.push(ScopeKind::Block);
        let lowered = self.transform_statements(&decl.statements)?;
        let scope = self.scopes.pop();
        self.export_scopes.pop();
        let body = hoist::hoist_statements(&scope, lowered, &self.symbols, self.options);

        out.push(LuaStatement::do_block(LuaBlock::new(body), origin));
        Ok(out)
    }

    // ---- enums -----------------------------------------------------------

    pub(crate) fn transform_enum_declaration(
        &mut self,
        statement: &Statement,
        decl: &EnumDeclaration,
    ) -> Result<Vec<LuaStatement>> {
        // Const enums vanish; member references were folded at use sites.
        if decl.is_const {
            return Ok(Vec::new());
        }

        let origin = Some(statement.id);
        let name = self.transform_identifier(&decl.name);
        let enum_name = name.text.clone();
        let enum_table = || LuaExpression::name(enum_name.clone(), origin);

        let mut out = Vec::new();
        if decl.exported {
            out.push(LuaStatement::assign(
                self.export_reference(&decl.name.text, origin),
                LuaExpression::table(Vec::new(), origin),
                origin,
            ));
            out.push(LuaStatement::local_single(
                name.clone_identifier(),
                Some(self.export_reference(&decl.name.text, origin)),
                origin,
            ));
        } else {
            self.scopes.record_declaration_for(&name, statement.span.start);
            out.push(LuaStatement::local_single(
                name.clone_identifier(),
                Some(LuaExpression::table(Vec::new(), origin)),
                origin,
            ));
        }

        let mut saw_string = false;
        let mut saw_numeric = false;
        let mut auto_value: Option<f64> = Some(0.0);
        let mut previous_key: Option<PropertyName> = None;

        for member in &decl.members {
            let member_origin = Some(member.id);
            let key_text = match &member.name {
                PropertyName::Identifier(text) | PropertyName::String(text) => text.clone(),
                _ => {
                    return Err(TranspileError::UnsupportedKind {
                        kind: "computed enum member name".to_string(),
                        span: member.span,
                    })
                }
            };
            let target = self.member_target(enum_table(), &member.name, member_origin)?;

            let (value, is_string) = match &member.initializer {
                Some(initializer) => match &initializer.kind {
                    crate::ast::ExpressionKind::String(_) => {
                        (self.transform_expression(initializer)?, true)
                    }
                    crate::ast::ExpressionKind::Number(n) => {
                        auto_value = Some(n + 1.0);
                        (self.transform_expression(initializer)?, false)
                    }
                    _ => {
                        // Arbitrary initialiser: numeric by contract; resets
                        // literal auto-increment.
                        auto_value = None;
                        (self.transform_expression(initializer)?, false)
                    }
                },
                None => match auto_value {
                    Some(value) => {
                        auto_value = Some(value + 1.0);
                        (LuaExpression::number(value, member_origin), false)
                    }
                    None => {
                        let previous = previous_key.as_ref().expect("non-first auto member");
                        let previous_value =
                            self.member_target(enum_table(), previous, member_origin)?;
                        (
                            LuaExpression::binary(
                                LuaBinaryOp::Add,
                                previous_value,
                                LuaExpression::number(1.0, member_origin),
                                member_origin,
                            ),
                            false,
                        )
                    }
                },
            };

            if is_string {
                saw_string = true;
            } else {
                saw_numeric = true;
            }
            if saw_string && saw_numeric {
                return Err(TranspileError::HeterogeneousEnum {
                    name: decl.name.text.clone(),
                    span: member.span,
                });
            }

            out.push(LuaStatement::assign(target.clone(), value, member_origin));

            if !is_string {
                // Reverse mapping: `E[E.A] = "A"`.
                out.push(LuaStatement::assign(
                    LuaExpression::index(enum_table(), target, member_origin),
                    LuaExpression::string(key_text, member_origin),
                    member_origin,
                ));
            }

            previous_key = Some(member.name.clone());
        }

        Ok(out)
    }

}

/// `"./lib/util"` imported from `"src/a/main.ts"` → `"src/a/lib/util"`.
fn join_normalized(directory: &str, specifier: &str) -> Option<String> {
    let joined = if directory.is_empty() {
        specifier.to_string()
    } else {
        format!("{directory}/{specifier}")
    };
    normalize_path(&joined)
}

/// Collapses `.` and `..` components; `None` when the path escapes its root.
fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let normalized = normalize_separators(path);
    for component in normalized.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn parent_directory(path: &str) -> String {
    let normalized = normalize_separators(path);
    match normalized.rfind('/') {
        Some(index) => normalized[..index].to_string(),
        None => String::new(),
    }
}

fn strip_root(path: &str, root: &str) -> Option<String> {
    if root.is_empty() {
        return Some(path.to_string());
    }
    let stripped = path.strip_prefix(root)?;
    Some(stripped.trim_start_matches('/').to_string())
}

/// The hidden local a named-import module binds to.
fn module_local_name(specifier: &str) -> String {
    let basename = specifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(specifier)
        .trim_start_matches('.');
    let mut name = String::from("____");
    for ch in basename.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            name.push(ch);
        } else {
            name.push('_');
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_dots() {
        assert_eq!(normalize_path("a/./b/../c").as_deref(), Some("a/c"));
        assert_eq!(normalize_path("a\\b\\c").as_deref(), Some("a/b/c"));
        assert_eq!(normalize_path("../a"), None);
    }

    #[test]
    fn joining_resolves_relative_specifiers() {
        assert_eq!(join_normalized("src/a", "./lib/util").as_deref(), Some("src/a/lib/util"));
        assert_eq!(join_normalized("src/a", "../shared").as_deref(), Some("src/shared"));
        assert_eq!(join_normalized("src", "../../out"), None);
    }

    #[test]
    fn module_locals_are_sanitized() {
        assert_eq!(module_local_name("./my-module"), "____my_module");
        assert_eq!(module_local_name("a/b/util"), "____util");
    }
}
