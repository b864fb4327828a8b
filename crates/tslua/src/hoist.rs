// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Block-exit hoisting.
//!
//! Runs once per scope, right after the scope's statements have been
//! lowered. Declarations that are referenced before they appear — directly,
//! or from the body of a function defined earlier in the block — are split
//! into a `local` at block entry plus an assignment at the original site.
//! Function definitions whose symbol is referenced before the definition are
//! moved to the top in their original relative order, and everything their
//! bodies capture from this scope is declared up top with them so the
//! closures bind locals rather than globals.
//!
//! Import statements are unconditionally placed first.

use crate::lua_ast::{LuaExpression, LuaIdentifier, LuaStatement, LuaStatementKind};
use crate::options::CompilerOptions;
use crate::scope::Scope;
use crate::symbols::{SymbolId, SymbolTracker};
use std::collections::{BTreeMap, HashSet};

/// Rewrites a block's statement list per the hoisting rules.
pub fn hoist_statements(
    scope: &Scope,
    statements: Vec<LuaStatement>,
    symbols: &SymbolTracker,
    options: &CompilerOptions,
) -> Vec<LuaStatement> {
    let mut out: Vec<LuaStatement> = scope.import_statements.clone();

    if options.no_hoisting {
        out.extend(statements);
        return out;
    }

    let hoisted = hoisted_declarations(scope, symbols);
    let moved = moved_functions(scope, symbols);

    if hoisted.is_empty() && moved.is_empty() {
        out.extend(statements);
        return out;
    }

    // Identifiers for the up-top `local`, keyed by declaration position so
    // the emitted order is deterministic.
    let mut hoisted_names: BTreeMap<usize, LuaIdentifier> = BTreeMap::new();
    for statement in &statements {
        if let LuaStatementKind::LocalDeclaration { names, .. } = &statement.kind {
            for name in names {
                if let Some(symbol) = name.symbol {
                    if hoisted.contains(&symbol) {
                        let position =
                            scope.declared_symbols.get(&symbol).copied().unwrap_or(usize::MAX);
                        hoisted_names.entry(position).or_insert_with(|| name.clone_identifier());
                    }
                }
            }
        }
    }

    if !hoisted_names.is_empty() {
        out.push(LuaStatement::local_declaration(
            hoisted_names.into_values().collect(),
            Vec::new(),
            None,
        ));
    }

    // Moved function definitions come right after the declarations, as
    // assignments, in their original relative order.
    let mut rest = Vec::new();
    for statement in statements {
        if let Some(rewritten) = rewrite_statement(statement, &hoisted, &moved, &mut out) {
            rest.push(rewritten);
        }
    }
    out.extend(rest);
    out
}

/// Symbols whose declaration must be lifted to block entry.
fn hoisted_declarations(scope: &Scope, symbols: &SymbolTracker) -> HashSet<SymbolId> {
    let mut hoisted = HashSet::new();

    for (&symbol, &position) in &scope.declared_symbols {
        if symbols.first_seen(symbol).start < position {
            hoisted.insert(symbol);
            continue;
        }
        for info in scope.function_definitions.values() {
            if info.position <= position {
                let captured = closure_references(scope, &info.referenced_symbols);
                if captured.contains(&symbol) {
                    hoisted.insert(symbol);
                    break;
                }
            }
        }
    }

    // Anything a *moved* function captures from this scope must be a local
    // before the moved assignment runs.
    for symbol in moved_functions(scope, symbols) {
        if let Some(info) = scope.function_definitions.get(&symbol) {
            for captured in closure_references(scope, &info.referenced_symbols) {
                if scope.declared_symbols.contains_key(&captured) {
                    hoisted.insert(captured);
                }
            }
        }
    }

    hoisted
}

/// Function definitions that must be moved to block entry, in position order.
fn moved_functions(scope: &Scope, symbols: &SymbolTracker) -> Vec<SymbolId> {
    let mut moved: Vec<(usize, SymbolId)> = scope
        .function_definitions
        .iter()
        .filter(|(symbol, info)| symbols.first_seen(**symbol).start < info.position)
        .map(|(&symbol, info)| (info.position, symbol))
        .collect();
    moved.sort_unstable();
    moved.into_iter().map(|(_, symbol)| symbol).collect()
}

/// Transitive references through function definitions in the same scope.
fn closure_references(scope: &Scope, start: &HashSet<SymbolId>) -> HashSet<SymbolId> {
    let mut closed: HashSet<SymbolId> = start.clone();
    let mut work: Vec<SymbolId> = start.iter().copied().collect();
    while let Some(symbol) = work.pop() {
        if let Some(info) = scope.function_definitions.get(&symbol) {
            for &referenced in &info.referenced_symbols {
                if closed.insert(referenced) {
                    work.push(referenced);
                }
            }
        }
    }
    closed
}

/// Rewrites one statement under the hoisting plan.
///
/// Returns `None` when the statement was consumed (moved to the top via
/// `top`); otherwise the possibly-rewritten statement.
fn rewrite_statement(
    statement: LuaStatement,
    hoisted: &HashSet<SymbolId>,
    moved: &[SymbolId],
    top: &mut Vec<LuaStatement>,
) -> Option<LuaStatement> {
    let origin = statement.origin;
    match statement.kind {
        LuaStatementKind::LocalDeclaration { names, expressions } => {
            let is_moved_function = names.len() == 1
                && names[0].symbol.map(|s| moved.contains(&s)).unwrap_or(false);
            let any_hoisted =
                names.iter().any(|n| n.symbol.map(|s| hoisted.contains(&s)).unwrap_or(false));

            if is_moved_function {
                // Definition goes to the top as an assignment; the local was
                // already declared up there.
                let targets = names
                    .into_iter()
                    .map(LuaExpression::identifier)
                    .collect::<Vec<_>>();
                top.push(LuaStatement::assignment(targets, expressions, origin));
                return None;
            }

            if any_hoisted {
                if expressions.is_empty() {
                    // The bare declaration already lives at the top.
                    return None;
                }
                let targets = names
                    .into_iter()
                    .map(LuaExpression::identifier)
                    .collect::<Vec<_>>();
                return Some(LuaStatement::assignment(targets, expressions, origin));
            }

            Some(LuaStatement { origin, kind: LuaStatementKind::LocalDeclaration { names, expressions } })
        }
        kind => Some(LuaStatement { origin, kind }),
    }
}

/// The hoisting decisions for a scope, for tests that inspect them directly.
#[cfg(test)]
pub(crate) fn hoisting_plan(
    scope: &Scope,
    symbols: &SymbolTracker,
) -> (HashSet<SymbolId>, Vec<SymbolId>) {
    (hoisted_declarations(scope, symbols), moved_functions(scope, symbols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeId, Span};
    use crate::scope::{FunctionDefinitionInfo, ScopeKind, ScopeStack};

    fn span(start: usize) -> Span {
        Span::new(start, start + 1, 1, start + 1)
    }

    #[test]
    fn forward_reference_hoists_declaration() {
        let mut symbols = SymbolTracker::new();
        // Symbol first seen at position 3, declared at position 10.
        let s = symbols.track(crate::oracle::SymbolHandle(1), span(3));

        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::File);
        stack.add_reference(s, NodeId(0));
        stack.record_declaration(s, 10);
        let scope = stack.pop();

        let (hoisted, moved) = hoisting_plan(&scope, &symbols);
        assert!(hoisted.contains(&s));
        assert!(moved.is_empty());
    }

    #[test]
    fn declaration_before_use_is_left_alone() {
        let mut symbols = SymbolTracker::new();
        let s = symbols.track(crate::oracle::SymbolHandle(1), span(10));

        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::File);
        stack.add_reference(s, NodeId(0));
        stack.record_declaration(s, 10);
        let scope = stack.pop();

        let (hoisted, moved) = hoisting_plan(&scope, &symbols);
        assert!(hoisted.is_empty());
        assert!(moved.is_empty());
    }

    #[test]
    fn early_function_capturing_later_declaration_hoists_it() {
        let mut symbols = SymbolTracker::new();
        let f = symbols.track(crate::oracle::SymbolHandle(1), span(5));
        let x = symbols.track(crate::oracle::SymbolHandle(2), span(7));

        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::File);
        stack.record_declaration(f, 5);
        stack.record_declaration(x, 20);
        let mut refs = HashSet::new();
        refs.insert(x);
        stack.record_function_definition(f, FunctionDefinitionInfo {
            referenced_symbols: refs,
            position: 5,
        });
        let scope = stack.pop();

        let (hoisted, _) = hoisting_plan(&scope, &symbols);
        assert!(hoisted.contains(&x), "x is captured before its declaration");
        assert!(!hoisted.contains(&f));
    }

    #[test]
    fn self_recursive_function_is_split() {
        let mut symbols = SymbolTracker::new();
        let f = symbols.track(crate::oracle::SymbolHandle(1), span(5));

        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::File);
        stack.record_declaration(f, 5);
        let mut refs = HashSet::new();
        refs.insert(f);
        stack.record_function_definition(f, FunctionDefinitionInfo {
            referenced_symbols: refs,
            position: 5,
        });
        let scope = stack.pop();

        let (hoisted, moved) = hoisting_plan(&scope, &symbols);
        assert!(hoisted.contains(&f), "recursive locals need a forward declaration");
        // The first reference is the declaration itself, so nothing moves.
        assert!(moved.is_empty());
    }

    #[test]
    fn forward_referenced_function_moves_to_top() {
        let mut symbols = SymbolTracker::new();
        // First reference at position 2, definition at position 10.
        let f = symbols.track(crate::oracle::SymbolHandle(1), span(2));

        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::File);
        stack.record_declaration(f, 10);
        stack.record_function_definition(f, FunctionDefinitionInfo {
            referenced_symbols: HashSet::new(),
            position: 10,
        });
        let scope = stack.pop();

        let (hoisted, moved) = hoisting_plan(&scope, &symbols);
        assert!(hoisted.contains(&f));
        assert_eq!(moved, vec![f]);
    }

    #[test]
    fn imports_always_come_first() {
        let symbols = SymbolTracker::new();
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::File);
        stack.peek_mut().import_statements.push(LuaStatement::local_single(
            LuaIdentifier::named("dep"),
            Some(LuaExpression::call(
                LuaExpression::name("require", None),
                vec![LuaExpression::string("dep", None)],
                None,
            )),
            None,
        ));
        let scope = stack.pop();

        let body = vec![LuaStatement::break_statement(None)];
        let options = CompilerOptions::default();
        let result = hoist_statements(&scope, body, &symbols, &options);
        assert!(matches!(result[0].kind, LuaStatementKind::LocalDeclaration { .. }));
        assert!(matches!(result[1].kind, LuaStatementKind::Break));
    }
}
