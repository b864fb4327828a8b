// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Doc-comment directives and their lookup table.
//!
//! Directives alter how a declaration is lowered (`@tupleReturn`,
//! `@noSelf`, `@extension`, …). They come from two syntaxes:
//!
//! - structured doc tags: `@tupleReturn`, `@forRange`
//! - bare text lines starting with `!`: `!TupleReturn` — deprecated, kept
//!   for compatibility and reported with a warning
//!
//! Unknown directive names are warned about and ignored; the set of known
//! kinds is closed. File-level directives are read from the doc comment of
//! the first top-level statement.

use crate::ast::{
    Block, ClassMemberKind, DocComment, ForInitializer, NodeId, Parameter, SourceFile, Statement,
    StatementKind,
};
use crate::oracle::{Signature, SymbolHandle, TypeOracle};
use std::collections::HashMap;

/// The closed set of directive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Class members extend an existing global table.
    Extension,
    /// Class members extend the metatable named by the argument.
    MetaExtension,
    /// Abstract method stub; no code is emitted for the body.
    PureAbstract,
    /// Do not resolve the import path; emit it verbatim.
    NoResolution,
    /// Functions in this declaration take no implicit `self`.
    NoSelf,
    /// Like `@noSelf`, applied to a whole file.
    NoSelfInFile,
    /// Type-only declaration; no code is emitted.
    Phantom,
    /// The function returns multiple Lua values instead of a table.
    TupleReturn,
    /// The value is a Lua iterator usable directly in `for … in`.
    LuaIterator,
    /// The class maps onto a raw Lua table (get/set/length only).
    LuaTable,
    /// The function call stands for a numeric `for` range.
    ForRange,
    /// The rest parameter maps to Lua `...`.
    Vararg,
    /// Only compile the members of this namespace, not the table itself.
    CompileMembersOnly,
    /// `new C()` calls the named constructor function instead.
    CustomConstructor,
}

impl DirectiveKind {
    /// Parses a directive name (tag spelling, case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "extension" => Some(Self::Extension),
            "metaextension" => Some(Self::MetaExtension),
            "pureabstract" => Some(Self::PureAbstract),
            "noresolution" => Some(Self::NoResolution),
            "noself" => Some(Self::NoSelf),
            "noselfinfile" => Some(Self::NoSelfInFile),
            "phantom" => Some(Self::Phantom),
            "tuplereturn" => Some(Self::TupleReturn),
            "luaiterator" => Some(Self::LuaIterator),
            "luatable" => Some(Self::LuaTable),
            "forrange" => Some(Self::ForRange),
            "vararg" => Some(Self::Vararg),
            "compilemembersonly" => Some(Self::CompileMembersOnly),
            "customconstructor" => Some(Self::CustomConstructor),
            _ => None,
        }
    }
}

/// One parsed directive with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// The directive kind.
    pub kind: DirectiveKind,
    /// Whitespace-separated arguments following the name.
    pub arguments: Vec<String>,
}

/// Node-indexed directive storage for one source file.
#[derive(Debug, Default)]
pub struct DirectiveTable {
    by_node: HashMap<NodeId, Vec<Directive>>,
    file: Vec<Directive>,
}

impl DirectiveTable {
    /// Builds the table by scanning every doc comment in the file.
    pub fn from_source_file(file: &SourceFile) -> Self {
        let mut table = DirectiveTable::default();
        for statement in &file.statements {
            table.index_statement(statement);
        }
        if let Some(first) = file.statements.first() {
            if let Some(doc) = first.doc() {
                table.file = parse_doc(doc);
            }
        }
        table
    }

    /// Directives attached to a node.
    pub fn for_node(&self, node: NodeId) -> &[Directive] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the node carries the given directive.
    pub fn node_has(&self, node: NodeId, kind: DirectiveKind) -> bool {
        self.for_node(node).iter().any(|d| d.kind == kind)
    }

    /// The first directive of a kind on a node, if present.
    pub fn node_directive(&self, node: NodeId, kind: DirectiveKind) -> Option<&Directive> {
        self.for_node(node).iter().find(|d| d.kind == kind)
    }

    /// Directives attached to any declaration of a symbol.
    pub fn for_symbol(&self, symbol: SymbolHandle, oracle: &dyn TypeOracle) -> Vec<Directive> {
        let mut out = Vec::new();
        for declaration in oracle.symbol_declarations(symbol) {
            out.extend(self.for_node(declaration).iter().cloned());
        }
        out
    }

    /// True when any declaration of the symbol carries the directive.
    pub fn symbol_has(
        &self,
        symbol: SymbolHandle,
        kind: DirectiveKind,
        oracle: &dyn TypeOracle,
    ) -> bool {
        oracle
            .symbol_declarations(symbol)
            .into_iter()
            .any(|declaration| self.node_has(declaration, kind))
    }

    /// True when the signature's declaration carries the directive.
    ///
    /// For function types hosted on a property signature the checker points
    /// the declaration at the property node, so its directives apply too.
    pub fn signature_has(&self, signature: &Signature, kind: DirectiveKind) -> bool {
        signature
            .declaration
            .map(|node| self.node_has(node, kind))
            .unwrap_or(false)
    }

    /// True when the file-level doc comment carries the directive.
    pub fn file_has(&self, kind: DirectiveKind) -> bool {
        self.file.iter().any(|d| d.kind == kind)
    }

    fn record(&mut self, node: NodeId, doc: Option<&DocComment>) {
        if let Some(doc) = doc {
            let directives = parse_doc(doc);
            if !directives.is_empty() {
                self.by_node.insert(node, directives);
            }
        }
    }

    fn index_parameters(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            self.record(parameter.id, parameter.doc.as_ref());
        }
    }

    fn index_block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.index_statement(statement);
        }
    }

    fn index_statement(&mut self, statement: &Statement) {
        self.record(statement.id, statement.doc());
        match &statement.kind {
            StatementKind::Function(decl) => {
                self.index_parameters(&decl.parameters);
                if let Some(body) = &decl.body {
                    self.index_block(body);
                }
            }
            StatementKind::Class(decl) => {
                for member in &decl.members {
                    self.record(member.id, member.doc.as_ref());
                    match &member.kind {
                        ClassMemberKind::Constructor { parameters, body } => {
                            self.index_parameters(parameters);
                            if let Some(body) = body {
                                self.index_block(body);
                            }
                        }
                        ClassMemberKind::Method { parameters, body, .. } => {
                            self.index_parameters(parameters);
                            if let Some(body) = body {
                                self.index_block(body);
                            }
                        }
                        ClassMemberKind::Getter { body, .. } => self.index_block(body),
                        ClassMemberKind::Setter { parameter, body, .. } => {
                            self.record(parameter.id, parameter.doc.as_ref());
                            self.index_block(body);
                        }
                        ClassMemberKind::Property { .. } => {}
                    }
                }
            }
            StatementKind::Namespace(decl) => {
                for inner in &decl.statements {
                    self.index_statement(inner);
                }
            }
            StatementKind::Block(block) => self.index_block(block),
            StatementKind::If(if_statement) => {
                self.index_block(&if_statement.then_branch);
                if let Some(else_branch) = &if_statement.else_branch {
                    self.index_statement(else_branch);
                }
            }
            StatementKind::While { body, .. } | StatementKind::DoWhile { body, .. } => {
                self.index_block(body)
            }
            StatementKind::For(for_statement) => {
                if let Some(ForInitializer::Variable(decl)) = &for_statement.initializer {
                    self.index_statement(decl);
                }
                self.index_block(&for_statement.body);
            }
            StatementKind::ForOf(for_of) => self.index_block(&for_of.body),
            StatementKind::ForIn(for_in) => self.index_block(&for_in.body),
            StatementKind::Switch(switch) => {
                for clause in &switch.clauses {
                    for inner in &clause.statements {
                        self.index_statement(inner);
                    }
                }
            }
            StatementKind::Try(try_statement) => {
                self.index_block(&try_statement.try_block);
                if let Some(catch) = &try_statement.catch {
                    self.index_block(&catch.block);
                }
                if let Some(finally) = &try_statement.finally {
                    self.index_block(finally);
                }
            }
            _ => {}
        }
    }
}

/// Parses the directives of one doc comment.
fn parse_doc(doc: &DocComment) -> Vec<Directive> {
    let mut out = Vec::new();
    for tag in &doc.tags {
        match DirectiveKind::parse(&tag.name) {
            Some(kind) => out.push(Directive { kind, arguments: tag.arguments.clone() }),
            None => tracing::warn!("unknown directive '@{}' ignored", tag.name),
        }
    }
    for line in &doc.text {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix('!') {
            let mut words = rest.split_whitespace();
            if let Some(name) = words.next() {
                match DirectiveKind::parse(name) {
                    Some(kind) => {
                        tracing::warn!(
                            "directive '!{}' uses deprecated syntax, use '@{}' instead",
                            name,
                            name
                        );
                        out.push(Directive {
                            kind,
                            arguments: words.map(str::to_string).collect(),
                        });
                    }
                    None => tracing::warn!("unknown directive '!{}' ignored", name),
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DocTag;

    fn doc(tags: &[(&str, &[&str])], text: &[&str]) -> DocComment {
        DocComment {
            text: text.iter().map(|s| s.to_string()).collect(),
            tags: tags
                .iter()
                .map(|(name, args)| DocTag {
                    name: name.to_string(),
                    arguments: args.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn parses_structured_tags() {
        let directives = parse_doc(&doc(&[("tupleReturn", &[])], &[]));
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].kind, DirectiveKind::TupleReturn);
    }

    #[test]
    fn parses_deprecated_bang_lines_with_arguments() {
        let directives = parse_doc(&doc(&[], &["!MetaExtension Vector"]));
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].kind, DirectiveKind::MetaExtension);
        assert_eq!(directives[0].arguments, vec!["Vector"]);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let directives = parse_doc(&doc(&[("frobnicate", &[])], &["!alsoUnknown"]));
        assert!(directives.is_empty());
    }

    #[test]
    fn directive_names_are_case_insensitive() {
        assert_eq!(DirectiveKind::parse("TupleReturn"), Some(DirectiveKind::TupleReturn));
        assert_eq!(DirectiveKind::parse("customConstructor"), Some(DirectiveKind::CustomConstructor));
        assert_eq!(DirectiveKind::parse("nope"), None);
    }
}
