// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # tslua
//!
//! Typed-script to Lua transpiler core.
//!
//! The crate consumes a type-checked source tree (parsed and checked by an
//! external front end, reachable through the [`oracle::TypeOracle`] trait)
//! and lowers it, file by file, into a Lua syntax tree plus the set of
//! runtime-support features the emitted code needs.
//!
//! ## Pipeline
//!
//! ```text
//! SourceFile + TypeOracle
//!         │
//!         ▼
//! transformer::transform_source_file   (scope tracking, hoisting,
//!         │                             class/module/control-flow lowering)
//!         ▼
//! LuaBlock + used LuaLibFeatures
//!         │
//!         ▼
//! printer::print_block  +  lualib::bundle_features
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tslua::{transform_source_file, CompilerOptions, NullOracle};
//!
//! let (block, features) = transform_source_file(&file, &NullOracle, &CompilerOptions::default())?;
//! let lua = tslua::print_block(&block);
//! ```

/// Abstract Syntax Tree types for the typed source language.
pub mod ast;
/// Call and construction lowering.
mod calls;
/// Class lowering (prototype-table protocol).
mod classes;
/// Doc-comment directives and their lookup table.
pub mod directives;
/// Error types.
pub mod error;
/// Expression lowering and intrinsic dispatch.
mod expressions;
/// Block-exit hoisting.
pub mod hoist;
/// The emitted Lua syntax tree.
pub mod lua_ast;
/// Runtime-support feature tracking and bundling.
pub mod lualib;
/// Reserved-name detection and renaming.
pub mod mangle;
/// Module lowering (imports, namespaces, enums).
mod modules;
/// Host configuration.
pub mod options;
/// The external type-checker interface.
pub mod oracle;
/// Lua source rendering of the emitted AST.
pub mod printer;
/// Lexical scope tracking.
pub mod scope;
/// Statement lowering.
mod statements;
/// Per-file symbol numbering.
pub mod symbols;
/// The AST-to-AST transformer driver.
pub mod transformer;

pub use ast::{NodeId, NodeIdAllocator, SourceFile, Span};
pub use error::{Result, TranspileError};
pub use lua_ast::{LuaBlock, LuaExpression, LuaStatement};
pub use lualib::{LuaLibFeature, LuaLibRegistry};
pub use options::{CompilerOptions, LuaLibImport, LuaTarget};
pub use oracle::{ContextType, NullOracle, Signature, Type, TypeKind, TypeOracle};
pub use printer::print_block;
pub use transformer::{transform_source_file, EXPORTS_TABLE};

#[cfg(test)]
mod conformance;

#[cfg(test)]
mod testing;
