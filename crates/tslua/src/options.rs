// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Host-provided configuration for a transformation run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The Lua dialect being targeted.
///
/// The target decides bitwise-operator lowering, `goto` availability and the
/// spelling of `unpack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LuaTarget {
    /// Lua 5.1: no `goto`, no bitwise support, global `unpack`.
    Lua51,
    /// Lua 5.2: `goto`, `bit32` library, `table.unpack`.
    Lua52,
    /// Lua 5.3+: native bitwise operators, `table.unpack`.
    #[default]
    Lua53,
    /// LuaJIT: `goto`, `bit` library, global `unpack`.
    LuaJit,
}

impl LuaTarget {
    /// True when the dialect has `goto`/label support.
    pub fn supports_goto(self) -> bool {
        !matches!(self, LuaTarget::Lua51)
    }

    /// True when bitwise operators can be emitted natively.
    pub fn native_bitwise(self) -> bool {
        matches!(self, LuaTarget::Lua53)
    }

    /// The bit-manipulation library to route bitwise operators through.
    pub fn bit_library(self) -> Option<&'static str> {
        match self {
            LuaTarget::Lua52 => Some("bit32"),
            LuaTarget::LuaJit => Some("bit"),
            _ => None,
        }
    }

    /// How `unpack` is spelled on this dialect.
    pub fn unpack(self) -> &'static str {
        match self {
            LuaTarget::Lua51 | LuaTarget::LuaJit => "unpack",
            LuaTarget::Lua52 | LuaTarget::Lua53 => "table.unpack",
        }
    }
}

/// How runtime-support code reaches the emitted module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LuaLibImport {
    /// Paste only the used lualib snippets into each chunk.
    #[default]
    Inline,
    /// Emit `require("lualib_bundle")` in files that use any feature.
    Require,
    /// Emit the require in every file regardless of use.
    Always,
    /// Emit nothing; the host guarantees the runtime is present.
    None,
}

/// The configuration bundle the host passes alongside each file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Target Lua dialect.
    pub lua_target: LuaTarget,
    /// Runtime-support emission mode.
    pub lualib_import: LuaLibImport,
    /// Project root; import paths are expressed relative to it.
    pub root_dir: Option<PathBuf>,
    /// Base directory for non-relative import specifiers.
    pub base_url: Option<PathBuf>,
    /// Disables declaration hoisting (imports are still lifted).
    pub no_hoisting: bool,
    /// Strict mode: bare calls receive `nil` context instead of `_G`.
    pub strict: bool,
    /// Nullability is tracked precisely by the checker.
    pub strict_null_checks: bool,
    /// Treat every file as strict-mode code.
    pub always_strict: bool,
}

impl CompilerOptions {
    /// Effective strictness, honoring `alwaysStrict`.
    pub fn is_strict(&self) -> bool {
        self.strict || self.always_strict
    }

    /// Effective strict-null-checks flag (`strict` implies it).
    pub fn has_strict_null_checks(&self) -> bool {
        self.strict_null_checks || self.strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_capabilities() {
        assert!(!LuaTarget::Lua51.supports_goto());
        assert!(LuaTarget::Lua52.supports_goto());
        assert!(LuaTarget::Lua53.native_bitwise());
        assert_eq!(LuaTarget::Lua52.bit_library(), Some("bit32"));
        assert_eq!(LuaTarget::LuaJit.unpack(), "unpack");
        assert_eq!(LuaTarget::Lua53.unpack(), "table.unpack");
    }

    #[test]
    fn strict_implies_strict_null_checks() {
        let options = CompilerOptions { strict: true, ..Default::default() };
        assert!(options.has_strict_null_checks());
        assert!(options.is_strict());
    }
}
