// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Reserved-name detection and deterministic renaming.
//!
//! An identifier is unsafe on the Lua side when it is a Lua keyword, shadows
//! a Lua built-in global, or is not a valid Lua identifier at all. Unsafe
//! names of non-exported, non-ambient symbols are renamed; ambient names
//! cannot be renamed (the runtime already knows them) and fail instead.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref VALID_LUA_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref LUA_KEYWORDS: HashSet<&'static str> = [
        "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto",
        "if", "in", "local", "nil", "not", "or", "repeat", "return", "then", "true",
        "until", "while",
    ]
    .into_iter()
    .collect();
    static ref LUA_BUILTIN_GLOBALS: HashSet<&'static str> = [
        "_G", "assert", "collectgarbage", "coroutine", "dofile", "error", "getmetatable",
        "io", "ipairs", "load", "loadstring", "math", "next", "os", "pairs", "pcall",
        "print", "rawequal", "rawget", "rawlen", "rawset", "require", "select",
        "setmetatable", "string", "table", "tonumber", "tostring", "type", "unpack",
        "xpcall",
    ]
    .into_iter()
    .collect();
}

/// True when the text is a syntactically valid Lua identifier.
pub fn is_valid_lua_identifier(name: &str) -> bool {
    VALID_LUA_IDENTIFIER.is_match(name)
}

/// True when the text is a Lua keyword.
pub fn is_lua_keyword(name: &str) -> bool {
    LUA_KEYWORDS.contains(name)
}

/// True when the name cannot be emitted verbatim.
pub fn is_unsafe_name(name: &str) -> bool {
    LUA_KEYWORDS.contains(name)
        || LUA_BUILTIN_GLOBALS.contains(name)
        || !is_valid_lua_identifier(name)
}

/// Produces the deterministic safe replacement for an unsafe name.
///
/// The replacement is `____` followed by the name with every byte outside
/// `[A-Za-z0-9_]` rewritten as its two-digit uppercase hex code. Keywords and
/// globals contain only valid bytes, so they simply gain the prefix.
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    out.push_str("____");
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("{:02X}", byte));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_and_globals_are_unsafe() {
        assert!(is_unsafe_name("end"));
        assert!(is_unsafe_name("print"));
        assert!(is_unsafe_name("table"));
        assert!(!is_unsafe_name("myVariable"));
    }

    #[test]
    fn invalid_characters_are_unsafe() {
        assert!(is_unsafe_name("my-var"));
        assert!(is_unsafe_name("1abc"));
        assert!(is_unsafe_name(""));
    }

    #[test]
    fn safe_names_are_prefixed_and_hex_escaped() {
        assert_eq!(safe_name("end"), "____end");
        assert_eq!(safe_name("my-var"), "____my2Dvar");
        assert_eq!(safe_name("a b"), "____a20b");
    }

    #[test]
    fn safe_names_are_valid_identifiers() {
        for name in ["end", "my-var", "1x", "a.b.c"] {
            assert!(is_valid_lua_identifier(&safe_name(name)));
        }
    }
}
