// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Runtime-support feature tracking and bundling.
//!
//! Lowerings that need runtime help (array methods, the iterator protocol,
//! class accessors, …) register a [`LuaLibFeature`]. The registry is a
//! monotonic, append-only set for the whole compilation; the host serialises
//! it once at the end. Each feature maps to a hand-written Lua snippet
//! embedded in the binary; snippets may depend on other snippets and the
//! bundle resolves those dependencies before concatenating.

use crate::options::LuaLibImport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The module name emitted for `require`-style lualib loading.
pub const LUALIB_BUNDLE_MODULE: &str = "lualib_bundle";

/// Every runtime-support feature the transformer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LuaLibFeature {
    /// `Array.prototype.concat`
    ArrayConcat,
    /// `Array.prototype.every`
    ArrayEvery,
    /// `Array.prototype.filter`
    ArrayFilter,
    /// `Array.prototype.forEach`
    ArrayForEach,
    /// `Array.prototype.indexOf`
    ArrayIndexOf,
    /// `Array.prototype.join`
    ArrayJoin,
    /// `Array.prototype.map`
    ArrayMap,
    /// `Array.prototype.push`
    ArrayPush,
    /// `Array.prototype.some`
    ArraySome,
    /// Static get-accessor dispatch on class tables.
    ClassIndex,
    /// Static set-accessor dispatch on class tables.
    ClassNewIndex,
    /// Class decorator application.
    Decorate,
    /// Instance get-accessor dispatch on prototypes.
    Index,
    /// `instanceof` against class tables.
    InstanceOf,
    /// `instanceof Object`.
    InstanceOfObject,
    /// The for-of iterator protocol.
    Iterator,
    /// The `Map` built-in.
    Map,
    /// Instance set-accessor dispatch on prototypes.
    NewIndex,
    /// `Object.assign`
    ObjectAssign,
    /// `Object.entries`
    ObjectEntries,
    /// `Object.keys`
    ObjectKeys,
    /// `Object.values`
    ObjectValues,
    /// The `Set` built-in.
    Set,
    /// Spread of arbitrary iterables.
    Spread,
    /// `String.prototype.indexOf`
    StringIndexOf,
    /// `String.prototype.split`
    StringSplit,
    /// `String.prototype.trim`
    StringTrim,
    /// The `Symbol` built-in and well-known symbols.
    Symbol,
    /// `Symbol.for` / `Symbol.keyFor`.
    SymbolRegistry,
    /// The `typeof` operator.
    TypeOf,
    /// The `WeakMap` built-in.
    WeakMap,
    /// The `WeakSet` built-in.
    WeakSet,
}

impl LuaLibFeature {
    /// Features this feature's snippet relies on.
    pub fn dependencies(self) -> &'static [LuaLibFeature] {
        match self {
            LuaLibFeature::Iterator => &[LuaLibFeature::Symbol],
            LuaLibFeature::Spread => &[LuaLibFeature::Iterator],
            LuaLibFeature::SymbolRegistry => &[LuaLibFeature::Symbol],
            _ => &[],
        }
    }

    /// The embedded Lua source of this feature's snippet.
    pub fn source(self) -> &'static str {
        match self {
            LuaLibFeature::ArrayConcat => include_str!("lualib/ArrayConcat.lua"),
            LuaLibFeature::ArrayEvery => include_str!("lualib/ArrayEvery.lua"),
            LuaLibFeature::ArrayFilter => include_str!("lualib/ArrayFilter.lua"),
            LuaLibFeature::ArrayForEach => include_str!("lualib/ArrayForEach.lua"),
            LuaLibFeature::ArrayIndexOf => include_str!("lualib/ArrayIndexOf.lua"),
            LuaLibFeature::ArrayJoin => include_str!("lualib/ArrayJoin.lua"),
            LuaLibFeature::ArrayMap => include_str!("lualib/ArrayMap.lua"),
            LuaLibFeature::ArrayPush => include_str!("lualib/ArrayPush.lua"),
            LuaLibFeature::ArraySome => include_str!("lualib/ArraySome.lua"),
            LuaLibFeature::ClassIndex => include_str!("lualib/ClassIndex.lua"),
            LuaLibFeature::ClassNewIndex => include_str!("lualib/ClassNewIndex.lua"),
            LuaLibFeature::Decorate => include_str!("lualib/Decorate.lua"),
            LuaLibFeature::Index => include_str!("lualib/Index.lua"),
            LuaLibFeature::InstanceOf => include_str!("lualib/InstanceOf.lua"),
            LuaLibFeature::InstanceOfObject => include_str!("lualib/InstanceOfObject.lua"),
            LuaLibFeature::Iterator => include_str!("lualib/Iterator.lua"),
            LuaLibFeature::Map => include_str!("lualib/Map.lua"),
            LuaLibFeature::NewIndex => include_str!("lualib/NewIndex.lua"),
            LuaLibFeature::ObjectAssign => include_str!("lualib/ObjectAssign.lua"),
            LuaLibFeature::ObjectEntries => include_str!("lualib/ObjectEntries.lua"),
            LuaLibFeature::ObjectKeys => include_str!("lualib/ObjectKeys.lua"),
            LuaLibFeature::ObjectValues => include_str!("lualib/ObjectValues.lua"),
            LuaLibFeature::Set => include_str!("lualib/Set.lua"),
            LuaLibFeature::Spread => include_str!("lualib/Spread.lua"),
            LuaLibFeature::StringIndexOf => include_str!("lualib/StringIndexOf.lua"),
            LuaLibFeature::StringSplit => include_str!("lualib/StringSplit.lua"),
            LuaLibFeature::StringTrim => include_str!("lualib/StringTrim.lua"),
            LuaLibFeature::Symbol => include_str!("lualib/Symbol.lua"),
            LuaLibFeature::SymbolRegistry => include_str!("lualib/SymbolRegistry.lua"),
            LuaLibFeature::TypeOf => include_str!("lualib/TypeOf.lua"),
            LuaLibFeature::WeakMap => include_str!("lualib/WeakMap.lua"),
            LuaLibFeature::WeakSet => include_str!("lualib/WeakSet.lua"),
        }
    }

    /// The global helper name a feature introduces, for diagnostics.
    pub fn helper_name(self) -> String {
        match self {
            LuaLibFeature::Map => "Map".to_string(),
            LuaLibFeature::Set => "Set".to_string(),
            LuaLibFeature::WeakMap => "WeakMap".to_string(),
            LuaLibFeature::WeakSet => "WeakSet".to_string(),
            LuaLibFeature::Symbol => "Symbol".to_string(),
            other => format!("__TS__{:?}", other),
        }
    }
}

/// The monotonic set of features used so far in a compilation.
#[derive(Debug, Default)]
pub struct LuaLibRegistry {
    used: BTreeSet<LuaLibFeature>,
}

impl LuaLibRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a feature (not its dependencies) as used.
    pub fn use_feature(&mut self, feature: LuaLibFeature) {
        self.used.insert(feature);
    }

    /// The used features in deterministic order.
    pub fn used_features(&self) -> &BTreeSet<LuaLibFeature> {
        &self.used
    }

    /// Absorbs the features of another registry.
    pub fn merge(&mut self, features: &BTreeSet<LuaLibFeature>) {
        self.used.extend(features.iter().copied());
    }

    /// True when no feature has been used.
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// Resolves dependencies and returns the full feature closure, in order.
pub fn feature_closure(features: &BTreeSet<LuaLibFeature>) -> BTreeSet<LuaLibFeature> {
    let mut closed = BTreeSet::new();
    let mut work: Vec<LuaLibFeature> = features.iter().copied().collect();
    while let Some(feature) = work.pop() {
        if closed.insert(feature) {
            work.extend(feature.dependencies().iter().copied());
        }
    }
    closed
}

/// Concatenates the snippets for a feature set, dependencies included.
pub fn bundle_features(features: &BTreeSet<LuaLibFeature>) -> String {
    let mut out = String::new();
    for feature in feature_closure(features) {
        out.push_str(feature.source());
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// The complete lualib bundle, for `LuaLibImport::Require` deployments.
pub fn full_bundle() -> String {
    let all: BTreeSet<LuaLibFeature> = [
        LuaLibFeature::ArrayConcat,
        LuaLibFeature::ArrayEvery,
        LuaLibFeature::ArrayFilter,
        LuaLibFeature::ArrayForEach,
        LuaLibFeature::ArrayIndexOf,
        LuaLibFeature::ArrayJoin,
        LuaLibFeature::ArrayMap,
        LuaLibFeature::ArrayPush,
        LuaLibFeature::ArraySome,
        LuaLibFeature::ClassIndex,
        LuaLibFeature::ClassNewIndex,
        LuaLibFeature::Decorate,
        LuaLibFeature::Index,
        LuaLibFeature::InstanceOf,
        LuaLibFeature::InstanceOfObject,
        LuaLibFeature::Iterator,
        LuaLibFeature::Map,
        LuaLibFeature::NewIndex,
        LuaLibFeature::ObjectAssign,
        LuaLibFeature::ObjectEntries,
        LuaLibFeature::ObjectKeys,
        LuaLibFeature::ObjectValues,
        LuaLibFeature::Set,
        LuaLibFeature::Spread,
        LuaLibFeature::StringIndexOf,
        LuaLibFeature::StringSplit,
        LuaLibFeature::StringTrim,
        LuaLibFeature::Symbol,
        LuaLibFeature::SymbolRegistry,
        LuaLibFeature::TypeOf,
        LuaLibFeature::WeakMap,
        LuaLibFeature::WeakSet,
    ]
    .into_iter()
    .collect();
    bundle_features(&all)
}

/// True when this import mode wants a `require` statement emitted.
pub fn wants_require(import: LuaLibImport, any_feature_used: bool) -> bool {
    match import {
        LuaLibImport::Require => any_feature_used,
        LuaLibImport::Always => true,
        LuaLibImport::Inline | LuaLibImport::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_monotonic_and_deterministic() {
        let mut registry = LuaLibRegistry::new();
        registry.use_feature(LuaLibFeature::StringSplit);
        registry.use_feature(LuaLibFeature::ArrayPush);
        registry.use_feature(LuaLibFeature::StringSplit);
        let used: Vec<_> = registry.used_features().iter().copied().collect();
        assert_eq!(used, vec![LuaLibFeature::ArrayPush, LuaLibFeature::StringSplit]);
    }

    #[test]
    fn closure_pulls_dependencies() {
        let features: BTreeSet<_> = [LuaLibFeature::Spread].into_iter().collect();
        let closed = feature_closure(&features);
        assert!(closed.contains(&LuaLibFeature::Iterator));
        assert!(closed.contains(&LuaLibFeature::Symbol));
    }

    #[test]
    fn bundle_includes_dependency_snippets() {
        let features: BTreeSet<_> = [LuaLibFeature::Iterator].into_iter().collect();
        let bundle = bundle_features(&features);
        assert!(bundle.contains("function __TS__Iterator"));
        // The Symbol table comes along because Iterator reads Symbol.iterator.
        assert!(bundle.contains("Symbol = {"));
    }

    #[test]
    fn full_bundle_contains_every_helper() {
        let bundle = full_bundle();
        for needle in ["__TS__ArrayPush", "__TS__Iterator", "__TS__TypeOf", "WeakSet.new"] {
            assert!(bundle.contains(needle), "missing {needle}");
        }
    }
}
