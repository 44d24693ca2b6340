//! Resolver traits and the immutable resolver registry
//!
//! A registry holds two kinds of resolvers:
//! - prefix resolvers (`ENV->`, `FS->`, ...) that turn a directive payload
//!   into a new value
//! - suffix resolvers (`::atoi`, `::duration`) that coerce a value
//!
//! Registries are assembled once with [`RegistryBuilder`] and never mutated
//! afterwards, so a single registry can be shared by any number of threads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ResolveContext;
use crate::error::{Error, Result};
use crate::grammar::{Split, SuffixGrammar};
use crate::value::Value;
use crate::{prefix, suffix};

/// A value produced by a prefix resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    /// The resolved value
    pub value: Value,
    /// Where the value came from (e.g. `env:HOME`, `file:/etc/app.yaml`).
    ///
    /// Used to detect a source that expands back into itself.
    pub source: Option<String>,
}

impl ResolvedValue {
    /// A value with no tracked source
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            source: None,
        }
    }

    /// A value read from `source`
    pub fn from_source(value: impl Into<Value>, source: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: Some(source.into()),
        }
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        ResolvedValue::new(value)
    }
}

/// Trait for prefix resolver implementations
pub trait PrefixResolver: Send + Sync {
    /// The prefix token, including the arrow (e.g. `"ENV->"`)
    fn prefix(&self) -> &str;

    /// Resolve the payload that followed the prefix
    fn resolve(&self, payload: &str, ctx: &ResolveContext<'_>) -> Result<ResolvedValue>;
}

/// Trait for suffix resolver implementations
pub trait SuffixResolver: Send + Sync {
    /// The suffix name, without the leading `::`
    fn name(&self) -> &str;

    /// Coerce the current value
    fn apply(&self, value: Value) -> Result<Value>;
}

/// A function-based prefix resolver
pub struct FnPrefix<F>
where
    F: Fn(&str, &ResolveContext<'_>) -> Result<ResolvedValue> + Send + Sync,
{
    prefix: String,
    func: F,
}

impl<F> FnPrefix<F>
where
    F: Fn(&str, &ResolveContext<'_>) -> Result<ResolvedValue> + Send + Sync,
{
    /// Create a new function-based prefix resolver
    pub fn new(prefix: impl Into<String>, func: F) -> Self {
        Self {
            prefix: prefix.into(),
            func,
        }
    }
}

impl<F> PrefixResolver for FnPrefix<F>
where
    F: Fn(&str, &ResolveContext<'_>) -> Result<ResolvedValue> + Send + Sync,
{
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn resolve(&self, payload: &str, ctx: &ResolveContext<'_>) -> Result<ResolvedValue> {
        (self.func)(payload, ctx)
    }
}

/// A function-based suffix resolver
pub struct FnSuffix<F>
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnSuffix<F>
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    /// Create a new function-based suffix resolver
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> SuffixResolver for FnSuffix<F>
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, value: Value) -> Result<Value> {
        (self.func)(value)
    }
}

/// Collects resolvers before freezing them into a [`ResolverRegistry`]
#[derive(Default)]
pub struct RegistryBuilder {
    prefixes: Vec<Arc<dyn PrefixResolver>>,
    suffixes: Vec<Arc<dyn SuffixResolver>>,
}

impl RegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the built-in resolvers (ENV, OENV, FS, OFS, VAULT, atoi, duration)
    pub fn with_builtins(self) -> Self {
        suffix::register_builtins(prefix::register_builtins(self))
    }

    /// Add a prefix resolver
    pub fn prefix(mut self, resolver: Arc<dyn PrefixResolver>) -> Self {
        self.prefixes.push(resolver);
        self
    }

    /// Add a suffix resolver
    pub fn suffix(mut self, resolver: Arc<dyn SuffixResolver>) -> Self {
        self.suffixes.push(resolver);
        self
    }

    /// Add a function as a prefix resolver
    pub fn prefix_fn<F>(self, prefix: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &ResolveContext<'_>) -> Result<ResolvedValue> + Send + Sync + 'static,
    {
        self.prefix(Arc::new(FnPrefix::new(prefix, func)))
    }

    /// Add a function as a suffix resolver
    pub fn suffix_fn<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.suffix(Arc::new(FnSuffix::new(name, func)))
    }

    /// Freeze the registry.
    ///
    /// Fails with `AlreadyRegistered` if a prefix or suffix name was added
    /// twice.
    pub fn build(self) -> Result<ResolverRegistry> {
        let mut prefixes: Vec<Arc<dyn PrefixResolver>> = Vec::with_capacity(self.prefixes.len());
        for resolver in self.prefixes {
            if prefixes.iter().any(|p| p.prefix() == resolver.prefix()) {
                return Err(Error::already_registered(resolver.prefix()));
            }
            prefixes.push(resolver);
        }
        // Longest first, so a prefix that extends another one wins
        prefixes.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));

        let mut suffixes: HashMap<String, Arc<dyn SuffixResolver>> = HashMap::new();
        for resolver in self.suffixes {
            let name = resolver.name().to_string();
            if suffixes.contains_key(&name) {
                return Err(Error::already_registered(name));
            }
            suffixes.insert(name, resolver);
        }

        let grammar = SuffixGrammar::new(suffixes.keys().map(String::as_str))?;

        Ok(ResolverRegistry {
            prefixes,
            suffixes,
            grammar,
        })
    }
}

/// Registry of available prefix and suffix resolvers
#[derive(Clone)]
pub struct ResolverRegistry {
    prefixes: Vec<Arc<dyn PrefixResolver>>,
    suffixes: HashMap<String, Arc<dyn SuffixResolver>>,
    grammar: SuffixGrammar,
}

impl ResolverRegistry {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Create a registry with the standard built-in resolvers
    pub fn with_builtins() -> Result<Self> {
        RegistryBuilder::new().with_builtins().build()
    }

    /// Check if a prefix is registered
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.iter().any(|p| p.prefix() == prefix)
    }

    /// Check if a suffix is registered
    pub fn contains_suffix(&self, name: &str) -> bool {
        self.suffixes.contains_key(name)
    }

    /// Get a suffix resolver by name
    pub fn suffix(&self, name: &str) -> Option<&Arc<dyn SuffixResolver>> {
        self.suffixes.get(name)
    }

    /// Split a string into stem and registered suffix chain
    pub fn split<'s>(&self, input: &'s str) -> Split<'s> {
        self.grammar.split(input)
    }

    /// Find the prefix resolver for a stem, returning it with the payload
    pub fn match_prefix<'s>(&self, stem: &'s str) -> Option<(&dyn PrefixResolver, &'s str)> {
        self.prefixes.iter().find_map(|resolver| {
            stem.strip_prefix(resolver.prefix())
                .map(|payload| (resolver.as_ref(), payload))
        })
    }
}
