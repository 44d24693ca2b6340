//! Recursive directive interpolation over a [`Value`] tree
//!
//! Every string leaf is split into a stem and a suffix chain. The stem's
//! prefix resolver (if any) produces a new value, the suffixes are applied
//! to it left to right, and the result is interpolated again, since a file
//! or secret can itself contain directives. Strings with neither a prefix
//! nor a suffix are left untouched.

use std::sync::Arc;

use crate::context::{CancelToken, ResolveContext};
use crate::error::{Error, Result};
use crate::resolver::{PrefixResolver, ResolvedValue, ResolverRegistry};
use crate::secret::SecretStore;
use crate::value::Value;

/// Default limit on nested directive expansion
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Options controlling interpolation
#[derive(Debug, Clone)]
pub struct InterpolatorOptions {
    /// How many directive expansions may nest inside one another
    pub max_depth: usize,
}

impl Default for InterpolatorOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl InterpolatorOptions {
    /// Set the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Resolves directives in a value tree.
///
/// Cheap to clone and safe to share between threads; each call keeps its
/// own state.
#[derive(Clone)]
pub struct Interpolator {
    registry: Arc<ResolverRegistry>,
    secrets: Option<Arc<dyn SecretStore>>,
    options: InterpolatorOptions,
}

impl Interpolator {
    /// Create an interpolator over a registry
    pub fn new(registry: impl Into<Arc<ResolverRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            secrets: None,
            options: InterpolatorOptions::default(),
        }
    }

    /// Create an interpolator with the built-in resolvers
    pub fn with_builtins() -> Result<Self> {
        Ok(Self::new(ResolverRegistry::with_builtins()?))
    }

    /// Attach the secret store used by `VAULT->`
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(store);
        self
    }

    /// Replace the options
    pub fn with_options(mut self, options: InterpolatorOptions) -> Self {
        self.options = options;
        self
    }

    /// The registry in use
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Whether a secret store is attached
    pub fn has_secret_store(&self) -> bool {
        self.secrets.is_some()
    }

    /// Interpolate a tree with no deadline
    pub fn interpolate(&self, value: Value) -> Result<Value> {
        self.interpolate_with(value, &CancelToken::new())
    }

    /// Interpolate a tree, honoring `cancel`.
    ///
    /// The first error aborts the walk; the partially resolved tree is
    /// dropped.
    pub fn interpolate_with(&self, mut value: Value, cancel: &CancelToken) -> Result<Value> {
        let mut ctx = ResolveContext::new(cancel);
        if let Some(store) = &self.secrets {
            ctx = ctx.with_secrets(store.as_ref());
        }

        let mut walk = Walk {
            registry: &self.registry,
            ctx,
            max_depth: self.options.max_depth,
            stack: Vec::new(),
        };
        walk.value(&mut value, 0)?;

        Ok(value)
    }
}

/// State of one interpolation call
struct Walk<'a> {
    registry: &'a ResolverRegistry,
    ctx: ResolveContext<'a>,
    max_depth: usize,
    /// Sources currently being expanded, outermost first
    stack: Vec<String>,
}

impl Walk<'_> {
    fn value(&mut self, value: &mut Value, depth: usize) -> Result<()> {
        match value {
            Value::Mapping(map) => {
                for (key, item) in map.iter_mut() {
                    self.value(item, depth).map_err(|e| e.at_key(key))?;
                }
            }
            Value::Sequence(seq) => {
                for (index, item) in seq.iter_mut().enumerate() {
                    self.value(item, depth).map_err(|e| e.at_index(index))?;
                }
            }
            Value::String(s) => {
                let raw = std::mem::take(s);
                *value = self.string(raw, depth)?;
            }
            Value::Null
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::Duration(_) => {}
        }
        Ok(())
    }

    fn string(&mut self, raw: String, depth: usize) -> Result<Value> {
        let registry = self.registry;
        let split = registry.split(&raw);
        let prefix = registry.match_prefix(split.stem);

        if prefix.is_none() && split.suffixes.is_empty() {
            log::trace!("no directive in string of length {}", raw.len());
            return Ok(Value::String(raw));
        }

        self.directive(split.stem, prefix, &split.suffixes, depth)
            .map_err(|e| e.with_directive(raw.as_str()))
    }

    fn directive(
        &mut self,
        stem: &str,
        prefix: Option<(&dyn PrefixResolver, &str)>,
        suffixes: &[&str],
        depth: usize,
    ) -> Result<Value> {
        if depth >= self.max_depth {
            return Err(Error::depth_exceeded(self.max_depth));
        }

        let ResolvedValue { mut value, source } = match prefix {
            Some((resolver, payload)) => {
                self.ctx.cancel.check()?;
                let resolved = resolver.resolve(payload, &self.ctx)?;
                log::debug!(
                    "resolved {}{} ({})",
                    resolver.prefix(),
                    payload,
                    resolved.value.type_name()
                );
                resolved
            }
            None => ResolvedValue::new(stem),
        };

        let registry = self.registry;
        for name in suffixes {
            let suffix = registry.suffix(name).ok_or_else(|| {
                Error::internal(format!("suffix '{}' matched but is not registered", name))
            })?;
            value = suffix.apply(value).map_err(|e| e.with_suffix(*name))?;
        }

        match source {
            Some(source) => {
                if self.stack.contains(&source) {
                    let mut chain = self.stack.clone();
                    chain.push(source);
                    return Err(Error::circular_reference(chain));
                }
                self.stack.push(source);
                let result = self.value(&mut value, depth + 1);
                self.stack.pop();
                result?;
            }
            None => self.value(&mut value, depth + 1)?,
        }

        Ok(value)
    }
}
