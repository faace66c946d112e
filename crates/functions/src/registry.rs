//! Function registry and static pipeline validation.

use crate::builtin;
use crate::function::QueryFunction;
use crate::signature::DataShape;
use hashbrown::HashMap;
use siftql_core::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a dry-run check of a pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub output_type: DataShape,
}

impl PipelineValidation {
    /// Converts a failed validation into an error.
    pub fn into_result(self) -> Result<DataShape> {
        if self.valid {
            Ok(self.output_type)
        } else {
            Err(Error::InvalidPipeline {
                errors: self.errors,
            })
        }
    }
}

/// Named pipeline functions.
///
/// Functions are keyed by `namespace.name` (or the bare name when they have
/// no namespace). A namespaced function is also reachable by its bare name
/// unless another function claimed that name first.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn QueryFunction>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `core` functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for function in builtin::all() {
            let registered = registry.register(function);
            debug_assert!(registered.is_ok(), "built-in keys collide: {:?}", registered);
        }
        registry
    }

    /// Registers a function. Fails if its qualified key is already taken.
    pub fn register(&mut self, function: Arc<dyn QueryFunction>) -> Result<()> {
        let signature = function.signature();
        let key = signature.key();
        if self.functions.contains_key(&key) {
            return Err(Error::config(format!("function {} is already registered", key)));
        }
        if signature.namespace.is_some() && !self.functions.contains_key(&signature.name) {
            self.functions
                .insert(signature.name.clone(), Arc::clone(&function));
        }
        debug!(function = %key, "registered function");
        self.functions.insert(key, function);
        Ok(())
    }

    /// Looks a function up by exact key, then case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn QueryFunction>> {
        if let Some(function) = self.functions.get(name) {
            return Some(Arc::clone(function));
        }
        let mut keys: Vec<&String> = self.functions.keys().collect();
        keys.sort();
        keys.into_iter()
            .find(|k| k.eq_ignore_ascii_case(name))
            .and_then(|k| self.functions.get(k))
            .map(Arc::clone)
    }

    /// Like [`resolve`](Self::resolve), failing with `UnknownFunction`.
    pub fn require(&self, name: &str) -> Result<Arc<dyn QueryFunction>> {
        self.resolve(name).ok_or_else(|| Error::UnknownFunction {
            name: name.to_string(),
        })
    }

    /// Returns whether `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Returns every registered key, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Threads a data-shape token through `names`, collecting every stage
    /// whose declared input does not accept the running shape.
    pub fn validate_pipeline<S: AsRef<str>>(
        &self,
        names: &[S],
        initial: DataShape,
    ) -> PipelineValidation {
        let mut errors = Vec::new();
        let mut current = initial;

        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let Some(function) = self.resolve(name) else {
                errors.push(format!("stage {}: unknown function '{}'", index, name));
                current = DataShape::Unknown;
                continue;
            };
            let signature = function.signature();
            if signature.input_type != DataShape::Any && signature.input_type != current {
                errors.push(format!(
                    "stage {}: {} expects {} but receives {}",
                    index,
                    signature.key(),
                    signature.input_type,
                    current
                ));
            }
            if signature.output_type != DataShape::Any {
                current = signature.output_type;
            }
        }

        PipelineValidation {
            valid: errors.is_empty(),
            errors,
            output_type: current,
        }
    }
}
