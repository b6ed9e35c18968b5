// src/engine/registry.rs
//
// Named operation and hook tables. Registration happens at init time; reads
// happen on every pipeline run, so the tables sit behind a read-write lock.
// A registry is a value - pipelines share one through an Arc, and the facade
// uses a process-wide default.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::engine::codec::{Image, ImageCodec};
use crate::engine::hooks::{self, HookConfig, HookFn, OffsetReference};
use crate::engine::operations;
use crate::error::PipeError;
use crate::ops::Params;

/// Where an operation sits in the queue.
///
/// Entry ops are pinned to the front and may appear at most once per
/// pipeline; exit ops are moved to the back at schedule time, also at most
/// once. Everything else keeps its enqueue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Entry,
    Middle,
    Exit,
}

/// Execution context handed to every operation invocation.
pub struct OpContext<'a> {
    pub codec: &'a dyn ImageCodec,
    pub config: HookConfig,
    registry: &'a Registry,
    pub(crate) warnings: Vec<String>,
}

impl<'a> OpContext<'a> {
    pub(crate) fn new(codec: &'a dyn ImageCodec, registry: &'a Registry) -> Self {
        Self {
            codec,
            config: registry.hook_config(),
            registry,
            warnings: Vec::new(),
        }
    }

    /// Look up the hook registered for `op:name`.
    pub fn hook(&self, op: &str, name: &str) -> Option<HookFn> {
        self.registry.get_hook(op, name)
    }

    /// Report a recoverable oddity; surfaced as a `Warning` event.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// An operation reads its params and works on the pipeline's image slot,
/// which holds the output of the previous step. On failure the slot keeps
/// whatever the operation left there, so a failed run can still hand back the
/// partially-processed image.
pub type OperationFn = Arc<
    dyn Fn(&mut Params, &mut Option<Image>, &mut OpContext) -> Result<(), PipeError> + Send + Sync,
>;

#[derive(Clone)]
pub struct RegisteredOp {
    pub func: OperationFn,
    pub role: Role,
}

/// The operation and hook tables.
pub struct Registry {
    ops: RwLock<HashMap<String, RegisteredOp>>,
    hooks: RwLock<HashMap<(String, String), HookFn>>,
    config: RwLock<HookConfig>,
}

impl Registry {
    /// An empty registry. Most callers want [`Registry::with_defaults`].
    pub fn new() -> Self {
        Self {
            ops: RwLock::new(HashMap::new()),
            hooks: RwLock::new(HashMap::new()),
            config: RwLock::new(HookConfig::default()),
        }
    }

    /// A registry pre-loaded with the built-in operations and their default
    /// constraint hooks.
    pub fn with_defaults() -> Self {
        let registry = Self::new();

        registry.add_with_role("from", Role::Entry, Arc::new(operations::from));
        registry.add_with_role("open", Role::Entry, Arc::new(operations::from));
        registry.add_with_role("to", Role::Exit, Arc::new(operations::to));
        registry.add_with_role("save", Role::Exit, Arc::new(operations::to));
        registry.add_with_role("resize", Role::Middle, Arc::new(operations::resize));
        registry.add_with_role("crop", Role::Middle, Arc::new(operations::crop));

        registry.hook("resize", "constraints", Arc::new(hooks::resize_constraints));
        registry.hook("crop", "constraints", Arc::new(hooks::crop_constraints));

        registry
    }

    /// Register a middle operation. Re-registering a name replaces it.
    pub fn add(&self, name: impl Into<String>, func: OperationFn) {
        self.add_with_role(name, Role::Middle, func);
    }

    pub fn add_with_role(&self, name: impl Into<String>, role: Role, func: OperationFn) {
        let name = name.into();
        tracing::debug!(op = %name, ?role, "registering operation");
        self.ops.write().insert(name, RegisteredOp { func, role });
    }

    /// Register (or replace) the hook for `op:name`. Last registration wins.
    pub fn hook(&self, op: impl Into<String>, name: impl Into<String>, func: HookFn) {
        self.hooks.write().insert((op.into(), name.into()), func);
    }

    pub fn get(&self, name: &str) -> Option<RegisteredOp> {
        self.ops.read().get(name).cloned()
    }

    pub fn get_hook(&self, op: &str, name: &str) -> Option<HookFn> {
        self.hooks.read().get(&(op.to_owned(), name.to_owned())).cloned()
    }

    pub fn hook_config(&self) -> HookConfig {
        *self.config.read()
    }

    pub fn set_crop_offset_reference(&self, reference: OffsetReference) {
        self.config.write().crop_offset_reference = reference;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Registry({} ops, {} hooks)",
            self.ops.read().len(),
            self.hooks.read().len()
        )
    }
}

static DEFAULT_REGISTRY: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::with_defaults()));

/// The process-wide registry used by the front-end facade.
pub fn default_registry() -> Arc<Registry> {
    DEFAULT_REGISTRY.clone()
}
