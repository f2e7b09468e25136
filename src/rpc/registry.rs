//! Service registry
//!
//! Receivers declare their remotely callable methods through [`RpcService`]
//! (or an explicitly built [`MethodTable`]). Registration binds every eligible
//! method to a shared receiver once; lookups afterwards only clone `Arc`s out
//! of the map.

use std::{
    any::type_name,
    collections::HashMap,
    fmt::Display,
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{RegistryError, RpcError};
use crate::rpc::context::CallContext;

/// A receiver whose methods can be called remotely.
///
/// Each declared handler must have the shape
/// `fn(&Self, Arg, &mut Reply) -> Result<(), E>`; the bounds on
/// [`MethodTable::method`] enforce that at compile time.
pub trait RpcService: Send + Sync + Sized + 'static {
    fn methods(table: &mut MethodTable<Self>);
}

type Invoker<R> =
    Box<dyn Fn(&R, Option<&Value>, &CallContext) -> Result<Value, RpcError> + Send + Sync>;

type BoundInvoker =
    Box<dyn Fn(Option<&Value>, &CallContext) -> Result<Value, RpcError> + Send + Sync>;

struct TableEntry<R> {
    name: String,
    argument_type: &'static str,
    reply_type: &'static str,
    invoker: Invoker<R>,
}

/// Method declarations for a receiver of type `R`, not yet bound to an
/// instance.
pub struct MethodTable<R> {
    entries: Vec<TableEntry<R>>,
}

impl<R> Default for MethodTable<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R: Send + Sync + 'static> MethodTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` as a remotely callable method backed by `handler`.
    ///
    /// The argument is decoded from the first positional parameter (or left
    /// at `A::default()` when there is none); the reply starts at
    /// `Rep::default()` and is sent back only when the handler returns `Ok`.
    pub fn method<A, Rep, E, F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        A: DeserializeOwned + Default + 'static,
        Rep: Serialize + Default + 'static,
        E: Display + 'static,
        F: Fn(&R, A, &mut Rep) -> Result<(), E> + Send + Sync + 'static,
    {
        let invoker: Invoker<R> = Box::new(
            move |receiver: &R,
                  param: Option<&Value>,
                  context: &CallContext|
                  -> Result<Value, RpcError> {
                let argument = match param {
                    Some(raw) => A::deserialize(raw)
                        .map_err(|err| RpcError::InvalidParams(err.to_string()))?,
                    None => A::default(),
                };

                if context.is_cancelled() {
                    return Err(RpcError::Cancelled);
                }

                let mut reply = Rep::default();
                handler(receiver, argument, &mut reply)
                    .map_err(|err| RpcError::Application(err.to_string()))?;

                serde_json::to_value(&reply).map_err(|err| RpcError::Internal(err.to_string()))
            },
        );

        self.entries.push(TableEntry {
            name: name.into(),
            argument_type: type_name::<A>(),
            reply_type: type_name::<Rep>(),
            invoker,
        });
        self
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A method bound to its receiver.
pub struct MethodDescriptor {
    pub name: String,
    pub argument_type: &'static str,
    pub reply_type: &'static str,
    invoke: BoundInvoker,
}

impl MethodDescriptor {
    pub fn invoke(&self, param: Option<&Value>, context: &CallContext) -> Result<Value, RpcError> {
        (self.invoke)(param, context)
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("argument_type", &self.argument_type)
            .field("reply_type", &self.reply_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ServiceDescriptor {
    pub name: String,
    pub receiver_type: &'static str,
    methods: HashMap<String, Arc<MethodDescriptor>>,
}

impl ServiceDescriptor {
    pub fn method(&self, name: &str) -> Option<Arc<MethodDescriptor>> {
        self.methods.get(name).cloned()
    }

    pub fn summary(&self) -> ServiceSummary {
        let mut methods = self
            .methods
            .values()
            .map(|method| MethodSummary {
                name: method.name.clone(),
                argument_type: method.argument_type.to_string(),
                reply_type: method.reply_type.to_string(),
            })
            .collect::<Vec<_>>();
        methods.sort_by(|left, right| left.name.cmp(&right.name));

        ServiceSummary {
            name: self.name.clone(),
            receiver_type: self.receiver_type.to_string(),
            methods,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub receiver_type: String,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    pub argument_type: String,
    pub reply_type: String,
}

/// What to do when a service name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// The newest registration wins.
    #[default]
    Replace,
    Reject,
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    policy: DuplicatePolicy,
    services: RwLock<HashMap<String, Arc<ServiceDescriptor>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            services: RwLock::default(),
        }
    }

    pub fn register<R: RpcService>(
        &self,
        name: &str,
        receiver: Arc<R>,
    ) -> Result<(), RegistryError> {
        let mut table = MethodTable::new();
        R::methods(&mut table);
        self.register_table(name, receiver, table)
    }

    pub fn register_table<R: Send + Sync + 'static>(
        &self,
        name: &str,
        receiver: Arc<R>,
        table: MethodTable<R>,
    ) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyServiceName);
        }

        let mut services = self.services.write();

        if self.policy == DuplicatePolicy::Reject && services.contains_key(name) {
            return Err(RegistryError::DuplicateService {
                service: name.to_string(),
            });
        }

        let mut methods = HashMap::with_capacity(table.len());
        for entry in table.entries {
            if !is_exported_name(&entry.name) {
                warn!(service = %name, method = %entry.name, "skipping method with unusable name");
                continue;
            }

            let bound = Arc::clone(&receiver);
            let invoker = entry.invoker;
            let invoke: BoundInvoker =
                Box::new(move |param: Option<&Value>, context: &CallContext| {
                    invoker(&*bound, param, context)
                });

            methods.insert(
                entry.name.clone(),
                Arc::new(MethodDescriptor {
                    name: entry.name,
                    argument_type: entry.argument_type,
                    reply_type: entry.reply_type,
                    invoke,
                }),
            );
        }

        if methods.is_empty() {
            return Err(RegistryError::NoSuitableMethods {
                service: name.to_string(),
            });
        }

        let method_count = methods.len();
        let descriptor = ServiceDescriptor {
            name: name.to_string(),
            receiver_type: type_name::<R>(),
            methods,
        };

        if services
            .insert(name.to_string(), Arc::new(descriptor))
            .is_some()
        {
            warn!(service = %name, "replaced existing service registration");
        }

        info!(service = %name, methods = method_count, "service registered");
        Ok(())
    }

    pub fn service(&self, name: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services.read().get(name).cloned()
    }

    /// Resolves a method; the registry lock is released before this returns.
    pub fn lookup(&self, service: &str, method: &str) -> Result<Arc<MethodDescriptor>, RpcError> {
        let descriptor = self
            .service(service)
            .ok_or_else(|| RpcError::ServiceNotFound(service.to_string()))?;

        descriptor
            .method(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    pub fn services(&self) -> Vec<ServiceSummary> {
        let mut summaries = self
            .services
            .read()
            .values()
            .map(|descriptor| descriptor.summary())
            .collect::<Vec<_>>();
        summaries.sort_by(|left, right| left.name.cmp(&right.name));
        summaries
    }
}

/// Method names must be plain identifiers so they stay addressable as the
/// suffix of `Service.Method`.
pub fn is_exported_name(name: &str) -> bool {
    let mut characters = name.chars();
    let Some(first) = characters.next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_')
        && characters.all(|character| character.is_ascii_alphanumeric() || character == '_')
}
