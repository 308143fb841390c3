//! Service container
//!
//! Process-wide registry mapping a capability (usually a `dyn Trait`) to the single
//! instance registered for it. Populated once during bootstrap through
//! [`ServiceRegistryBuilder`], immutable after [`ServiceRegistryBuilder::build`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DomainError, RegistryError};

struct Registration {
    capability: &'static str,
    /// Always an `Arc<T>` where `TypeId::of::<T>()` is the map key
    instance: Box<dyn Any + Send + Sync>,
}

pub struct ServiceRegistry {
    services: HashMap<TypeId, Registration>,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    /// Look up the instance registered for capability `T`.
    ///
    /// Every call returns a clone of the same `Arc`.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|registration| registration.instance.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Like [`ServiceRegistry::get`] but fails with [`RegistryError::Missing`].
    pub fn resolve<T>(&self) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get::<T>()
            .ok_or_else(|| RegistryError::Missing(type_name::<T>()))
    }

    /// Registered capability names, sorted (for diagnostics).
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.services.values().map(|r| r.capability).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

#[must_use = "builders do nothing unless you call .build()"]
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    services: HashMap<TypeId, Registration>,
}

impl ServiceRegistryBuilder {
    /// Register an already constructed instance for capability `T`.
    ///
    /// # Errors
    /// [`RegistryError::Duplicate`] if `T` is already registered.
    pub fn register<T>(mut self, instance: Arc<T>) -> Result<Self, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let capability = type_name::<T>();
        if self.services.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::Duplicate(capability));
        }

        self.services.insert(
            TypeId::of::<T>(),
            Registration {
                capability,
                instance: Box::new(instance),
            },
        );
        tracing::debug!(capability, "Capability registered");
        Ok(self)
    }

    /// Run `factory` once and register its result for capability `T`.
    ///
    /// The factory is not invoked when `T` is already registered.
    ///
    /// # Errors
    /// [`RegistryError::Duplicate`] or [`RegistryError::Construction`].
    pub fn provide<T, F>(self, factory: F) -> Result<Self, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce() -> Result<Arc<T>, DomainError>,
    {
        let capability = type_name::<T>();
        if self.services.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::Duplicate(capability));
        }

        let instance =
            factory().map_err(|source| RegistryError::Construction { capability, source })?;
        self.register(instance)
    }

    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}
