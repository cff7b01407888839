use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::traits::ScrapeModule;

type ModuleFactory = Box<dyn Fn() -> Box<dyn ScrapeModule> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("module descriptor has an empty name")]
    EmptyName,

    #[error("module '{0}' is already registered")]
    DuplicateName(String),
}

/// A registered, not-yet-instantiated module: a stable name plus a
/// zero-argument factory the engine invokes once per run.
pub struct ModuleDescriptor {
    name: String,
    factory: ModuleFactory,
}

impl ModuleDescriptor {
    /// Descriptor for a module type constructible without arguments.
    pub fn of<M>() -> Self
    where
        M: ScrapeModule + Default + 'static,
    {
        let type_name = std::any::type_name::<M>();
        let name = type_name.rsplit("::").next().unwrap_or(type_name);
        Self {
            name: name.to_string(),
            factory: Box::new(|| Box::new(M::default())),
        }
    }

    /// Descriptor with an explicit name; the factory may capture whatever
    /// configuration the instances it builds should carry.
    pub fn from_factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ScrapeModule> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instantiate(&self) -> Box<dyn ScrapeModule> {
        (self.factory)()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

/// Validate a registration batch against already-queued names. Nothing may
/// be enqueued unless the whole batch passes.
pub(crate) fn validate_batch<'a>(
    batch: &[ModuleDescriptor],
    queued: impl IntoIterator<Item = &'a str>,
) -> Result<(), RegistrationError> {
    let mut seen: HashSet<String> = queued.into_iter().map(str::to_string).collect();
    for descriptor in batch {
        if descriptor.name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if !seen.insert(descriptor.name.clone()) {
            return Err(RegistrationError::DuplicateName(descriptor.name.clone()));
        }
    }
    Ok(())
}
