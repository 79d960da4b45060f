//! Descriptor Registry - build each record type's descriptor once and reuse it.
//!
//! Descriptors are keyed by [`TypeId`] and shared as `Arc`s, so concurrent
//! readers of the same record type never rebuild or copy them.

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::schema::{Record, TypeDescriptor};

type Entry = Arc<dyn Any + Send + Sync>;

static GLOBAL: Lazy<DescriptorRegistry> = Lazy::new(DescriptorRegistry::new);

/// Thread-safe cache of type descriptors.
#[derive(Default)]
pub struct DescriptorRegistry {
    entries: RwLock<HashMap<TypeId, Entry>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by [`crate::Reader::new`].
    pub fn global() -> &'static DescriptorRegistry {
        &GLOBAL
    }

    /// Descriptor for `R`, built on first use.
    ///
    /// If two threads race on the first lookup both may build, but only
    /// the first insert is kept and every caller gets the same `Arc`.
    pub fn descriptor<R: Record>(&self) -> Arc<TypeDescriptor<R>> {
        let key = TypeId::of::<R>();

        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(found) = cached.and_then(|entry| entry.downcast::<TypeDescriptor<R>>().ok()) {
            return found;
        }

        let built: Entry = Arc::new(R::describe());
        tracing::debug!(record = std::any::type_name::<R>(), "Built type descriptor");

        let entry = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key).or_insert(built))
        };

        match entry.downcast::<TypeDescriptor<R>>() {
            Ok(descriptor) => descriptor,
            // Keys are TypeIds, so this arm is never taken.
            Err(_) => Arc::new(R::describe()),
        }
    }

    pub fn contains<R: Record>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
