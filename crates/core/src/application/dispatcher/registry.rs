// Handler Registry

use crate::domain::Category;
use crate::port::JobHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// Mapping from category to the handler that runs its jobs
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Category, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration; a second handler for the same category
    /// replaces the first
    pub fn with(mut self, category: impl Into<Category>, handler: Arc<dyn JobHandler>) -> Self {
        self.insert(category, handler);
        self
    }

    pub fn insert(&mut self, category: impl Into<Category>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(category.into(), handler);
    }

    pub fn get(&self, category: &Category) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(category).cloned()
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.handlers.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut categories: Vec<&str> = self.handlers.keys().map(Category::as_str).collect();
        categories.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("categories", &categories)
            .finish()
    }
}
