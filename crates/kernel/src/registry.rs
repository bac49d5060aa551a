use std::collections::HashSet;
use std::sync::Arc;

use anyhow::bail;

use crate::module::{Module, RouteSummary};

/// Holds every module in registration order.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        tracing::debug!(module = module.name(), "module registered");
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Flattened routing table across all modules.
    pub fn route_table(&self) -> Vec<RouteSummary> {
        self.modules
            .iter()
            .flat_map(|module| {
                let name = module.name();
                module
                    .routes()
                    .into_iter()
                    .map(move |entry| entry.summary(name))
            })
            .collect()
    }

    /// Reject duplicate module names and duplicate method/path pairs.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut names = HashSet::new();
        for module in &self.modules {
            if !names.insert(module.name()) {
                bail!("module '{}' registered twice", module.name());
            }
        }

        let mut seen = HashSet::new();
        for route in self.route_table() {
            if !seen.insert((route.method.clone(), route.path)) {
                bail!(
                    "route {} {} declared twice (last by module '{}')",
                    route.method,
                    route.path,
                    route.module
                );
            }
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Access, RouteEntry};

    struct TestModule {
        name: &'static str,
        path: &'static str,
    }

    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn routes(&self) -> Vec<RouteEntry> {
            vec![
                RouteEntry::get(self.path, Access::Public, || async { "read" }),
                RouteEntry::post(self.path, Access::Authenticated, || async { "write" }),
            ]
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
        assert!(registry.route_table().is_empty());
    }

    #[test]
    fn test_route_table_keeps_access_classes() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "test",
            path: "/things",
        }));

        let table = registry.route_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].method, "GET");
        assert_eq!(table[0].access, Access::Public);
        assert_eq!(table[1].method, "POST");
        assert_eq!(table[1].access, Access::Authenticated);
        assert!(registry.get_module("test").is_some());
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_duplicate_routes_are_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "first",
            path: "/things",
        }));
        registry.register(Arc::new(TestModule {
            name: "second",
            path: "/things",
        }));

        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("GET /things"));
    }

    #[test]
    fn test_duplicate_module_names_are_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "same",
            path: "/a",
        }));
        registry.register(Arc::new(TestModule {
            name: "same",
            path: "/b",
        }));

        assert!(registry.validate().is_err());
    }
}
