pub mod books;
pub mod comments;
pub mod health;

use bookshare_kernel::ModuleRegistry;

/// Register every module with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(health::create_module());
    registry.register(books::create_module());
    registry.register(comments::create_module());
}
