pub mod module;
pub mod registry;
pub mod settings;
pub mod state;

pub use module::{Access, Module, RouteEntry, RouteSummary};
pub use registry::ModuleRegistry;
pub use state::AppState;
