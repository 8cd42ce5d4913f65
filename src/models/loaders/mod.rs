pub mod metadata_loader;
pub mod module_loader;

pub use metadata_loader::{load_metadata, METADATA_FILE};
pub use module_loader::{load_module, ModuleCatalog};
