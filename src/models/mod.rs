pub mod extraction;
pub mod loaders;
pub mod metadata;
pub mod module_source;
pub mod request_spec;

pub use extraction::{ExtractionResult, RESULT_CONTAINER_ID};
pub use loaders::{load_metadata, load_module, ModuleCatalog};
pub use metadata::ProjectMetadata;
pub use module_source::{ModuleKind, ModuleSource};
pub use request_spec::RequestSpec;
