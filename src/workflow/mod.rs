pub mod pagination;

pub use pagination::{
    ModuleRun, PaginationDriver, PaginationPolicy, PreparedModule, Seed, StopReason,
};
