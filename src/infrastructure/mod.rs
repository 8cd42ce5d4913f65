pub mod http_fetcher;
pub mod js_executor;
pub mod sandbox;

pub use http_fetcher::{ApiFetcher, HttpFetcher};
pub use js_executor::JsExecutor;
pub use sandbox::{ConsoleLine, Sandbox, SandboxLimits};
