pub mod content_acquirer;
pub mod html_wrapper;
pub mod logic_injector;
pub mod module_splitter;
pub mod request_evaluator;

pub use content_acquirer::{AcquiredContent, AcquisitionMode, ContentAcquirer};
pub use logic_injector::LogicInjector;
pub use module_splitter::{split, SplitModule, LOGIC_MARKER};
pub use request_evaluator::{EvaluatedRequest, RequestEvaluator};
