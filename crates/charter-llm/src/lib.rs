//! LLM provider abstraction for charter
//!
//! Every backend implements [`ProviderClient`]. The pipeline never names a
//! concrete backend; it asks [`ProviderSelector`] for one per call.

mod http_client;
mod local_backend;
mod remote_backend;
mod selector;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use charter_utils::error::LlmError;
pub use local_backend::LocalBackend;
pub use remote_backend::RemoteBackend;
pub use selector::{HealthReport, ProviderSelector, SelectedProvider, SelectionReason};
pub use types::{GenerationParams, ProviderClient, generate_with_timeout};
