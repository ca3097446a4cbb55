mod traits;
mod openrouter;
pub mod catalog;

pub use traits::*;
pub use openrouter::{interpret_success_body, OpenRouterClient};
pub use catalog::{default_models, is_default_model, ModelCatalog, ModelDescriptor};
