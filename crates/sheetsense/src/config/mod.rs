pub mod loader;
pub mod schema;
pub mod secrets;

pub use loader::{load_config, load_config_from_str};
pub use schema::{CodegenConfig, CompletionConfig, Config, RasterConfig};
pub use secrets::resolve_secret;
