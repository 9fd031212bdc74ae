mod default;
pub mod error;
pub mod factory;
pub mod hls_extractor;
pub mod platform_extractor;
pub mod platforms;
pub mod utils;

pub use default::{
    ClientOptions, DEFAULT_TIMEOUT, ProxyConfig, create_client, default_client, default_factory,
    factory_with_options,
};
