pub mod backend_config;
pub mod backend_key;
