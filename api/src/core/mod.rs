pub mod app_state;
pub mod http;
pub mod proxy_translator;
