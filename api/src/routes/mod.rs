pub mod health;
pub mod rag_proxy;
pub mod runs;
