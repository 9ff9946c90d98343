pub mod rag_backend_service;
