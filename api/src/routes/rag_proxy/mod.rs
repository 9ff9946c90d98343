pub mod rag_proxy_route;
