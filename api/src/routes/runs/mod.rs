pub mod runs_request;
pub mod runs_route;
