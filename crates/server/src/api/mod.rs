pub mod error;
pub mod handlers;
pub mod legacy;
pub mod middleware;
pub mod print_jobs;
pub mod routes;
pub mod sales;
pub mod templates;
pub mod tickets;

pub use routes::create_router;
