pub mod handlers;
pub mod middleware;
pub mod print;
pub mod routes;

pub use routes::create_router;
