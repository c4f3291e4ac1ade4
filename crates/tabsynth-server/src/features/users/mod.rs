pub mod commands;
pub mod routes;

pub use commands::{RegisterUserCommand, RegisterUserError, RegisterUserResponse};

pub use routes::users_routes;
