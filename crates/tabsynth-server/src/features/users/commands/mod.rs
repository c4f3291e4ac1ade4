pub mod register;

pub use register::{RegisterUserCommand, RegisterUserError, RegisterUserResponse};
