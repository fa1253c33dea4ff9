pub mod assets;
pub mod auth;
pub mod email;
pub mod store;
pub mod tokens;
pub mod users;
