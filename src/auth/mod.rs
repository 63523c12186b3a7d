pub mod auth;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod verifier;
