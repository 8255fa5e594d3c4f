pub mod admin;
pub mod auth;
pub mod auths;
pub mod envelope;
pub mod health;
pub mod investor;
pub mod startup;
