pub mod admin;
pub mod auth;
pub mod calls;
pub mod dashboard;
pub mod health;
pub mod pending;
pub mod reservations;
pub mod webhook;
