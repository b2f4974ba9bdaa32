//! Identity and session service for the Hirely job board.
//!
//! The server side issues signed session credentials at login, verifies them
//! on every protected request and gates routes by role. The client side
//! keeps the signed-in identity and decides where navigation may go.

pub mod api;
pub mod auth;
pub mod client;
pub mod db;
pub mod user;
