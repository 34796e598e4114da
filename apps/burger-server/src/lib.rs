//! Backend Burger server: wires the application context, HTTP surface and
//! periodic jobs for the `burger-server` binary.

pub mod app;
pub mod jobs;
pub mod middleware;
pub mod shutdown;
