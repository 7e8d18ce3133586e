//! Adapters exposing the service to the outside world.

pub mod http;
