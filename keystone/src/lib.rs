//! Application bootstrapping based on [keystone_di] service providers.
//!
//! Applications are composed of modules, each being a service provider registering a group of
//! related services. This crate provides the entrypoint which collects those modules, activates
//! them in dependency order and configures additional supporting infrastructure, e.g. logging, in
//! the form of [App](application::App) and the [module loader](loader).

pub mod application;
pub mod config;
pub mod loader;
