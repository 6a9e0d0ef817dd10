#![allow(non_snake_case)]

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod runtime;
pub mod service;
pub mod store;
pub mod tasks;
pub mod timefmt;
