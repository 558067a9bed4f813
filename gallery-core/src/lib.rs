pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod models;
pub mod mutation;
pub mod notice;
pub mod paths;
pub mod render;
pub mod runtime;
pub mod service;
pub mod store;
pub mod tags;
pub mod task;
pub mod theme;
