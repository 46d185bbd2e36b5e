pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod mapper;
pub mod models;
pub mod remote;
pub mod repository;
pub mod services;
pub mod session;
pub mod state;
