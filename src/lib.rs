// Módulos de la aplicación
pub mod api;
pub mod app_state;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod models;
pub mod rules;
