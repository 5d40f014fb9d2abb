pub mod app;
pub mod catalog;
pub mod config;
pub mod library;
pub mod models;
pub mod tmdb;
