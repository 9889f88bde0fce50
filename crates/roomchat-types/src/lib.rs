pub mod api;
pub mod frame;
pub mod models;
