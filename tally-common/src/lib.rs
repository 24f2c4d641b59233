pub mod api;
pub mod domain;
mod lenient;
pub mod utils;
