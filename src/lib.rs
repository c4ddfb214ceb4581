pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use db::CourseRepository;
pub use error::{AppError, AppResult};
