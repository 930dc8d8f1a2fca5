pub mod analyze;
pub mod monitor;
pub mod score;
