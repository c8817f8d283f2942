pub mod answers;
pub mod fixed;
