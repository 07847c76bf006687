pub mod batch;
pub mod transplant;
