pub mod portfolio;
pub mod records;
