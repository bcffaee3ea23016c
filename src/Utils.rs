pub mod logger;
pub mod plots;
