pub mod mapper;
pub mod synthesize;
pub mod value;
