pub mod error;
pub mod msg;
pub mod option;


pub type Result<T> = std::result::Result<T, error::Error>;
