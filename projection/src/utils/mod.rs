pub mod cancel;
pub mod clock;
pub mod config;
pub mod errors;
