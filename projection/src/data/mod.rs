pub mod investment;
pub mod options;
pub mod projection;
