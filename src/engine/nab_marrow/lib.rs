pub mod app;
pub mod timing;
pub mod hashing;

pub mod debugging;
