// Configuration loading

pub mod ai;
pub mod credentials;
pub mod secrets;
pub mod settings;
