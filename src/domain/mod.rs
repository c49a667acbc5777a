pub mod gestures;
pub mod measurement;
pub mod models;
pub mod settings;
