pub mod metadata;
pub mod transcript;
pub mod wav;
