pub mod extractor;
pub mod permissions;
