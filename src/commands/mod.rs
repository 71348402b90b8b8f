pub mod convert;
pub mod mappings;
