pub mod files;
pub mod webapp;
