pub mod campaign;
pub mod tenant;
