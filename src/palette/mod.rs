pub mod cluster;
pub mod color;
pub mod derive;
pub mod generate;
