pub mod mapper;
pub mod state;
