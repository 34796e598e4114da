pub mod entity;
pub mod mapper;
