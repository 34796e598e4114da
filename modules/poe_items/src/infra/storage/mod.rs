pub mod entity;
pub mod mapper;
pub mod seed;
