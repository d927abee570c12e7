pub mod dto;
pub mod entity;
pub mod error;
pub mod handler;
pub mod model;
pub mod result;
pub mod service;
