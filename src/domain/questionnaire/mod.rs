pub mod dto;
pub mod entity;
pub mod error;
pub mod handler;
pub mod model;
pub mod reminder;
pub mod service;
pub mod target;
pub mod validation;
