//! Per-user views: who am I, what targets me, what I administer

pub mod dto;
pub mod handler;
pub mod service;
