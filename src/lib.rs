//! fizzboxd - Posts digests of followed Letterboxd diaries to Discord channels.
//!
//! This crate provides:
//! - Diary feed fetching and entry extraction
//! - Follow bookkeeping with per-destination delivery history
//! - A polling task that renders new entries into digests and delivers them

pub mod bot;
pub mod config;
pub mod delivery;
pub mod digest;
pub mod entity;
pub mod error;
pub mod feed;
pub mod logging;
pub mod repository;
pub mod service;
pub mod task;
