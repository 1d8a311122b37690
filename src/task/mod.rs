//! Background tasks.

pub mod diary_feed_publisher;
