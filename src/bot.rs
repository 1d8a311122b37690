//! Text command surface for managing follows from a chat channel.

pub mod commands;
