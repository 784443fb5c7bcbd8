//! Durable storage for the commander.

pub mod db;
pub mod migrations;

pub use db::CommanderDb;
