//! Route modules for the Filechest server

pub mod files;
pub mod health;
pub mod public;
pub mod upload;
