//! Route handlers organized by domain.

pub mod health;
pub mod pairs;
pub mod ws;
