//! Core types, errors, and collaborator traits for the beacon collector.

pub mod dao;
pub mod error;
pub mod events;
pub mod subscription;

pub use dao::DataAccess;
pub use error::{DbErrorCode, Error, Result};
pub use events::*;
pub use subscription::*;
