//! Dashboard Common
//!
//! Pieces shared by every dashboard binary.

pub mod logging;
