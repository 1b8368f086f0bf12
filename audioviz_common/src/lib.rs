//! audioviz common library
//!
//! Protocol constants, the frame wire layout and configuration loading shared
//! by every process that touches the audioviz shared-memory channel. Nothing
//! in this crate opens an OS resource.
//!
//! # Module Structure
//!
//! - [`consts`] - Names, sizes and the magic number of the protocol
//! - [`frame`] - `FrameHeader` / `Frame` layout with compile-time size checks
//! - [`config`] - TOML configuration loading
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! viz = { package = "audioviz_common", path = "../audioviz_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use audioviz_common::consts::*;
//! use audioviz_common::frame::{Frame, FrameHeader};
//! ```

pub mod config;
pub mod consts;
pub mod frame;
pub mod prelude;
