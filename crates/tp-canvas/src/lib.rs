//! # tp-canvas: the drawing core of termpaint
//!
//! - **[`palette`]**: the 15 paintable colors
//! - **[`plane`]**: `Point`, the stored `Cell`, and the unbounded sparse `Plane`
//! - **[`viewport`]**: the screen window onto the plane, with panning
//! - **[`tool`]**: tip catalog, `Mode` and `ToolState`
//! - **[`compositor`]**: what a stroke does to the cell it lands on
//! - **[`strip`]**: the options strip layout and its hit boxes
//! - **[`render`]**: border, canvas and strip painted into a frame buffer
//! - **[`export`]**: the visible canvas saved as a numbered text file
//! - **[`session`]**: one user's canvas, routing input events to all of the above
//!
//! Nothing here touches a real terminal or socket; `tp-term` types carry
//! events in and frames out.

pub mod compositor;
pub mod export;
pub mod palette;
pub mod plane;
pub mod render;
pub mod session;
pub mod strip;
pub mod tool;
pub mod viewport;
