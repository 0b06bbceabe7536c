//! # UI Module
//!
//! This module contains the UI components of the Pitchscope application.

pub mod main_display;
pub mod surface;
