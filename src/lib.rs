//! Terminal map of pollution layers over Germany.
//!
//! Layers are declared in [`layers::registry`], composed into a
//! [`layers::MapModel`], and shown or hidden only through
//! [`visibility::VisibilityCoordinator`]. The legends and the layer switcher
//! read that state; neither writes it directly.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod legend;
pub mod logging;
pub mod map;
pub mod switcher;
pub mod ui;
pub mod visibility;
