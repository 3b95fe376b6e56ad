//! Terminal choropleth of municipalities.
//!
//! Boundaries are drawn as a cell-filled map with Braille outlines. A
//! municipality is selected from a dropdown or by clicking its polygon, and
//! its attribute row is shown in a details panel.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod input;
pub mod map;
pub mod selection;
pub mod telemetry;
pub mod ui;
