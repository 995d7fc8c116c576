//! Data models for bundle-toolkit

pub mod components;

pub use components::ParsedComponents;
