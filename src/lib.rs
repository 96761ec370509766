// HarmonyHub - Practice exercise generation and AI music assistant
// Module declarations

pub mod assistant;
pub mod config;
pub mod exercise;
pub mod inference;
pub mod midi;
pub mod notation;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod state;
pub mod theory;
