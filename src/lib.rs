//! Dixit against AI image generators
//!
//! The player writes a prompt, several generation models of one provider
//! illustrate it, and a vision model judges which image fits best. Fireworks,
//! Together, BaseTen, Amazon Bedrock and Google Vertex sit behind the same
//! generation and evaluation traits.

pub mod ai;
pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod prompts;
pub mod registry;
pub mod server;

pub use error::{Error, Result};
