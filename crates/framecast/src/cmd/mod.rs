//! Command implementations for the framecast CLI

pub mod listen;
pub mod synth;
