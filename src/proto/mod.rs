//! Backend wire messages.

pub mod vllm;
