//! vLLM generation service messages (`vllm.grpc.engine` package).
//!
//! Generated at build time from `proto/vllm_engine.proto`. Only the message
//! types are emitted; the gateway owns the transport.

include!(concat!(env!("OUT_DIR"), "/vllm.grpc.engine.rs"));
