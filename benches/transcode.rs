//! Benchmarks for request transcoding and usage extraction
//!
//! This benchmark measures:
//! - OpenAI JSON to vLLM `GenerateRequest` transcoding by conversation length
//! - Pass-through JSON parsing for the same bodies
//! - Protobuf response decoding for usage

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prost::Message as _;
use std::collections::HashMap;

use ai_payload_rust::proto::vllm::{generate_response, GenerateComplete, GenerateResponse};
use ai_payload_rust::{OpenAiParser, Parser, VllmGrpcParser};

fn chat_body(turns: usize) -> Vec<u8> {
    let messages: Vec<_> = (0..turns)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            serde_json::json!({
                "role": role,
                "content": format!("Message number {} with some representative text.", i),
            })
        })
        .collect();
    serde_json::json!({
        "model": "llama-3-8b",
        "messages": messages,
        "max_tokens": 256,
        "temperature": 0.7,
        "top_p": 0.95,
        "stop": ["</s>", "<|eot_id|>"]
    })
    .to_string()
    .into_bytes()
}

fn bench_parse_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_request");
    let headers = HashMap::from([("x-request-id".to_string(), "bench".to_string())]);
    let vllm = VllmGrpcParser::new();
    let openai = OpenAiParser::new();

    for turns in [1usize, 10, 100] {
        let body = chat_body(turns);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::new("vllm_grpc", turns), &body, |b, body| {
            b.iter(|| vllm.parse_request(black_box(&headers), black_box(body)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("openai", turns), &body, |b, body| {
            b.iter(|| openai.parse_request(black_box(&headers), black_box(body)).unwrap())
        });
    }
    group.finish();
}

fn bench_parse_response(c: &mut Criterion) {
    let parser = VllmGrpcParser::new();
    let body = GenerateResponse {
        response: Some(generate_response::Response::Complete(GenerateComplete {
            output_ids: (0..512).collect(),
            finish_reason: "stop".to_string(),
            prompt_tokens: 128,
            completion_tokens: 512,
            cached_tokens: 0,
        })),
    }
    .encode_to_vec();

    c.bench_function("vllm_grpc_parse_response", |b| {
        b.iter(|| parser.parse_response(black_box(&body)).unwrap())
    });
}

criterion_group!(benches, bench_parse_request, bench_parse_response);
criterion_main!(benches);
