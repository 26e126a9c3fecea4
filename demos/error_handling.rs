//! Example demonstrating error handling by phase.
//!
//! This example shows how to:
//! - Tell send, read, status and decode failures apart
//! - Access raw response data on errors
//! - Inspect HTTP status codes and headers
//! - Check if errors are retryable
//!
//! Run with: `cargo run --example error_handling`

use declient::{Client, Error, ErrorKind, JsonDecoder, MethodMetadata, RequestTemplate, ReturnType};
use http::Method;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct WrongSchema {
    nonexistent_field: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("declient=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .method::<u32, Post>(
            MethodMetadata::new("Posts#get", ReturnType::decoded::<Post>()),
            |id: &u32| RequestTemplate::new(Method::GET, format!("/posts/{id}")),
            JsonDecoder,
        )
        .method::<u32, WrongSchema>(
            MethodMetadata::new("Posts#getWrong", ReturnType::decoded::<WrongSchema>()),
            |id: &u32| RequestTemplate::new(Method::GET, format!("/posts/{id}")),
            JsonDecoder,
        )
        .build()?;

    println!("=== Example 1: Handling HTTP Errors ===");
    match client.invoke::<u32, Post>("Posts#get", &999_999).await {
        Ok(reply) => println!("Success: {:?}", reply.into_decoded()),
        Err(Error::Status {
            config_key,
            status,
            headers,
            body,
            ..
        }) => {
            println!("HTTP Error from {}!", config_key);
            println!("  Status: {}", status);
            println!("  Is client error (4xx): {}", status.is_client_error());
            println!("  Is server error (5xx): {}", status.is_server_error());
            println!("  Raw response: {}", body.as_deref().unwrap_or("<empty>"));
            println!("  Content-Type: {:?}", headers.get("content-type"));
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Handling Decode Errors ===");
    match client.invoke::<u32, WrongSchema>("Posts#getWrong", &1).await {
        Ok(reply) => println!("Unexpected success: {:?}", reply.into_decoded()),
        Err(e) if e.kind() == ErrorKind::Decode => {
            println!("Decode error (status {:?})", e.status());
            println!("  Error: {}", e);
            if let Some(raw) = e.raw_response() {
                let preview: String = raw.chars().take(80).collect();
                println!("  Raw response: {}...", preview);
            }
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Send Errors ===");
    let unreachable = Client::builder()
        .base_url("http://127.0.0.1:9")?
        .connect_timeout(Duration::from_millis(500))
        .method::<u32, Post>(
            MethodMetadata::new("Posts#get", ReturnType::decoded::<Post>()),
            |id: &u32| RequestTemplate::new(Method::GET, format!("/posts/{id}")),
            JsonDecoder,
        )
        .build()?;

    match unreachable.invoke::<u32, Post>("Posts#get", &1).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => {
            println!("Kind: {}", e.kind());
            println!("  Retryable: {}", e.is_retryable());
            if let Some(request) = e.request() {
                println!("  Request: {} {}", request.method(), request.url());
            }
            if let Some(elapsed) = e.elapsed() {
                println!("  Failed after: {:?}", elapsed);
            }
        }
    }

    Ok(())
}
