//! Basic example declaring a small client with a GET and a POST method.
//!
//! This example shows how to:
//! - Describe methods with metadata, a template factory and a decoder
//! - Invoke them through the client
//! - Return the raw response instead of a decoded value
//!
//! Run with: `cargo run --example basic_call`

use declient::{
    Client, DefaultDecoder, Error, JsonDecoder, Level, MethodMetadata, RequestTemplate,
    ReturnType,
};
use http::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("declient=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .log_level(Level::Basic)
        .method::<u32, Post>(
            MethodMetadata::new("Posts#get", ReturnType::decoded::<Post>()),
            |id: &u32| RequestTemplate::new(Method::GET, format!("/posts/{id}")),
            JsonDecoder,
        )
        .method::<NewPost, Post>(
            MethodMetadata::new("Posts#create", ReturnType::decoded::<Post>()),
            |post: &NewPost| {
                let mut template = RequestTemplate::new(Method::POST, "/posts");
                if let Err(e) = template.json_body(post) {
                    tracing::error!(error = %e, "Could not serialize post");
                }
                template
            },
            JsonDecoder,
        )
        .method::<(), String>(
            MethodMetadata::new("Posts#list", ReturnType::Response),
            |_: &()| RequestTemplate::new(Method::GET, "/posts"),
            DefaultDecoder,
        )
        .build()?;

    println!("=== GET ===");
    if let Some(post) = client.invoke::<u32, Post>("Posts#get", &1).await?.into_decoded() {
        println!("Post ID: {}", post.id);
        println!("Title: {}", post.title);
        println!("Body: {}", post.body);
    }
    println!();

    println!("=== POST ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    if let Some(post) = client
        .invoke::<NewPost, Post>("Posts#create", &new_post)
        .await?
        .into_decoded()
    {
        println!("Created post ID: {}", post.id);
        println!("Title: {}", post.title);
    }
    println!();

    println!("=== Raw response ===");
    if let Some(mut response) = client
        .invoke::<(), String>("Posts#list", &())
        .await?
        .into_response()
    {
        let body = response.bytes().await.map_err(|e| {
            Error::ConfigurationError(format!("buffered body unreadable: {}", e))
        })?;
        println!("Status: {}", response.status());
        println!("Content-Type: {:?}", response.header("content-type"));
        println!("Body length: {} bytes", body.len());
    }

    Ok(())
}
