mod client;
mod models;
mod stream;

pub use client::OpenAiClient;
