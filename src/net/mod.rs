//! Requests, responses and the network seam

pub mod fetcher;
pub mod message;

pub use fetcher::{classify, Fetcher, HttpFetcher};
pub use message::{Body, Method, Request, RequestKey, Response, ResponseType};
