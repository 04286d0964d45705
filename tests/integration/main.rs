//! Integration tests for shellcache

mod cli;
mod lifecycle;
