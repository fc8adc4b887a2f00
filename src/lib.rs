#![doc = "swift-chunker: chunked large-object uploads for Swift-style object stores."]

//! Splits a large source file into bounded-size segments, uploads each segment
//! to a segment container, then commits a `multipart-manifest=put` manifest so
//! the store serves the segments as one logical object.
//!
//! # Usage
//! Drive [`upload::split_upload`] with a [`client::SwiftClient`] (or any other
//! [`client::ObjectStore`] implementation) and an upload configuration
//! ([`config::UploadConfig`]).

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod load_config;
pub mod manifest;
pub mod split;
pub mod upload;
