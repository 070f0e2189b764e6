//! Integration tests for epicenter-markdown.

mod helpers;
mod materialization;
mod pull_from_markdown;
