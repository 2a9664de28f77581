pub mod backoff;
pub mod engine;
pub mod fetch;
pub mod manifest;
pub mod paths;
pub mod plan;
pub mod watermark;
