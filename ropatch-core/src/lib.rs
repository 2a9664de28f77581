mod server;

pub use server::{FetchClass, PatchServer, ServerError};
