pub mod connection;

pub use connection::{DbPool, init_pool};
