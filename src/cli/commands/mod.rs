pub mod cursor;
pub mod server;
pub mod token;
