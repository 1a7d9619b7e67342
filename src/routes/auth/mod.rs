mod handler;
mod model;

pub use handler::{callback, logout, session, start};
