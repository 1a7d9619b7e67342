mod handler;
mod model;

pub use handler::{create, list_by_company};
