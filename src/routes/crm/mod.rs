mod handler;
mod model;

pub use handler::{list_companies, sync_company};
