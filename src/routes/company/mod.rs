mod handler;
mod model;

pub use handler::{create, find_by_id, list};
pub use model::Company;
