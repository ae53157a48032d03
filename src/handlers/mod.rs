pub mod admin;
pub mod generate;
pub mod simplify;

pub use admin::{delete_parent, list_parents, register_parent, reset_password};
pub use generate::generate_paragraph;
pub use simplify::simplify_word;
