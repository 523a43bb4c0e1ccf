pub mod obj;

pub use obj::omit;
