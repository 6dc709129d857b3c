pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::entities;
pub use domain::ports;
pub use domain::value_objects;
pub use application::services;
pub use application::use_cases;
pub use infrastructure::parsers;
