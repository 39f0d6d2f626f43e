pub mod fields;
pub mod model;
pub mod record;
pub mod repository;
pub mod service;
pub mod validation;
