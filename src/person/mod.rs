//! Person records for loss cases and their loading

mod data;
pub mod loader;

pub use data::{PersonRecord, Sex, EducationLevel, EmploymentStatus, MAX_AGE};
pub use loader::{load_person_json, load_persons, load_persons_from_reader};
