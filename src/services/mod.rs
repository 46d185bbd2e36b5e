pub mod catalog;
pub mod dashboard;

pub use catalog::{CatalogService, CategoryPage, CourseCard, CourseDetail};
pub use dashboard::{CategoryForm, CourseForm, Dashboard, Modal, ModalMode};
