pub mod category;
pub mod course;

pub use category::{Category, NewCategoryRequest};
pub use course::{Course, CourseDraft, CourseWithCategory};
