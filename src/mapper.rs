//! Translation between the hosted table rows (snake_case, integer keys) and
//! the application models (camelCase, string ids).

use crate::error::AppError;
use crate::models::{Category, Course, CourseDraft, CourseWithCategory};
use crate::remote::dto::{CategoryRow, CategoryWrite, CourseRow, CourseWrite};

pub fn category_from_external(row: &CategoryRow) -> Category {
    Category {
        id: row.id.to_string(),
        name: row.name.clone(),
    }
}

pub fn category_to_external(name: &str) -> CategoryWrite {
    CategoryWrite {
        name: name.to_string(),
    }
}

/// Maps a course row, ignoring any embedded category. Write responses take this path.
pub fn course_from_external(row: &CourseRow) -> Course {
    Course {
        id: row.id.to_string(),
        name: row.name.clone(),
        description: row.description.clone(),
        price: row.price,
        original_price: row.original_price,
        image_url: row.image_url.clone(),
        category_id: row.category_id.to_string(),
        checkout_url: row.checkout_url.clone(),
        benefits: row.benefits.clone(),
    }
}

pub fn course_with_category_from_external(row: &CourseRow) -> Result<CourseWithCategory, AppError> {
    let category = row.categories.as_ref().ok_or_else(|| {
        AppError::Remote(format!(
            "Course {} has no category {} joined",
            row.id, row.category_id
        ))
    })?;

    Ok(CourseWithCategory {
        course: course_from_external(row),
        category: category_from_external(category),
    })
}

pub fn course_to_external(draft: &CourseDraft) -> Result<CourseWrite, AppError> {
    Ok(CourseWrite {
        name: draft.name.clone(),
        description: draft.description.clone(),
        price: draft.price,
        original_price: draft.original_price,
        image_url: draft.image_url.clone(),
        category_id: parse_key(&draft.category_id)?,
        checkout_url: draft.checkout_url.clone(),
        benefits: draft.benefits.clone(),
    })
}

/// Converts a string id back into the table's integer key.
pub fn parse_key(id: &str) -> Result<i64, AppError> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("Invalid id: {:?}", id)))
}
