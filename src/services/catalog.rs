use std::sync::Arc;

use serde::Serialize;

use crate::error::AppError;
use crate::models::{Category, CourseWithCategory};
use crate::remote::RemoteTables;
use crate::repository;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCard {
    #[serde(flatten)]
    pub course: CourseWithCategory,
    pub discount_percent: u32,
    pub price_label: String,
    /// Only set when a discount badge is shown.
    pub original_price_label: Option<String>,
}

impl From<CourseWithCategory> for CourseCard {
    fn from(course: CourseWithCategory) -> Self {
        let discount_percent = course.course.discount_percent();
        let original_price_label = match course.course.original_price {
            Some(original) if discount_percent > 0 => Some(format_brl(original)),
            _ => None,
        };

        Self {
            price_label: format_brl(course.course.price),
            discount_percent,
            original_price_label,
            course,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub card: CourseCard,
    pub benefit_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub categories: Vec<Category>,
    pub selected: Option<Category>,
    pub courses: Vec<CourseCard>,
}

/// Read-only views behind the public storefront pages.
pub struct CatalogService {
    remote: Arc<dyn RemoteTables>,
}

impl CatalogService {
    pub fn new(remote: Arc<dyn RemoteTables>) -> Self {
        Self { remote }
    }

    pub async fn home(&self) -> Result<Vec<CourseCard>, AppError> {
        let courses = repository::list_courses_with_category(self.remote.as_ref()).await?;
        Ok(courses.into_iter().map(CourseCard::from).collect())
    }

    /// All categories, plus the courses of `category_id` when one is selected.
    pub async fn category_page(&self, category_id: Option<&str>) -> Result<CategoryPage, AppError> {
        let categories = repository::list_categories(self.remote.as_ref()).await?;

        let Some(category_id) = category_id else {
            return Ok(CategoryPage {
                categories,
                selected: None,
                courses: Vec::new(),
            });
        };

        let courses = repository::list_courses_with_category(self.remote.as_ref())
            .await?
            .into_iter()
            .filter(|c| c.course.category_id == category_id)
            .map(CourseCard::from)
            .collect();
        let selected = categories.iter().find(|c| c.id == category_id).cloned();

        Ok(CategoryPage {
            categories,
            selected,
            courses,
        })
    }

    pub async fn course_detail(&self, id: &str) -> Result<Option<CourseDetail>, AppError> {
        let course = repository::get_course(self.remote.as_ref(), id).await?;

        Ok(course.map(|course| {
            let benefit_list = course.course.benefit_list();
            CourseDetail {
                card: CourseCard::from(course),
                benefit_list,
            }
        }))
    }
}

/// Renders an amount as Brazilian reais, e.g. `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (integer, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, cents)
}
