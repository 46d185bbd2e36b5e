use serde::{Deserialize, Serialize};

use super::Category;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub image_url: String,
    pub category_id: String,
    pub checkout_url: String,
    /// `;`-delimited list of benefit statements.
    pub benefits: String,
}

/// Course fields as submitted by the admin forms, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    pub image_url: String,
    pub category_id: String,
    pub checkout_url: String,
    #[serde(default)]
    pub benefits: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseWithCategory {
    #[serde(flatten)]
    pub course: Course,
    pub category: Category,
}

impl Course {
    /// Whole-percent discount of `price` against `original_price`, or 0 when
    /// there is no higher original price.
    pub fn discount_percent(&self) -> u32 {
        match self.original_price {
            Some(original) if original > self.price => {
                (((original - self.price) / original) * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.discount_percent() > 0
    }

    pub fn benefit_list(&self) -> Vec<String> {
        split_benefits(&self.benefits)
    }

    pub fn draft(&self) -> CourseDraft {
        CourseDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            original_price: self.original_price,
            image_url: self.image_url.clone(),
            category_id: self.category_id.clone(),
            checkout_url: self.checkout_url.clone(),
            benefits: self.benefits.clone(),
        }
    }
}

impl CourseDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Course name is required".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::BadRequest("Price must be a non-negative amount".to_string()));
        }
        if let Some(original) = self.original_price {
            if !original.is_finite() || original < 0.0 {
                return Err(AppError::BadRequest(
                    "Original price must be a non-negative amount".to_string(),
                ));
            }
        }
        if self.category_id.trim().is_empty() {
            return Err(AppError::BadRequest("Category is required".to_string()));
        }
        Ok(())
    }

    pub fn with_id(self, id: impl Into<String>) -> Course {
        Course {
            id: id.into(),
            name: self.name,
            description: self.description,
            price: self.price,
            original_price: self.original_price,
            image_url: self.image_url,
            category_id: self.category_id,
            checkout_url: self.checkout_url,
            benefits: self.benefits,
        }
    }
}

pub fn split_benefits(benefits: &str) -> Vec<String> {
    benefits
        .split(';')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(price: f64, original_price: Option<f64>) -> Course {
        Course {
            id: "1".to_string(),
            name: "Oratória".to_string(),
            description: "Fale em público".to_string(),
            price,
            original_price,
            image_url: "https://img.example/1.png".to_string(),
            category_id: "2".to_string(),
            checkout_url: "https://pay.example/1".to_string(),
            benefits: "Foco ; Disciplina; ;".to_string(),
        }
    }

    #[test]
    fn test_discount_percent_rounds() {
        assert_eq!(course(97.0, Some(197.0)).discount_percent(), 51);
        assert_eq!(course(50.0, Some(200.0)).discount_percent(), 75);
        assert_eq!(course(2.0, Some(3.0)).discount_percent(), 33);
    }

    #[test]
    fn test_no_discount_without_higher_original_price() {
        assert_eq!(course(97.0, None).discount_percent(), 0);
        assert_eq!(course(97.0, Some(97.0)).discount_percent(), 0);
        assert_eq!(course(97.0, Some(50.0)).discount_percent(), 0);
        assert!(!course(97.0, Some(50.0)).has_discount());
    }

    #[test]
    fn test_benefit_list_drops_blank_segments() {
        assert_eq!(course(1.0, None).benefit_list(), vec!["Foco", "Disciplina"]);
        assert_eq!(split_benefits(";; Foco;Disciplina  ;"), vec!["Foco", "Disciplina"]);
        assert!(split_benefits("").is_empty());
    }

    #[test]
    fn test_draft_with_id_restores_course() {
        let original = course(10.0, Some(20.0));
        assert_eq!(original.draft().with_id("1"), original);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let valid = course(10.0, Some(20.0)).draft();
        assert!(valid.validate().is_ok());

        let nameless = CourseDraft { name: "  ".to_string(), ..valid.clone() };
        assert!(matches!(nameless.validate(), Err(AppError::BadRequest(_))));

        let negative = CourseDraft { price: -1.0, ..valid.clone() };
        assert!(negative.validate().is_err());

        let orphan = CourseDraft { category_id: String::new(), ..valid };
        assert!(orphan.validate().is_err());
    }

    #[test]
    fn test_course_with_category_serializes_flat_camel_case() {
        let joined = CourseWithCategory {
            course: course(10.0, None),
            category: Category { id: "2".to_string(), name: "Comunicação".to_string() },
        };
        let value = serde_json::to_value(&joined).expect("serialize");
        assert_eq!(value["categoryId"], "2");
        assert_eq!(value["imageUrl"], "https://img.example/1.png");
        assert_eq!(value["category"]["name"], "Comunicação");
        assert!(value.get("originalPrice").is_none());
    }
}
