use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::error::AppError;
use crate::models::{Category, Course, CourseDraft, CourseWithCategory};
use crate::remote::RemoteTables;
use crate::repository;

/// Working buffer of the course form. Numbers stay optional until submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseForm {
    pub name: String,
    pub description: String,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub image_url: String,
    pub category_id: String,
    pub checkout_url: String,
    pub benefits: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryForm {
    pub name: String,
}

impl CourseForm {
    pub fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            description: course.description.clone(),
            price: Some(course.price),
            original_price: course.original_price,
            image_url: course.image_url.clone(),
            category_id: course.category_id.clone(),
            checkout_url: course.checkout_url.clone(),
            benefits: course.benefits.clone(),
        }
    }

    /// Applies raw text input to the field named as in the course JSON shape.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), AppError> {
        match field {
            "name" => self.name = value.to_string(),
            "description" => self.description = value.to_string(),
            "price" => self.price = parse_amount(field, value)?,
            "originalPrice" => self.original_price = parse_amount(field, value)?,
            "imageUrl" => self.image_url = value.to_string(),
            "categoryId" => self.category_id = value.to_string(),
            "checkoutUrl" => self.checkout_url = value.to_string(),
            "benefits" => self.benefits = value.to_string(),
            _ => return Err(AppError::BadRequest(format!("Unknown course field: {}", field))),
        }
        Ok(())
    }

    pub fn to_draft(&self) -> Result<CourseDraft, AppError> {
        let price = self
            .price
            .ok_or_else(|| AppError::BadRequest("Price is required".to_string()))?;

        let draft = CourseDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            price,
            original_price: self.original_price,
            image_url: self.image_url.clone(),
            category_id: self.category_id.clone(),
            checkout_url: self.checkout_url.clone(),
            benefits: self.benefits.clone(),
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// Empty input is an absent amount, never zero.
fn parse_amount(field: &str, value: &str) -> Result<Option<f64>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(Some(amount)),
        _ => Err(AppError::BadRequest(format!(
            "{} must be a number, got {:?}",
            field, value
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    AddCourse,
    EditCourse,
    AddCategory,
    EditCategory,
}

impl ModalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalMode::AddCourse => "add-course",
            ModalMode::EditCourse => "edit-course",
            ModalMode::AddCategory => "add-category",
            ModalMode::EditCategory => "edit-category",
        }
    }
}

impl fmt::Display for ModalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dashboard's single shared form. Edit variants carry the target id.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Modal {
    #[default]
    Closed,
    AddCourse(CourseForm),
    EditCourse { id: String, form: CourseForm },
    AddCategory(CategoryForm),
    EditCategory { id: String, form: CategoryForm },
}

impl Modal {
    pub fn mode(&self) -> Option<ModalMode> {
        match self {
            Modal::Closed => None,
            Modal::AddCourse(_) => Some(ModalMode::AddCourse),
            Modal::EditCourse { .. } => Some(ModalMode::EditCourse),
            Modal::AddCategory(_) => Some(ModalMode::AddCategory),
            Modal::EditCategory { .. } => Some(ModalMode::EditCategory),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::Closed)
    }
}

/// Admin dashboard state: the loaded lists plus the open form, if any.
///
/// Every write goes to the remote tables and is followed by a full reload;
/// local lists are never patched in place.
pub struct Dashboard {
    remote: Arc<dyn RemoteTables>,
    courses: Vec<CourseWithCategory>,
    categories: Vec<Category>,
    modal: Modal,
}

impl Dashboard {
    pub fn new(remote: Arc<dyn RemoteTables>) -> Self {
        Self {
            remote,
            courses: Vec::new(),
            categories: Vec::new(),
            modal: Modal::Closed,
        }
    }

    pub fn courses(&self) -> &[CourseWithCategory] {
        &self.courses
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn title(&self) -> &'static str {
        match self.modal.mode() {
            Some(ModalMode::AddCourse) => "Add new course",
            Some(ModalMode::EditCourse) => "Edit course",
            Some(ModalMode::AddCategory) => "Add new category",
            Some(ModalMode::EditCategory) => "Edit category",
            None => "",
        }
    }

    /// Fetches both lists concurrently and replaces the local copies.
    pub async fn load(&mut self) -> Result<(), AppError> {
        let remote = self.remote.as_ref();
        let (courses, categories) = tokio::try_join!(
            repository::list_courses_with_category(remote),
            repository::list_categories(remote),
        )
        .inspect_err(|e| error!("failed to load dashboard data: {}", e))?;

        self.courses = courses;
        self.categories = categories;
        Ok(())
    }

    /// Manual reload. The open form, if any, is kept.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        info!("reloading dashboard data");
        self.load().await
    }

    pub fn open_add_course(&mut self) {
        self.modal = Modal::AddCourse(CourseForm::default());
    }

    pub fn open_add_category(&mut self) {
        self.modal = Modal::AddCategory(CategoryForm::default());
    }

    pub fn open_edit_course(&mut self, id: &str) -> Result<(), AppError> {
        let joined = self
            .courses
            .iter()
            .find(|c| c.course.id == id)
            .ok_or(AppError::NotFound)?;

        self.modal = Modal::EditCourse {
            id: joined.course.id.clone(),
            form: CourseForm::from_course(&joined.course),
        };
        Ok(())
    }

    pub fn open_edit_category(&mut self, id: &str) -> Result<(), AppError> {
        let category = self
            .categories
            .iter()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound)?;

        self.modal = Modal::EditCategory {
            id: category.id.clone(),
            form: CategoryForm {
                name: category.name.clone(),
            },
        };
        Ok(())
    }

    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), AppError> {
        match &mut self.modal {
            Modal::Closed => Err(AppError::BadRequest("No form is open".to_string())),
            Modal::AddCourse(form) | Modal::EditCourse { form, .. } => form.set_field(field, value),
            Modal::AddCategory(form) | Modal::EditCategory { form, .. } => match field {
                "name" => {
                    form.name = value.to_string();
                    Ok(())
                }
                _ => Err(AppError::BadRequest(format!(
                    "Unknown category field: {}",
                    field
                ))),
            },
        }
    }

    pub fn cancel(&mut self) {
        self.modal = Modal::Closed;
    }

    /// Saves the open form. On failure the form stays open with its input intact.
    pub async fn submit(&mut self) -> Result<(), AppError> {
        let mode = self.modal.mode();
        if let Err(e) = self.save().await {
            error!("failed to save {:?}: {}", mode, e);
            return Err(e);
        }

        self.modal = Modal::Closed;
        self.load().await
    }

    async fn save(&self) -> Result<(), AppError> {
        let remote = self.remote.as_ref();

        match &self.modal {
            Modal::Closed => return Err(AppError::BadRequest("No form is open".to_string())),
            Modal::AddCourse(form) => {
                repository::add_course(remote, &form.to_draft()?).await?;
            }
            Modal::EditCourse { id, form } => {
                repository::update_course(remote, id, &form.to_draft()?).await?;
            }
            Modal::AddCategory(form) => {
                repository::add_category(remote, &form.name).await?;
            }
            Modal::EditCategory { id, form } => {
                repository::update_category(remote, id, &form.name).await?;
            }
        }
        Ok(())
    }

    pub async fn delete_course(&mut self, id: &str) -> Result<(), AppError> {
        repository::delete_course(self.remote.as_ref(), id).await?;
        self.load().await
    }

    /// Returns `false` when the category is still used by a course; nothing is
    /// deleted or reloaded in that case.
    pub async fn delete_category(&mut self, id: &str) -> Result<bool, AppError> {
        let deleted = repository::delete_category(self.remote.as_ref(), id).await?;
        if deleted {
            self.load().await?;
        } else {
            info!("category {} kept: still referenced by courses", id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryTables;

    async fn seeded() -> Dashboard {
        let remote: Arc<dyn RemoteTables> = Arc::new(MemoryTables::new());
        let category = repository::add_category(remote.as_ref(), "Carreira")
            .await
            .expect("add category");
        repository::add_course(
            remote.as_ref(),
            &CourseDraft {
                name: "Liderança".to_string(),
                description: "Gestão de equipes".to_string(),
                price: 97.0,
                original_price: Some(197.0),
                image_url: "https://img.example/l.png".to_string(),
                category_id: category.id,
                checkout_url: "https://pay.example/l".to_string(),
                benefits: "Visão; Gestão".to_string(),
            },
        )
        .await
        .expect("add course");

        let mut dashboard = Dashboard::new(remote);
        dashboard.load().await.expect("load");
        dashboard
    }

    fn fill_course(dashboard: &mut Dashboard, category_id: &str) {
        for (field, value) in [
            ("name", "Oratória"),
            ("description", "Fale bem"),
            ("price", "49.9"),
            ("originalPrice", ""),
            ("imageUrl", "https://img.example/o.png"),
            ("categoryId", category_id),
            ("checkoutUrl", "https://pay.example/o"),
            ("benefits", "Voz; Presença;"),
        ] {
            dashboard.set_field(field, value).expect("set field");
        }
    }

    #[tokio::test]
    async fn test_load_replaces_lists() {
        let dashboard = seeded().await;
        assert_eq!(dashboard.courses().len(), 1);
        assert_eq!(dashboard.categories().len(), 1);
        assert_eq!(dashboard.courses()[0].category.name, "Carreira");
        assert_eq!(dashboard.modal(), &Modal::Closed);
    }

    #[tokio::test]
    async fn test_add_course_submits_reloads_and_closes() {
        let mut dashboard = seeded().await;
        let category_id = dashboard.categories()[0].id.clone();

        dashboard.open_add_course();
        assert_eq!(dashboard.modal().mode(), Some(ModalMode::AddCourse));
        assert_eq!(dashboard.title(), "Add new course");
        fill_course(&mut dashboard, &category_id);

        dashboard.submit().await.expect("submit");
        assert!(!dashboard.modal().is_open());

        let added: Vec<_> = dashboard
            .courses()
            .iter()
            .filter(|c| c.course.name == "Oratória")
            .collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].course.original_price, None);
        assert_eq!(added[0].course.price, 49.9);
        assert_eq!(added[0].category.id, category_id);
    }

    #[tokio::test]
    async fn test_edit_course_seeds_form_without_category() {
        let mut dashboard = seeded().await;
        let course = dashboard.courses()[0].course.clone();

        dashboard.open_edit_course(&course.id).expect("open");
        match dashboard.modal() {
            Modal::EditCourse { id, form } => {
                assert_eq!(id, &course.id);
                assert_eq!(form, &CourseForm::from_course(&course));
            }
            other => panic!("unexpected modal: {:?}", other),
        }

        dashboard.set_field("originalPrice", "").expect("set");
        dashboard.set_field("price", "10").expect("set");
        dashboard.submit().await.expect("submit");

        let updated = &dashboard.courses()[0].course;
        assert_eq!(updated.price, 10.0);
        assert_eq!(updated.original_price, None);
        assert_eq!(updated.name, course.name);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_modal_open() {
        let mut dashboard = seeded().await;

        dashboard.open_add_course();
        fill_course(&mut dashboard, "not-a-number");
        assert!(matches!(dashboard.submit().await, Err(AppError::BadRequest(_))));
        assert_eq!(dashboard.modal().mode(), Some(ModalMode::AddCourse));

        dashboard.set_field("price", "").expect("set");
        dashboard.set_field("categoryId", "1").expect("set");
        assert!(dashboard.submit().await.is_err());
        assert!(dashboard.modal().is_open());
        assert_eq!(dashboard.courses().len(), 1);
    }

    #[test]
    fn test_numeric_field_coercion() {
        let mut form = CourseForm::default();
        form.set_field("originalPrice", "  ").expect("empty");
        assert_eq!(form.original_price, None);
        form.set_field("originalPrice", "199.90").expect("number");
        assert_eq!(form.original_price, Some(199.9));
        assert!(form.set_field("price", "abc").is_err());
        assert!(form.set_field("price", "NaN").is_err());
        assert!(form.set_field("category", "1").is_err());
    }

    #[tokio::test]
    async fn test_category_add_edit_and_cancel() {
        let mut dashboard = seeded().await;

        dashboard.open_add_category();
        dashboard.set_field("name", "Finanças").expect("set");
        assert!(dashboard.set_field("price", "1").is_err());
        dashboard.submit().await.expect("submit");
        assert_eq!(dashboard.categories().len(), 2);

        let id = dashboard.categories()[1].id.clone();
        dashboard.open_edit_category(&id).expect("open");
        assert_eq!(dashboard.title(), "Edit category");
        dashboard.set_field("name", "Finanças Pessoais").expect("set");
        dashboard.cancel();
        assert!(!dashboard.modal().is_open());
        assert!(dashboard.categories().iter().any(|c| c.name == "Finanças"));

        dashboard.open_edit_category(&id).expect("open");
        dashboard.set_field("name", "Finanças Pessoais").expect("set");
        dashboard.submit().await.expect("submit");
        assert!(dashboard.categories().iter().any(|c| c.name == "Finanças Pessoais"));
    }

    #[tokio::test]
    async fn test_delete_category_in_use_is_refused() {
        let mut dashboard = seeded().await;
        let category_id = dashboard.categories()[0].id.clone();
        let course_id = dashboard.courses()[0].course.id.clone();

        assert!(!dashboard.delete_category(&category_id).await.expect("delete"));
        assert_eq!(dashboard.categories().len(), 1);

        dashboard.delete_course(&course_id).await.expect("delete course");
        assert!(dashboard.courses().is_empty());
        assert!(dashboard.delete_category(&category_id).await.expect("delete"));
        assert!(dashboard.categories().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_outside_writes() {
        let mut dashboard = seeded().await;
        repository::add_category(dashboard.remote.as_ref(), "Arte")
            .await
            .expect("add");
        assert_eq!(dashboard.categories().len(), 1);

        dashboard.open_add_category();
        dashboard.refresh().await.expect("refresh");
        assert_eq!(dashboard.categories()[0].name, "Arte");
        assert_eq!(dashboard.modal().mode(), Some(ModalMode::AddCategory));
    }

    #[tokio::test]
    async fn test_open_edit_unknown_id_is_not_found() {
        let mut dashboard = seeded().await;
        assert!(matches!(dashboard.open_edit_course("404"), Err(AppError::NotFound)));
        assert!(matches!(dashboard.open_edit_category("404"), Err(AppError::NotFound)));
        assert!(dashboard.set_field("name", "x").is_err());
        assert!(dashboard.submit().await.is_err());
    }
}
