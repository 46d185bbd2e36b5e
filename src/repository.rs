use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;
use crate::mapper::{
    category_from_external, category_to_external, course_from_external,
    course_to_external, course_with_category_from_external, parse_key,
};
use crate::models::{Category, Course, CourseDraft, CourseWithCategory};
use crate::remote::dto::{CategoryRow, CourseRow};
use crate::remote::{Filter, RemoteTables, SelectRequest, Table};

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    Ok(serde_json::from_value(value)?)
}

fn category(row: Value) -> Result<Category, AppError> {
    Ok(category_from_external(&decode::<CategoryRow>(row)?))
}

fn course(row: Value) -> Result<Course, AppError> {
    Ok(course_from_external(&decode::<CourseRow>(row)?))
}

fn joined_course(row: Value) -> Result<CourseWithCategory, AppError> {
    course_with_category_from_external(&decode::<CourseRow>(row)?)
}

fn require_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Category name is required".to_string()));
    }
    Ok(())
}

pub async fn list_categories(remote: &dyn RemoteTables) -> Result<Vec<Category>, AppError> {
    let rows = remote
        .select(&SelectRequest::new(Table::Categories).order_by("name"))
        .await?;

    rows.into_iter().map(category).collect()
}

/// `Ok(None)` when no row has this id; backend failures stay errors.
pub async fn get_category(
    remote: &dyn RemoteTables,
    id: &str,
) -> Result<Option<Category>, AppError> {
    let Ok(key) = parse_key(id) else {
        return Ok(None);
    };

    let row = remote
        .select_one(&SelectRequest::new(Table::Categories).eq("id", key))
        .await?;

    row.map(category).transpose()
}

pub async fn add_category(remote: &dyn RemoteTables, name: &str) -> Result<Category, AppError> {
    require_name(name)?;

    let row = remote
        .insert(
            Table::Categories,
            serde_json::to_value(category_to_external(name))?,
        )
        .await?;
    let created = category(row)?;

    info!("category {} created: {}", created.id, created.name);
    Ok(created)
}

pub async fn update_category(
    remote: &dyn RemoteTables,
    id: &str,
    name: &str,
) -> Result<Category, AppError> {
    require_name(name)?;
    let key = parse_key(id)?;

    let row = remote
        .update(
            Table::Categories,
            &Filter::id(key),
            serde_json::to_value(category_to_external(name))?,
        )
        .await?
        .ok_or(AppError::NotFound)?;

    category(row)
}

/// Deletes the category unless a course still references it.
///
/// Returns `false` without deleting when the category is in use; the caller
/// owns telling the user.
pub async fn delete_category(remote: &dyn RemoteTables, id: &str) -> Result<bool, AppError> {
    let key = parse_key(id)?;

    let in_use = remote
        .count(Table::Courses, &Filter::eq("category_id", key))
        .await?;
    if in_use > 0 {
        warn!("refusing to delete category {}: {} course(s) reference it", id, in_use);
        return Ok(false);
    }

    remote.delete(Table::Categories, &Filter::id(key)).await?;
    info!("category {} deleted", id);
    Ok(true)
}

pub async fn list_courses(remote: &dyn RemoteTables) -> Result<Vec<Course>, AppError> {
    let rows = remote.select(&SelectRequest::new(Table::Courses)).await?;

    rows.into_iter().map(course).collect()
}

/// All courses with their category embedded. No ordering is guaranteed.
pub async fn list_courses_with_category(
    remote: &dyn RemoteTables,
) -> Result<Vec<CourseWithCategory>, AppError> {
    let rows = remote
        .select(&SelectRequest::new(Table::Courses).embed_category())
        .await?;

    rows.into_iter().map(joined_course).collect()
}

pub async fn get_course(
    remote: &dyn RemoteTables,
    id: &str,
) -> Result<Option<CourseWithCategory>, AppError> {
    let Ok(key) = parse_key(id) else {
        return Ok(None);
    };

    let row = remote
        .select_one(&SelectRequest::new(Table::Courses).embed_category().eq("id", key))
        .await?;

    row.map(joined_course).transpose()
}

/// Inserts a course. The response carries no joined category; reload to get one.
pub async fn add_course(remote: &dyn RemoteTables, draft: &CourseDraft) -> Result<Course, AppError> {
    draft.validate()?;
    let write = course_to_external(draft)?;

    let row = remote
        .insert(Table::Courses, serde_json::to_value(write)?)
        .await?;
    let created = course(row)?;

    info!("course {} created: {}", created.id, created.name);
    Ok(created)
}

pub async fn update_course(
    remote: &dyn RemoteTables,
    id: &str,
    draft: &CourseDraft,
) -> Result<Course, AppError> {
    draft.validate()?;
    let key = parse_key(id)?;
    let write = course_to_external(draft)?;

    let row = remote
        .update(Table::Courses, &Filter::id(key), serde_json::to_value(write)?)
        .await?
        .ok_or(AppError::NotFound)?;

    course(row)
}

pub async fn delete_course(remote: &dyn RemoteTables, id: &str) -> Result<(), AppError> {
    let key = parse_key(id)?;
    remote.delete(Table::Courses, &Filter::id(key)).await?;
    info!("course {} deleted", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryTables;

    fn draft(category_id: &str, name: &str) -> CourseDraft {
        CourseDraft {
            name: name.to_string(),
            description: "Curso online".to_string(),
            price: 97.0,
            original_price: Some(147.0),
            image_url: "https://img.example/c.png".to_string(),
            category_id: category_id.to_string(),
            checkout_url: "https://pay.example/c".to_string(),
            benefits: "Foco; Disciplina".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_categories_sorted_by_name() {
        let remote = MemoryTables::new();
        add_category(&remote, "Produtividade").await.expect("add");
        add_category(&remote, "Carreira").await.expect("add");

        let names: Vec<String> = list_categories(&remote)
            .await
            .expect("list")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Carreira", "Produtividade"]);
    }

    #[tokio::test]
    async fn test_get_category_absent_for_unknown_or_malformed_id() {
        let remote = MemoryTables::new();
        let created = add_category(&remote, "Carreira").await.expect("add");

        assert_eq!(get_category(&remote, &created.id).await.expect("get"), Some(created));
        assert_eq!(get_category(&remote, "42").await.expect("get"), None);
        assert_eq!(get_category(&remote, "c1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_update_category_renames() {
        let remote = MemoryTables::new();
        let created = add_category(&remote, "Carrera").await.expect("add");

        let renamed = update_category(&remote, &created.id, "Carreira").await.expect("update");
        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.name, "Carreira");

        assert!(matches!(
            update_category(&remote, "99", "X").await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            add_category(&remote, " ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_category_refused_while_in_use() {
        let remote = MemoryTables::new();
        let category = add_category(&remote, "Finanças").await.expect("add");
        let course = add_course(&remote, &draft(&category.id, "Investimentos"))
            .await
            .expect("add course");

        let deleted = delete_category(&remote, &category.id).await.expect("delete");
        assert!(!deleted);
        assert_eq!(list_categories(&remote).await.expect("list"), vec![category.clone()]);

        delete_course(&remote, &course.id).await.expect("delete course");
        assert!(delete_category(&remote, &category.id).await.expect("delete"));
        assert!(list_categories(&remote).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_add_course_then_list_with_category() {
        let remote = MemoryTables::new();
        let finance = add_category(&remote, "Finanças").await.expect("add");
        let career = add_category(&remote, "Carreira").await.expect("add");

        let submitted = draft(&career.id, "Liderança");
        let created = add_course(&remote, &submitted).await.expect("add course");
        assert_eq!(created.draft(), submitted);

        let joined = list_courses_with_category(&remote).await.expect("list");
        let matching: Vec<_> = joined
            .iter()
            .filter(|c| c.course.draft() == submitted)
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].category, career);
        assert_ne!(matching[0].category, finance);

        let plain = list_courses(&remote).await.expect("list");
        assert_eq!(plain, vec![created]);
    }

    #[tokio::test]
    async fn test_get_and_update_course() {
        let remote = MemoryTables::new();
        let category = add_category(&remote, "Saúde").await.expect("add");
        let created = add_course(&remote, &draft(&category.id, "Yoga")).await.expect("add");

        let fetched = get_course(&remote, &created.id).await.expect("get").expect("found");
        assert_eq!(fetched.course, created);
        assert_eq!(fetched.category, category);
        assert!(get_course(&remote, "999").await.expect("get").is_none());

        let changes = CourseDraft {
            price: 47.0,
            original_price: None,
            ..created.draft()
        };
        let updated = update_course(&remote, &created.id, &changes).await.expect("update");
        assert_eq!(updated.price, 47.0);
        assert_eq!(updated.original_price, None);

        assert!(matches!(
            update_course(&remote, "999", &changes).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_course_with_unknown_category_is_rejected() {
        let remote = MemoryTables::new();
        let category = add_category(&remote, "Carreira").await.expect("add");
        let kept = add_course(&remote, &draft(&category.id, "Liderança"))
            .await
            .expect("add course");

        assert!(matches!(
            add_course(&remote, &draft("999", "Órfão")).await,
            Err(AppError::Remote(_))
        ));
        assert!(matches!(
            update_course(&remote, &kept.id, &draft("999", "Liderança")).await,
            Err(AppError::Remote(_))
        ));

        let joined = list_courses_with_category(&remote).await.expect("list");
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].category, category);
    }

    #[tokio::test]
    async fn test_add_course_rejects_invalid_draft() {
        let remote = MemoryTables::new();
        let invalid = CourseDraft {
            price: -5.0,
            ..draft("1", "Quebrado")
        };
        assert!(matches!(
            add_course(&remote, &invalid).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(list_courses(&remote).await.expect("list").is_empty());
    }
}
