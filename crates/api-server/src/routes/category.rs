//! Category API endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::get,
    Json, Router,
};

use notesphere_core::category::{Category, CategoryId, CategoryUpdate, NewCategory};
use notesphere_core::envelope::ApiResponse;

use super::{error_response, json_body, ok, path_param, ApiResult};
use crate::state::AppState;

/// GET /api/categories - List categories by name
async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state
        .category_store()
        .list()
        .await
        .map_err(|e| error_response(e, "Failed to fetch categories"))?;

    ok(categories)
}

/// POST /api/categories - Create a category
async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<Category> {
    let input = json_body(payload)?;
    let created = state
        .category_store()
        .create(input)
        .await
        .map_err(|e| error_response(e, "Failed to create category"))?;

    ok(created)
}

/// GET /api/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    id: Result<Path<CategoryId>, PathRejection>,
) -> ApiResult<Category> {
    let id = path_param(id)?;
    let category = state
        .category_store()
        .get(id)
        .await
        .map_err(|e| error_response(e, "Failed to fetch category"))?;

    ok(category)
}

/// PUT /api/categories/{id} - Rename or recolor
async fn update_category(
    State(state): State<AppState>,
    id: Result<Path<CategoryId>, PathRejection>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Category> {
    let id = path_param(id)?;
    let update = json_body(payload)?;
    let updated = state
        .category_store()
        .update(id, update)
        .await
        .map_err(|e| error_response(e, "Failed to update category"))?;

    ok(updated)
}

/// DELETE /api/categories/{id} - Refused while any task is tagged with it
async fn delete_category(
    State(state): State<AppState>,
    id: Result<Path<CategoryId>, PathRejection>,
) -> ApiResult<()> {
    let id = path_param(id)?;
    state
        .category_store()
        .delete(id)
        .await
        .map_err(|e| error_response(e, "Failed to delete category"))?;

    Ok(Json(ApiResponse::empty()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category)
                .put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use notesphere_core::category::NewCategory;
    use notesphere_core::task::NewTask;

    use crate::routes::test_support::{app, build_state, send};

    #[tokio::test]
    async fn create_and_list_categories() {
        let (state, _temp_dir) = build_state().await;
        let app = app(state);

        for name in ["Work", "Errands"] {
            let (status, body) = send(
                &app,
                "POST",
                "/api/categories",
                Some(json!({"name": name, "color": "#ff8800"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["name"], name);
        }

        let (_, body) = send(&app, "GET", "/api/categories", None).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Errands", "Work"]);
    }

    #[tokio::test]
    async fn duplicate_name_is_bad_request() {
        let (state, _temp_dir) = build_state().await;
        let app = app(state.clone());
        let body = json!({"name": "Urgent", "color": "red"});

        let (status, _) = send(&app, "POST", "/api/categories", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, response) = send(&app, "POST", "/api/categories", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);

        let categories = state.category_store().list().await.unwrap();
        assert_eq!(categories.iter().filter(|c| c.name == "Urgent").count(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (state, _temp_dir) = build_state().await;
        let app = app(state);

        let (status, body) = send(&app, "POST", "/api/categories", Some(json!({"color": "blue"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name is required");
    }

    #[tokio::test]
    async fn update_category_partially() {
        let (state, _temp_dir) = build_state().await;
        let category = state
            .category_store()
            .create(NewCategory::new("Home", "green"))
            .await
            .unwrap();
        let app = app(state);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/categories/{}", category.id),
            Some(json!({"color": "teal"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Home");
        assert_eq!(body["data"]["color"], "teal");

        let (status, _) = send(&app, "PUT", "/api/categories/404", Some(json!({"color": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_referenced_category_is_refused() {
        let (state, _temp_dir) = build_state().await;
        let category = state
            .category_store()
            .create(NewCategory::new("Blocked", "black"))
            .await
            .unwrap();
        let task = state
            .task_store()
            .create(NewTask::new("Uses it").with_categories([category.id]))
            .await
            .unwrap();
        let app = app(state.clone());
        let uri = format!("/api/categories/{}", category.id);

        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Cannot delete category with associated tasks"));
        assert!(state.category_store().get(category.id).await.is_ok());

        state.task_store().delete(task.id).await.unwrap();
        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_id_gets_error_envelope() {
        let (state, _temp_dir) = build_state().await;
        let app = app(state);

        let (status, body) = send(&app, "DELETE", "/api/categories/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, "GET", "/api/categories/1.5", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
