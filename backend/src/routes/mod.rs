//! Route definitions for the Inventory Management service

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use shared::{ProductView, Supplier};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/products", product_routes(&state))
        .nest("/suppliers", supplier_routes())
        .nest("/movements", movement_routes())
        .nest("/analytics", analytics_routes())
        .route("/activity", get(handlers::list_activity))
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/users", get(handlers::list_users))
        .route("/users/:user_id", delete(handlers::delete_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        .merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Product routes
fn product_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<ProductView>)
                .post(handlers::create_resource::<ProductView>),
        )
        .route("/search", get(handlers::search_products))
        .route("/delete-all", post(handlers::delete_all_products))
        .route(
            "/import",
            post(handlers::import_products)
                .layer(DefaultBodyLimit::max(state.config.import.max_upload_bytes)),
        )
        .route(
            "/:product_id",
            get(handlers::get_resource::<ProductView>)
                .put(handlers::update_resource::<ProductView>)
                .delete(handlers::delete_resource::<ProductView>),
        )
}

/// Supplier routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<Supplier>).post(handlers::create_resource::<Supplier>),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_resource::<Supplier>)
                .put(handlers::update_resource::<Supplier>)
                .delete(handlers::delete_resource::<Supplier>),
        )
}

/// Movement routes (no update or delete)
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_movements).post(handlers::create_movement),
        )
        .route("/:movement_id", get(handlers::get_movement))
}

/// Dashboard and report routes
fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/low-stock", get(handlers::get_low_stock_report))
        .route("/turnover", get(handlers::get_turnover_report))
        .route("/history", get(handlers::get_movement_history))
        .route("/supplier-purchases", get(handlers::get_supplier_purchases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DatabaseConfig, ImportConfig, JwtConfig, ServerConfig};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/inventory_test".to_string(),
                max_connections: 1,
                min_connections: 0,
            },
            jwt: JwtConfig {
                secret: "router-test-secret".to_string(),
                access_token_expiry: 900,
                refresh_token_expiry: 3600,
            },
            import: ImportConfig {
                max_upload_bytes: 1024,
            },
        };
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        AppState {
            db,
            config: Arc::new(config),
        }
    }

    fn app() -> Router {
        let state = test_state();
        Router::new()
            .nest("/api/v1", api_routes(state.clone()))
            .with_state(state)
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for (method, uri) in [
            (Method::GET, "/api/v1/products"),
            (Method::GET, "/api/v1/suppliers"),
            (Method::POST, "/api/v1/movements"),
            (Method::GET, "/api/v1/analytics/dashboard"),
            (Method::POST, "/api/v1/products/import"),
            (Method::GET, "/api/v1/activity"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let request = Request::builder()
            .uri("/api/v1/products")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::builder()
            .uri("/api/v1/nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_requires_json_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            status_of(request).await,
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
