//! HTML page handlers, branched on session state.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;
use tower_sessions::Session;

use super::auth::current_user;

#[derive(RustEmbed)]
#[folder = "templates"]
struct Template;

fn serve_template(name: &str) -> Response {
    match Template::get(name) {
        Some(content) => {
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// GET /
pub async fn home() -> Response {
    serve_template("home.html")
}

/// GET /login
pub async fn login() -> Response {
    serve_template("login.html")
}

/// GET /admin — login form until an admin session exists.
pub async fn admin(session: Session) -> Response {
    let is_admin = current_user(&session)
        .await
        .ok()
        .flatten()
        .is_some_and(|user| user.is_admin);

    if is_admin {
        serve_template("admin_dashboard.html")
    } else {
        serve_template("admin_login.html")
    }
}

/// GET /dashboard — falls back to the login page without a session.
pub async fn dashboard(session: Session) -> Response {
    let Some(user) = current_user(&session).await.ok().flatten() else {
        return serve_template("login.html");
    };

    match Template::get("dashboard.html") {
        Some(content) => {
            let page = String::from_utf8_lossy(&content.data)
                .replace("{{user_name}}", &user.user_name);
            ([(header::CONTENT_TYPE, "text/html")], page).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}
