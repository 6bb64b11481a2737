//! Admin console: login, dashboard and the YAML configuration editor.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::intake::repair_mojibake;
use crate::web::handlers::{redirect_with, remote_label};
use crate::web::pages::{
    render_config_editor, render_dashboard, render_login, Banner, DashboardView,
};
use crate::web::session::{
    credentials_match, expired_session_cookie, session_cookie, session_id_from,
};
use crate::web::state::SharedState;

const BAD_CREDENTIALS: &str = "Nom d'utilisateur ou mot de passe incorrect";
const LOGGED_OUT: &str = "Déconnexion réussie";
const SAVED: &str = "Configuration enregistrée et appliquée. Adresse, port et périphérique série : au prochain redémarrage.";

/// The `/admin` routes.
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/admin", get(login_page))
        .route("/admin/login", post(login))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/config", get(config_editor).post(save_config))
        .route("/admin/logout", get(logout))
}

/// Login form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    username: String,
    password: String,
}

/// Config editor form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigForm {
    config_content: String,
}

fn disabled() -> Response {
    (StatusCode::NOT_FOUND, "Administration désactivée").into_response()
}

/// Id and user of the request's live session, if any.
fn current_session(state: &SharedState, headers: &HeaderMap, config: &Config) -> Option<(String, String)> {
    let id = session_id_from(headers)?;
    if !state.sessions().validate(&id, config.session_timeout()) {
        return None;
    }
    let user = state.sessions().username(&id)?;
    Some((id, user))
}

async fn login_page(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(banner): Query<Banner>,
) -> Response {
    let config = state.config().await;
    if !config.admin.enabled {
        return disabled();
    }
    if current_session(&state, &headers, &config).is_some() {
        return Redirect::to("/admin/dashboard").into_response();
    }
    Html(render_login(&config, &banner)).into_response()
}

async fn login(
    State(state): State<SharedState>,
    connect: Option<Extension<ConnectInfo<SocketAddr>>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let config = state.config().await;
    if !config.admin.enabled {
        return disabled();
    }
    let remote = remote_label(connect.as_ref());
    let username = form.username.trim();

    if !credentials_match(username, form.password.trim(), &config.admin) {
        warn!("Failed admin login for {:?} from {}", username, remote);
        return redirect_with("/admin", "error", BAD_CREDENTIALS).into_response();
    }

    let id = state.sessions().create(username);
    info!("Admin login for {} from {}", username, remote);
    (
        [(header::SET_COOKIE, session_cookie(&id, config.session_timeout()))],
        Redirect::to("/admin/dashboard"),
    )
        .into_response()
}

async fn dashboard(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let config = state.config().await;
    if !config.admin.enabled {
        return disabled();
    }
    let Some((id, username)) = current_session(&state, &headers, &config) else {
        return Redirect::to("/admin").into_response();
    };

    let view = DashboardView {
        username: &username,
        link: state.transmitter().status().await,
        session_count: state.sessions().len(),
        session_expires_in: state
            .sessions()
            .expires_in(&id, config.session_timeout())
            .unwrap_or_default(),
    };
    Html(render_dashboard(&config, &view)).into_response()
}

async fn config_editor(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(mut banner): Query<Banner>,
) -> Response {
    let config = state.config().await;
    if !config.admin.enabled {
        return disabled();
    }
    if current_session(&state, &headers, &config).is_none() {
        return Redirect::to("/admin").into_response();
    }

    let path = state.config_path();
    let content = match tokio::fs::read_to_string(path).await {
        Ok(text) => repair_mojibake(&text).0,
        Err(err) => {
            warn!("Cannot read {}: {}", path.display(), err);
            if banner.error.is_none() {
                banner.error = Some(format!("Lecture de {} impossible : {err}", path.display()));
            }
            config.to_yaml().unwrap_or_default()
        }
    };
    Html(render_config_editor(&config, path, &content, &banner)).into_response()
}

async fn save_config(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<ConfigForm>,
) -> Response {
    let config = state.config().await;
    if !config.admin.enabled {
        return disabled();
    }
    let Some((_, username)) = current_session(&state, &headers, &config) else {
        return Redirect::to("/admin").into_response();
    };

    let (content, repaired) = repair_mojibake(&form.config_content);
    if repaired {
        info!("Encoding repaired in submitted configuration");
    }
    if let Err(err) = Config::from_yaml_str(&content) {
        warn!("Configuration rejected: {}", err);
        return redirect_with("/admin/config", "error", &format!("YAML invalide : {err}"))
            .into_response();
    }

    let path = state.config_path().to_path_buf();
    if let Err(err) = Config::save_with_backup(&path, &content) {
        error!("Failed to save configuration: {}", err);
        return redirect_with("/admin/config", "error", "Erreur d'écriture du fichier")
            .into_response();
    }
    info!("Configuration saved by {}", username);

    match Config::load_from(Some(path)) {
        Ok(reloaded) => state.replace_config(reloaded).await,
        Err(err) => warn!("Saved configuration not applied: {}", err),
    }
    redirect_with("/admin/config", "success", SAVED).into_response()
}

async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id_from(&headers) {
        if state.sessions().remove(&id) {
            info!("Admin session closed");
        }
    }
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        redirect_with("/admin", "success", LOGGED_OUT),
    )
        .into_response()
}
