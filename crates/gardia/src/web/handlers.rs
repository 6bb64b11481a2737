//! Public routes: the intake form, submissions, health and static files.

use std::net::SocketAddr;
use std::path::{Component, Path as FsPath};

use axum::extract::{ConnectInfo, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info, warn};

use crate::compact::compact;
use crate::intake::{log_report, FormSubmission};
use crate::transmit::SendTarget;
use crate::web::pages::{render_index, Banner};
use crate::web::state::SharedState;

const MISSING_FIELDS: &str = "Tous les champs obligatoires doivent être remplis";
const SENT: &str = "Message d'urgence envoyé avec succès ! Votre alerte a été transmise.";
const SEND_FAILED: &str = "Erreur lors de l'envoi via Meshtastic. Veuillez réessayer.";

/// Redirect to `path` with `key=message` in the query string.
pub(crate) fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?{key}={}", urlencoding::encode(message)))
}

pub(crate) fn remote_label(connect: Option<&Extension<ConnectInfo<SocketAddr>>>) -> String {
    connect.map_or_else(|| "unknown".to_string(), |Extension(ConnectInfo(addr))| addr.to_string())
}

/// `GET /`: the intake form.
pub async fn index(State(state): State<SharedState>, Query(banner): Query<Banner>) -> Html<String> {
    let config = state.config().await;
    let template_path = config.template_path();

    let template = match tokio::fs::read_to_string(&template_path).await {
        Ok(text) => Some(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Template not found at {}, using the built-in form",
                template_path.display()
            );
            None
        }
        Err(err) => {
            error!("Failed to read template {}: {}", template_path.display(), err);
            None
        }
    };

    Html(render_index(&config, template.as_deref(), &banner))
}

/// `POST /submit`: validate, compact and transmit one report.
pub async fn submit(
    State(state): State<SharedState>,
    connect: Option<Extension<ConnectInfo<SocketAddr>>>,
    Form(form): Form<FormSubmission>,
) -> Redirect {
    let config = state.config().await;
    let remote = remote_label(connect.as_ref());

    let report = match form.into_report() {
        Ok(report) => report,
        Err(err) if err.is_user_error() => {
            warn!("Incomplete submission from {}: {}", remote, err);
            return redirect_with("/", "error", MISSING_FIELDS);
        }
        Err(err) => {
            error!("Submission from {} not processed: {}", remote, err);
            return redirect_with("/", "error", SEND_FAILED);
        }
    };
    log_report(&report, config.logging.log_all_data, &remote);

    let limit = config.message_limit();
    let message = compact(&report, &config.alert_types, limit);
    info!("Payload ({} bytes): {}", message.len(), message.payload);
    if message.truncated {
        let steps: Vec<String> = message.steps.iter().map(ToString::to_string).collect();
        warn!("Payload shortened to fit {} bytes: {}", limit, steps.join("; "));
    }

    let target = SendTarget::from_config(&config.meshtastic);
    match state.transmitter().transmit(&message.payload, target).await {
        Ok(()) => {
            info!(
                "Alert sent - {} - {}",
                report.reporter_name(),
                report.incident_type()
            );
            let mut notice = SENT.to_string();
            if message.truncated {
                notice.push_str(&format!(
                    " (Message adapté à la limite Meshtastic de {limit} caractères)"
                ));
            }
            redirect_with("/", "success", &notice)
        }
        Err(err) => {
            let stage = if err.is_link_error() { "radio link" } else { "payload check" };
            error!(
                "Alert not sent ({}) - {} - {}: {}",
                stage,
                report.reporter_name(),
                report.incident_type(),
                err
            );
            redirect_with("/", "error", SEND_FAILED)
        }
    }
}

/// `GET /health`: service status.
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let config = state.config().await;
    let link = state.transmitter().status().await;
    let template_found = tokio::fs::try_exists(config.template_path())
        .await
        .unwrap_or(false);

    Json(json!({
        "status": "OK",
        "version": config.app.version,
        "meshtastic": link.health_label(),
        "link": link,
        "template_file": if template_found { "FOUND" } else { "NOT_FOUND" },
        "timestamp": chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }))
}

/// `GET /version`: build and configuration versions.
pub async fn version(State(state): State<SharedState>) -> Json<Value> {
    let config = state.config().await;

    Json(json!({
        "app_name": config.app.name,
        "version": config.app.version,
        "build_date": config.app.build_date,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
        "package_version": env!("CARGO_PKG_VERSION"),
        "config_version": config.app.version,
    }))
}

/// Whether `name` is a single plain file name.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = FsPath::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('\\')
}

/// `GET /static/{filename}`: a file from the static directory.
pub async fn static_file(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
    request: Request,
) -> Response {
    if !is_plain_file_name(&filename) {
        warn!("Rejected static path {:?}", filename);
        return not_found().await.into_response();
    }

    let config = state.config().await;
    let path = config.web.static_dir.join(&filename);
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Fichier non trouvé")
}
