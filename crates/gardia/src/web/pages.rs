//! HTML rendering for the form and the admin console.
//!
//! Pages are plain HTML with `{{name}}` and `<!-- NAME -->` placeholders.
//! Every substituted value is escaped unless it is markup built here.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::transmit::LinkStatus;

const FALLBACK_INDEX: &str = include_str!("../../assets/index.html");
const ADMIN_LOGIN: &str = include_str!("../../assets/admin_login.html");
const ADMIN_DASHBOARD: &str = include_str!("../../assets/admin_dashboard.html");
const ADMIN_CONFIG: &str = include_str!("../../assets/admin_config.html");

const SUCCESS_SLOT: &str = "<!-- SUCCESS_MESSAGE -->";
const ERROR_SLOT: &str = "<!-- ERROR_MESSAGE -->";
const LOGOS_SLOT: &str = "<!-- LOGOS_SECTION -->";
const ALERT_OPTIONS_SLOT: &str = "<!-- ALERT_OPTIONS -->";

/// `?success=` / `?error=` query parameters shown as banners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Banner {
    /// Confirmation text.
    pub success: Option<String>,
    /// Error text.
    pub error: Option<String>,
}

/// Escape text for use in HTML content and quoted attributes.
#[must_use]
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |page, (name, value)| {
            page.replace(&format!("{{{{{name}}}}}"), value)
        })
}

fn with_banner(page: String, banner: &Banner) -> String {
    let block = |class: &str, text: &Option<String>| {
        text.as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!(r#"<div class="{class}">{}</div>"#, html_escape(t)))
            .unwrap_or_default()
    };
    page.replace(SUCCESS_SLOT, &block("success", &banner.success))
        .replace(ERROR_SLOT, &block("error", &banner.error))
}

/// Logo markup for the logos whose file exists in the static directory.
/// Empty when logos are disabled.
#[must_use]
pub fn logos_html(config: &Config) -> String {
    if !config.logos.enabled {
        return String::new();
    }

    let mut html = String::from(r#"<div class="logos-container">"#);
    for (n, logo) in config.logos.entries() {
        if logo.file.is_empty() || !config.web.static_dir.join(&logo.file).is_file() {
            continue;
        }
        let img = format!(
            r#"<img src="/static/{}" alt="{}" class="logo logo{n}">"#,
            html_escape(&logo.file),
            html_escape(&logo.alt)
        );
        if logo.link.is_empty() {
            html.push_str(&img);
        } else {
            html.push_str(&format!(
                r#"<a href="{}" target="_blank" rel="noopener" class="logo-link">{img}</a>"#,
                html_escape(&logo.link)
            ));
        }
    }
    html.push_str("</div>");
    html
}

fn alert_options(config: &Config) -> String {
    config
        .alert_types
        .labels_by_code()
        .into_iter()
        .map(|(label, _)| {
            let label = html_escape(label);
            format!(r#"<option value="{label}">{label}</option>"#)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The intake form. `template` is the content of the custom template file,
/// when one was found; otherwise the built-in page is used.
#[must_use]
pub fn render_index(config: &Config, template: Option<&str>, banner: &Banner) -> String {
    let channel_name = html_escape(&config.meshtastic.channel_name);
    let channel_index = config.meshtastic.channel_index.to_string();
    let app_version = html_escape(&config.app.version);
    let page = fill(
        template.unwrap_or(FALLBACK_INDEX),
        &[
            ("channel_name", channel_name.as_str()),
            ("channel_index", channel_index.as_str()),
            ("app_version", app_version.as_str()),
        ],
    )
    .replace(ALERT_OPTIONS_SLOT, &alert_options(config))
    .replace(LOGOS_SLOT, &logos_html(config));
    with_banner(page, banner)
}

/// The admin login page.
#[must_use]
pub fn render_login(config: &Config, banner: &Banner) -> String {
    let app_name = html_escape(&config.app.name);
    let page = fill(ADMIN_LOGIN, &[("app_name", app_name.as_str())]);
    with_banner(page, banner)
}

/// Live figures shown on the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardView<'a> {
    /// Logged-in user.
    pub username: &'a str,
    /// State of the radio link.
    pub link: LinkStatus,
    /// Open admin sessions.
    pub session_count: usize,
    /// Time left on the viewer's session.
    pub session_expires_in: Duration,
}

/// The admin dashboard.
#[must_use]
pub fn render_dashboard(config: &Config, view: &DashboardView<'_>) -> String {
    let link_class = if view.link.is_up() {
        "status-ok"
    } else {
        "status-error"
    };
    let link_status = match view.link {
        LinkStatus::Connected => "Connecté",
        LinkStatus::Disconnected => "Déconnecté",
        LinkStatus::DryRun => "Simulation (dry-run)",
    };
    let app_name = html_escape(&config.app.name);
    let app_version = html_escape(&config.app.version);
    let username = html_escape(view.username);
    let channel_index = config.meshtastic.channel_index.to_string();
    let channel_name = html_escape(&config.meshtastic.channel_name);
    let limit = config.meshtastic.max_message_length.to_string();
    let session_count = view.session_count.to_string();
    let session_expires = view.session_expires_in.as_secs().div_ceil(60).to_string();
    fill(
        ADMIN_DASHBOARD,
        &[
            ("app_name", app_name.as_str()),
            ("app_version", app_version.as_str()),
            ("username", username.as_str()),
            ("link_class", link_class),
            ("link_status", link_status),
            ("channel_index", channel_index.as_str()),
            ("channel_name", channel_name.as_str()),
            ("max_message_length", limit.as_str()),
            ("session_count", session_count.as_str()),
            ("session_expires", session_expires.as_str()),
        ],
    )
}

/// The YAML editor, prefilled with `content`.
#[must_use]
pub fn render_config_editor(
    config: &Config,
    path: &Path,
    content: &str,
    banner: &Banner,
) -> String {
    let app_name = html_escape(&config.app.name);
    let config_path = html_escape(&path.display().to_string());
    let page = fill(
        ADMIN_CONFIG,
        &[
            ("app_name", app_name.as_str()),
            ("config_path", config_path.as_str()),
        ],
    );
    // Escaped content cannot open a `<!--` banner slot.
    with_banner(page.replace("{{config_content}}", &html_escape(content)), banner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
        assert_eq!(html_escape("Secours à Personnes"), "Secours à Personnes");
    }

    #[test]
    fn test_fallback_index() {
        let config = Config::default();
        let page = render_index(&config, None, &Banner::default());

        assert!(page.contains("canal 1 (Fr-Emcom)"));
        assert!(page.contains(r#"<option value="Secours à Personnes">"#));
        assert!(!page.contains("{{"));
        assert!(!page.contains(SUCCESS_SLOT));
        assert!(!page.contains(ALERT_OPTIONS_SLOT));
    }

    #[test]
    fn test_alert_options_ordered_by_code() {
        let page = render_index(&Config::default(), None, &Banner::default());
        let fire = page.find(r#"value="Incendie""#).unwrap();
        let other = page.find(r#"value="Autre""#).unwrap();
        assert!(fire < other);
    }

    #[test]
    fn test_custom_template_placeholders() {
        let config = Config::default();
        let template = "<h1>{{channel_name}} #{{channel_index}} v{{app_version}}</h1><!-- SUCCESS_MESSAGE --><!-- ERROR_MESSAGE -->";
        let page = render_index(&config, Some(template), &Banner::default());

        assert_eq!(page, "<h1>Fr-Emcom #1 v1.0.0</h1>");
    }

    #[test]
    fn test_banners_escaped() {
        let banner = Banner {
            success: Some("<b>sent</b>".to_string()),
            error: Some("oops".to_string()),
        };
        let page = render_index(&Config::default(), Some("<!-- SUCCESS_MESSAGE -->|<!-- ERROR_MESSAGE -->"), &banner);

        assert_eq!(
            page,
            r#"<div class="success">&lt;b&gt;sent&lt;/b&gt;</div>|<div class="error">oops</div>"#
        );
    }

    #[test]
    fn test_logos_only_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("logo2.png"), b"png").unwrap();

        let mut config = Config::default();
        config.web.static_dir = dir.path().to_path_buf();
        config.logos.logo2.link = "https://example.org".to_string();

        let html = logos_html(&config);
        assert!(html.contains(r#"src="/static/logo2.png""#));
        assert!(html.contains(r#"href="https://example.org""#));
        assert!(!html.contains("logo1.png"));
        assert!(!html.contains("logo3.png"));
    }

    #[test]
    fn test_logos_disabled() {
        let mut config = Config::default();
        config.logos.enabled = false;
        assert!(logos_html(&config).is_empty());
    }

    #[test]
    fn test_dashboard() {
        let view = DashboardView {
            username: "admin",
            link: LinkStatus::Disconnected,
            session_count: 2,
            session_expires_in: Duration::from_secs(1501),
        };
        let page = render_dashboard(&Config::default(), &view);

        assert!(page.contains("Déconnecté"));
        assert!(page.contains("status-error"));
        assert!(page.contains("<strong>Sessions admin :</strong> 2"));
        assert!(page.contains("session :</strong> 26 min"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_config_editor_escapes_content() {
        let page = render_config_editor(
            &Config::default(),
            Path::new("config.yaml"),
            "web:\n  host: \"<0.0.0.0>\"\n# {{app_name}}\n",
            &Banner::default(),
        );

        assert!(page.contains("&quot;&lt;0.0.0.0&gt;&quot;"));
        assert!(page.contains("# {{app_name}}"));
    }
}
