//! Response Rendering
//!
//! Accept-header negotiation and the small server-rendered HTML surface:
//! login form, step-up form, enrollment page and error pages. Pages are
//! deliberately dependency-free `format!` templates; the gateway is not
//! a frontend.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::i18n::{catalog, Catalog, Lang};

/// Non-HTML error body format, chosen by the first `Accept` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Json,
    Xml,
    Text,
}

/// Whether the caller negotiates HTML. Empty `Accept` and pure-wildcard
/// headers count as browsers; a wildcard alongside concrete types does
/// not.
pub fn wants_html(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return true;
    };
    let mut any = false;
    for entry in accept.split(',') {
        let media = entry.split(';').next().unwrap_or("").trim();
        if media.is_empty() {
            continue;
        }
        if media.starts_with("text/html") {
            return true;
        }
        if media != "*/*" {
            any = true;
        }
    }
    !any
}

/// Error body format for non-HTML callers.
pub fn error_format(accept: Option<&str>) -> ErrorFormat {
    let first = accept
        .unwrap_or("")
        .split(',')
        .next()
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim();
    if first.starts_with("application/json") {
        ErrorFormat::Json
    } else if first.starts_with("application/xml") || first.starts_with("text/xml") {
        ErrorFormat::Xml
    } else {
        ErrorFormat::Text
    }
}

/// Render an error in the caller's preferred machine format.
pub fn render_error(status: StatusCode, message: &str, format: ErrorFormat) -> Response {
    match format {
        ErrorFormat::Json => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            json!({ "error": message, "code": status.as_u16() }).to_string(),
        )
            .into_response(),
        ErrorFormat::Xml => (
            status,
            [(header::CONTENT_TYPE, "application/xml")],
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?><errors><error code=\"{}\">{}</error></errors>",
                status.as_u16(),
                xml_escape(message)
            ),
        )
            .into_response(),
        ErrorFormat::Text => (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message.to_string(),
        )
            .into_response(),
    }
}

pub fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn html_escape(raw: &str) -> String {
    // Same entity set works for HTML text and attribute values.
    xml_escape(raw)
}

fn page(title: &str, body: &str) -> Response {
    let html = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title>\
         <style>body{{font-family:sans-serif;max-width:24rem;margin:4rem auto;padding:0 1rem}}\
         input,button{{display:block;width:100%;margin:.5rem 0;padding:.5rem}}\
         .hint{{color:#666;font-size:.9rem}}</style>\
         </head><body>{body}</body></html>",
        title = html_escape(title),
    );
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

/// Login form. Shows the password field always, the phone/mail + code
/// fields when the directory is enabled, and the OIDC link when a
/// provider is configured.
pub fn login_page(lang: Lang, callback: &str, warden_enabled: bool, oidc_enabled: bool) -> Response {
    let phrases: &Catalog = catalog(lang);
    let callback = html_escape(callback);
    let mut body = format!(
        "<h1>{}</h1>\
         <form method=\"post\" action=\"/_login\">\
         <input type=\"hidden\" name=\"callback\" value=\"{callback}\">\
         <input type=\"password\" name=\"password\" placeholder=\"password\" autofocus>\
         <button type=\"submit\">Sign in</button></form>",
        html_escape(phrases.login_required),
    );
    if warden_enabled {
        body.push_str(&format!(
            "<hr><form method=\"post\" action=\"/_login\">\
             <input type=\"hidden\" name=\"auth_method\" value=\"warden\">\
             <input type=\"hidden\" name=\"callback\" value=\"{callback}\">\
             <input type=\"text\" name=\"phone\" placeholder=\"phone\">\
             <input type=\"text\" name=\"mail\" placeholder=\"mail\">\
             <input type=\"text\" name=\"challenge_id\" placeholder=\"challenge id\">\
             <input type=\"text\" name=\"verify_code\" placeholder=\"verification code\">\
             <button type=\"submit\">Sign in with code</button></form>\
             <p class=\"hint\">{}</p>",
            html_escape(phrases.code_sent),
        ));
    }
    if oidc_enabled {
        body.push_str(&format!(
            "<hr><p><a href=\"/_oidc/login?callback={callback}\">Sign in with SSO</a></p>"
        ));
    }
    page("Sign in", &body)
}

/// Step-up TOTP form.
pub fn step_up_page(lang: Lang, callback: &str) -> Response {
    let phrases = catalog(lang);
    let body = format!(
        "<h1>{}</h1>\
         <form method=\"post\" action=\"/_step_up\">\
         <input type=\"hidden\" name=\"callback\" value=\"{}\">\
         <input type=\"text\" name=\"code\" placeholder=\"authenticator code\" autofocus>\
         <button type=\"submit\">Verify</button></form>",
        html_escape(phrases.step_up_required),
        html_escape(callback),
    );
    page("Verification", &body)
}

/// TOTP enrollment page: the otpauth URI to scan plus the confirm form.
pub fn enroll_page(enroll_id: &str, otpauth_uri: &str) -> Response {
    let body = format!(
        "<h1>Authenticator setup</h1>\
         <p>Add this URI to your authenticator app:</p>\
         <p><code>{uri}</code></p>\
         <form method=\"post\" action=\"/totp/enroll/confirm\">\
         <input type=\"hidden\" name=\"enroll_id\" value=\"{id}\">\
         <input type=\"text\" name=\"code\" placeholder=\"code from app\" autofocus>\
         <button type=\"submit\">Confirm</button></form>",
        uri = html_escape(otpauth_uri),
        id = html_escape(enroll_id),
    );
    page("Authenticator setup", &body)
}

/// HTML error page with a retry link back to the login form.
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let body = format!(
        "<h1>{}</h1><p>{}</p><p><a href=\"/_login\">Try again</a></p>",
        status.as_u16(),
        html_escape(message),
    );
    let mut response = page("Error", &body);
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_html() {
        assert!(wants_html(None));
        assert!(wants_html(Some("")));
        assert!(wants_html(Some("text/html,application/xhtml+xml")));
        assert!(wants_html(Some("*/*")));
        assert!(wants_html(Some("application/json, text/html;q=0.9")));
        // A wildcard next to concrete types is not a browser.
        assert!(!wants_html(Some("*/*, application/json")));
        assert!(!wants_html(Some("application/json")));
        assert!(!wants_html(Some("text/plain")));
    }

    #[test]
    fn test_error_format() {
        assert_eq!(error_format(Some("application/json")), ErrorFormat::Json);
        assert_eq!(
            error_format(Some("application/json; charset=utf-8")),
            ErrorFormat::Json
        );
        assert_eq!(error_format(Some("application/xml")), ErrorFormat::Xml);
        assert_eq!(error_format(Some("text/plain")), ErrorFormat::Text);
        assert_eq!(error_format(None), ErrorFormat::Text);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_error_page_keeps_status() {
        let response = error_page(StatusCode::BAD_REQUEST, "nope");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
