//! Authorize Use Case
//!
//! The forward-auth decision pipeline behind `/_auth`. Branches are
//! evaluated top-down and the first one that fires is terminal:
//! password header, directory headers, session cookie, step-up gate.

use std::sync::Arc;

use platform::password::PasswordSet;

use crate::domain::policy::StepUpMatcher;
use crate::domain::session::Session;
use crate::domain::store::SessionStore;
use crate::domain::upstream::Directory;
use crate::error::GateResult;

/// One forwarded subrequest, already parsed by the handler.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeInput {
    pub forwarded_proto: String,
    pub forwarded_host: String,
    pub forwarded_uri: String,
    /// `Stargate-Password` header value, if present.
    pub password_header: Option<String>,
    /// `X-User-Phone` header value, if present.
    pub phone_header: Option<String>,
    /// `X-User-Mail` header value, if present.
    pub mail_header: Option<String>,
    /// Session id from the cookie, if present.
    pub session_id: Option<String>,
    /// Whether the caller negotiates HTML (drives 302 vs 401/403).
    pub wants_html: bool,
}

/// Terminal verdict for one subrequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeVerdict {
    /// 200 with the given identity headers.
    Allow(Vec<(String, String)>),
    /// 302 to the login page.
    Redirect(String),
    /// 401 in the caller's negotiated format.
    Deny,
    /// 302 to the step-up page.
    StepUpRedirect(String),
    /// 403, session authenticated but the step-up gate blocks.
    StepUpBlocked,
}

/// Forward-auth decision engine.
pub struct AuthorizeUseCase<S, D>
where
    S: SessionStore,
    D: Directory,
{
    store: Arc<S>,
    directory: Option<Arc<D>>,
    passwords: Option<PasswordSet>,
    matcher: Arc<StepUpMatcher>,
    auth_host: String,
    user_header: String,
}

impl<S, D> AuthorizeUseCase<S, D>
where
    S: SessionStore + Sync,
    D: Directory + Sync,
{
    pub fn new(
        store: Arc<S>,
        directory: Option<Arc<D>>,
        passwords: Option<PasswordSet>,
        matcher: Arc<StepUpMatcher>,
        auth_host: String,
        user_header: String,
    ) -> Self {
        Self {
            store,
            directory,
            passwords,
            matcher,
            auth_host,
            user_header,
        }
    }

    pub async fn execute(&self, input: AuthorizeInput) -> GateResult<AuthorizeVerdict> {
        // Stateless machine-to-machine branch. Mismatch is a hard 401,
        // never a redirect, and the session is not consulted.
        if let Some(password) = input.password_header.as_deref() {
            let matched = self
                .passwords
                .as_ref()
                .is_some_and(|set| set.matches(password));
            if matched {
                return Ok(AuthorizeVerdict::Allow(vec![(
                    self.user_header.clone(),
                    "authenticated".to_string(),
                )]));
            }
            tracing::debug!(host = %input.forwarded_host, "Password header mismatch");
            return Ok(AuthorizeVerdict::Deny);
        }

        // Directory headers. Lookup misses and errors fall through to
        // the session branch; the directory is advisory here.
        let phone = input.phone_header.as_deref().unwrap_or("");
        let mail = input.mail_header.as_deref().unwrap_or("");
        if !phone.is_empty() || !mail.is_empty() {
            if let Some(directory) = &self.directory {
                match directory.get_user("", phone, mail).await {
                    Ok(Some(user)) => {
                        return Ok(AuthorizeVerdict::Allow(self.directory_headers(&user)));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Directory lookup failed, falling through");
                    }
                }
            }
        }

        // Session branch. Store failures fail closed.
        let session = match input.session_id.as_deref() {
            Some(id) => self.store.load(id).await?,
            None => None,
        };

        let Some(session) = session.filter(|s| s.authenticated) else {
            return Ok(self.unauthenticated(&input));
        };

        // Step-up gate on the forwarded path, query stripped.
        if !session.step_up_verified {
            let path = input
                .forwarded_uri
                .split('?')
                .next()
                .unwrap_or(&input.forwarded_uri);
            if self.matcher.matches(path) {
                if input.wants_html {
                    return Ok(AuthorizeVerdict::StepUpRedirect(format!(
                        "{}://{}/_step_up?callback={}",
                        scheme(&input.forwarded_proto),
                        self.auth_host,
                        input.forwarded_host,
                    )));
                }
                return Ok(AuthorizeVerdict::StepUpBlocked);
            }
        }

        Ok(AuthorizeVerdict::Allow(self.session_headers(&session)))
    }

    fn unauthenticated(&self, input: &AuthorizeInput) -> AuthorizeVerdict {
        if input.wants_html {
            AuthorizeVerdict::Redirect(format!(
                "{}://{}/_login?callback={}",
                scheme(&input.forwarded_proto),
                self.auth_host,
                input.forwarded_host,
            ))
        } else {
            AuthorizeVerdict::Deny
        }
    }

    fn session_headers(&self, session: &Session) -> Vec<(String, String)> {
        let mut headers = vec![(self.user_header.clone(), session.forwarded_user().to_string())];
        push_header(&mut headers, "X-Auth-User", &session.user_id);
        push_header(&mut headers, "X-Auth-Email", &session.user_mail);
        push_header(&mut headers, "X-Auth-Name", &session.user_name);
        push_header(&mut headers, "X-Auth-Scopes", &session.user_scope.join(","));
        push_header(&mut headers, "X-Auth-Role", &session.user_role);
        push_header(&mut headers, "X-Auth-AMR", &session.user_amr.join(","));
        headers
    }

    fn directory_headers(&self, user: &crate::domain::directory::DirectoryUser) -> Vec<(String, String)> {
        let forwarded = if user.user_id.is_empty() {
            "authenticated".to_string()
        } else {
            user.user_id.clone()
        };
        let mut headers = vec![(self.user_header.clone(), forwarded)];
        push_header(&mut headers, "X-Auth-User", &user.user_id);
        push_header(&mut headers, "X-Auth-Email", &user.mail);
        push_header(&mut headers, "X-Auth-Scopes", &user.scope.join(","));
        push_header(&mut headers, "X-Auth-Role", &user.role);
        headers
    }
}

fn push_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !value.is_empty() {
        headers.push((name.to_string(), value.to_string()));
    }
}

fn scheme(forwarded_proto: &str) -> &str {
    if forwarded_proto.is_empty() {
        "http"
    } else {
        forwarded_proto
    }
}
