//! Request gateway for the identity service. Every call carries the current
//! session token as a bearer credential and every response is classified into
//! exactly one [`Outcome`]. Classification depends on the call site as well as
//! the status: a 401 during sign-in asks for a second factor, anywhere else it
//! invalidates the session. Nothing is retried here.

use crate::{
    config::AppConfig, errors::AuthError, routes::Navigator, session::SessionStore, token,
};
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::{debug, error, info, instrument, warn};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

/// Which operation a request belongs to. Sign-up and sign-in carry the e-mail
/// so a follow-up step knows whom to verify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallSite {
    SignUp { email: String },
    SignIn { email: String },
    VerifyEmail,
    VerifySecondFactor,
    RequestPasswordReset,
    ConfirmPasswordReset,
    GoogleAuthUrl,
    /// Any call against a resource that requires a session.
    Protected,
}

impl CallSite {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SignUp { .. } => "sign_up",
            Self::SignIn { .. } => "sign_in",
            Self::VerifyEmail => "verify_email",
            Self::VerifySecondFactor => "verify_second_factor",
            Self::RequestPasswordReset => "request_password_reset",
            Self::ConfirmPasswordReset => "confirm_password_reset",
            Self::GoogleAuthUrl => "google_auth_url",
            Self::Protected => "protected",
        }
    }

    fn email(&self) -> &str {
        match self {
            Self::SignUp { email } | Self::SignIn { email } => email,
            _ => "",
        }
    }
}

/// Status classification before the body is looked at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Success,
    VerificationRequired,
    TwoFactorRequired,
    SessionInvalid,
    Forbidden,
    NotFound,
    ServerError,
    Rejected,
}

/// Maps a status code to a disposition for the given call site.
#[must_use]
pub fn classify(status: StatusCode, site: &CallSite) -> Disposition {
    let credential_submission = matches!(site, CallSite::SignUp { .. } | CallSite::SignIn { .. });

    match status.as_u16() {
        202 if credential_submission => Disposition::VerificationRequired,
        200..=299 => Disposition::Success,
        401 if matches!(site, CallSite::SignIn { .. }) => Disposition::TwoFactorRequired,
        401 => Disposition::SessionInvalid,
        403 => Disposition::Forbidden,
        404 => Disposition::NotFound,
        500..=599 => Disposition::ServerError,
        _ => Disposition::Rejected,
    }
}

/// Domain result of one gateway call.
#[derive(Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Ok(T),
    VerificationRequired { email: String },
    TwoFactorRequired { email: String },
    /// The session was cleared because a protected call was unauthorized.
    SessionInvalid,
    Forbidden(String),
    ResourceError(String),
    ServerError { status: u16, message: String },
    InvalidCredentials(String),
    NetworkUnavailable(String),
}

impl<T> Outcome<T> {
    /// Collapses everything but `Ok` into an [`AuthError`].
    ///
    /// # Errors
    ///
    /// Returns the matching [`AuthError`] variant for every non-`Ok` outcome.
    pub fn into_result(self) -> Result<T, AuthError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::VerificationRequired { email } => Err(AuthError::VerificationRequired { email }),
            Self::TwoFactorRequired { email } => Err(AuthError::TwoFactorRequired { email }),
            Self::SessionInvalid => Err(AuthError::SessionInvalid),
            Self::Forbidden(message) => Err(AuthError::Forbidden(message)),
            Self::ResourceError(message) => Err(AuthError::ResourceError(message)),
            Self::ServerError { status, message } => Err(AuthError::ServerError { status, message }),
            Self::InvalidCredentials(message) => Err(AuthError::InvalidCredentials(message)),
            Self::NetworkUnavailable(message) => Err(AuthError::NetworkUnavailable(message)),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

// payloads may hold tokens, keep them out of debug output
impl<T> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(_) => f.write_str("Ok(..)"),
            Self::VerificationRequired { email } => {
                write!(f, "VerificationRequired({email})")
            }
            Self::TwoFactorRequired { email } => write!(f, "TwoFactorRequired({email})"),
            Self::SessionInvalid => f.write_str("SessionInvalid"),
            Self::Forbidden(message) => write!(f, "Forbidden({message})"),
            Self::ResourceError(message) => write!(f, "ResourceError({message})"),
            Self::ServerError { status, message } => write!(f, "ServerError({status}, {message})"),
            Self::InvalidCredentials(message) => write!(f, "InvalidCredentials({message})"),
            Self::NetworkUnavailable(message) => write!(f, "NetworkUnavailable({message})"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Gateway {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
}

impl Gateway {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &AppConfig,
        session: Arc<SessionStore>,
        navigator: Arc<Navigator>,
    ) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            session,
            navigator,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.navigator
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, site: CallSite) -> Outcome<T> {
        self.send::<(), T>(Method::GET, path, site, None).await
    }

    pub async fn post<B, T>(&self, path: &str, site: CallSite, body: &B) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, site, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, site: CallSite, body: &B) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, site, Some(body)).await
    }

    /// Sends one request and classifies the response. Bodies are never logged.
    #[instrument(skip(self, body), fields(site = site.name()))]
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        site: CallSite,
        body: Option<&B>,
    ) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = build_url(&self.base_url, path);
        let mut request = self.client.request(method, &url);

        if let Some(token) = self.bearer() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("request to {url} failed: {err}");
                return Outcome::NetworkUnavailable(map_request_error(&err));
            }
        };

        let status = response.status();
        let disposition = classify(status, &site);
        debug!("{} {url} -> {status} ({disposition:?})", site.name());

        match disposition {
            Disposition::Success => match response.bytes().await {
                Ok(bytes) => decode_payload(status, &bytes),
                Err(err) => Outcome::NetworkUnavailable(map_request_error(&err)),
            },
            Disposition::VerificationRequired => Outcome::VerificationRequired {
                email: site.email().to_string(),
            },
            Disposition::TwoFactorRequired => Outcome::TwoFactorRequired {
                email: site.email().to_string(),
            },
            Disposition::SessionInvalid => {
                self.invalidate_session();
                Outcome::SessionInvalid
            }
            Disposition::Forbidden => {
                warn!("access forbidden for {url}");
                Outcome::Forbidden(error_message(response).await)
            }
            Disposition::NotFound => Outcome::ResourceError(error_message(response).await),
            Disposition::ServerError => {
                error!("server error {status} for {url}");
                Outcome::ServerError {
                    status: status.as_u16(),
                    message: error_message(response).await,
                }
            }
            Disposition::Rejected => Outcome::InvalidCredentials(error_message(response).await),
        }
    }

    /// Current token if it is still usable. An expired token clears the
    /// session and the request goes out without credentials.
    fn bearer(&self) -> Option<String> {
        let token = self.session.token()?;
        if token::is_expired(&token, token::now_unix_seconds()) {
            info!("session token expired, clearing session");
            self.session.clear();
            return None;
        }
        Some(token)
    }

    fn invalidate_session(&self) {
        warn!("unauthorized response, clearing session");
        self.session.clear();
        if self.navigator.redirect_to_entry() {
            info!("redirected to entry view");
        }
    }
}

/// Builds a URL from the base URL and the provided path.
fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

fn decode_payload<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Outcome<T> {
    // an empty body decodes like JSON null so `()` and `Option<_>` work
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        bytes
    };

    match serde_json::from_slice(bytes) {
        Ok(payload) => Outcome::Ok(payload),
        Err(err) => Outcome::ServerError {
            status: status.as_u16(),
            message: format!("Failed to decode response: {err}"),
        },
    }
}

fn map_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timed out. Please try again.".to_string()
    } else {
        err.to_string()
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    sanitize_body(&body)
}

/// Prefers a JSON `message` (or `error`) field, otherwise the trimmed body,
/// truncated for display.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();

    let message = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|json| {
            ["message", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| trimmed.to_string());

    let message = message.trim();
    if message.is_empty() {
        "Request failed.".to_string()
    } else {
        message.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        routes::View,
        session::slots::MemorySlots,
        token::{encode_unsigned, Claims},
    };
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn sign_in() -> CallSite {
        CallSite::SignIn {
            email: "user@example.com".to_string(),
        }
    }

    fn live_token() -> String {
        let Value::Object(map) = json!({"sub": "ada", "exp": token::now_unix_seconds() + 600})
        else {
            unreachable!()
        };
        encode_unsigned(&Claims::new(map))
    }

    fn gateway(base_url: &str, start: View) -> Gateway {
        let config = AppConfig {
            api_base_url: base_url.to_string(),
            ..AppConfig::default()
        };
        let session = Arc::new(SessionStore::new(Arc::new(MemorySlots::new())));
        let navigator = Arc::new(Navigator::new(start));
        Gateway::new(&config, session, navigator).unwrap()
    }

    #[test]
    fn classify_success_and_special_statuses() {
        let ok = StatusCode::OK;
        let accepted = StatusCode::ACCEPTED;
        let unauthorized = StatusCode::UNAUTHORIZED;

        assert_eq!(classify(ok, &sign_in()), Disposition::Success);
        assert_eq!(classify(accepted, &sign_in()), Disposition::VerificationRequired);
        assert_eq!(
            classify(accepted, &CallSite::SignUp { email: String::new() }),
            Disposition::VerificationRequired
        );
        assert_eq!(classify(accepted, &CallSite::Protected), Disposition::Success);
        assert_eq!(classify(unauthorized, &sign_in()), Disposition::TwoFactorRequired);
        assert_eq!(classify(unauthorized, &CallSite::Protected), Disposition::SessionInvalid);
        assert_eq!(classify(unauthorized, &CallSite::VerifyEmail), Disposition::SessionInvalid);
        assert_eq!(
            classify(unauthorized, &CallSite::SignUp { email: String::new() }),
            Disposition::SessionInvalid
        );
    }

    #[test]
    fn classify_error_statuses() {
        let site = CallSite::Protected;
        assert_eq!(classify(StatusCode::FORBIDDEN, &site), Disposition::Forbidden);
        assert_eq!(classify(StatusCode::NOT_FOUND, &site), Disposition::NotFound);
        assert_eq!(classify(StatusCode::INTERNAL_SERVER_ERROR, &site), Disposition::ServerError);
        assert_eq!(classify(StatusCode::BAD_GATEWAY, &site), Disposition::ServerError);
        assert_eq!(classify(StatusCode::BAD_REQUEST, &site), Disposition::Rejected);
        assert_eq!(classify(StatusCode::CONFLICT, &sign_in()), Disposition::Rejected);
    }

    #[test]
    fn build_url_joins_base_and_path() {
        assert_eq!(build_url("http://h:9090/", "/api/x"), "http://h:9090/api/x");
        assert_eq!(build_url("http://h:9090", "api/x"), "http://h:9090/api/x");
        assert_eq!(build_url("  ", "/api/x"), "/api/x");
    }

    #[test]
    fn sanitize_body_prefers_message_field() {
        assert_eq!(sanitize_body(r#"{"message":"Bad credentials"}"#), "Bad credentials");
        assert_eq!(sanitize_body(r#"{"error":"nope"}"#), "nope");
        assert_eq!(sanitize_body("  plain text  "), "plain text");
        assert_eq!(sanitize_body(""), "Request failed.");
        assert_eq!(sanitize_body(&"x".repeat(500)).len(), MAX_ERROR_CHARS);
    }

    #[test]
    fn into_result_maps_every_outcome() {
        assert_eq!(Outcome::Ok(1).into_result(), Ok(1));
        assert_eq!(
            Outcome::<()>::SessionInvalid.into_result(),
            Err(AuthError::SessionInvalid)
        );
        assert_eq!(
            Outcome::<()>::TwoFactorRequired { email: "a@b.c".to_string() }.into_result(),
            Err(AuthError::TwoFactorRequired { email: "a@b.c".to_string() })
        );
        assert_eq!(
            Outcome::<()>::NetworkUnavailable("down".to_string()).into_result(),
            Err(AuthError::NetworkUnavailable("down".to_string()))
        );
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::Chat);
        let token = live_token();
        gateway.session().set(&token, None).unwrap();

        Mock::given(method("GET"))
            .and(path("/api/users/me"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome: Outcome<Value> = gateway.get("/api/users/me", CallSite::Protected).await;
        assert_eq!(outcome, Outcome::Ok(json!({"ok": true})));
    }

    #[tokio::test]
    async fn no_header_without_session() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignIn);

        Mock::given(method("POST"))
            .and(path("/api/auth/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .mount(&server)
            .await;

        let outcome: Outcome<Value> = gateway
            .post("/api/auth/signin", sign_in(), &json!({"email": "user@example.com"}))
            .await;
        assert!(outcome.is_ok());

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn expired_token_is_not_sent_and_session_is_cleared() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::Chat);
        let Value::Object(map) = json!({"sub": "ada", "exp": 1}) else {
            unreachable!()
        };
        gateway
            .session()
            .set(&encode_unsigned(&Claims::new(map)), None)
            .unwrap();

        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let outcome: Outcome<Value> = gateway.get("/api/chats", CallSite::Protected).await;
        assert!(outcome.is_ok());
        assert!(!gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn unauthorized_protected_call_clears_and_redirects() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::Chat);
        gateway.session().set(&live_token(), None).unwrap();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let outcome: Outcome<Value> = gateway.get("/api/chats", CallSite::Protected).await;
        assert_eq!(outcome, Outcome::SessionInvalid);
        assert!(!gateway.session().is_authenticated());
        assert_eq!(gateway.navigator().current(), View::Auth);
    }

    #[tokio::test]
    async fn unauthorized_inside_entry_flow_does_not_redirect() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::Verify);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let outcome: Outcome<Value> = gateway
            .post("/api/auth/verify", CallSite::VerifyEmail, &json!({}))
            .await;
        assert_eq!(outcome, Outcome::SessionInvalid);
        assert_eq!(gateway.navigator().current(), View::Verify);
        assert_eq!(gateway.navigator().history(), vec![View::Verify]);
    }

    #[tokio::test]
    async fn sign_in_statuses_become_flow_outcomes() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignIn);
        gateway.session().set(&live_token(), None).unwrap();

        Mock::given(method("POST"))
            .and(path("/accepted"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/unauthorized"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let accepted: Outcome<Value> = gateway.post("/accepted", sign_in(), &json!({})).await;
        assert_eq!(
            accepted,
            Outcome::VerificationRequired { email: "user@example.com".to_string() }
        );

        let unauthorized: Outcome<Value> =
            gateway.post("/unauthorized", sign_in(), &json!({})).await;
        assert_eq!(
            unauthorized,
            Outcome::TwoFactorRequired { email: "user@example.com".to_string() }
        );
        assert!(gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn error_statuses_keep_the_session() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::Settings);
        gateway.session().set(&live_token(), None).unwrap();

        Mock::given(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "no"})))
            .mount(&server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let forbidden: Outcome<Value> = gateway.get("/forbidden", CallSite::Protected).await;
        assert_eq!(forbidden, Outcome::Forbidden("no".to_string()));

        let missing: Outcome<Value> = gateway.get("/missing", CallSite::Protected).await;
        assert_eq!(missing, Outcome::ResourceError("Request failed.".to_string()));

        let broken: Outcome<Value> = gateway.get("/broken", CallSite::Protected).await;
        assert_eq!(
            broken,
            Outcome::ServerError { status: 503, message: "maintenance".to_string() }
        );

        assert!(gateway.session().is_authenticated());
        assert_eq!(gateway.navigator().current(), View::Settings);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_success_body_decodes_to_unit() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::Home);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let outcome: Outcome<()> = gateway.post("/x", CallSite::Protected, &json!({})).await;
        assert_eq!(outcome, Outcome::Ok(()));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_unavailable() {
        let gateway = gateway("http://127.0.0.1:9", View::Home);
        let outcome: Outcome<Value> = gateway.get("/x", CallSite::Protected).await;
        assert!(matches!(outcome, Outcome::NetworkUnavailable(_)));
    }
}
