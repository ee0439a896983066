//! Session credentials and the API identifiers derived from them
//!
//! The CSRF token is never set directly: it is derived from the session
//! cookie's `ct0` pair whenever the cookie changes.

/// Cookie key carrying the CSRF token
const CSRF_COOKIE_KEY: &str = "ct0";

/// The three identifiers compiled into the web client bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiIdentifiers {
    /// Bearer token sent in the `authorization` header
    pub bearer_token: String,

    /// Operation id of the bookmarks list query
    pub list_operation_id: String,

    /// Operation id of the delete-bookmark mutation
    pub delete_operation_id: String,
}

/// Everything needed to authenticate a call to the private API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    session_cookie: String,
    csrf_token: String,
    bearer_token: String,
    list_operation_id: String,
    delete_operation_id: String,
}

impl Credentials {
    /// Creates credentials for a session cookie, deriving the CSRF token
    pub fn new(session_cookie: impl Into<String>) -> Self {
        let mut credentials = Self {
            session_cookie: session_cookie.into(),
            ..Default::default()
        };
        credentials.load_csrf_token();
        credentials
    }

    /// Replaces the bearer token and session cookie
    ///
    /// Returns whether a CSRF token could be derived from the new cookie.
    /// The rest of the update is applied either way.
    pub fn set_credentials(
        &mut self,
        bearer_token: impl Into<String>,
        session_cookie: impl Into<String>,
    ) -> bool {
        self.bearer_token = bearer_token.into();
        self.session_cookie = session_cookie.into();
        self.load_csrf_token()
    }

    /// Re-derives the CSRF token from the session cookie
    pub fn load_csrf_token(&mut self) -> bool {
        match extract_csrf_token(&self.session_cookie) {
            Some(token) => {
                self.csrf_token = token;
                true
            }
            None => {
                self.csrf_token.clear();
                false
            }
        }
    }

    /// Installs identifiers discovered by a bootstrap (or loaded from cache)
    pub fn apply_identifiers(&mut self, identifiers: &ApiIdentifiers) {
        self.bearer_token = identifiers.bearer_token.clone();
        self.list_operation_id = identifiers.list_operation_id.clone();
        self.delete_operation_id = identifiers.delete_operation_id.clone();
    }

    /// Forgets the bundle identifiers so the next start re-discovers them
    pub fn reset_identifiers(&mut self) {
        self.bearer_token.clear();
        self.list_operation_id.clear();
        self.delete_operation_id.clear();
    }

    /// Returns true once a bearer token and list operation id are known
    pub fn has_identifiers(&self) -> bool {
        !self.bearer_token.is_empty() && !self.list_operation_id.is_empty()
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    pub fn list_operation_id(&self) -> &str {
        &self.list_operation_id
    }

    pub fn delete_operation_id(&self) -> &str {
        &self.delete_operation_id
    }
}

/// Scans a cookie header's `;`-separated pairs for the CSRF token
///
/// Keys and values are trimmed of surrounding whitespace. A `ct0` entry
/// without `=` yields an empty token.
pub fn extract_csrf_token(cookie: &str) -> Option<String> {
    cookie.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key.trim() == CSRF_COOKIE_KEY).then(|| value.trim().to_string())
    })
}
