use crate::sso::SsoToken;

/// Authentication token handed to the realm: the caller's host and the SSO
/// token verified earlier in the same request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KissoToken {
    host: Option<String>,
    sso_token: Option<SsoToken>,
}

impl KissoToken {
    #[must_use]
    pub fn new(host: Option<String>, sso_token: Option<SsoToken>) -> Self {
        Self { host, sso_token }
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn sso_token(&self) -> Option<&SsoToken> {
        self.sso_token.as_ref()
    }

    /// Principal carried by the SSO token.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.sso_token.as_ref().map(SsoToken::id)
    }
}
