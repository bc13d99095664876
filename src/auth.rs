use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::models::Identity;

/// Claims as delivered by the identity provider, keyed by claim name.
pub type RawClaims = BTreeMap<String, String>;

pub const REQUIRED_CLAIMS: [&str; 6] = [
    "email",
    "eppn",
    "firstname",
    "lastname",
    "member_of",
    "patron_barcode",
];

const BROWN_DOMAIN: &str = "@brown.edu";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationVerdict {
    pub authorized: bool,
    pub identity: Option<Identity>,
}

impl AuthorizationVerdict {
    fn denied() -> Self {
        Self {
            authorized: false,
            identity: None,
        }
    }
}

/// Decides whether a set of login claims may open a session.
#[derive(Debug, Clone)]
pub struct ClaimsAuthorizer {
    required_group: String,
}

impl ClaimsAuthorizer {
    pub fn new(required_group: impl Into<String>) -> Self {
        Self {
            required_group: required_group.into(),
        }
    }

    /// Never fails; every rejection is an unauthorized verdict.
    pub fn authorize(&self, claims: Option<&RawClaims>) -> AuthorizationVerdict {
        let Some(claims) = claims else {
            debug!("no claims supplied");
            return AuthorizationVerdict::denied();
        };

        let authorized = all_values_present(claims)
            && brown_user_confirmed(claims)
            && self.group_member(claims);
        debug!(authorized, "evaluated login claims");

        if !authorized {
            return AuthorizationVerdict::denied();
        }

        AuthorizationVerdict {
            authorized: true,
            identity: Some(Identity {
                display_name: format!("{} {}", claims["firstname"], claims["lastname"]),
                email: claims["email"].clone(),
                patron_barcode: claims["patron_barcode"].clone(),
            }),
        }
    }

    fn group_member(&self, claims: &RawClaims) -> bool {
        let member = claims
            .get("member_of")
            .is_some_and(|groups| groups.contains(self.required_group.as_str()));
        debug!(member, group = %self.required_group, "checked group membership");
        member
    }
}

fn all_values_present(claims: &RawClaims) -> bool {
    let exact_keys = claims.keys().map(String::as_str).eq(REQUIRED_CLAIMS);
    let present = exact_keys && claims.values().all(|value| !value.trim().is_empty());
    debug!(present, "checked required claims");
    present
}

fn brown_user_confirmed(claims: &RawClaims) -> bool {
    let confirmed = claims
        .get("eppn")
        .is_some_and(|eppn| eppn.contains(BROWN_DOMAIN));
    debug!(confirmed, "checked eppn domain");
    confirmed
}

/// What the login callback stores in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub login_error: bool,
    pub authorized: bool,
    pub user_info: Option<Identity>,
}

impl SessionState {
    pub fn from_verdict(verdict: &AuthorizationVerdict) -> Self {
        Self {
            login_error: !verdict.authorized,
            authorized: verdict.authorized,
            user_info: verdict.identity.clone(),
        }
    }
}
