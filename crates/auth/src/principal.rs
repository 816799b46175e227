use tenantkit_core::{CompanyId, UserId};

use crate::cookies::{COMPANY_COOKIE, CookieSource, USER_COOKIE};

/// The acting principal as known from session cookies.
///
/// Both fields are optional: an anonymous or half-logged-in session simply
/// fails every ownership check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub company_id: Option<CompanyId>,
}

impl Actor {
    pub fn new(user_id: UserId, company_id: Option<CompanyId>) -> Self {
        Self {
            user_id: Some(user_id),
            company_id,
        }
    }

    pub fn from_cookies(cookies: &impl CookieSource) -> Self {
        Self {
            user_id: cookies
                .cookie(USER_COOKIE)
                .and_then(|v| v.parse::<UserId>().ok()),
            company_id: cookies
                .cookie(COMPANY_COOKIE)
                .and_then(|v| v.parse::<CompanyId>().ok()),
        }
    }
}
