use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use servicarr_guard::csrf::CSRF_COOKIE;
use servicarr_guard::session::SESSION_COOKIE;

/// Attributes shared by the session and CSRF cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookiePolicy {
    /// The session cookie is hidden from scripts.
    pub fn session(&self, value: String) -> Cookie<'static> {
        self.build(SESSION_COOKIE, value, true)
    }

    /// The CSRF cookie must stay readable so the page can echo it in a header.
    pub fn csrf(&self, value: String) -> Cookie<'static> {
        self.build(CSRF_COOKIE, value, false)
    }

    pub fn clear_session(&self) -> Cookie<'static> {
        let mut cookie = self.session(String::new());
        cookie.make_removal();
        cookie
    }

    pub fn clear_csrf(&self) -> Cookie<'static> {
        let mut cookie = self.csrf(String::new());
        cookie.make_removal();
        cookie
    }

    fn build(&self, name: &'static str, value: String, http_only: bool) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(http_only)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(self.max_age_secs))
            .finish()
    }
}
