//! Cookie access shared by the client hook and the server guard.

use std::collections::HashMap;

use url::form_urlencoded;

/// Name of the compressed capability table cookie.
pub const CAPABILITIES_COOKIE: &str = "capabilities";
/// Name of the role/feature companion cookie.
pub const ACCESS_COOKIE: &str = "access";
/// Bearer token of the current session.
pub const SESSION_COOKIE: &str = "session";
/// Active company (tenant) id.
pub const COMPANY_COOKIE: &str = "company";
/// Acting user id.
pub const USER_COOKIE: &str = "user";

/// Read-only cookie store.
///
/// The browser runtime reads `document.cookie`; the server reads the request's
/// `Cookie` header. Both hand their values to the same decoder.
pub trait CookieSource {
    fn cookie(&self, name: &str) -> Option<String>;
}

impl CookieSource for HashMap<String, String> {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: CookieSource + ?Sized> CookieSource for &T {
    fn cookie(&self, name: &str) -> Option<String> {
        (**self).cookie(name)
    }
}

/// Cookies parsed from a `Cookie` header (`a=1; b=2`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    values: HashMap<String, String>,
}

impl CookieJar {
    pub fn parse(header: &str) -> Self {
        let values = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some((name.to_string(), decode_value(value)))
            })
            .collect();
        Self { values }
    }

    /// Merge several `Cookie` headers; later values win.
    pub fn parse_all<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut jar = Self::default();
        for header in headers {
            jar.values.extend(Self::parse(header).values);
        }
        jar
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Render as a `Cookie` header value, sorted by name.
    pub fn to_header(&self) -> String {
        let mut pairs: Vec<_> = self.values.iter().collect();
        pairs.sort();
        pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Percent-decode a cookie value. A literal `+` stays a `+` (base64).
fn decode_value(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    let escaped = format!("v={}", value.replace('+', "%2B").replace('&', "%26"));
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
        .unwrap_or_else(|| value.to_string())
}

impl CookieSource for CookieJar {
    fn cookie(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_pairs() {
        let jar = CookieJar::parse("session=abc; company=c1;  user=\"u1\"; =skip; junk");
        assert_eq!(jar.cookie("session").as_deref(), Some("abc"));
        assert_eq!(jar.cookie("company").as_deref(), Some("c1"));
        assert_eq!(jar.cookie("user").as_deref(), Some("u1"));
        assert_eq!(jar.cookie("junk"), None);
    }

    #[test]
    fn base64_padding_survives() {
        let jar = CookieJar::parse("capabilities=AbC+/de==; access=admin|");
        assert_eq!(jar.cookie("capabilities").as_deref(), Some("AbC+/de=="));
        assert_eq!(jar.cookie("access").as_deref(), Some("admin|"));
    }

    #[test]
    fn url_encoded_values_are_decoded() {
        let jar = CookieJar::parse("capabilities=AbC%2B%2Fde%3D%3D; access=admin%7Cbilling%2Cnotifications");
        assert_eq!(jar.cookie("capabilities").as_deref(), Some("AbC+/de=="));
        assert_eq!(jar.cookie("access").as_deref(), Some("admin|billing,notifications"));

        let jar = CookieJar::parse("capabilities=Ab+C%3D");
        assert_eq!(jar.cookie("capabilities").as_deref(), Some("Ab+C="));
    }
}
