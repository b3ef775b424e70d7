use std::collections::HashMap;

use reqwest::Url;

use crate::auth::AuthSession;
use crate::models::CvId;

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const SIGNUP: &str = "/signup";
pub const DASHBOARD: &str = "/dashboard";
pub const LAYOUTS: &str = "/layouts";
pub const NEW_EDITOR: &str = "/editor";
pub const PAYMENT_SUCCESS: &str = "/payment-success";
pub const SOCIAL_LOGIN_SUCCESS: &str = "/social-login-success";

pub fn editor_path(id: &CvId) -> String {
    format!("{NEW_EDITOR}/{id}")
}

pub fn view_path(id: &CvId) -> String {
    format!("/view/{id}")
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Signed-in-only pages are the dashboard, the layout picker and the editor.
/// Returns where to send the visitor instead, or `None` to let them through.
pub fn guard(path: &str, session: &AuthSession) -> Option<&'static str> {
    let protected = matches!(
        segments(path).as_slice(),
        ["dashboard"] | ["layouts"] | ["editor"] | ["editor", _]
    );
    (protected && !session.is_logged_in()).then_some(HOME)
}

/// A client-side location split into its path and query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: HashMap<String, String>,
}

impl Location {
    /// Parses `/editor/abc?mode=view` style locations. Anything unparseable
    /// yields the home location.
    pub fn parse(location: &str) -> Self {
        let Ok(base) = Url::parse("http://localhost/") else {
            return Self::home();
        };
        match base.join(location.trim()) {
            Ok(url) => Self {
                path: url.path().to_string(),
                query: url.query_pairs().into_owned().collect(),
            },
            Err(_) => Self::home(),
        }
    }

    fn home() -> Self {
        Self {
            path: HOME.to_string(),
            query: HashMap::new(),
        }
    }
}

/// Which CV an editor instance should open and whether it may be edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorRoute {
    pub id: Option<CvId>,
    pub read_only: bool,
}

impl EditorRoute {
    pub fn new_cv() -> Self {
        Self::default()
    }

    pub fn edit(id: CvId) -> Self {
        Self {
            id: Some(id),
            read_only: false,
        }
    }

    pub fn view(id: CvId) -> Self {
        Self {
            id: Some(id),
            read_only: true,
        }
    }

    /// Matches `/editor`, `/editor/:id`, `/editview/:id` and `/view/:id`.
    /// `/view` is always read-only; on the others `?mode=view` makes it so.
    /// A malformed id is treated as no id at all.
    pub fn parse(path: &str, query: &HashMap<String, String>) -> Option<Self> {
        let view_mode = query.get("mode").map(String::as_str) == Some("view");

        match segments(path).as_slice() {
            ["editor"] => Some(Self {
                id: None,
                read_only: view_mode,
            }),
            ["editor", raw] | ["editview", raw] => Some(Self {
                id: CvId::from_route(raw),
                read_only: view_mode,
            }),
            ["view", raw] => Some(Self {
                id: CvId::from_route(raw),
                read_only: true,
            }),
            _ => None,
        }
    }

    pub fn from_location(location: &str) -> Option<Self> {
        let location = Location::parse(location);
        Self::parse(&location.path, &location.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "65f1a2b3c4d5e6f708192a3b";

    #[test]
    fn test_editor_routes() {
        assert_eq!(EditorRoute::from_location("/editor"), Some(EditorRoute::new_cv()));
        assert_eq!(
            EditorRoute::from_location(&format!("/editor/{ID}")),
            Some(EditorRoute::edit(CvId::new(ID).unwrap()))
        );
        assert_eq!(
            EditorRoute::from_location(&format!("/view/{ID}")),
            Some(EditorRoute::view(CvId::new(ID).unwrap()))
        );
        assert_eq!(
            EditorRoute::from_location(&format!("/editor/{ID}?mode=view")),
            Some(EditorRoute::view(CvId::new(ID).unwrap()))
        );
        assert_eq!(EditorRoute::from_location("/dashboard"), None);
    }

    #[test]
    fn test_editview_route() {
        let id = CvId::new(ID).unwrap();
        assert_eq!(
            EditorRoute::from_location(&format!("/editview/{ID}")),
            Some(EditorRoute::edit(id.clone()))
        );
        assert_eq!(
            EditorRoute::from_location(&format!("/editview/{ID}?mode=view")),
            Some(EditorRoute::view(id))
        );
        assert_eq!(EditorRoute::from_location("/editview/nope").unwrap().id, None);
    }

    #[test]
    fn test_guard_sends_signed_out_visitors_home() {
        let signed_out = AuthSession::default();
        let edit = format!("/editor/{ID}");
        for path in ["/dashboard", "/layouts", "/editor", edit.as_str()] {
            assert_eq!(guard(path, &signed_out), Some(HOME), "{path}");
        }
        let public = [
            HOME.to_string(),
            LOGIN.to_string(),
            SIGNUP.to_string(),
            format!("/view/{ID}"),
            format!("/editview/{ID}"),
            PAYMENT_SUCCESS.to_string(),
            SOCIAL_LOGIN_SUCCESS.to_string(),
        ];
        for path in &public {
            assert_eq!(guard(path, &signed_out), None, "{path}");
        }
    }

    #[test]
    fn test_guard_lets_signed_in_users_through() {
        let session = AuthSession {
            user: Some(crate::models::User::default()),
            token: Some("t".to_string()),
        };
        assert_eq!(guard(DASHBOARD, &session), None);
        assert_eq!(guard(&format!("/editor/{ID}"), &session), None);

        // A bare token is not a session.
        let token_only = AuthSession {
            user: None,
            token: Some("t".to_string()),
        };
        assert_eq!(guard(LAYOUTS, &token_only), Some(HOME));
    }

    #[test]
    fn test_malformed_id_means_new_cv() {
        let route = EditorRoute::from_location("/editor/undefined").unwrap();
        assert_eq!(route.id, None);
        assert!(!route.read_only);
    }

    #[test]
    fn test_location_query_is_decoded() {
        let location = Location::parse("/payment-success?cvId=abc&action=download");
        assert_eq!(location.path, PAYMENT_SUCCESS);
        assert_eq!(location.query.get("cvId").map(String::as_str), Some("abc"));
        assert_eq!(location.query.get("action").map(String::as_str), Some("download"));
    }

    #[test]
    fn test_paths() {
        let id = CvId::new(ID).unwrap();
        assert_eq!(editor_path(&id), format!("/editor/{ID}"));
        assert_eq!(view_path(&id), format!("/view/{ID}"));
    }
}
