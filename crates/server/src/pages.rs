//! Page routes
//!
//! Every page is rendered client-side from the same `index.html`; the
//! server owns the path table and the admin guard. A route flagged
//! `requires_admin` is only served to allow-listed sessions, everyone else
//! is redirected to `/`.

use crate::auth::CurrentSession;
use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Redirect, Response},
};
use logbook_feed::{AdminList, Session};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRoute {
    pub path: &'static str,
    pub name: &'static str,
    pub requires_admin: bool,
}

impl PageRoute {
    const fn public(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            requires_admin: false,
        }
    }
}

pub const ROUTES: &[PageRoute] = &[
    PageRoute::public("/", "home"),
    PageRoute::public("/posts", "posts"),
    PageRoute::public("/logbook", "logbook"),
    PageRoute::public("/proposal", "proposal"),
    PageRoute::public("/updates", "updates"),
    PageRoute::public("/demo", "demo"),
    PageRoute::public("/report", "report"),
];

/// Where a navigation ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(&'static str),
}

pub fn find_route(path: &str) -> Option<&'static PageRoute> {
    ROUTES.iter().find(|r| r.path == path)
}

pub fn guard(route: &PageRoute, session: &Session, admins: &AdminList) -> Navigation {
    if !route.requires_admin || admins.is_admin(session) {
        Navigation::Proceed
    } else {
        Navigation::Redirect("/")
    }
}

const FALLBACK_SHELL: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Logbook</title>
  </head>
  <body>
    <div id="app"></div>
  </body>
</html>
"#;

/// GET for every path in `ROUTES`.
pub async fn serve_page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    uri: Uri,
) -> Result<Response> {
    let route = find_route(uri.path()).ok_or(Error::NotFound)?;

    if let Navigation::Redirect(to) = guard(route, &session, state.store.admins()) {
        debug!("Guarded page {} redirected to {}", route.name, to);
        return Ok(Redirect::to(to).into_response());
    }

    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) => {
            warn!("Serving built-in shell, {:?} unreadable: {}", index, e);
            Ok(Html(FALLBACK_SHELL).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logbook_feed::Identity;

    fn admin_route() -> PageRoute {
        PageRoute {
            path: "/admin",
            name: "admin",
            requires_admin: true,
        }
    }

    fn session(email: &str) -> Session {
        Session::authenticated(Identity::new("u", Some(email.to_string()), "t"))
    }

    #[test]
    fn test_route_table() {
        assert_eq!(ROUTES.len(), 7);
        assert_eq!(find_route("/report").map(|r| r.name), Some("report"));
        assert!(find_route("/admin").is_none());
        assert!(find_route("/posts/1").is_none());
    }

    #[test]
    fn test_public_routes_always_proceed() {
        let admins = AdminList::new(["osalirab@gmail.com"]);
        for route in ROUTES {
            assert_eq!(
                guard(route, &Session::anonymous(), &admins),
                Navigation::Proceed
            );
        }
    }

    #[test]
    fn test_guarded_route() {
        let admins = AdminList::new(["osalirab@gmail.com"]);
        let route = admin_route();

        assert_eq!(
            guard(&route, &session("osalirab@gmail.com"), &admins),
            Navigation::Proceed
        );
        assert_eq!(
            guard(&route, &session("Osalirab@gmail.com"), &admins),
            Navigation::Redirect("/")
        );
        assert_eq!(
            guard(&route, &Session::anonymous(), &admins),
            Navigation::Redirect("/")
        );
    }
}
