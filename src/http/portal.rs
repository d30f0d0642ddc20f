//! Static page served at `/`.

use axum::{
    body::Body,
    http::{header, HeaderValue, Response},
};

use crate::config::PortalPage;

const PORTAL_HTML: &str = include_str!("../../assets/portal.html");
const NGINX_HTML: &str = include_str!("../../assets/nginx.html");

pub fn page_html(page: PortalPage) -> &'static str {
    match page {
        PortalPage::Portal => PORTAL_HTML,
        PortalPage::Nginx => NGINX_HTML,
    }
}

pub fn render(page: PortalPage) -> Response<Body> {
    let mut response = Response::new(Body::from(page_html(page)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_selection() {
        assert!(page_html(PortalPage::Portal).contains("relay-form"));
        assert!(page_html(PortalPage::Nginx).contains("Welcome to nginx!"));
    }

    #[test]
    fn test_render_sets_html_content_type() {
        let response = render(PortalPage::Nginx);
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
    }
}
