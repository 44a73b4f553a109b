#![allow(dead_code)]

pub mod socket_guard;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use profile_scraper_core::ServiceEndpoints;

pub const ROOT_TOKEN: &str = "root-token";

/// Endpoints rooted at the mock server.
pub fn endpoints_for(server: &MockServer) -> ServiceEndpoints {
    ServiceEndpoints::from_base_url(&format!("{}/", server.uri()))
}

/// Serves the service root with the anti-forgery cookie.
pub async fn mount_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", format!("csrftoken={ROOT_TOKEN}; Path=/"))
                .append_header("set-cookie", "mid=abc123; Path=/")
                .set_body_string("<html></html>"),
        )
        .mount(server)
        .await;
}

/// A complete profile payload for `username`.
pub fn profile_body(username: &str, followers: u64) -> serde_json::Value {
    serde_json::json!({
        "graphql": {
            "user": {
                "biography": format!("bio of {username}"),
                "edge_followed_by": {"count": followers},
                "edge_follow": {"count": 12},
                "full_name": username.to_uppercase(),
                "id": "1001",
                "is_business_account": false,
                "is_joined_recently": true,
                "is_private": false,
                "edge_owner_to_timeline_media": {"count": 7},
                "profile_pic_url": "https://cdn.example.com/pic.jpg"
            }
        }
    })
}
