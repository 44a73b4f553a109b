//! User-Agent identities presented to the remote service.
//!
//! The service hands out its anti-forgery cookie to the mobile "stories"
//! client, so session bootstrap briefly switches to that identity before
//! reverting to the desktop browser string for every other request.

/// Desktop browser identity used for regular traffic.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/67.0.3396.87 Safari/537.36";

/// Mobile client identity presented while bootstrapping the anti-forgery token.
pub const STORIES_USER_AGENT: &str = "Instagram 123.0.0.21.115 (iPhone; CPU iPhone OS 11_4 like \
    Mac OS X; en_US; en-US; scale=2.00; 750x1334) AppleWebKit/605.1.15";
