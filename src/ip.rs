/// Client address extraction for posting and moderation
///
/// Posts, bans, and audit entries are all keyed to the client address, so
/// getting it right behind proxies matters more here than usual.

use actix_web::HttpRequest;
use std::net::IpAddr;

/// Extract the real client IP address from an HTTP request.
///
/// Checks headers in order of preference:
/// 1. X-Forwarded-For (first IP in the list)
/// 2. X-Real-IP
/// 3. Remote peer address
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    // Check X-Forwarded-For header (proxy chains)
    if let Some(xff) = req.headers().get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // Take the first IP in the chain (the original client)
            if let Some(first_ip) = xff_str.split(',').next() {
                let trimmed = first_ip.trim();
                if trimmed.parse::<IpAddr>().is_ok() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }

    // Check X-Real-IP header (nginx, etc.)
    if let Some(xri) = req.headers().get("x-real-ip") {
        if let Ok(xri_str) = xri.to_str() {
            let trimmed = xri_str.trim();
            if trimmed.parse::<IpAddr>().is_ok() {
                return Some(trimmed.to_string());
            }
        }
    }

    // Fall back to peer address
    if let Some(peer_addr) = req.peer_addr() {
        return Some(peer_addr.ip().to_string());
    }

    None
}

/// Country code for flag display, when an edge proxy supplies one.
/// Geolocation itself happens upstream; we only trust the header.
pub fn extract_country_code(req: &HttpRequest) -> Option<String> {
    for header in ["cf-ipcountry", "x-country-code"] {
        if let Some(value) = req.headers().get(header) {
            if let Ok(code) = value.to_str() {
                let code = code.trim().to_uppercase();
                if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Some(code);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_parses_valid_ipv4() {
        let ip = "192.168.1.1";
        assert!(ip.parse::<IpAddr>().is_ok());
    }

    #[test]
    fn test_extract_ip_parses_valid_ipv6() {
        let ip = "2001:0db8:85a3:0000:0000:8a2e:0370:7334";
        assert!(ip.parse::<IpAddr>().is_ok());
    }
}
