//! Request dispatch: `/auth`, `/login`, `/logout` and everything the state
//! machine around them needs.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{HostConfig, ServerConfig};
use crate::cookie;
use crate::logger::EventLog;
use crate::ratelimit::RateLimiter;
use crate::request::RequestRecord;
use crate::response::Response;
use crate::templates;
use crate::totp;

/// Shared state handed to every worker: immutable configuration plus the
/// internally synchronized limiter and event log.
pub struct AppContext {
    pub config: ServerConfig,
    pub limiter: RateLimiter,
    pub events: Arc<EventLog>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `atoi`-style code parse: leading decimal digits, 0 when there are none.
fn parse_code(s: &str) -> u32 {
    s.chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

fn follow_page(req: &RequestRecord) -> String {
    // Never redirect to an empty location; fall back to the index.
    [req.getvars.get("follow_page"), req.postvars.get("follow_page")]
        .into_iter()
        .flatten()
        .find(|p| !p.is_empty())
        .cloned()
        .unwrap_or_else(|| "/".to_string())
}

/// Routes one decoded request to a complete response. Never panics on
/// malformed input; anything unparseable is treated as absent.
pub fn dispatch(ctx: &AppContext, req: &RequestRecord) -> Response {
    let Some(host) = ctx.config.webs.get(&req.host) else {
        ctx.events.log(&format!("Failed to find host '{}'", req.host));
        return Response::plain(500, &format!("Unknown hostname: {}", req.host));
    };

    match req.uri.as_str() {
        "/auth" => auth(ctx, req, host),
        "/login" => login(ctx, req, host),
        "/logout" => logout(ctx),
        _ => {
            ctx.events.log(&format!("Unknown request for URL: {}", req.uri));
            Response::plain(404, "Not found, valid endpoints: /auth /login /logout")
        }
    }
}

fn auth(ctx: &AppContext, req: &RequestRecord, host: &HostConfig) -> Response {
    let token = req
        .cookies
        .get(cookie::COOKIE_NAME)
        .map(String::as_str)
        .unwrap_or("");

    if cookie::verify(token, host, &ctx.config.secret, unix_now()) {
        ctx.events.log("Requested authentication succeeded");
        Response::plain(200, "Authentication Succeeded")
    } else {
        ctx.events.log("Requested authentication denied");
        Response::plain(401, "Authentication Denied")
    }
}

fn login(ctx: &AppContext, req: &RequestRecord, host: &HostConfig) -> Response {
    let follow = follow_page(req);

    if !ctx.limiter.try_consume(req.ip64) {
        ctx.events
            .log(&format!("Rate limit hit for ip id {}", req.ip64));
        return Response::plain(429, "Too many requests, request blocked");
    }

    let mut error = false;
    if req.method == "POST" {
        let user = req.postvars.get("username").map(String::as_str).unwrap_or("");
        let pass = req.postvars.get("password").map(String::as_str).unwrap_or("");
        let code = parse_code(req.postvars.get("totp").map(String::as_str).unwrap_or(""));

        match host.users.get(user) {
            Some(cred)
                if cred.password == pass
                    && totp::totp_valid(cred, code, host.totp_generations, unix_now()) =>
            {
                ctx.events.log(&format!("Login successful for user {user}"));
                let token = cookie::issue(user, &ctx.config.secret, unix_now());
                return Response::redirect(&follow)
                    .with_header("Set-Cookie", &format!("{}={}", cookie::COOKIE_NAME, token));
            }
            _ => {
                ctx.events.log(&format!("Failed login for user {user}"));
                error = true;
            }
        }
    }

    match templates::lookup(&host.webtemplate) {
        Some(render) => Response::html(render(&req.host, &follow, error)),
        None => Response::plain(500, "Could not find template"),
    }
}

fn logout(ctx: &AppContext) -> Response {
    ctx.events.log("Logout requested");
    Response::redirect("/login")
        .with_header("Set-Cookie", "authentication-token=null")
        .with_header("Cache-Control", "no-cache, no-store, max-age=0")
}
