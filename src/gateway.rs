//! Accept side of the service.
//!
//! The FastCGI wire protocol is handled by the `fastcgi` crate; this module
//! only decodes the request environment into a [`RequestRecord`], hands it
//! to the worker pool through the shared queue, and writes back whatever
//! response the worker produced. The underlying request is released exactly
//! once on every path when the per-request closure returns.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use log::{debug, warn};

use crate::queue::RequestQueue;
use crate::request::RequestRecord;
use crate::response::Response;

/// Bodies beyond this are truncated before form parsing.
pub const MAX_BODY_SIZE: usize = 4 * 1024;

const ENV_KEYS: &[&str] = &[
    "REQUEST_METHOD",
    "DOCUMENT_URI",
    "QUERY_STRING",
    "HTTP_HOST",
    "HTTP_COOKIE",
    "REMOTE_ADDR",
    "CONTENT_LENGTH",
];

/// A decoded request waiting in the queue, paired with the channel the
/// worker answers on.
pub struct PendingRequest {
    pub record: RequestRecord,
    reply: mpsc::SyncSender<Vec<u8>>,
}

impl PendingRequest {
    pub fn new(record: RequestRecord) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (reply, done) = mpsc::sync_channel(1);
        (Self { record, reply }, done)
    }

    /// Answers the waiting gateway thread. Consumes the request so a worker
    /// cannot reply twice.
    pub fn finish(self, response: &Response) {
        let _ = self.reply.send(response.serialize());
    }
}

/// Runs the gateway accept loop. Each accepted request is decoded, queued
/// and answered; once `shutdown` is set no new work is taken.
///
/// Never returns; on shutdown the process exits after the workers drain.
pub fn serve(queue: RequestQueue<PendingRequest>, shutdown: &'static AtomicBool) {
    fastcgi::run(move |mut raw| {
        if shutdown.load(Ordering::SeqCst) {
            write_out(&mut raw, &Response::plain(503, "Service is shutting down"));
            return;
        }

        let record = decode(&mut raw);
        debug!("accepted {} {}", record.method, record.uri);

        let (pending, done) = PendingRequest::new(record);
        if !queue.push(pending) {
            write_out(&mut raw, &Response::plain(503, "Service is shutting down"));
            return;
        }

        match done.recv() {
            Ok(bytes) => {
                if let Err(e) = raw.stdout().write_all(&bytes) {
                    warn!("failed to write response: {e}");
                }
            }
            Err(_) => {
                // The worker dropped the request without answering.
                write_out(&mut raw, &Response::plain(500, "Internal server error"));
            }
        }
    });
}

fn decode(raw: &mut fastcgi::Request) -> RequestRecord {
    let mut env = HashMap::new();
    for key in ENV_KEYS {
        if let Some(value) = raw.param(key) {
            env.insert((*key).to_string(), value);
        }
    }

    let announced: usize = env
        .get("CONTENT_LENGTH")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let capped = announced.min(MAX_BODY_SIZE);

    let mut body = Vec::with_capacity(capped);
    if let Err(e) = raw.stdin().take(capped as u64).read_to_end(&mut body) {
        warn!("failed to read request body: {e}");
        body.clear();
    }

    RequestRecord::from_env(&env, &body)
}

fn write_out(raw: &mut fastcgi::Request, response: &Response) {
    if let Err(e) = raw.stdout().write_all(&response.serialize()) {
        warn!("failed to write response: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_request_round_trip() {
        let (pending, done) = PendingRequest::new(RequestRecord::default());
        pending.finish(&Response::plain(200, "ok"));
        let bytes = done.recv().unwrap();
        assert!(bytes.starts_with(b"Status: 200\r\n"));
    }

    #[test]
    fn test_dropped_request_errors_the_receiver() {
        let (pending, done) = PendingRequest::new(RequestRecord::default());
        drop(pending);
        assert!(done.recv().is_err());
    }
}
