//! Worker pool: N threads popping from the shared queue and answering
//! requests until the queue closes.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::gateway::PendingRequest;
use crate::handler::{self, AppContext};
use crate::queue::RequestQueue;
use crate::response::Response;

/// Spawns `count` workers over the queue. Handles are joined at shutdown
/// after the queue closes.
pub fn spawn(
    count: usize,
    queue: &RequestQueue<PendingRequest>,
    ctx: &Arc<AppContext>,
) -> io::Result<Vec<JoinHandle<()>>> {
    (0..count)
        .map(|i| {
            let queue = queue.clone();
            let ctx = Arc::clone(ctx);
            thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || run(&queue, &ctx))
        })
        .collect()
}

fn run(queue: &RequestQueue<PendingRequest>, ctx: &Arc<AppContext>) {
    while let Some(job) = queue.pop() {
        // No panic escapes a worker: the request gets a 500 and the thread
        // stays in the pool.
        let response =
            panic::catch_unwind(AssertUnwindSafe(|| handler::dispatch(ctx, &job.record)))
                .unwrap_or_else(|_| {
                    error!("request handler panicked, answering 500");
                    Response::plain(500, "Internal server error")
                });
        job.finish(&response);
    }
    debug!("queue closed, worker exiting");
}
