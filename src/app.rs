//! Startup orchestration: configuration, worker pool, signal handling and
//! the graceful shutdown sequence.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{error, info};

use crate::config;
use crate::gateway::{self, PendingRequest};
use crate::handler::AppContext;
use crate::logger::EventLog;
use crate::queue::RequestQueue;
use crate::ratelimit::RateLimiter;
use crate::worker;

const QUEUE_CAPACITY: usize = 256;
const SHUTDOWN_POLL_MS: u64 = 200;

// Published by the signal handler, observed by the accept side and the
// shutdown loop.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

pub struct App {
    config_path: PathBuf,
}

impl App {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    pub fn run(self) {
        let config = match config::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                process::exit(1);
            }
        };

        let events = match EventLog::open(&config.log_path) {
            Ok(events) => Arc::new(events),
            Err(e) => {
                error!("Failed to open log file {:?}: {}", config.log_path, e);
                process::exit(1);
            }
        };

        let nthreads = config.nthreads;
        let ctx = Arc::new(AppContext {
            limiter: RateLimiter::new(config.auth_per_second),
            events,
            config,
        });

        let queue: RequestQueue<PendingRequest> = RequestQueue::new(QUEUE_CAPACITY);
        let workers = match worker::spawn(nthreads, &queue, &ctx) {
            Ok(workers) => workers,
            Err(e) => {
                error!("Failed to spawn worker threads: {}", e);
                process::exit(1);
            }
        };

        unsafe {
            let handler = on_signal as extern "C" fn(libc::c_int);
            libc::signal(libc::SIGINT, handler as libc::sighandler_t);
            libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
            libc::signal(libc::SIGPIPE, libc::SIG_IGN);
        }

        let accept_queue = queue.clone();
        let accept = thread::Builder::new()
            .name("gateway".to_string())
            .spawn(move || gateway::serve(accept_queue, &SHUTDOWN));
        if let Err(e) = accept {
            error!("Failed to start gateway thread: {}", e);
            process::exit(1);
        }

        info!("All workers up, serving until SIGINT/SIGTERM");
        while !SHUTDOWN.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(SHUTDOWN_POLL_MS));
        }

        info!("Signal caught, starting shutdown");
        queue.close(nthreads);
        for handle in workers {
            let _ = handle.join();
        }

        // The gateway thread has no cooperative stop; it dies with the
        // process once the workers are drained.
        info!("All clear, service is down");
    }
}
