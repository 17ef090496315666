//! Bounded FIFO between the accept side and the worker pool.
//!
//! `push` blocks while the queue is full, `pop` blocks while it is empty,
//! and `close` makes every worker's next `pop` (after the backlog drains)
//! return `None` so the pool can exit cleanly.

use crossbeam_channel::{Receiver, Sender, bounded};

enum Message<T> {
    Job(T),
    Shutdown,
}

pub struct RequestQueue<T> {
    tx: Sender<Message<T>>,
    rx: Receiver<Message<T>>,
}

// Hand-written so T does not need Clone.
impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> RequestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Enqueues a job, blocking while the queue is full. Returns false when
    /// the queue can no longer accept work.
    pub fn push(&self, job: T) -> bool {
        self.tx.send(Message::Job(job)).is_ok()
    }

    /// Dequeues the next job, blocking while the queue is empty. `None`
    /// means the queue was closed and the backlog ahead of the sentinel is
    /// drained: the worker should exit.
    pub fn pop(&self) -> Option<T> {
        match self.rx.recv() {
            Ok(Message::Job(job)) => Some(job),
            Ok(Message::Shutdown) | Err(_) => None,
        }
    }

    /// Closes the queue for `workers` consumers. Jobs already queued are
    /// still delivered first.
    pub fn close(&self, workers: usize) {
        for _ in 0..workers {
            let _ = self.tx.send(Message::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let q = RequestQueue::new(8);
        assert!(q.push(1));
        assert!(q.push(2));
        assert!(q.push(3));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn test_close_drains_backlog_first() {
        let q = RequestQueue::new(8);
        q.push(10);
        q.push(11);
        q.close(2);

        assert_eq!(q.pop(), Some(10));
        assert_eq!(q.pop(), Some(11));
        assert_eq!(q.pop(), None);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let q = RequestQueue::new(1);
        let q2 = q.clone();
        let consumer = thread::spawn(move || q2.pop());

        thread::sleep(Duration::from_millis(50));
        assert!(q.push(42));
        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn test_many_workers_one_sentinel_each() {
        let q: RequestQueue<u32> = RequestQueue::new(4);
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let q = q.clone();
                thread::spawn(move || {
                    let mut seen = 0;
                    while q.pop().is_some() {
                        seen += 1;
                    }
                    seen
                })
            })
            .collect();

        for i in 0..12 {
            assert!(q.push(i));
        }
        q.close(3);

        let total: u32 = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(total, 12, "every queued job is processed before exit");
    }
}
