//! Acceptor / worker topology: one acceptor thread producing into the
//! bounded queue, and `T` worker threads draining it.

use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::info;

use crate::config::{Discipline, ServerConfig};
use crate::error::{Result, ServerError};
use crate::handler;
use crate::net::{self, Connection};
use crate::queue::{BoundedQueue, Weighted};

/// One accepted-but-not-yet-served connection, carrying the scheduling
/// weight SFF needs to rank it.
pub struct Entry {
    pub conn: Connection,
    pub weight: i64,
}

impl Weighted for Entry {
    fn weight(&self) -> i64 {
        self.weight
    }
}

/// Runs the acceptor loop: accept, optionally peek a weight, and enqueue.
/// Never touches the connection again after it's enqueued. An `accept`
/// failure is an infrastructure error, not a routine per-client condition,
/// so it aborts the loop rather than being logged and retried.
pub fn run_acceptor(listener: TcpListener, queue: Arc<BoundedQueue<Entry>>, discipline: Discipline) -> Result<()> {
    info!("acceptor listening on {:?}", listener.local_addr());

    loop {
        let conn = net::accept(&listener).map_err(|source| ServerError::Accept { source })?;

        let weight = match discipline {
            Discipline::Sff => handler::peek_weight(&conn),
            Discipline::Fifo => 0, // FIFO ignores weight.
        };

        queue.enqueue(Entry { conn, weight });
    }
}

/// Runs one worker's loop forever: dequeue, handle, drop (closing the
/// connection). Workers never share per-request state.
pub fn run_worker(id: usize, queue: Arc<BoundedQueue<Entry>>) -> ! {
    info!("worker {id} started");

    loop {
        let mut entry = queue.dequeue();
        handler::handle_connection(&mut entry.conn);
        // `entry` drops here, closing the connection.
    }
}

/// Spawns `config.threads` worker threads. The acceptor is left to the
/// caller to run on its own thread — this just spawns the worker pool.
pub fn spawn_workers(
    config: &ServerConfig,
    queue: Arc<BoundedQueue<Entry>>,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    (0..config.threads)
        .map(|id| {
            let queue = Arc::clone(&queue);
            thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || run_worker(id, queue))
        })
        .collect()
}
