use std::process::ExitCode;
use std::sync::Arc;

use log::error;

use sff_webserver::config::{self, ServerConfig};
use sff_webserver::error::{Result, ServerError};
use sff_webserver::logging;
use sff_webserver::net;
use sff_webserver::pool::{self, Entry};
use sff_webserver::queue::BoundedQueue;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match config::parse_args(args) {
        Ok(cfg) => cfg,
        Err(ServerError::Usage(msg)) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(config.verbosity) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: ServerConfig) -> Result<()> {
    let listener = net::listen(config.port).map_err(|source| ServerError::Bind {
        addr: format!("0.0.0.0:{}", config.port),
        source,
    })?;

    std::env::set_current_dir(&config.document_root).map_err(|source| ServerError::Chdir {
        path: config.document_root.clone(),
        source,
    })?;

    log::info!(
        "starting: port={} threads={} queue_capacity={} discipline={} docroot={}",
        config.port,
        config.threads,
        config.queue_capacity,
        config.discipline,
        config.document_root,
    );

    let queue: Arc<BoundedQueue<Entry>> =
        Arc::new(BoundedQueue::new(config.queue_capacity, config.discipline));

    let _workers = pool::spawn_workers(&config, Arc::clone(&queue)).map_err(|source| {
        ServerError::ThreadSpawn {
            kind: "worker",
            source,
        }
    })?;

    // The acceptor runs on the main thread; it only returns on a fatal
    // accept() failure (no graceful shutdown path otherwise).
    pool::run_acceptor(listener, queue, config.discipline)
}
