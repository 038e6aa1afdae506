//! Admission and scheduling core for a multi-threaded HTTP/1.0 origin
//! server: bounded producer/consumer queue with selectable FIFO/SFF
//! discipline, acceptor/worker topology, and the per-request handler
//! state machine (static files, GET CGI, POST CGI).

pub mod cgi;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod net;
pub mod pool;
pub mod queue;
pub mod http;
