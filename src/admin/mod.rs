//! Management Surface Module
//!
//! Operability hooks exposed over HTTP: a diagnostic smoke-test job, starting and stopping
//! inbound transport delivery, node status, and job submission through the transport.
//!
//! Every operation answers with `success`/`error` JSON; failures never alter queued-job
//! semantics.

pub mod handlers;
pub mod protocol;
pub mod service;

pub use service::AdminService;
