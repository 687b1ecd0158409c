// Pipeline: input discovery, the session read cache, per-item insertion, and the batch session.

pub mod cache;
pub mod discovery;
pub mod insertion;
pub mod session;

pub use session::BatchSession;
