/// Broadcast over a `tokio::sync::broadcast` channel to drive graceful shutdown.
///
/// `Shutdown` asks a worker to stop accepting new work; `Finalised` is sent
/// once every other worker has acknowledged `Shutdown`, telling the last
/// stragglers that draining in-flight work should now be time-bounded rather
/// than open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
