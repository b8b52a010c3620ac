use async_trait::async_trait;

/// The daemon's registry of data bearers for one modem.
///
/// Plugins never own bearer objects; they only ask the daemon to tear all
/// of them down when the device reports that service is gone. That side
/// effect is independent of any in-flight command sequence.
#[async_trait]
pub trait BearerList: Send + Sync {
    /// Force-disconnect every active data session on the modem.
    async fn disconnect_all(&self);
}
