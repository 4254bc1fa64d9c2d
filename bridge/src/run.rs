use std::future::Future;

use chess_link::{BitLink, LinkError, LinkStage, SignalLines};
use engine::EngineAdapter;

use crate::coordinator::GameCoordinator;
use crate::error::CoordinatorError;

/// Serve the board until `shutdown` resolves or the lines fail.
///
/// Brings the link up once, then loops receive → handle → transmit. Lost
/// frames, bad frames and engine failures are logged and the loop carries on;
/// only a line-level fault ends it with an error.
pub async fn run<L, E, S>(
    link: &mut BitLink<L>,
    coordinator: &mut GameCoordinator<E>,
    shutdown: S,
) -> Result<(), LinkError>
where
    L: SignalLines,
    E: EngineAdapter,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = serve(link, coordinator) => result,
        _ = shutdown => {
            tracing::info!("Shutdown requested, stopping link");
            Ok(())
        }
    }
}

async fn serve<L, E>(
    link: &mut BitLink<L>,
    coordinator: &mut GameCoordinator<E>,
) -> Result<(), LinkError>
where
    L: SignalLines,
    E: EngineAdapter,
{
    link.bring_up().await?;
    let width = coordinator.layout().inbound_width();

    loop {
        let frame = match link.receive(width).await {
            Ok(frame) => Some(frame),
            Err(LinkError::SyncLost {
                stage: LinkStage::Armed,
                ..
            }) => {
                tracing::trace!("No frame from the board");
                None
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Frame lost: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let reply = match coordinator.handle_inbound(frame).await {
            Ok(reply) => reply,
            Err(CoordinatorError::Decode(e)) => {
                tracing::warn!("Rejected frame: {}", e);
                None
            }
            Err(e) => {
                tracing::error!("Could not act on frame: {}", e);
                None
            }
        };

        if let Some(reply) = reply {
            tracing::debug!("Sending reply {}", reply);
            match link.transmit(&reply).await {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => tracing::warn!("Reply lost: {}", e),
                Err(e) => return Err(e),
            }
        }
    }
}
