use crate::error::AppError;
use crate::models::destination::GeoPoint;
use crate::state::AppState;

pub async fn enqueue_position(state: &AppState, position: GeoPoint) -> Result<(), AppError> {
    state
        .position_tx
        .send(position)
        .await
        .map_err(|err| AppError::Internal(format!("position queue send failed: {err}")))?;

    state.metrics.positions_in_queue.inc();
    Ok(())
}
