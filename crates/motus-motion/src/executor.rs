//! Sequential waypoint execution.
//!
//! Each waypoint is commanded and awaited before the next one starts.  The
//! cancellation token is polled only between waypoints, so a cancelled call
//! always stops at a waypoint boundary.  A failed command ends the run with
//! the device's error; nothing is rolled back.

use motus_kinematics::InputEnabled;
use motus_types::{Input, MotusError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Drive `device` through `waypoints` in order.
///
/// # Errors
///
/// - [`MotusError::Cancelled`] – `cancel` fired before a waypoint was
///   commanded; waypoints already reached are not undone.
/// - The first error returned by [`InputEnabled::go_to_inputs`], as-is.
pub async fn go_to_waypoints<D: InputEnabled + ?Sized>(
    device: &D,
    waypoints: &[Vec<Input>],
    cancel: &CancellationToken,
) -> Result<(), MotusError> {
    for (index, waypoint) in waypoints.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(index, total = waypoints.len(), "waypoint execution cancelled");
            return Err(MotusError::Cancelled);
        }
        debug!(index, total = waypoints.len(), "commanding waypoint");
        if let Err(e) = device.go_to_inputs(waypoint).await {
            warn!(index, error = %e, "waypoint execution aborted");
            return Err(e);
        }
    }
    debug!(total = waypoints.len(), "waypoint execution done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every commanded waypoint; can fail or cancel on a given index.
    #[derive(Default)]
    struct Recorder {
        attempts: AtomicUsize,
        commanded: Mutex<Vec<Vec<f64>>>,
        fail_at: Option<usize>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    #[async_trait]
    impl InputEnabled for Recorder {
        async fn current_inputs(&self) -> Result<Vec<Input>, MotusError> {
            let commanded = self.commanded.lock().unwrap();
            Ok(commanded.last().map(|v| Input::from_floats(v)).unwrap_or_default())
        }

        async fn go_to_inputs(&self, goal: &[Input]) -> Result<(), MotusError> {
            let index = self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(index) {
                return Err(MotusError::device("arm1", "joint 2 stalled"));
            }
            self.commanded.lock().unwrap().push(Input::to_floats(goal));
            if let Some((after, token)) = &self.cancel_after {
                if *after == index {
                    token.cancel();
                }
            }
            Ok(())
        }
    }

    fn trajectory() -> Vec<Vec<Input>> {
        vec![
            Input::from_floats(&[0.0]),
            Input::from_floats(&[1.0]),
            Input::from_floats(&[2.0]),
        ]
    }

    #[tokio::test]
    async fn executes_every_waypoint_in_order() {
        let device = Recorder::default();
        go_to_waypoints(&device, &trajectory(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*device.commanded.lock().unwrap(), vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert_eq!(Input::to_floats(&device.current_inputs().await.unwrap()), vec![2.0]);
    }

    #[tokio::test]
    async fn empty_trajectory_is_a_no_op() {
        let device = Recorder::default();
        go_to_waypoints(&device, &[], &CancellationToken::new()).await.unwrap();
        assert!(device.commanded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_after_first_waypoint_stops_before_second() {
        let cancel = CancellationToken::new();
        let device = Recorder {
            cancel_after: Some((0, cancel.clone())),
            ..Default::default()
        };
        let err = go_to_waypoints(&device, &trajectory(), &cancel).await.unwrap_err();
        assert_eq!(err, MotusError::Cancelled);
        assert_eq!(*device.commanded.lock().unwrap(), vec![vec![0.0]]);
    }

    #[tokio::test]
    async fn cancelled_token_commands_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let device = Recorder::default();
        let err = go_to_waypoints(&device, &trajectory(), &cancel).await.unwrap_err();
        assert_eq!(err, MotusError::Cancelled);
        assert!(device.commanded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn device_failure_aborts_without_further_commands() {
        let device = Recorder {
            fail_at: Some(1),
            ..Default::default()
        };
        let err = go_to_waypoints(&device, &trajectory(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, MotusError::device("arm1", "joint 2 stalled"));
        assert_eq!(device.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(*device.commanded.lock().unwrap(), vec![vec![0.0]]);
    }
}
