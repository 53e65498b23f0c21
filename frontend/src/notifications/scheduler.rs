use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::notifications::engine::{EngineState, FetchOutcome, NotificationSyncEngine, SyncError};
use crate::utils::runtime::{sleep, spawn_local};

/// Owner's grip on a running auto-refresh loop.
///
/// Dropping or cancelling the handle stops the loop and detaches the inbox,
/// so a page still in flight is thrown away when it lands. Starting a new
/// loop on the same engine retires the old handle without detaching.
#[must_use = "dropping the handle stops auto-refresh and detaches the inbox"]
pub struct AutoRefreshHandle {
    stopped: Rc<Cell<bool>>,
    detached: Rc<Cell<bool>>,
    engine: Weak<RefCell<EngineState>>,
}

impl AutoRefreshHandle {
    pub fn is_active(&self) -> bool {
        !self.stopped.get()
    }

    pub fn cancel(self) {}
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        if self.stopped.replace(true) {
            return;
        }
        // Responses in flight check this flag before they are applied.
        self.detached.set(true);
        if let Some(engine) = self.engine.upgrade() {
            match engine.try_borrow_mut() {
                Ok(mut state) => state.detach(),
                Err(_) => log::debug!("inbox busy on cancel; listeners are kept until teardown"),
            }
        }
        log::debug!("notification auto-refresh cancelled");
    }
}

impl NotificationSyncEngine {
    /// Runs [`tick`](Self::tick) every `period` until the returned handle
    /// goes away or the engine is torn down.
    pub fn start_auto_refresh(&self, period: Duration) -> AutoRefreshHandle {
        let stopped = Rc::new(Cell::new(false));
        let detached = {
            let mut state = self.inner.borrow_mut();
            if let Some(previous) = state.timer.replace(stopped.clone()) {
                previous.set(true);
            }
            state.detached.clone()
        };

        let engine = self.clone();
        let flag = stopped.clone();
        spawn_local(async move {
            loop {
                sleep(period).await;
                if flag.get() {
                    break;
                }
                match engine.tick().await {
                    Ok(FetchOutcome::Skipped) => {
                        log::debug!("auto-refresh tick skipped: inbox busy");
                    }
                    Ok(_) => {}
                    Err(SyncError::Detached) => break,
                    Err(err) => log::warn!("auto-refresh failed: {}", err),
                }
            }
            log::debug!("notification auto-refresh loop finished");
        });

        AutoRefreshHandle {
            stopped,
            detached,
            engine: Rc::downgrade(&self.inner),
        }
    }
}
