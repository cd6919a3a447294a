// 9.0: background re-pricing of open margin positions.
// one task per desk. wakes every interval, draws a fresh price for each position
// around its entry and recomputes pnl. liquidation price and leverage never move here.

use crate::margin::MarginBook;
use crate::position::MarginPosition;
use crate::price_feed::PriceSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub type SharedMarginBook = Arc<Mutex<MarginBook>>;

/// Owns the running ticker. dropping it stops the task.
#[derive(Debug)]
pub struct TickerHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl TickerHandle {
    /// Completed re-pricing passes so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancels the loop and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Quote precision for a position's price: cents against DAI, 6 decimals otherwise.
pub fn tick_precision(position: &MarginPosition) -> u32 {
    if position.quote_asset == "DAI" {
        2
    } else {
        6
    }
}

// 9.1: one pass. the book lock is held for the whole pass so a pass is atomic to readers
pub async fn tick_once<P: PriceSource>(book: &SharedMarginBook, source: &mut P) -> usize {
    let mut book = book.lock().await;
    book.reprice_all(|position| source.next_price(position.entry_price, tick_precision(position)))
}

/// Must be called inside a tokio runtime.
pub fn spawn_ticker<P>(book: SharedMarginBook, mut source: P, interval: Duration) -> TickerHandle
where
    P: PriceSource + 'static,
{
    let shutdown = CancellationToken::new();
    let ticks = Arc::new(AtomicU64::new(0));

    let token = shutdown.clone();
    let counter = Arc::clone(&ticks);
    let task = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "price ticker started");
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    info!("price ticker shutting down");
                    break;
                }
                () = tokio::time::sleep(interval) => {
                    let repriced = tick_once(&book, &mut source).await;
                    let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(tick = n, repriced, "margin positions re-priced");
                }
            }
        }
    });

    TickerHandle {
        shutdown,
        task: Some(task),
        ticks,
    }
}
