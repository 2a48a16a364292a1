use std::collections::HashMap;
use tokio::sync::Mutex;

/// Issues trace numbers, strictly increasing and unique within a
/// `(terminal, batch)` pair, starting at 1 for every new batch.
///
/// This is the only serialization point transactions on the same terminal
/// share; everything else proceeds independently once a trace is issued.
#[derive(Debug, Default)]
pub struct TraceAllocator {
    counters: Mutex<HashMap<(String, u32), u32>>,
}

impl TraceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn next(&self, terminal_id: &str, batch_number: u32) -> u32 {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry((terminal_id.to_string(), batch_number))
            .or_insert(0);
        *counter += 1;
        *counter
    }
}
