#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start ticking the display countdown once per second.
    StartCountdown { seconds: u64 },
    /// Stop the display countdown ticker.
    StopCountdown,
    /// The run reached a terminal phase.
    RunFinished { succeeded: usize, failed: usize },
}
