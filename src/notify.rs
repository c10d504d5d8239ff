use crate::integrity::BlockStatus;
use crate::mining::AttemptResult;

/// Presentation-side observer. The core reports plain status values and
/// attempt results here and never performs terminal I/O itself; the
/// binary's renderer turns these into boxes, colors and beeps.
pub trait Notifier {
    fn block_status(&mut self, index: usize, status: BlockStatus);
    fn attempt(&mut self, index: usize, result: &AttemptResult);
}

/// Notifier that discards everything; used in tests and scripted runs.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn block_status(&mut self, _index: usize, _status: BlockStatus) {}
    fn attempt(&mut self, _index: usize, _result: &AttemptResult) {}
}
