//! Landmark detector lifecycle.
//!
//! The detector backend is loaded lazily, once, on first use. Instead of a
//! mutable "models loaded" flag, the lifecycle is an explicit state value:
//! `Uninitialized → Loading → Ready | Failed`. Callers await readiness;
//! failure is sticky and reported on every subsequent request.

use rouge_core::{DetectorError, LandmarkDetector};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Builds the detector backend; may block (model load) and may fail.
/// Shared so the load can run on the blocking pool.
pub type DetectorFactory =
    Arc<dyn Fn() -> Result<Arc<dyn LandmarkDetector>, DetectorError> + Send + Sync>;

/// Observable lifecycle state of the detector slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DetectorState {
    Uninitialized = 0,
    Loading = 1,
    Ready = 2,
    Failed = 3,
}

impl DetectorState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::Uninitialized,
        }
    }
}

enum SlotInner {
    Pending,
    Ready(Arc<dyn LandmarkDetector>),
    Failed(String),
}

/// One-time lazy initialization around the detector factory.
///
/// The async mutex serializes initialization: the first caller runs the
/// factory while later callers await the outcome, then everyone reads the
/// memoized result.
pub struct DetectorSlot {
    factory: DetectorFactory,
    inner: Mutex<SlotInner>,
    state: AtomicU8,
}

impl DetectorSlot {
    pub fn new(factory: DetectorFactory) -> Self {
        Self {
            factory,
            inner: Mutex::new(SlotInner::Pending),
            state: AtomicU8::new(DetectorState::Uninitialized as u8),
        }
    }

    pub fn state(&self) -> DetectorState {
        DetectorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Await a ready detector, initializing on first call.
    pub async fn ready(&self) -> Result<Arc<dyn LandmarkDetector>, DetectorError> {
        let mut inner = self.inner.lock().await;
        match &*inner {
            SlotInner::Ready(detector) => Ok(Arc::clone(detector)),
            SlotInner::Failed(message) => Err(DetectorError::Unavailable(message.clone())),
            SlotInner::Pending => {
                self.state
                    .store(DetectorState::Loading as u8, Ordering::Release);
                tracing::info!("loading landmark detector backend");

                // Model loading blocks; keep it off the executor threads.
                let factory = Arc::clone(&self.factory);
                let outcome = tokio::task::spawn_blocking(move || factory()).await;

                match outcome {
                    Ok(Ok(detector)) => {
                        self.state
                            .store(DetectorState::Ready as u8, Ordering::Release);
                        tracing::info!("landmark detector ready");
                        *inner = SlotInner::Ready(Arc::clone(&detector));
                        Ok(detector)
                    }
                    Ok(Err(err)) => {
                        self.state
                            .store(DetectorState::Failed as u8, Ordering::Release);
                        tracing::error!(error = %err, "landmark detector failed to load");
                        *inner = SlotInner::Failed(err.to_string());
                        Err(DetectorError::Unavailable(err.to_string()))
                    }
                    Err(join_err) => {
                        self.state
                            .store(DetectorState::Failed as u8, Ordering::Release);
                        tracing::error!(error = %join_err, "landmark detector load task aborted");
                        *inner = SlotInner::Failed(join_err.to_string());
                        Err(DetectorError::Unavailable(join_err.to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use rouge_core::Detection;
    use std::sync::atomic::AtomicUsize;

    struct NullDetector;

    impl LandmarkDetector for NullDetector {
        fn detect(&self, _image: &RgbaImage) -> Result<Detection, DetectorError> {
            Ok(Detection::none())
        }
    }

    #[tokio::test]
    async fn test_slot_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let slot = DetectorSlot::new(Arc::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullDetector) as Arc<dyn LandmarkDetector>)
        }));

        assert_eq!(slot.state(), DetectorState::Uninitialized);
        slot.ready().await.unwrap();
        slot.ready().await.unwrap();
        assert_eq!(slot.state(), DetectorState::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "factory must run exactly once");
    }

    #[tokio::test]
    async fn test_slot_failure_is_sticky() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let slot = DetectorSlot::new(Arc::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(DetectorError::Unavailable("model file missing".into()))
        }));

        assert!(slot.ready().await.is_err());
        assert_eq!(slot.state(), DetectorState::Failed);

        let err = slot.ready().await.unwrap_err();
        assert!(err.to_string().contains("model file missing"));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "failed factory must not rerun");
    }

    #[tokio::test]
    async fn test_slow_load_does_not_stall_runtime() {
        let slot = DetectorSlot::new(Arc::new(|| {
            std::thread::sleep(std::time::Duration::from_millis(100));
            Ok(Arc::new(NullDetector) as Arc<dyn LandmarkDetector>)
        }));

        let ticked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&ticked);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
        });

        slot.ready().await.unwrap();
        assert!(
            ticked.load(Ordering::SeqCst),
            "runtime must keep making progress while the model loads"
        );
        timer.await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_load_marks_slot_failed() {
        let slot = DetectorSlot::new(Arc::new(|| panic!("corrupt model bundle")));

        assert!(slot.ready().await.is_err());
        assert_eq!(slot.state(), DetectorState::Failed);
        assert!(slot.ready().await.is_err(), "aborted load must stay sticky");
    }
}
