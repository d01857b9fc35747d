use crate::foundation::core::PixelRect;

/// Receives the canvas rectangle touched by every edit, undo and redo.
pub trait CanvasObserver {
    /// `rect` is in canvas coordinates and may extend past the canvas.
    fn region_changed(&mut self, rect: PixelRect);
}

impl<F> CanvasObserver for F
where
    F: FnMut(PixelRect),
{
    fn region_changed(&mut self, rect: PixelRect) {
        self(rect)
    }
}

/// Observer that keeps every notification, for tests and tooling.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    log: std::sync::Arc<std::sync::Mutex<Vec<PixelRect>>>,
}

impl RecordingObserver {
    /// New, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangles received so far.
    pub fn rects(&self) -> Vec<PixelRect> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Forget recorded rectangles.
    pub fn clear(&self) {
        if let Ok(mut l) = self.log.lock() {
            l.clear();
        }
    }
}

impl CanvasObserver for RecordingObserver {
    fn region_changed(&mut self, rect: PixelRect) {
        if let Ok(mut l) = self.log.lock() {
            l.push(rect);
        }
    }
}
