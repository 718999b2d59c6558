//! The renderer handoff: a mutex/condvar pair carrying the most recent
//! frame snapshot to a worker thread that owns the display surface.
//!
//! The producer publishes after each batch of terminal mutations; the
//! worker only ever renders the latest snapshot, so bursts coalesce.
//! Unconsumed damage windows are merged across coalesced publishes so a
//! skipped snapshot can never leave stale cells on screen.

use crate::cell::{Cell, CellFlags};
use crate::frame::Frame;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Where cells become pixels.  Implementations own their cell buffer
/// (the visible area in row-major order); `present` is called after the
/// buffer has been delta-updated, with the frame supplying cursor,
/// selection and geometry state.
pub trait RenderSurface: Send {
    fn resize(&mut self, n_cols: usize, n_rows: usize);
    fn cells(&mut self) -> &mut [Cell];
    fn present(&mut self, frame: &Frame);
}

struct Handoff {
    frame: Frame,
    seq_no: u64,
    done: bool,
}

pub struct Renderer {
    shared: Arc<(Mutex<Handoff>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl Renderer {
    pub fn new(surface: Box<dyn RenderSurface>) -> Renderer {
        let shared = Arc::new((
            Mutex::new(Handoff {
                frame: Frame::new(1, 1, 0),
                seq_no: 0,
                done: false,
            }),
            Condvar::new(),
        ));
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("renderer".into())
            .spawn(move || render_thread(worker_shared, surface))
            .expect("failed to spawn renderer thread");
        Renderer {
            shared,
            worker: Some(worker),
        }
    }

    /// Publish a frame snapshot (see [`crate::vterm::Vterm::take_frame`])
    /// and wake the worker.  If the previous snapshot was never
    /// rendered, its damage window is folded into this one.
    pub fn update(&self, mut frame: Frame) {
        let (lock, cond) = &*self.shared;
        {
            let mut shared = lock.lock().unwrap();
            frame.widen_damage(&shared.frame);
            shared.seq_no += 1;
            frame.seq_no = shared.seq_no;
            shared.frame = frame;
        }
        cond.notify_one();
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let (lock, cond) = &*self.shared;
        {
            let mut shared = lock.lock().unwrap();
            shared.done = true;
            shared.seq_no += 1;
        }
        cond.notify_one();
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

fn render_thread(shared: Arc<(Mutex<Handoff>, Condvar)>, mut surface: Box<dyn RenderSurface>) {
    let (lock, cond) = &*shared;
    let mut last_seq = 0u64;
    let mut geometry = (0usize, 0usize);

    loop {
        let frame = {
            let guard = lock.lock().unwrap();
            let mut guard = cond
                .wait_while(guard, |h| !h.done && h.seq_no == last_seq)
                .unwrap();
            if guard.done {
                return;
            }
            last_seq = guard.seq_no;
            let frame = guard.frame.clone();
            guard.frame.reset_damage();
            frame
        };

        if (frame.n_cols, frame.n_rows) != geometry {
            geometry = (frame.n_cols, frame.n_rows);
            surface.resize(frame.n_cols, frame.n_rows);
            frame.full_copy_cells(surface.cells());
            for cell in surface.cells().iter_mut() {
                cell.flags |= CellFlags::DIRTY;
            }
        } else {
            frame.delta_copy_cells(surface.cells());
        }

        surface.present(&frame);
    }
}
