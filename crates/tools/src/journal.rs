use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// One native call as seen by a recording renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum NativeCall {
    /// `init` was entered.
    Init { surface: u32, width: u32, height: u32 },
    /// `init` returned an error; the renderer never became live.
    InitFailed,
    /// `render` completed frame number `frame` (1-based).
    Render { frame: u64 },
    /// `pointer_event` was delivered.
    Pointer { x: f32, y: f32, pressed: bool },
    /// `destroy` returned.
    Destroy,
}

/// A journal entry: which renderer made which call, and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub renderer: u32,
    pub at_micros: u64,
    pub call: NativeCall,
}

/// Ordering violations found by [`CallJournal::check_exclusive`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExclusivityViolation {
    #[error("seq {seq}: renderer {renderer} initialized while renderer {live_with} was still live")]
    Overlap { seq: u64, renderer: u32, live_with: u32 },
    #[error("seq {seq}: renderer {renderer} rendered outside init..destroy")]
    RenderWhileNotLive { seq: u64, renderer: u32 },
    #[error("seq {seq}: renderer {renderer} initialized twice")]
    DoubleInit { seq: u64, renderer: u32 },
    #[error("seq {seq}: renderer {renderer} destroyed without being live")]
    DestroyWhileNotLive { seq: u64, renderer: u32 },
}

struct JournalInner {
    entries: Mutex<Vec<JournalEntry>>,
    changed: Condvar,
    next_renderer: AtomicU32,
    started: Instant,
}

/// Thread-safe, totally ordered log of native renderer calls.
///
/// Cloning is cheap and every clone writes to the same log.
#[derive(Clone)]
pub struct CallJournal {
    inner: Arc<JournalInner>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(JournalInner {
                entries: Mutex::new(Vec::new()),
                changed: Condvar::new(),
                next_renderer: AtomicU32::new(1),
                started: Instant::now(),
            }),
        }
    }

    /// Reserve the next renderer number (1-based, in creation order).
    pub(crate) fn next_renderer_id(&self) -> u32 {
        self.inner.next_renderer.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record(&self, renderer: u32, call: NativeCall) {
        let mut entries = self.inner.entries.lock();
        let seq = entries.len() as u64;
        let at_micros = self.inner.started.elapsed().as_micros() as u64;
        tracing::trace!(seq, renderer, ?call, "journal");
        entries.push(JournalEntry {
            seq,
            renderer,
            at_micros,
            call,
        });
        drop(entries);
        self.inner.changed.notify_all();
    }

    /// Copy of every entry so far.
    pub fn snapshot(&self) -> Vec<JournalEntry> {
        self.inner.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until `pred` holds over the entries, or `timeout` elapses.
    pub fn wait_until<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&[JournalEntry]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut entries = self.inner.entries.lock();
        loop {
            if pred(&entries) {
                return true;
            }
            if self.inner.changed.wait_until(&mut entries, deadline).timed_out() {
                return pred(&entries);
            }
        }
    }

    pub fn count(&self, pred: impl Fn(&JournalEntry) -> bool) -> usize {
        self.inner.entries.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn init_count(&self) -> usize {
        self.count(|e| matches!(e.call, NativeCall::Init { .. }))
    }

    pub fn render_count(&self) -> usize {
        self.count(|e| matches!(e.call, NativeCall::Render { .. }))
    }

    pub fn destroy_count(&self) -> usize {
        self.count(|e| e.call == NativeCall::Destroy)
    }

    pub fn pointer_count(&self) -> usize {
        self.count(|e| matches!(e.call, NativeCall::Pointer { .. }))
    }

    /// Sequence number of the first entry of `renderer` matching `pred`.
    pub fn first_seq(&self, renderer: u32, pred: impl Fn(&NativeCall) -> bool) -> Option<u64> {
        self.inner
            .entries
            .lock()
            .iter()
            .find(|e| e.renderer == renderer && pred(&e.call))
            .map(|e| e.seq)
    }

    /// Sequence number of the last entry of `renderer` matching `pred`.
    pub fn last_seq(&self, renderer: u32, pred: impl Fn(&NativeCall) -> bool) -> Option<u64> {
        self.inner
            .entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.renderer == renderer && pred(&e.call))
            .map(|e| e.seq)
    }

    /// Largest number of renderers that were live (init entered, not yet
    /// destroyed or failed) at the same time.
    pub fn max_live_renderers(&self) -> usize {
        let entries = self.inner.entries.lock();
        let mut live = BTreeSet::new();
        let mut max = 0;
        for e in entries.iter() {
            match e.call {
                NativeCall::Init { .. } => {
                    live.insert(e.renderer);
                    max = max.max(live.len());
                }
                NativeCall::InitFailed | NativeCall::Destroy => {
                    live.remove(&e.renderer);
                }
                _ => {}
            }
        }
        max
    }

    /// Verify that renderers never overlapped and every call respected the
    /// init..destroy window of its renderer.
    pub fn check_exclusive(&self) -> Result<(), ExclusivityViolation> {
        let entries = self.inner.entries.lock();
        let mut live: Option<u32> = None;
        let mut seen_init = BTreeSet::new();

        for e in entries.iter() {
            match e.call {
                NativeCall::Init { .. } => {
                    if !seen_init.insert(e.renderer) {
                        return Err(ExclusivityViolation::DoubleInit {
                            seq: e.seq,
                            renderer: e.renderer,
                        });
                    }
                    if let Some(other) = live {
                        return Err(ExclusivityViolation::Overlap {
                            seq: e.seq,
                            renderer: e.renderer,
                            live_with: other,
                        });
                    }
                    live = Some(e.renderer);
                }
                NativeCall::InitFailed => {
                    if live == Some(e.renderer) {
                        live = None;
                    }
                }
                NativeCall::Render { .. } | NativeCall::Pointer { .. } => {
                    if live != Some(e.renderer) {
                        return Err(ExclusivityViolation::RenderWhileNotLive {
                            seq: e.seq,
                            renderer: e.renderer,
                        });
                    }
                }
                NativeCall::Destroy => {
                    if live != Some(e.renderer) {
                        return Err(ExclusivityViolation::DestroyWhileNotLive {
                            seq: e.seq,
                            renderer: e.renderer,
                        });
                    }
                    live = None;
                }
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> JournalSummary {
        JournalSummary {
            renderers: self.inner.next_renderer.load(Ordering::Relaxed).saturating_sub(1),
            inits: self.init_count(),
            renders: self.render_count(),
            pointers: self.pointer_count(),
            destroys: self.destroy_count(),
            max_live: self.max_live_renderers(),
        }
    }
}

impl Default for CallJournal {
    fn default() -> Self {
        Self::new()
    }
}

/// Call totals for CLI output and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalSummary {
    pub renderers: u32,
    pub inits: usize,
    pub renders: usize,
    pub pointers: usize,
    pub destroys: usize,
    pub max_live: usize,
}

impl fmt::Display for JournalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Journal: renderers={} inits={} renders={} pointers={} destroys={} max_live={}",
            self.renderers, self.inits, self.renders, self.pointers, self.destroys, self.max_live
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(surface: u32) -> NativeCall {
        NativeCall::Init {
            surface,
            width: 10,
            height: 20,
        }
    }

    #[test]
    fn sequential_renderers_are_exclusive() {
        let j = CallJournal::new();
        j.record(1, init(1));
        j.record(1, NativeCall::Render { frame: 1 });
        j.record(1, NativeCall::Destroy);
        j.record(2, init(2));
        j.record(2, NativeCall::Render { frame: 1 });

        assert!(j.check_exclusive().is_ok());
        assert_eq!(j.max_live_renderers(), 1);
        assert_eq!(j.render_count(), 2);
        assert_eq!(j.first_seq(2, |c| matches!(c, NativeCall::Init { .. })), Some(3));
        assert_eq!(j.last_seq(1, |c| *c == NativeCall::Destroy), Some(2));
    }

    #[test]
    fn overlap_is_reported() {
        let j = CallJournal::new();
        j.record(1, init(1));
        j.record(2, init(2));

        assert_eq!(
            j.check_exclusive(),
            Err(ExclusivityViolation::Overlap {
                seq: 1,
                renderer: 2,
                live_with: 1
            })
        );
        assert_eq!(j.max_live_renderers(), 2);
    }

    #[test]
    fn render_after_destroy_is_reported() {
        let j = CallJournal::new();
        j.record(1, init(1));
        j.record(1, NativeCall::Destroy);
        j.record(1, NativeCall::Render { frame: 1 });

        assert!(matches!(
            j.check_exclusive(),
            Err(ExclusivityViolation::RenderWhileNotLive { seq: 2, .. })
        ));
    }

    #[test]
    fn failed_init_frees_the_slot() {
        let j = CallJournal::new();
        j.record(1, init(1));
        j.record(1, NativeCall::InitFailed);
        j.record(2, init(1));
        assert!(j.check_exclusive().is_ok());
        assert_eq!(j.max_live_renderers(), 1);
    }

    #[test]
    fn wait_until_sees_writes_from_other_threads() {
        let j = CallJournal::new();
        let writer = j.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.record(1, init(1));
        });
        assert!(j.wait_until(Duration::from_secs(5), |e| !e.is_empty()));
        t.join().unwrap();
    }

    #[test]
    fn wait_until_times_out() {
        let j = CallJournal::new();
        assert!(!j.wait_until(Duration::from_millis(20), |e| !e.is_empty()));
    }

    #[test]
    fn summary_display() {
        let j = CallJournal::new();
        j.record(1, init(1));
        let text = j.summary().to_string();
        assert!(text.contains("inits=1"));
        assert!(text.contains("max_live=1"));
    }
}
