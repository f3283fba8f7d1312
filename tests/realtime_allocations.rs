use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pod_onset::{DetectorConfig, EventSink, OnsetDetector, OnsetEvent};

struct CountingAllocator;

static TRACK_ALLOCATIONS: AtomicBool = AtomicBool::new(false);
static ALLOC_CALLS: AtomicUsize = AtomicUsize::new(0);
static ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
static REALLOC_CALLS: AtomicUsize = AtomicUsize::new(0);
static REALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: CountingAllocator = CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if TRACK_ALLOCATIONS.load(Ordering::Relaxed) {
            ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
            ALLOC_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if TRACK_ALLOCATIONS.load(Ordering::Relaxed) {
            ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
            ALLOC_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let out = unsafe { System.realloc(ptr, layout, new_size) };
        if TRACK_ALLOCATIONS.load(Ordering::Relaxed) {
            REALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
            REALLOC_BYTES.fetch_add(new_size, Ordering::Relaxed);
        }
        out
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

fn reset_alloc_counters() {
    ALLOC_CALLS.store(0, Ordering::Relaxed);
    ALLOC_BYTES.store(0, Ordering::Relaxed);
    REALLOC_CALLS.store(0, Ordering::Relaxed);
    REALLOC_BYTES.store(0, Ordering::Relaxed);
}

fn begin_alloc_tracking() {
    reset_alloc_counters();
    TRACK_ALLOCATIONS.store(true, Ordering::SeqCst);
}

fn end_alloc_tracking() -> (usize, usize, usize, usize) {
    TRACK_ALLOCATIONS.store(false, Ordering::SeqCst);
    (
        ALLOC_CALLS.load(Ordering::Relaxed),
        REALLOC_CALLS.load(Ordering::Relaxed),
        ALLOC_BYTES.load(Ordering::Relaxed),
        REALLOC_BYTES.load(Ordering::Relaxed),
    )
}

/// Counts events without storing them.
#[derive(Default)]
struct CountingSink {
    hops: usize,
    onsets: usize,
}

impl EventSink for CountingSink {
    fn on_flux(&mut self, _hop_index: u64, _flux: f32) {
        self.hops += 1;
    }

    fn on_onset(&mut self, _event: &OnsetEvent) {
        self.onsets += 1;
    }
}

/// Clicks every `period` samples over a quiet 95 Hz hum.
fn test_signal(frames: usize, period: usize, sample_rate: f32) -> Vec<f32> {
    (0..frames)
        .map(|n| {
            let t = n as f32 / sample_rate;
            let hum = 0.05 * (2.0 * std::f32::consts::PI * 95.0 * t).sin();
            if n % period == 0 {
                hum + 0.9
            } else {
                hum
            }
        })
        .collect()
}

#[test]
fn process_into_steady_state_does_not_allocate() {
    const SAMPLE_RATE: f32 = 44_100.0;
    const WARMUP_FRAMES: usize = 8_192;

    let scenarios: [(DetectorConfig, usize); 4] = [
        (DetectorConfig::default(), 64),
        (DetectorConfig::default().with_threshold_scales(4.0, 1.0), 128),
        (
            DetectorConfig::default()
                .with_window_size(2048)
                .with_hop_size(512),
            1024,
        ),
        (DetectorConfig::default().with_hop_size(64), 32),
    ];

    for (config, block) in scenarios {
        let mut detector = OnsetDetector::new(config).unwrap();
        let signal = test_signal(SAMPLE_RATE as usize * 2, 11_025, SAMPLE_RATE);
        let (warmup, measured) = signal.split_at(WARMUP_FRAMES);
        let mut sink = CountingSink::default();

        for chunk in warmup.chunks(block) {
            detector.process_into(chunk, &mut sink);
        }

        begin_alloc_tracking();
        for chunk in measured.chunks(block) {
            detector.process_into(chunk, &mut sink);
        }
        let (alloc_calls, realloc_calls, alloc_bytes, realloc_bytes) = end_alloc_tracking();

        assert!(sink.hops > 0);
        assert!(sink.onsets > 0, "block {}: no onsets exercised", block);
        assert_eq!(
            alloc_calls + realloc_calls,
            0,
            "block {}: steady-state process_into allocated: alloc_calls={}, realloc_calls={}, alloc_bytes={}, realloc_bytes={}",
            block,
            alloc_calls,
            realloc_calls,
            alloc_bytes,
            realloc_bytes
        );
    }
}
