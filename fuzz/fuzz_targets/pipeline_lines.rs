#![no_main]
use libfuzzer_sys::fuzz_target;
use texfeed_log::ir::LineKind;
use texfeed_log::{FeedbackPipeline, FileTracker, PipelineOptions, StrictTracker, TrackerKind};

fuzz_target!(|data: &[u8]| {
    // Arbitrary engine output must never panic, whatever the tracker.
    let text = String::from_utf8_lossy(data);
    for tracker in [TrackerKind::Fragment, TrackerKind::Strict] {
        let mut pipeline = FeedbackPipeline::new(PipelineOptions {
            default_file: Some("/fuzz/main.tex".to_string()),
            tracker,
            ..PipelineOptions::default()
        });
        for line in text.lines() {
            let _ = pipeline.process(line, LineKind::Output);
        }
        let _ = pipeline.finish();
    }

    let mut strict = StrictTracker::new();
    for line in text.lines() {
        if strict.consume(line).is_err() {
            break;
        }
    }
});
