//! End-to-end tests for the async writer
//!
//! Drives the full pipeline (facade -> pool -> queue -> drainer -> staging ->
//! sink) against well-behaved, slow, faulty, and panicking sinks.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use drainpipe::{AsyncWriter, Callback, Config, Error};

/// Sink appending into a shared byte vector
#[derive(Clone, Default)]
struct SharedSink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl SharedSink {
    fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that fails every write
struct FaultySink;

impl Write for FaultySink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "sink unavailable"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that sleeps on every write, then discards
struct SlowSink {
    delay: Duration,
}

impl Write for SlowSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that panics on every write
struct PanickySink;

impl Write for PanickySink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        panic!("sink exploded");
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Callback recording every notification it receives
#[derive(Clone, Default)]
struct RecordingCallback {
    notifications: Arc<Mutex<Vec<Option<Vec<u8>>>>>,
}

impl RecordingCallback {
    fn with_content(&self) -> Vec<Vec<u8>> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| n.clone())
            .collect()
    }

    fn without_content(&self) -> usize {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.is_none())
            .count()
    }
}

impl Callback for RecordingCallback {
    fn on_write_failed(&self, content: Option<&[u8]>, _reason: &io::Error) {
        self.notifications
            .lock()
            .unwrap()
            .push(content.map(<[u8]>::to_vec));
    }
}

/// Poll `cond` until it holds or `timeout` elapses
fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

/// A 66-byte payload, bigger than the small staging buffers used below
fn large_payload() -> Vec<u8> {
    (0..66u8).map(|i| b'a' + i % 26).collect()
}

/// Config with short drainer cadence so idle flushes happen within test time
fn snappy_config() -> Config {
    Config::new()
        .with_heartbeat_interval(Duration::from_millis(20))
        .with_idle_timeout(Duration::from_millis(150))
}

#[test]
fn test_sequential_writes_reach_sink_in_order() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    writer.write(b"hello").unwrap();
    writer.write(b"world").unwrap();
    writer.write(b"!!!").unwrap();

    writer.stop();

    assert_eq!(sink.contents(), b"helloworld!!!");
}

#[test]
fn test_empty_write_is_accepted_without_output() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    assert_eq!(writer.write(b"").unwrap(), 0);

    writer.stop();
    assert!(sink.contents().is_empty());
}

#[test]
fn test_write_after_stop_is_rejected() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    writer.write(b"hello").unwrap();
    writer.stop();

    assert_eq!(writer.write(b"late"), Err(Error::Closed));
    assert_eq!(sink.contents(), b"hello");
}

#[test]
fn test_stop_is_idempotent() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    writer.write(b"once").unwrap();

    writer.stop();
    writer.stop();
    writer.stop();

    assert_eq!(sink.contents(), b"once");
}

#[test]
fn test_concurrent_stop_calls() {
    let sink = SharedSink::default();
    let writer = Arc::new(AsyncWriter::new(sink.clone(), Config::new()));

    writer.write(b"payload").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || writer.stop())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.contents(), b"payload");
}

#[test]
fn test_drop_stops_the_writer() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    writer.write(b"dropped, not lost").unwrap();
    drop(writer);

    assert_eq!(sink.contents(), b"dropped, not lost");
}

#[test]
fn test_every_accepted_write_is_delivered_by_stop() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    let mut expected = Vec::new();
    for i in 0..500 {
        let payload = format!("line-{i};");
        writer.write(payload.as_bytes()).unwrap();
        expected.extend_from_slice(payload.as_bytes());
    }

    writer.stop();

    assert_eq!(sink.contents(), expected);
}

#[test]
fn test_idle_flush_delivers_without_stop() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), snappy_config());

    writer.write(b"hello").unwrap();

    // The coarse clock advances about once a second, so the flush lands
    // within a tick of the idle timeout
    assert!(wait_until(Duration::from_secs(3), || {
        sink.contents() == b"hello"
    }));

    writer.stop();
}

#[test]
fn test_idle_flush_with_default_cadence() {
    let sink = SharedSink::default();
    let writer = AsyncWriter::new(sink.clone(), Config::new());

    writer.write(b"hello").unwrap();
    writer.write(b"world").unwrap();
    writer.write(b"!!!").unwrap();

    thread::sleep(Duration::from_secs(7));

    assert_eq!(sink.contents(), b"helloworld!!!");
    writer.stop();
}

#[test]
fn test_failing_sink_reports_every_oversize_payload() {
    let payload = large_payload();
    let callback = RecordingCallback::default();
    let config = Config::new()
        .with_buffer_size(60)
        .with_callback(callback.clone());
    let writer = AsyncWriter::new(FaultySink, config);

    for _ in 0..10 {
        writer.write(&payload).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || {
        callback.with_content().len() == 10
    }));
    for reported in callback.with_content() {
        assert_eq!(reported, payload);
    }

    writer.stop();
    assert_eq!(callback.with_content().len(), 10);
}

#[test]
fn test_failing_sink_reports_staging_flush_failure() {
    let payload = large_payload();
    let callback = RecordingCallback::default();
    let config = snappy_config()
        .with_buffer_size(600)
        .with_callback(callback.clone());
    let writer = AsyncWriter::new(FaultySink, config);

    // Nine payloads fit in staging; the tenth forces a flush that fails,
    // then fails its own direct write and is reported with its content
    for _ in 0..10 {
        writer.write(&payload).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || {
        !callback.with_content().is_empty()
    }));
    let reported = callback.with_content();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0], payload);

    // The stuck staging bytes surface as an idle-flush failure without content
    assert!(wait_until(Duration::from_secs(3), || {
        callback.without_content() >= 1
    }));

    writer.stop();
}

#[test]
fn test_concurrent_writers_keep_per_thread_order() {
    const WRITERS: usize = 10;
    const PER_WRITER: usize = 100;

    let sink = SharedSink::default();
    let writer = Arc::new(AsyncWriter::new(sink.clone(), Config::new()));

    let handles: Vec<_> = (0..WRITERS)
        .map(|id| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for seq in 0..PER_WRITER {
                    let token = format!("w{id}-{seq};");
                    writer.write(token.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    writer.stop();

    let contents = sink.contents();
    let text = std::str::from_utf8(&contents).unwrap();

    let mut last_seq = vec![-1i64; WRITERS];
    let mut total = 0usize;
    for token in text.split(';').filter(|t| !t.is_empty()) {
        let (id, seq) = token
            .strip_prefix('w')
            .and_then(|t| t.split_once('-'))
            .expect("malformed token");
        let id: usize = id.parse().unwrap();
        let seq: i64 = seq.parse().unwrap();

        assert!(
            seq > last_seq[id],
            "writer {id} reordered: {} then {seq}",
            last_seq[id]
        );
        last_seq[id] = seq;
        total += 1;
    }

    assert_eq!(total, WRITERS * PER_WRITER);
}

#[test]
fn test_slow_sink_never_blocks_writers() {
    let config = Config::new().with_buffer_size(60);
    let writer = AsyncWriter::new(
        SlowSink {
            delay: Duration::from_millis(50),
        },
        config,
    );

    // Every 100-byte payload bypasses the 60-byte staging buffer, so the
    // drainer spends 50 ms in the sink per payload while the producer keeps
    // going at push + memcpy speed
    let payload = vec![b'x'; 100];
    let started = Instant::now();
    for _ in 0..20 {
        writer.write(&payload).unwrap();
    }
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(250),
        "producer was blocked for {elapsed:?}"
    );

    writer.stop();
}

#[test]
fn test_panicking_sink_is_contained() {
    let callback = RecordingCallback::default();
    let config = Config::new()
        .with_buffer_size(4)
        .with_callback(callback.clone());
    let writer = AsyncWriter::new(PanickySink, config);

    writer.write(b"hello").unwrap();
    writer.write(b"world").unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        callback.with_content().len() == 2
    }));

    // The drainer survived both panics and still shuts down cleanly
    writer.stop();
}

#[test]
fn test_std_io_write_adapter() {
    let sink = SharedSink::default();
    let mut writer = AsyncWriter::new(sink.clone(), Config::new());

    io::Write::write_all(&mut writer, b"via trait").unwrap();
    io::Write::flush(&mut writer).unwrap();

    writer.stop();
    assert_eq!(sink.contents(), b"via trait");

    let err = io::Write::write(&mut writer, b"late").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
}

#[test]
fn test_file_sink_roundtrip() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();

    let writer = AsyncWriter::new(std::fs::File::create(&path).unwrap(), Config::new());
    writer.write(b"first line\n").unwrap();
    writer.write(b"second line\n").unwrap();
    writer.stop();

    let contents = std::fs::read(&path).unwrap();
    assert_eq!(contents, b"first line\nsecond line\n");
}
