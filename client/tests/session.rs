use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};

use client::sampler::generate_batch;
use client::session::{Session, SessionSettings, StopOutcome};
use client::transmit::{DeliveryFailure, HttpTransmitter, Transmit, TransmitResult};
use client::Error;
use common::{Batch, SensorTable, SubjectId};

struct Counting<T> {
    inner: T,
    attempts: Arc<AtomicUsize>,
}

impl<T: Transmit> Transmit for Counting<T> {
    fn transmit(&self, batch: &Batch) -> TransmitResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.transmit(batch)
    }
}

struct Slow(Duration);

impl Transmit for Slow {
    fn transmit(&self, _: &Batch) -> TransmitResult {
        thread::sleep(self.0);
        Ok(())
    }
}

struct Nothing;

impl Transmit for Nothing {
    fn transmit(&self, _: &Batch) -> TransmitResult {
        Ok(())
    }
}

fn settings(interval_ms: u64) -> SessionSettings {
    SessionSettings {
        sensors: SensorTable::reference(),
        interval: Duration::from_millis(interval_ms),
        stop_grace: Duration::from_secs(3),
    }
}

fn closed_port_url() -> String {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{}/api/sensor-data", port)
}

/// Minimal collector answering every request with `status`. Received bodies
/// are forwarded on the returned channel.
fn stub_collector(status: u16) -> (String, Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!(
        "http://{}/api/sensor-data",
        listener.local_addr().unwrap()
    );
    let (tx, rx) = unbounded();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => return,
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }

            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            let _ = tx.send(body);

            let reply = if status == 200 {
                r#"{"status":"ok"}"#
            } else {
                r#"{"status":"error","message":"Invalid JSON"}"#
            };
            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reply.len(),
                reply
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (url, rx)
}

#[test]
fn unreachable_collector_keeps_the_loop_running() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let transmitter = Counting {
        inner: HttpTransmitter::new(&closed_port_url(), Duration::from_secs(1)),
        attempts: Arc::clone(&attempts),
    };

    let mut session = Session::start("u1", settings(100), transmitter).unwrap();
    thread::sleep(Duration::from_millis(450));
    assert_eq!(session.stop(), StopOutcome::Joined);

    assert!(attempts.load(Ordering::SeqCst) >= 2);
}

#[test]
fn stop_interrupts_the_wait_and_sends_nothing_more() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let transmitter = Counting {
        inner: Nothing,
        attempts: Arc::clone(&attempts),
    };

    let mut session = Session::start("u1", settings(60_000), transmitter).unwrap();
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    assert_eq!(session.stop(), StopOutcome::Joined);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!session.is_running());

    thread::sleep(Duration::from_millis(100));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn stopping_twice_is_harmless() {
    let mut session = Session::start("u1", settings(50), Nothing).unwrap();
    assert_eq!(session.stop(), StopOutcome::Joined);
    assert_eq!(session.stop(), StopOutcome::Joined);
    assert!(session.token().is_cancelled());
}

#[test]
fn stop_gives_up_after_grace_period() {
    let mut settings = settings(10);
    settings.stop_grace = Duration::from_millis(100);

    let mut session = Session::start("u1", settings, Slow(Duration::from_secs(2))).unwrap();
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    assert_eq!(session.stop(), StopOutcome::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn session_keeps_the_trimmed_subject() {
    let mut session = Session::start("  bed-12 ", settings(50), Nothing).unwrap();
    assert_eq!(session.subject(), &SubjectId::new("bed-12").unwrap());
    assert_eq!(session.subject().to_string(), "bed-12");
    session.stop();
}

#[test]
fn empty_subject_never_starts() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let transmitter = Counting {
        inner: Nothing,
        attempts: Arc::clone(&attempts),
    };

    match Session::start("   ", settings(10), transmitter) {
        Err(Error::InvalidSubject(_)) => {}
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("session started without a subject"),
    }
    thread::sleep(Duration::from_millis(50));
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}

#[test]
fn delivered_body_matches_generated_batch() {
    let (url, bodies) = stub_collector(200);
    let transmitter = HttpTransmitter::new(&url, Duration::from_secs(5));

    let subject = SubjectId::new("u1").unwrap();
    let batch = generate_batch(&SensorTable::reference(), &subject);
    transmitter.transmit(&batch).unwrap();

    let body = bodies.recv_timeout(Duration::from_secs(5)).unwrap();
    let decoded: Batch = serde_json::from_slice(&body).unwrap();
    assert_eq!(decoded, batch);

    let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(raw[0]["ES_ID"], "u1");
    assert_eq!(raw[0]["sensor_name"], "heart_rate");
}

#[test]
fn rejected_batch_is_a_status_failure() {
    let (url, _bodies) = stub_collector(400);
    let transmitter = HttpTransmitter::new(&url, Duration::from_secs(5));

    let batch = generate_batch(&SensorTable::reference(), &SubjectId::new("u1").unwrap());
    match transmitter.transmit(&batch) {
        Err(DeliveryFailure::Status(400)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn silent_collector_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api/sensor-data", listener.local_addr().unwrap());
    // Accept and hold the connection open without ever answering
    let holder = thread::spawn(move || {
        let held = listener.accept();
        thread::sleep(Duration::from_secs(2));
        drop(held);
    });

    let transmitter = HttpTransmitter::new(&url, Duration::from_millis(300));
    let start = Instant::now();
    let result = transmitter.transmit(&Batch::default());
    assert!(matches!(result, Err(DeliveryFailure::Transport(_))));
    assert!(start.elapsed() < Duration::from_secs(2));

    holder.join().unwrap();
}

#[test]
fn session_delivers_to_live_collector() {
    let (url, bodies) = stub_collector(200);
    let transmitter = HttpTransmitter::new(&url, Duration::from_secs(5));

    let mut session = Session::start("bed-12", settings(50), transmitter).unwrap();
    let first = bodies.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = bodies.recv_timeout(Duration::from_secs(5)).unwrap();
    session.stop();

    for body in [first, second].iter() {
        let batch: Batch = serde_json::from_slice(body).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.readings().iter().all(|r| r.subject_id == "bed-12"));
    }
}
