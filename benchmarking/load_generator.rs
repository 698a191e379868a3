//! Ad hoc load generator: spins up `CONNECTION_COUNT` handles against a
//! running echo server, has each send `MESSAGE_COUNT` round trips, and
//! reports the average per-round-trip latency. Not part of the crate's
//! `[[bin]]` set (matching the teacher's own `benchmarking/load_generator.rs`,
//! which is likewise undeclared) — run it with
//! `rustc --edition 2021 -L target/debug/deps --extern wsclient_core=... load_generator.rs`
//! against a built `libwsclient_core`, pointed at a real echo server.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use wsclient_core::Handle;

const CONNECTION_COUNT: usize = 100;
const MESSAGE_COUNT: usize = 1000;
const MESSAGE_SIZE: usize = 16384;

fn main() {
    let url = "ws://127.0.0.1:9002/";
    let (tx, rx) = mpsc::channel::<Duration>();

    let workers: Vec<_> = (0..CONNECTION_COUNT)
        .map(|_| {
            let tx = tx.clone();
            std::thread::spawn(move || run_one_connection(url, tx))
        })
        .collect();

    drop(tx);
    for w in workers {
        let _ = w.join();
    }

    let mut total = Duration::ZERO;
    let mut count = 0u32;
    while let Ok(d) = rx.recv() {
        total += d;
        count += 1;
    }

    if count == 0 {
        println!("no connections completed a full run");
        return;
    }
    println!(
        "average round trip latency over {count} connections: {:?}",
        total / (count * MESSAGE_COUNT as u32)
    );
}

fn run_one_connection(url: &str, tx: mpsc::Sender<Duration>) {
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let handle = Handle::new();
    handle.set_url(url).expect("valid ws:// url");
    handle.set_on_recvd_bin(move |_h, _bytes, _is_final| {
        let _ = done_tx.send(());
    });
    handle.set_on_disconnected(|_h| {});
    handle.connect().expect("connect() parameters are valid");

    while !handle.is_connected() {
        if handle.state() == wsclient_core::State::Closed {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    let payload = vec![b'a'; MESSAGE_SIZE];
    let start = Instant::now();
    for _ in 0..MESSAGE_COUNT {
        handle.send_binary(&payload).expect("connection still open");
        let _ = done_rx.recv_timeout(Duration::from_secs(10));
    }
    let elapsed = start.elapsed();

    handle.disconnect_and_release();
    let _ = tx.send(elapsed);
}
