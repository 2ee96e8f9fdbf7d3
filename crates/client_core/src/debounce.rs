use std::time::Duration;

use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};

/// Spawns the settle loop for raw query text.
///
/// Each value received restarts the `delay` window; only the value present
/// when the window elapses untouched is handed to `on_settled`. Blank
/// values settle silently. The loop ends when every sender is dropped.
pub(crate) fn spawn_query_debouncer<F>(
    runtime: &Handle,
    delay: Duration,
    mut raw_rx: mpsc::UnboundedReceiver<String>,
    mut on_settled: F,
) -> JoinHandle<()>
where
    F: FnMut(String) + Send + 'static,
{
    runtime.spawn(async move {
        loop {
            let Some(mut latest) = raw_rx.recv().await else {
                break;
            };

            loop {
                match tokio::time::timeout(delay, raw_rx.recv()).await {
                    Ok(Some(next)) => latest = next,
                    Ok(None) => return,
                    // quiet for a full window
                    Err(_) => break,
                }
            }

            if latest.trim().is_empty() {
                continue;
            }
            on_settled(latest);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(String) + Send + 'static) {
        let settled = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&settled);
        (settled, move |value| sink.lock().expect("lock").push(value))
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_value_of_a_burst_settles() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (settled, sink) = collector();
        let _task = spawn_query_debouncer(&Handle::current(), Duration::from_millis(500), rx, sink);

        for value in ["r", "ru", "rus", "rust"] {
            tx.send(value.to_string()).expect("send");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(settled.lock().expect("lock").is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*settled.lock().expect("lock"), vec!["rust".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_settle_separately() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (settled, sink) = collector();
        let _task = spawn_query_debouncer(&Handle::current(), Duration::from_millis(500), rx, sink);

        tx.send("go".into()).expect("send");
        tokio::time::sleep(Duration::from_millis(700)).await;
        tx.send("zig".into()).expect("send");
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(
            *settled.lock().expect("lock"),
            vec!["go".to_string(), "zig".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn blank_values_never_settle() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (settled, sink) = collector();
        let _task = spawn_query_debouncer(&Handle::current(), Duration::from_millis(500), rx, sink);

        tx.send("kotlin".into()).expect("send");
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send("  ".into()).expect("send");
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert!(settled.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ends_when_sender_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let (_settled, sink) = collector();
        let task = spawn_query_debouncer(&Handle::current(), Duration::from_millis(500), rx, sink);

        drop(tx);
        task.await.expect("debouncer exits cleanly");
    }
}
