//! Line-oriented text producer (stdin or a replayed file).
//!
//! Lines are read on a spawned tokio task, so a slow or blocked read never
//! holds up updates that are already queued.  A line that fails to parse is
//! logged and skipped; the stream carries on.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::queue::UpdateSender;
use crate::serialize::UpdateSerializer;

use super::{join_cancelled, ProducerError, UpdateProducer};

/// Reads serialized updates from any async line source.
pub struct TextStreamProducer<R> {
    name: String,
    reader: Option<R>,
    serializer: Arc<dyn UpdateSerializer>,
    task: Option<JoinHandle<()>>,
}

impl<R> TextStreamProducer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(name: impl Into<String>, reader: R, serializer: Arc<dyn UpdateSerializer>) -> Self {
        Self {
            name: name.into(),
            reader: Some(reader),
            serializer,
            task: None,
        }
    }

    /// `true` while the reading task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl TextStreamProducer<BufReader<tokio::io::Stdin>> {
    /// Producer over the process's standard input.
    pub fn stdin(serializer: Arc<dyn UpdateSerializer>) -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()), serializer)
    }
}

impl TextStreamProducer<BufReader<tokio::fs::File>> {
    /// Producer replaying a recorded file.
    pub async fn open(path: &Path, serializer: Arc<dyn UpdateSerializer>) -> Result<Self, ProducerError> {
        let file = tokio::fs::File::open(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".into());
        Ok(Self::new(name, BufReader::new(file), serializer))
    }
}

/// Read lines until EOF, an I/O error, or the queue closes.  A line that is
/// not valid UTF-8 is skipped like any other malformed line.
async fn pump<R>(name: String, mut reader: R, serializer: Arc<dyn UpdateSerializer>, queue: UpdateSender)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut delivered = 0u64;
    let mut skipped = 0u64;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::error!("producer[{name}]: read failed: {e}");
                break;
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                log::error!("producer[{name}]: skipping line that is not UTF-8: {e}");
                skipped += 1;
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serializer.deserialize(line) {
            Ok(update) => {
                if queue.send(update).await.is_err() {
                    log::debug!("producer[{name}]: queue closed, stopping");
                    break;
                }
                delivered += 1;
            }
            Err(e) => {
                log::error!("producer[{name}]: {e}");
                skipped += 1;
            }
        }
    }

    log::info!("producer[{name}]: stream ended ({delivered} delivered, {skipped} skipped)");
}

#[async_trait]
impl<R> UpdateProducer for TextStreamProducer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self, queue: UpdateSender) -> Result<(), ProducerError> {
        let reader = self.reader.take().ok_or(ProducerError::AlreadyStarted)?;
        let serializer = Arc::clone(&self.serializer);
        let name = self.name.clone();

        log::debug!("producer[{name}]: reading lines");
        self.task = Some(tokio::spawn(pump(name, reader, serializer, queue)));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ProducerError> {
        match self.task.take() {
            Some(task) => {
                task.abort();
                join_cancelled(task).await
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use crate::queue::{self, Recv};
    use crate::serialize::CsvSerializer;
    use crate::update::UpdateValue;

    fn csv(allow_missing: bool) -> Arc<dyn UpdateSerializer> {
        Arc::new(CsvSerializer::new(allow_missing))
    }

    async fn collect(rx: &mut queue::UpdateReceiver) -> Vec<(String, UpdateValue)> {
        let mut out = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_millis(200)).await {
                Recv::Update(u) => out.push((u.key, u.value)),
                Recv::Timeout | Recv::Closed => return out,
            }
        }
    }

    #[tokio::test]
    async fn delivers_parsed_lines_and_skips_bad_ones() {
        let input = "2024-03-01T10:00:00,speed_instant,4.5\n\
                     this is not csv\n\
                     \n\
                     2024-03-01T10:00:01,time_elapsed,1\n";
        let mut producer = TextStreamProducer::new("test", Cursor::new(input.as_bytes().to_vec()), csv(false));
        let (tx, mut rx) = queue::bounded(8);

        producer.start(tx).await.unwrap();
        let got = collect(&mut rx).await;
        producer.stop().await.unwrap();

        assert_eq!(
            got,
            vec![
                ("speed_instant".to_string(), UpdateValue::Real(4.5)),
                ("time_elapsed".to_string(), UpdateValue::Int(1)),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let mut input = b"2024-03-01T10:00:00,speed_instant,4.5\n".to_vec();
        input.extend_from_slice(b"2024-03-01T10:00:00,k\xff,1\n");
        input.extend_from_slice(b"2024-03-01T10:00:01,time_elapsed,1\n");
        let mut producer = TextStreamProducer::new("test", Cursor::new(input), csv(false));
        let (tx, mut rx) = queue::bounded(8);

        producer.start(tx).await.unwrap();
        let keys: Vec<String> = collect(&mut rx).await.into_iter().map(|(k, _)| k).collect();
        producer.stop().await.unwrap();

        assert_eq!(keys, vec!["speed_instant", "time_elapsed"]);
    }

    #[tokio::test]
    async fn end_of_stream_closes_the_queue() {
        let mut producer = TextStreamProducer::new("test", Cursor::new(b"k,1\n".to_vec()), csv(true));
        let (tx, mut rx) = queue::bounded(8);
        producer.start(tx).await.unwrap();

        assert!(matches!(rx.recv_timeout(Duration::from_secs(1)).await, Recv::Update(_)));
        assert!(matches!(rx.recv_timeout(Duration::from_secs(1)).await, Recv::Closed));
        producer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_cancels_a_blocked_read() {
        // Keep the writer alive so the read never completes on its own.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut producer = TextStreamProducer::new("blocked", BufReader::new(reader), csv(false));
        let (tx, _rx) = queue::bounded(1);

        producer.start(tx).await.unwrap();
        assert!(producer.is_running());

        tokio::time::timeout(Duration::from_secs(1), producer.stop())
            .await
            .expect("stop must not hang")
            .unwrap();
        assert!(!producer.is_running());
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let mut producer = TextStreamProducer::new("test", Cursor::new(Vec::new()), csv(false));
        let (tx, _rx) = queue::bounded(1);
        producer.start(tx.clone()).await.unwrap();
        assert!(matches!(
            producer.start(tx).await,
            Err(ProducerError::AlreadyStarted)
        ));
        producer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn replays_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");
        std::fs::write(&path, "2024-03-01T10:00:00,distance_total,120\n").unwrap();

        let mut producer = TextStreamProducer::open(&path, csv(false)).await.unwrap();
        assert_eq!(producer.name(), "session.csv");

        let (tx, mut rx) = queue::bounded(4);
        producer.start(tx).await.unwrap();
        let got = collect(&mut rx).await;
        producer.stop().await.unwrap();
        assert_eq!(got, vec![("distance_total".to_string(), UpdateValue::Int(120))]);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = TextStreamProducer::open(Path::new("/definitely/not/here.csv"), csv(false)).await;
        assert!(matches!(result, Err(ProducerError::Io(_))));
    }
}
