//! Transcription stream stage: one persistent session, two concurrent
//! duties. Audio frames are forwarded to the service while transcript
//! events are delivered downstream, in arrival order.

use crate::audio::codec;
use crate::error::Result;
use crate::pipeline::types::{AudioFrame, Transcript};
use crate::stt::{AudioSink, Recognizer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs until cancelled, the service ends the stream, or a read fails.
///
/// Queue closure and cancellation both translate into the graceful
/// close handshake on the audio half. A connect or read error is fatal to
/// this stage only; dropping `transcript_tx` on exit propagates shutdown
/// downstream.
pub(crate) async fn run_recognizer_stage(
    recognizer: Arc<dyn Recognizer>,
    frame_rx: mpsc::Receiver<AudioFrame>,
    transcript_tx: mpsc::Sender<Transcript>,
    cancel: CancellationToken,
) -> Result<()> {
    let session = recognizer.connect().await?;
    let mut events = session.events;

    let writer = {
        let cancel = cancel.clone();
        tokio::spawn(run_audio_writer(session.audio, frame_rx, cancel))
    };

    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            event = events.next_event() => match event {
                Ok(Some(transcript)) => {
                    log::debug!(
                        "transcript: {:?} (final={})",
                        transcript.text,
                        transcript.is_final
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break Ok(()),
                        sent = transcript_tx.send(transcript) => {
                            if sent.is_err() {
                                break Ok(());
                            }
                        }
                    }
                }
                Ok(None) => {
                    log::info!("transcription stream ended");
                    break Ok(());
                }
                Err(e) => break Err(e),
            },
        }
    };

    writer.abort();
    if let Err(e) = writer.await
        && !e.is_cancelled()
    {
        log::warn!("audio writer task failed: {}", e);
    }
    result
}

/// Forward frames from the queue to the service until the queue closes or
/// cancellation fires, then perform the close handshake.
async fn run_audio_writer(
    mut audio: Box<dyn AudioSink>,
    mut frame_rx: mpsc::Receiver<AudioFrame>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frame_rx.recv() => match frame {
                Some(frame) => {
                    let pcm = codec::encode_samples(&frame.samples);
                    if let Err(e) = audio.send_audio(&pcm).await {
                        // The reader half surfaces the fatal error; just stop writing.
                        log::warn!("audio forward failed: {}", e);
                        return;
                    }
                }
                None => break,
            },
        }
    }
    if let Err(e) = audio.finish().await {
        log::debug!("close handshake failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::MockRecognizer;
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_events_in_order_then_closes_downstream() {
        let recognizer = Arc::new(
            MockRecognizer::new()
                .with_events(vec![
                    Transcript::partial("hel"),
                    Transcript::r#final("hello"),
                    Transcript::r#final("world"),
                ])
                .with_stream_end(),
        );
        let (_frame_tx, frame_rx) = mpsc::channel(8);
        let (transcript_tx, mut transcript_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = tokio::spawn(run_recognizer_stage(
            recognizer.clone(),
            frame_rx,
            transcript_tx,
            cancel,
        ));

        assert_eq!(
            transcript_rx.recv().await,
            Some(Transcript::partial("hel"))
        );
        assert_eq!(
            transcript_rx.recv().await,
            Some(Transcript::r#final("hello"))
        );
        assert_eq!(
            transcript_rx.recv().await,
            Some(Transcript::r#final("world"))
        );
        // Stream end closes the output queue.
        assert_eq!(transcript_rx.recv().await, None);

        tokio::time::timeout(Duration::from_secs(2), stage)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn forwards_frames_to_the_service() {
        let recognizer = Arc::new(MockRecognizer::new());
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (transcript_tx, _transcript_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = {
            let cancel = cancel.clone();
            tokio::spawn(run_recognizer_stage(
                recognizer.clone(),
                frame_rx,
                transcript_tx,
                cancel,
            ))
        };

        for sequence in 0..3 {
            frame_tx
                .send(AudioFrame::new(vec![0i16; 16], sequence))
                .await
                .unwrap();
        }

        // Give the writer a moment to drain the queue.
        for _ in 0..50 {
            if recognizer.frames_sent() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(recognizer.frames_sent(), 3);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), stage)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn connect_failure_is_fatal() {
        let recognizer = Arc::new(MockRecognizer::new().with_connect_failure());
        let (_frame_tx, frame_rx) = mpsc::channel(8);
        let (transcript_tx, mut transcript_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let result =
            run_recognizer_stage(recognizer, frame_rx, transcript_tx, cancel).await;
        assert!(result.is_err());
        // Output queue closed by the stage exit.
        assert_eq!(transcript_rx.recv().await, None);
    }

    #[tokio::test]
    async fn cancellation_ends_an_open_session() {
        let recognizer = Arc::new(MockRecognizer::new());
        let (_frame_tx, frame_rx) = mpsc::channel(8);
        let (transcript_tx, _transcript_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = {
            let cancel = cancel.clone();
            tokio::spawn(run_recognizer_stage(
                recognizer,
                frame_rx,
                transcript_tx,
                cancel,
            ))
        };

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), stage)
            .await
            .expect("stage ignored cancellation")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn frame_queue_closure_triggers_close_handshake() {
        let recognizer = Arc::new(MockRecognizer::new());
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (transcript_tx, _transcript_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = {
            let cancel = cancel.clone();
            tokio::spawn(run_recognizer_stage(
                recognizer,
                frame_rx,
                transcript_tx,
                cancel,
            ))
        };

        // Closing the leading queue lets the writer finish; the reader side
        // stays up (live sessions outlive silence) until cancellation.
        drop(frame_tx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), stage)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
