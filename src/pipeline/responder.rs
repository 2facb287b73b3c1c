//! Response stage: one collaborator call per committed utterance.

use crate::error::Result;
use crate::llm::Responder;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs until cancelled or the utterance queue closes.
///
/// Generation errors are logged and the utterance is skipped; empty replies
/// are dropped. The collaborator call itself races the cancellation token so
/// a hung request is abandoned on shutdown.
pub(crate) async fn run_responder_stage(
    responder: Arc<dyn Responder>,
    mut utterance_rx: mpsc::Receiver<String>,
    reply_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let utterance = tokio::select! {
            _ = cancel.cancelled() => break,
            utterance = utterance_rx.recv() => match utterance {
                Some(utterance) => utterance,
                None => break,
            },
        };

        log::info!("user: {:?}", utterance);

        let reply = tokio::select! {
            _ = cancel.cancelled() => break,
            reply = responder.generate(&utterance) => match reply {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("response generation failed: {}", e);
                    continue;
                }
            },
        };

        if reply.trim().is_empty() {
            log::debug!("empty reply, nothing to speak");
            continue;
        }
        log::info!("assistant: {:?}", reply);

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = reply_tx.send(reply) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockResponder;
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_replies_for_utterances() {
        let responder = Arc::new(MockResponder::new());
        let (utterance_tx, utterance_rx) = mpsc::channel(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = tokio::spawn(run_responder_stage(
            responder.clone(),
            utterance_rx,
            reply_tx,
            cancel,
        ));

        utterance_tx.send("hello".to_string()).await.unwrap();
        assert_eq!(reply_rx.recv().await.unwrap(), "You said: hello");

        utterance_tx.send("again".to_string()).await.unwrap();
        assert_eq!(reply_rx.recv().await.unwrap(), "You said: again");

        drop(utterance_tx);
        tokio::time::timeout(Duration::from_secs(2), stage)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(responder.prompts(), vec!["hello", "again"]);
    }

    #[tokio::test]
    async fn empty_reply_is_dropped() {
        let responder = Arc::new(MockResponder::new().with_reply("   "));
        let (utterance_tx, utterance_rx) = mpsc::channel(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = tokio::spawn(run_responder_stage(
            responder,
            utterance_rx,
            reply_tx,
            cancel,
        ));

        utterance_tx.send("hello".to_string()).await.unwrap();
        drop(utterance_tx);

        stage.await.unwrap().unwrap();
        // Queue closed without any reply.
        assert_eq!(reply_rx.recv().await, None);
    }

    #[tokio::test]
    async fn generation_error_skips_the_utterance_and_continues() {
        struct FlakyResponder {
            calls: std::sync::atomic::AtomicU32,
        }

        #[async_trait::async_trait]
        impl Responder for FlakyResponder {
            async fn generate(&self, utterance: &str) -> Result<String> {
                let call = self
                    .calls
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if call == 0 {
                    Err(crate::error::VoxloopError::Generation {
                        message: "transient".to_string(),
                    })
                } else {
                    Ok(format!("ok: {}", utterance))
                }
            }
        }

        let responder = Arc::new(FlakyResponder {
            calls: std::sync::atomic::AtomicU32::new(0),
        });
        let (utterance_tx, utterance_rx) = mpsc::channel(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = tokio::spawn(run_responder_stage(
            responder,
            utterance_rx,
            reply_tx,
            cancel,
        ));

        utterance_tx.send("first".to_string()).await.unwrap();
        utterance_tx.send("second".to_string()).await.unwrap();
        drop(utterance_tx);

        // The failed first call produced nothing; the second got through.
        assert_eq!(reply_rx.recv().await.unwrap(), "ok: second");
        assert_eq!(reply_rx.recv().await, None);
        stage.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_the_stage() {
        let responder = Arc::new(MockResponder::new());
        let (_utterance_tx, utterance_rx) = mpsc::channel::<String>(8);
        let (reply_tx, _reply_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stage = {
            let cancel = cancel.clone();
            tokio::spawn(run_responder_stage(responder, utterance_rx, reply_tx, cancel))
        };

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), stage)
            .await
            .expect("stage ignored cancellation")
            .unwrap()
            .unwrap();
    }
}
